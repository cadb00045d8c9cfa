//! Well-known health endpoint.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};

use crate::health::HEALTH_PATH;

/// Answer [`HEALTH_PATH`] with `200 OK` without reaching `handler`.
pub fn with_health(handler: Router) -> Router {
    handler.layer(middleware::from_fn(well_known_health))
}

async fn well_known_health(request: Request, next: Next) -> Response {
    if request.uri().path() == HEALTH_PATH {
        return (StatusCode::OK, "OK").into_response();
    }
    next.run(request).await
}
