//! Password gate.
//!
//! Accepts the password as a bearer token (`Authorization: Bearer <password>`)
//! or as the password half of HTTP Basic credentials, so both scripts and
//! browsers can get through. Anything else is challenged with `401`.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

const REALM: &str = "Basic realm=\"wtf-serve\", charset=\"UTF-8\"";

/// Gate every request behind `password`. `None` leaves `handler` untouched.
pub fn with_password(handler: Router, password: Option<&str>) -> Router {
    match password {
        None => handler,
        Some(password) => {
            let password: Arc<str> = Arc::from(password);
            handler.layer(middleware::from_fn_with_state(password, password_auth))
        }
    }
}

async fn password_auth(State(password): State<Arc<str>>, request: Request, next: Next) -> Response {
    if credential_matches(request.headers(), &password) {
        return next.run(request).await;
    }

    tracing::debug!(path = %request.uri().path(), "Rejected request without valid credentials");
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, REALM)],
        "Unauthorized",
    )
        .into_response()
}

fn credential_matches(headers: &HeaderMap, password: &str) -> bool {
    let Some(value) = headers.get(header::AUTHORIZATION).and_then(|h| h.to_str().ok()) else {
        return false;
    };

    if let Some(token) = value.strip_prefix("Bearer ") {
        return token == password;
    }

    if let Some(encoded) = value.strip_prefix("Basic ") {
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(credentials) = String::from_utf8(decoded) else {
            return false;
        };
        return credentials
            .split_once(':')
            .is_some_and(|(_, given)| given == password);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use tower::ServiceExt;

    fn app(password: Option<&str>) -> Router {
        with_password(Router::new().route("/", get(|| async { "secret stuff" })), password)
    }

    async fn status(app: Router, authorization: Option<&str>) -> StatusCode {
        let mut request = Request::get("/");
        if let Some(value) = authorization {
            request = request.header(header::AUTHORIZATION, value);
        }
        app.oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn no_password_is_identity() {
        assert_eq!(status(app(None), None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_credential_is_challenged() {
        let response = app(Some("secret"))
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn bearer_and_basic_are_accepted() {
        assert_eq!(status(app(Some("secret")), Some("Bearer secret")).await, StatusCode::OK);

        let basic = format!("Basic {}", STANDARD.encode("anyone:secret"));
        assert_eq!(status(app(Some("secret")), Some(&basic)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_credentials_are_rejected() {
        assert_eq!(
            status(app(Some("secret")), Some("Bearer hunter2")).await,
            StatusCode::UNAUTHORIZED
        );

        let basic = format!("Basic {}", STANDARD.encode("secret:wrong"));
        assert_eq!(status(app(Some("secret")), Some(&basic)).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status(app(Some("secret")), Some("Basic !!!")).await, StatusCode::UNAUTHORIZED);
    }
}
