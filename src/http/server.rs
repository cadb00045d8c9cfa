//! Service runner.
//!
//! # Responsibilities
//! - Fall back to a default handler when the caller supplies none
//! - Wrap the handler with the password gate and the health endpoint
//! - Report the endpoint and auth mode (unless quiet)
//! - Start the health watchdog next to the serve loop
//! - Serve until the listener closes (clean) or the loop fails (error)

use axum::{http::StatusCode, Router};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::config::ServerConfig;
use crate::error::ServeError;
use crate::health::probe::{health_url, HttpProbe, Probe};
use crate::health::{HealthWatchdog, WatchdogEvent};
use crate::http::middleware::{with_health, with_password};
use crate::net::listener::{ClosableListener, Listener};

/// Handler used when the caller passes none: every path is not found.
pub fn default_handler() -> Router {
    Router::new().fallback(|| async { (StatusCode::NOT_FOUND, "404 page not found\n") })
}

/// Apply the standard decorators around `handler`.
pub fn build_app(handler: Option<Router>, password: Option<&str>) -> Router {
    let handler = handler.unwrap_or_else(default_handler);
    let handler = with_password(handler, password);
    with_health(handler).layer(TraceLayer::new_for_http())
}

/// Drives one listener from acquisition to close.
pub struct ServiceRunner<'a> {
    config: &'a ServerConfig,
    events: Option<mpsc::UnboundedSender<WatchdogEvent>>,
}

impl<'a> ServiceRunner<'a> {
    pub fn new(config: &'a ServerConfig) -> Self {
        Self { config, events: None }
    }

    /// Forward the watchdog's transitions to `events`.
    pub fn with_watchdog_events(mut self, events: mpsc::UnboundedSender<WatchdogEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Serve `handler` on `listener`, probing the listener's own health
    /// endpoint over HTTP.
    pub async fn run<L: Listener>(
        &self,
        listener: ClosableListener<L>,
        handler: Option<Router>,
    ) -> Result<(), ServeError> {
        let probe = if self.config.watchdog_enabled() {
            let endpoint = listener.endpoint().map_err(ServeError::ServeFailed)?;
            self.http_probe(&endpoint)
        } else {
            None
        };
        self.run_with_probe(listener, handler, probe).await
    }

    /// Serve `handler` on `listener` with an explicit watchdog probe.
    /// `None` runs without a watchdog.
    pub async fn run_with_probe<L: Listener, P: Probe>(
        &self,
        listener: ClosableListener<L>,
        handler: Option<Router>,
        probe: Option<P>,
    ) -> Result<(), ServeError> {
        let endpoint = listener.endpoint().map_err(ServeError::ServeFailed)?;
        if !self.config.quiet {
            log_server_status(&endpoint, self.config.password_protected());
        }

        let app = build_app(handler, self.config.password.as_deref());

        let watchdog = probe.and_then(|probe| {
            let mut watchdog = HealthWatchdog::new(
                probe,
                self.config.health_check_interval,
                self.config.health_check_retry,
            );
            if let Some(events) = &self.events {
                watchdog = watchdog.with_events(events.clone());
            }
            watchdog.spawn(listener.handle())
        });

        let result = listener.serve(app).await;

        if let Some(task) = watchdog {
            task.abort();
        }

        match result {
            Ok(()) => {
                if !self.config.quiet {
                    tracing::info!(endpoint = %endpoint, "Listener closed");
                }
                Ok(())
            }
            Err(e) => Err(ServeError::ServeFailed(e)),
        }
    }

    fn http_probe(&self, endpoint: &Url) -> Option<HttpProbe> {
        let url = match health_url(endpoint) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Cannot derive health check URL, watchdog disabled");
                return None;
            }
        };
        match HttpProbe::new(url, self.config.health_check_interval) {
            Ok(probe) => Some(probe),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot build health check client, watchdog disabled");
                None
            }
        }
    }
}

fn log_server_status(endpoint: &Url, password_protected: bool) {
    tracing::info!(endpoint = %endpoint, password_protected, "listening on {endpoint}");
    if password_protected {
        tracing::info!("secured by password authentication");
    } else {
        tracing::info!("publicly accessible without a password");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HEALTH_PATH;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    async fn status(app: Router, uri: &str, authorization: Option<&str>) -> StatusCode {
        let mut request = Request::get(uri);
        if let Some(value) = authorization {
            request = request.header(header::AUTHORIZATION, value);
        }
        app.oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn default_handler_is_not_found() {
        assert_eq!(status(build_app(None, None), "/anything", None).await, StatusCode::NOT_FOUND);
        assert_eq!(status(build_app(None, None), HEALTH_PATH, None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn health_bypasses_password() {
        let app = build_app(None, Some("secret"));
        assert_eq!(status(app.clone(), HEALTH_PATH, None).await, StatusCode::OK);
        assert_eq!(status(app.clone(), "/", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status(app, "/", Some("Bearer secret")).await, StatusCode::NOT_FOUND);
    }

    /// Log sink shared with a scoped subscriber.
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn status_log(quiet: bool) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut config = ServerConfig::with_defaults(crate::config::Target::Bind(":0".into()));
        config.quiet = quiet;
        let listener = ClosableListener::new(tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap());
        listener.close();

        ServiceRunner::new(&config)
            .run_with_probe(listener, None, None::<HttpProbe>)
            .await
            .unwrap();

        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[tokio::test]
    async fn status_is_reported_unless_quiet() {
        let log = status_log(false).await;
        assert!(log.contains("listening on http://127.0.0.1:"), "{log}");
        assert!(log.contains("publicly accessible without a password"), "{log}");

        let log = status_log(true).await;
        assert!(!log.contains("listening on"), "{log}");
        assert!(!log.contains("publicly accessible"), "{log}");
    }
}
