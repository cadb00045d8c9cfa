//! Persistent supervisor.
//!
//! Owns the Acquire → Run cycle. Without `persist` it runs one cycle and
//! hands back the result. With `persist` it never returns: every cycle's
//! error is logged, and the next cycle starts after a fixed delay so a
//! failing relay cannot turn into a tight reconnect loop.

use std::time::Duration;

use axum::Router;
use tokio::sync::mpsc;
use tokio::time;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::schema::DEFAULT_RESTART_DELAY;
use crate::config::{self, ServerConfig};
use crate::error::ServeError;
use crate::health::WatchdogEvent;
use crate::http::server::ServiceRunner;
use crate::net::transport::{acquire, TcpTransport, Transport};
use crate::observability::metrics;

pub struct Supervisor<T> {
    transport: T,
    config: ServerConfig,
    handler: Option<Router>,
    restart_delay: Duration,
    events: Option<mpsc::UnboundedSender<WatchdogEvent>>,
}

impl<T: Transport> Supervisor<T> {
    pub fn new(transport: T, config: ServerConfig, handler: Option<Router>) -> Self {
        Self {
            transport,
            config,
            handler,
            restart_delay: DEFAULT_RESTART_DELAY,
            events: None,
        }
    }

    /// Pause between persistent cycles.
    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    /// Forward every cycle's watchdog transitions to `events`.
    pub fn with_watchdog_events(mut self, events: mpsc::UnboundedSender<WatchdogEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run according to `persist`. In persistent mode this never returns.
    pub async fn run(&self) -> Result<(), ServeError> {
        if !self.config.persist {
            return self.run_once().await;
        }

        loop {
            let result = self.run_once().await;
            if let Err(e) = &result {
                tracing::warn!(error = %e, "serve error");
            }
            metrics::record_restart(result.is_err());

            time::sleep(self.restart_delay).await;
        }
    }

    /// One Acquire → Run cycle.
    pub async fn run_once(&self) -> Result<(), ServeError> {
        let span = tracing::info_span!("cycle", cycle_id = %Uuid::new_v4());

        async {
            let listener = acquire(&self.transport, &self.config.address, self.config.dial_timeout).await?;

            let mut runner = ServiceRunner::new(&self.config);
            if let Some(events) = &self.events {
                runner = runner.with_watchdog_events(events.clone());
            }
            runner.run(listener, self.handler.clone()).await
        }
        .instrument(span)
        .await
    }
}

/// Resolve `address` and serve `handler` over local TCP.
pub async fn serve(address: &str, handler: Option<Router>) -> Result<(), ServeError> {
    serve_with(TcpTransport::new(), address, handler).await
}

/// Resolve `address` and serve `handler` through `transport`.
pub async fn serve_with<T: Transport>(
    transport: T,
    address: &str,
    handler: Option<Router>,
) -> Result<(), ServeError> {
    let config = config::resolve(address)?;
    Supervisor::new(transport, config, handler).run().await
}
