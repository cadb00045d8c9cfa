//! Listener abstraction with idempotent close.
//!
//! # Responsibilities
//! - Describe where a listener is reachable (`endpoint`)
//! - Serve a router until the listener is closed
//! - Let any task close the listener, any number of times
//!
//! The serve loop treats closure as a normal end of life: it stops accepting,
//! gives in-flight connections a bounded grace period and returns `Ok(())`.

use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time;
use url::Url;

/// How long in-flight requests may run after the listener closes.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// An open acceptor that can drive an HTTP service.
pub trait Listener: Send + Sized + 'static {
    /// Base URL at which this listener is reachable, e.g. `http://127.0.0.1:8080`.
    fn endpoint(&self) -> io::Result<Url>;

    /// Serve `app` until `closed` resolves.
    fn serve<F>(self, app: Router, closed: F) -> impl Future<Output = io::Result<()>> + Send
    where
        F: Future<Output = ()> + Send + 'static;
}

impl Listener for TcpListener {
    fn endpoint(&self) -> io::Result<Url> {
        endpoint_url("http", self.local_addr()?)
    }

    fn serve<F>(self, app: Router, closed: F) -> impl Future<Output = io::Result<()>> + Send
    where
        F: Future<Output = ()> + Send + 'static,
    {
        async move { axum::serve(self, app).with_graceful_shutdown(closed).await }
    }
}

/// Build an endpoint URL for a local socket address.
///
/// Unspecified addresses (`0.0.0.0`, `::`) are replaced with loopback so the
/// endpoint can actually be dialled.
pub fn endpoint_url(scheme: &str, addr: SocketAddr) -> io::Result<Url> {
    let ip = match addr.ip() {
        IpAddr::V4(v4) if v4.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(v6) if v6.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    let addr = SocketAddr::new(ip, addr.port());
    Url::parse(&format!("{scheme}://{addr}")).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Cloneable close switch shared between the serve loop and the watchdog.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    closed: Arc<watch::Sender<bool>>,
}

impl ListenerHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { closed: Arc::new(tx) }
    }

    /// Close the listener. Returns `true` only for the call that actually
    /// closed it; later calls are no-ops.
    pub fn close(&self) -> bool {
        self.closed.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the listener has been closed.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl Default for ListenerHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A listener paired with its close switch.
pub struct ClosableListener<L> {
    inner: L,
    handle: ListenerHandle,
    grace: Duration,
}

impl<L: Listener> ClosableListener<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            handle: ListenerHandle::new(),
            grace: SHUTDOWN_GRACE,
        }
    }

    /// Bound on draining in-flight requests after close.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn handle(&self) -> ListenerHandle {
        self.handle.clone()
    }

    pub fn endpoint(&self) -> io::Result<Url> {
        self.inner.endpoint()
    }

    pub fn close(&self) -> bool {
        self.handle.close()
    }

    /// Serve `app` until the listener is closed or the loop fails.
    ///
    /// Once closed, requests still in flight get the shutdown grace period;
    /// after that the loop is dropped and this returns regardless. The handle
    /// is closed on return either way, so anything watching it (the health
    /// watchdog) winds down with the loop.
    pub async fn serve(self, app: Router) -> io::Result<()> {
        let handle = self.handle.clone();
        let closed = {
            let handle = handle.clone();
            async move { handle.closed().await }
        };
        let grace = self.grace;
        let grace_expired = {
            let handle = handle.clone();
            async move {
                handle.closed().await;
                time::sleep(grace).await;
            }
        };

        let result = tokio::select! {
            result = self.inner.serve(app, closed) => result,
            _ = grace_expired => {
                tracing::warn!(grace = ?grace, "In-flight requests outlived the shutdown grace, abandoning them");
                Ok(())
            }
        };
        handle.close();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_idempotent() {
        let handle = ListenerHandle::new();
        assert!(!handle.is_closed());
        assert!(handle.close());
        assert!(!handle.close());
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn closed_resolves_for_late_waiters() {
        let handle = ListenerHandle::new();
        handle.close();
        tokio::time::timeout(Duration::from_secs(1), handle.closed())
            .await
            .expect("already-closed handle should resolve immediately");
    }

    #[test]
    fn unspecified_endpoint_points_at_loopback() {
        let url = endpoint_url("http", "0.0.0.0:8080".parse().unwrap()).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/");

        let url = endpoint_url("https", "[::]:443".parse().unwrap()).unwrap();
        assert_eq!(url.host_str(), Some("[::1]"));
    }

    #[tokio::test]
    async fn closing_ends_serve_cleanly() {
        let listener = ClosableListener::new(TcpListener::bind("127.0.0.1:0").await.unwrap());
        let handle = listener.handle();
        let serving = tokio::spawn(listener.serve(Router::new()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.close();
        handle.close();

        let result = tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .expect("serve loop should stop after close")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn closing_ends_serve_despite_a_hung_request() {
        use axum::routing::get;
        use tokio::sync::Notify;

        let entered = Arc::new(Notify::new());
        let app = {
            let entered = entered.clone();
            Router::new().route(
                "/",
                get(move || {
                    let entered = entered.clone();
                    async move {
                        entered.notify_one();
                        std::future::pending::<&'static str>().await
                    }
                }),
            )
        };

        let listener = ClosableListener::new(TcpListener::bind("127.0.0.1:0").await.unwrap())
            .with_shutdown_grace(Duration::from_millis(100));
        let endpoint = listener.endpoint().unwrap();
        let handle = listener.handle();
        let serving = tokio::spawn(listener.serve(app));

        let request = tokio::spawn(async move {
            let client = reqwest::Client::builder().no_proxy().build().unwrap();
            client.get(endpoint).send().await
        });
        tokio::time::timeout(Duration::from_secs(5), entered.notified())
            .await
            .expect("request should reach the handler");

        handle.close();

        let result = tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .expect("serve loop should stop after close even with a request in flight")
            .unwrap();
        assert!(result.is_ok());
        request.abort();
    }
}
