//! Shared helpers for integration tests.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use url::Url;
use wtf_serve::{Listener, Target, Transport};

/// Start a programmable mock backend on an ephemeral loopback port.
///
/// Every connection gets one response built by `f`, then the connection is
/// closed.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A loopback listener that advertises a different endpoint, so the
/// watchdog probes whatever the test points it at.
pub struct RedirectedListener {
    inner: TcpListener,
    endpoint: Url,
}

impl Listener for RedirectedListener {
    fn endpoint(&self) -> io::Result<Url> {
        Ok(self.endpoint.clone())
    }

    fn serve<F>(self, app: Router, closed: F) -> impl Future<Output = io::Result<()>> + Send
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.serve(app, closed)
    }
}

/// Stands in for a relay: binds a fresh loopback socket for every listen,
/// whatever the target, and reports the real address on `bound`.
pub struct LoopbackTransport {
    health_endpoint: Option<Url>,
    bound: mpsc::UnboundedSender<Url>,
    pub listens: Arc<AtomicUsize>,
}

impl LoopbackTransport {
    /// Advertise the real endpoint; the watchdog probes the served app.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Url>) {
        Self::build(None)
    }

    /// Advertise `health_endpoint` instead of the real one.
    #[allow(dead_code)]
    pub fn probing(health_endpoint: Url) -> (Self, mpsc::UnboundedReceiver<Url>) {
        Self::build(Some(health_endpoint))
    }

    fn build(health_endpoint: Option<Url>) -> (Self, mpsc::UnboundedReceiver<Url>) {
        let (bound, rx) = mpsc::unbounded_channel();
        let transport = Self {
            health_endpoint,
            bound,
            listens: Arc::new(AtomicUsize::new(0)),
        };
        (transport, rx)
    }
}

impl Transport for LoopbackTransport {
    type Listener = RedirectedListener;

    async fn listen(&self, _target: &Target) -> io::Result<RedirectedListener> {
        self.listens.fetch_add(1, Ordering::SeqCst);
        let inner = TcpListener::bind("127.0.0.1:0").await?;
        let real = inner.endpoint()?;
        let _ = self.bound.send(real.clone());
        Ok(RedirectedListener {
            inner,
            endpoint: self.health_endpoint.clone().unwrap_or(real),
        })
    }
}

/// HTTP client that never goes through an environment proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
