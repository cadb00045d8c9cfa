//! Listener acquisition.
//!
//! # Responsibilities
//! - Abstract the tunnel/relay transport behind [`Transport`]
//! - Bound every acquisition by the configured dial timeout
//! - Provide a plain TCP transport for bare binds and local relays
//!
//! Acquisition never retries; restarting is the supervisor's job.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::time;
use url::Url;

use crate::config::Target;
use crate::error::{ListenError, ServeError};
use crate::net::listener::{ClosableListener, Listener};
use crate::net::tls::{load_tls_config, TlsListener};
use crate::observability::metrics;

/// Source of listeners for a target address.
pub trait Transport: Send + Sync + 'static {
    type Listener: Listener;

    /// Open a listener for `target`. Callers bound this with a deadline.
    fn listen(&self, target: &Target) -> impl Future<Output = io::Result<Self::Listener>> + Send;
}

/// Acquire a listener for `target`, giving up after `dial_timeout`.
pub async fn acquire<T: Transport>(
    transport: &T,
    target: &Target,
    dial_timeout: Duration,
) -> Result<ClosableListener<T::Listener>, ServeError> {
    let source = match time::timeout(dial_timeout, transport.listen(target)).await {
        Ok(Ok(listener)) => {
            metrics::record_listener_acquired();
            return Ok(ClosableListener::new(listener));
        }
        Ok(Err(e)) => ListenError::Transport(e),
        Err(_) => ListenError::Timeout(dial_timeout),
    };

    metrics::record_listen_failure();
    Err(ServeError::ListenFailed {
        address: target.to_string(),
        source,
    })
}

/// Certificate and key used to serve bare binds over TLS.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Binds local TCP sockets.
///
/// Bare binds (`:8080`) listen on every interface: the IPv6 wildcard, which is
/// dual-stack on most hosts, or the IPv4 wildcard where IPv6 is unavailable.
/// Relay URLs are bound to
/// their own `host:port`, which makes a loopback URL a self-hosted relay.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    tls: Option<TlsPaths>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve bare binds over TLS with the given PEM files.
    pub fn with_tls(mut self, tls: TlsPaths) -> Self {
        self.tls = Some(tls);
        self
    }

    async fn bind(target: &Target) -> io::Result<TcpListener> {
        match target {
            Target::Bind(addr) => bind_any(addr).await,
            Target::Relay(url) => TcpListener::bind(relay_bind_address(url)?).await,
        }
    }
}

async fn bind_any(port_spec: &str) -> io::Result<TcpListener> {
    match TcpListener::bind(format!("[::]{port_spec}")).await {
        Ok(listener) => Ok(listener),
        Err(e) if matches!(e.kind(), io::ErrorKind::AddrInUse | io::ErrorKind::PermissionDenied) => Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "IPv6 wildcard unavailable, binding IPv4 only");
            TcpListener::bind(format!("0.0.0.0{port_spec}")).await
        }
    }
}

fn relay_bind_address(url: &Url) -> io::Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "relay URL has no host"))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "relay URL has no port"))?;
    Ok(format!("{host}:{port}"))
}

impl Transport for TcpTransport {
    type Listener = LocalListener;

    async fn listen(&self, target: &Target) -> io::Result<LocalListener> {
        let listener = Self::bind(target).await?;

        match (&self.tls, target) {
            (Some(tls), Target::Bind(_)) => {
                let config = load_tls_config(&tls.cert_path, &tls.key_path).await?;
                Ok(LocalListener::Tls(TlsListener::new(listener, config)?))
            }
            _ => Ok(LocalListener::Plain(listener)),
        }
    }
}

/// Listener produced by [`TcpTransport`].
pub enum LocalListener {
    Plain(TcpListener),
    Tls(TlsListener),
}

impl Listener for LocalListener {
    fn endpoint(&self) -> io::Result<Url> {
        match self {
            LocalListener::Plain(listener) => listener.endpoint(),
            LocalListener::Tls(listener) => listener.endpoint(),
        }
    }

    fn serve<F>(self, app: Router, closed: F) -> impl Future<Output = io::Result<()>> + Send
    where
        F: Future<Output = ()> + Send + 'static,
    {
        async move {
            match self {
                LocalListener::Plain(listener) => listener.serve(app, closed).await,
                LocalListener::Tls(listener) => listener.serve(app, closed).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    struct NeverTransport;

    impl Transport for NeverTransport {
        type Listener = TcpListener;

        async fn listen(&self, _target: &Target) -> io::Result<TcpListener> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_times_out() {
        let target = Target::Relay(Url::parse("wtf://relay.example/").unwrap());
        let err = match acquire(&NeverTransport, &target, Duration::from_secs(2)).await {
            Err(e) => e,
            Ok(_) => panic!("acquire should time out"),
        };
        assert_eq!(err.kind(), ErrorKind::ListenFailed);
        assert!(matches!(
            err,
            ServeError::ListenFailed { source: ListenError::Timeout(d), .. } if d == Duration::from_secs(2)
        ));
    }

    #[tokio::test]
    async fn relay_url_binds_its_own_address() {
        let target = Target::Relay(Url::parse("tcp://127.0.0.1:0/").unwrap());
        let listener = acquire(&TcpTransport::new(), &target, Duration::from_secs(5))
            .await
            .unwrap();
        let endpoint = listener.endpoint().unwrap();
        assert_eq!(endpoint.scheme(), "http");
        assert_eq!(endpoint.host_str(), Some("127.0.0.1"));
        assert_ne!(endpoint.port(), Some(0));
    }

    #[tokio::test]
    async fn relay_without_port_fails_to_listen() {
        let target = Target::Relay(Url::parse("wtf://relay.example/").unwrap());
        let err = match acquire(&TcpTransport::new(), &target, Duration::from_secs(5)).await {
            Err(e) => e,
            Ok(_) => panic!("portless relay should not bind"),
        };
        assert!(matches!(
            err,
            ServeError::ListenFailed { source: ListenError::Transport(_), .. }
        ));
    }

    #[tokio::test]
    async fn missing_certificate_fails_to_listen() {
        let transport = TcpTransport::new().with_tls(TlsPaths {
            cert_path: "/nonexistent/cert.pem".into(),
            key_path: "/nonexistent/key.pem".into(),
        });
        let target = Target::Bind(":0".into());
        let err = match acquire(&transport, &target, Duration::from_secs(5)).await {
            Err(e) => e,
            Ok(_) => panic!("missing certificate should fail"),
        };
        assert_eq!(err.kind(), ErrorKind::ListenFailed);
    }

    #[tokio::test]
    async fn bare_bind_accepts_ipv4_clients() {
        let listener = acquire(&TcpTransport::new(), &Target::Bind(":0".into()), Duration::from_secs(5))
            .await
            .unwrap();
        let endpoint = listener.endpoint().unwrap();
        let port = endpoint.port().unwrap();
        assert!(matches!(endpoint.host_str(), Some("127.0.0.1") | Some("[::1]")));

        tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    }
}
