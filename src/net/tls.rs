//! TLS listener for bare binds with a certificate.

use std::future::Future;
use std::io;
use std::path::Path;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use url::Url;

use crate::net::listener::{endpoint_url, Listener, SHUTDOWN_GRACE};

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, io::Error> {
    if !cert_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }
    if !key_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        ));
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// A bound TCP socket that terminates TLS before handing requests to axum.
pub struct TlsListener {
    inner: std::net::TcpListener,
    config: RustlsConfig,
}

impl TlsListener {
    pub fn new(inner: tokio::net::TcpListener, config: RustlsConfig) -> io::Result<Self> {
        Ok(Self {
            inner: inner.into_std()?,
            config,
        })
    }
}

impl Listener for TlsListener {
    fn endpoint(&self) -> io::Result<Url> {
        endpoint_url("https", self.inner.local_addr()?)
    }

    fn serve<F>(self, app: Router, closed: F) -> impl Future<Output = io::Result<()>> + Send
    where
        F: Future<Output = ()> + Send + 'static,
    {
        async move {
            let handle = axum_server::Handle::new();
            let shutdown = handle.clone();
            tokio::spawn(async move {
                closed.await;
                shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });

            axum_server::from_tcp_rustls(self.inner, self.config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    }
}
