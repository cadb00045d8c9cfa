//! Health probes.
//!
//! A probe asks the listener's well-known health endpoint whether the service
//! behind it still answers. The watchdog only cares about the outcome; how it
//! is obtained is behind [`Probe`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use url::{Host, Url};

use crate::health::HEALTH_PATH;

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint answered 200.
    Healthy,
    /// The endpoint answered with another status.
    BadStatus(u16),
    /// No response: connection error or timeout.
    Unreachable(String),
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Healthy => f.write_str("healthy"),
            ProbeOutcome::BadStatus(status) => write!(f, "health check endpoint returned status {status}"),
            ProbeOutcome::Unreachable(reason) => write!(f, "failed to reach health check endpoint: {reason}"),
        }
    }
}

/// Something that can check liveness once.
pub trait Probe: Send + Sync + 'static {
    fn probe(&self) -> impl Future<Output = ProbeOutcome> + Send;
}

/// Health URL for a listener endpoint.
pub fn health_url(endpoint: &Url) -> Result<Url, url::ParseError> {
    let mut base = endpoint.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(HEALTH_PATH.trim_start_matches('/'))
}

/// Probes over HTTP(S).
///
/// Certificates are not verified: relay endpoints are often self-signed or
/// issued lazily on first contact. Environment proxies apply to everything
/// except loopback endpoints.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    url: Url,
}

impl HttpProbe {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .user_agent(concat!("wtf-serve-health-check/", env!("CARGO_PKG_VERSION")));
        if is_loopback(&url) {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self { client, url })
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        Some(Host::Domain(domain)) => domain == "localhost",
        None => false,
    }
}

impl Probe for HttpProbe {
    async fn probe(&self) -> ProbeOutcome {
        match self.client.get(self.url.clone()).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => ProbeOutcome::Healthy,
            Ok(response) => ProbeOutcome::BadStatus(response.status().as_u16()),
            Err(e) => ProbeOutcome::Unreachable(e.to_string()),
        }
    }
}
