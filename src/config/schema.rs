//! Resolved run configuration.
//!
//! A [`ServerConfig`] is produced once per run by [`crate::config::resolve`]
//! and handed by reference to every other component. Nothing mutates it after
//! resolution.

use std::fmt;
use std::time::Duration;
use url::Url;

/// Default bound on listener acquisition.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between health probes.
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of consecutive failed probes tolerated.
pub const DEFAULT_HEALTH_CHECK_RETRY: u32 = 3;

/// Default pause between persistent restart cycles.
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(1);

/// Where the listener comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Bare local bind specifier such as `:8080`.
    Bind(String),
    /// Relay URL, already annotated with client metadata and stripped of
    /// its password fragment.
    Relay(Url),
}

impl Target {
    pub fn as_str(&self) -> &str {
        match self {
            Target::Bind(addr) => addr,
            Target::Relay(url) => url.as_str(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration governing one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind specifier or relay URL. Never empty.
    pub address: Target,

    /// Bound on listener acquisition. Always non-zero.
    pub dial_timeout: Duration,

    /// Delay between watchdog probes; zero disables the watchdog.
    pub health_check_interval: Duration,

    /// Consecutive failed probes tolerated before the listener is closed.
    pub health_check_retry: u32,

    /// Suppress informational status logging.
    pub quiet: bool,

    /// Restart the whole run on failure instead of returning.
    pub persist: bool,

    /// Shared secret gating every request. `None` means no authentication.
    pub password: Option<String>,
}

impl ServerConfig {
    /// Configuration for `address` with every tunable at its default.
    pub fn with_defaults(address: Target) -> Self {
        Self {
            address,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
            health_check_retry: DEFAULT_HEALTH_CHECK_RETRY,
            quiet: false,
            persist: false,
            password: None,
        }
    }

    pub fn watchdog_enabled(&self) -> bool {
        !self.health_check_interval.is_zero()
    }

    pub fn password_protected(&self) -> bool {
        self.password.is_some()
    }
}
