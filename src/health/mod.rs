//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Listener acquired
//!     → watchdog.rs (warm-up probe, then one probe per interval)
//!     → probe.rs (GET {endpoint}/.well-known/health)
//!     → consecutive failures >= retry budget
//!     → ListenerHandle::close()
//!     → serve loop ends cleanly
//! ```
//!
//! # Design Decisions
//! - The watchdog shares nothing with the serve loop except the close switch
//! - Probe failures are bookkeeping, never errors
//! - Any success resets the budget
//! - A probe that outlives the interval counts as a failure

pub mod probe;
pub mod watchdog;

pub use probe::{HttpProbe, Probe, ProbeOutcome};
pub use watchdog::{HealthWatchdog, WatchdogEvent, WatchdogState};

/// Path answered locally by the health decorator and probed by the watchdog.
pub const HEALTH_PATH: &str = "/.well-known/health";
