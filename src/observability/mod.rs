//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! resolver, watchdog, runner, supervisor
//!     → logging.rs (structured status observations via tracing)
//!     → metrics.rs (listener, probe and restart counters)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Status wording is not a contract; the structured fields are
//! - `quiet` only silences informational startup output, never warnings
//! - Metrics are cheap counters and safe to record without an exporter

pub mod logging;
pub mod metrics;
