//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Single-shot (persist=false):
//!     acquire listener → run service → return result
//!
//! Persistent (persist=true):
//!     loop {
//!         acquire listener → run service
//!         error → warn and carry on
//!         sleep fixed restart delay
//!     }
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → process exits
//! ```
//!
//! # Design Decisions
//! - At most one listener/watchdog pair alive at a time
//! - Fixed delay, no backoff growth, no attempt ceiling
//! - The delay is injected so tests can observe spacing

pub mod signals;
pub mod supervisor;

pub use signals::shutdown_signal;
pub use supervisor::{serve, serve_with, Supervisor};
