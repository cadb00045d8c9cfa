//! HTTP service subsystem.
//!
//! # Data Flow
//! ```text
//! caller's Router (or default 404 handler)
//!     → middleware/password.rs (gate, identity without a password)
//!     → middleware/health.rs (answer /.well-known/health locally)
//!     → server.rs (trace layer, serve on the listener until closed)
//! ```

pub mod middleware;
pub mod server;

pub use server::{build_app, default_handler, ServiceRunner};
