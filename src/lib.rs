//! Listener lifecycle supervisor for services exposed through a tunnel or
//! relay listener.
//!
//! # Architecture Overview
//!
//! ```text
//!   raw address ──▶ config::resolve ──▶ ServerConfig
//!                                            │
//!                                            ▼
//!                               net::transport::acquire (dial timeout)
//!                                            │
//!                          ┌─────────────────┴─────────────────┐
//!                          ▼                                   ▼
//!               health::HealthWatchdog              http::ServiceRunner
//!               probe /.well-known/health           password + health decorators
//!               close listener when exhausted ────▶ serve until closed
//!                          │                                   │
//!                          └──────────────┬────────────────────┘
//!                                         ▼
//!                          lifecycle::Supervisor (optional persist loop)
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::{resolve, ServerConfig, Target};
pub use error::{ErrorKind, ListenError, ServeError};
pub use http::ServiceRunner;
pub use lifecycle::{serve, serve_with, Supervisor};
pub use net::{ClosableListener, Listener, ListenerHandle, TcpTransport, Transport};
