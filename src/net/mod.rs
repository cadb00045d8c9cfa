//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Target (bind specifier or relay URL)
//!     → transport.rs (Transport::listen under the dial timeout)
//!     → tls.rs (optional TLS for bare binds)
//!     → listener.rs (ClosableListener: endpoint, serve, idempotent close)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - The relay transport is a trait; plain TCP ships in-crate
//! - Closing is a shared switch, not a socket operation, so it is safe to
//!   call from any task at any time
//! - Acquisition never retries

pub mod listener;
pub mod tls;
pub mod transport;

pub use listener::{ClosableListener, Listener, ListenerHandle};
pub use transport::{acquire, TcpTransport, TlsPaths, Transport};
