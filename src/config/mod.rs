//! Configuration resolution subsystem.
//!
//! # Data Flow
//! ```text
//! raw address
//!     → address.rs (bare bind vs relay URL)
//!     → client_info.rs (append client/version metadata to the relay query)
//!     → params.rs (quiet, timeout, gc, retry, persist)
//!     → ServerConfig (validated, immutable)
//!     → shared by reference with listener, watchdog and runner
//! ```
//!
//! # Design Decisions
//! - One entry point (`resolve`) with an explicit form discriminator
//! - Defaults are named constants, not mutable globals
//! - Any parse failure aborts resolution; no partial config escapes

pub mod address;
pub mod client_info;
pub mod loader;
pub mod params;
pub mod schema;

pub use address::{resolve, resolve_with, AddressForm};
pub use schema::ServerConfig;
pub use schema::Target;
