//! Handler decorators applied around the caller's router.
//!
//! Order, innermost first: password gate, then the well-known health
//! endpoint. The health endpoint therefore answers without credentials.

pub mod health;
pub mod password;

pub use health::with_health;
pub use password::with_password;
