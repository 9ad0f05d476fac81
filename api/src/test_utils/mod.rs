//! Test utilities
//!
//! Manual mock implementations and test fixtures for unit testing.
//!
//! Why manual mocks instead of mockall?
//! - The purchase path needs a store whose commit is genuinely atomic so
//!   concurrency tests exercise the real invariant
//! - The window store needs clock-driven expiry
//! - Manual mocks are more explicit and easier to debug
//!
//! mockall is still used for single-call expectations (see `MockWindowStore`).

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
