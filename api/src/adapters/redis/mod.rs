//! Redis adapters
//!
//! Sliding-window storage for the rate limiter.

pub mod window_store;

pub use window_store::RedisWindowStore;
