//! Adapters layer
//!
//! Implementations of port traits for external systems.

pub mod clock;
pub mod postgres;
pub mod redis;

pub use clock::SystemClock;
pub use postgres::{
    PostgresEpisodeRepository, PostgresOwnershipRepository, PostgresPurchaseRepository,
    PostgresUserRepository,
};
pub use self::redis::RedisWindowStore;
