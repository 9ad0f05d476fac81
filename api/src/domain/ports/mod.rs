//! Domain ports (traits)
//!
//! Port traits define interfaces that the domain layer requires.
//! Adapters provide concrete implementations of these traits.

pub mod rate_limit;
pub mod repositories;

#[cfg(test)]
pub use rate_limit::MockWindowStore;
pub use rate_limit::{Clock, WindowStore};
pub use repositories::{
    EpisodeRepository, OwnershipRepository, PurchaseRepository, UserRepository,
};
