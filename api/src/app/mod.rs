//! Application layer
//!
//! Contains use cases and service orchestration.
//! Services coordinate between domain entities, ports, and external systems.

pub mod auto_purchase_service;
pub mod ownership_oracle;
pub mod point_ledger;
pub mod purchase_service;
pub mod rate_limiter;
pub mod reading_service;

pub use auto_purchase_service::{AutoPurchaseService, EpisodePage};
pub use ownership_oracle::OwnershipOracle;
pub use point_ledger::PointLedger;
pub use purchase_service::{PurchaseService, MAX_BATCH_SIZE};
pub use rate_limiter::RateLimiter;
pub use reading_service::{
    ContentAccess, ContentPage, EpisodeOwnership, LocatedEpisode, ReadingService,
};
