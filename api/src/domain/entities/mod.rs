//! Domain entities
//!
//! Pure domain models representing core business concepts.
//! These are separate from the SeaORM entities in the `entity` module.

pub mod auto_purchase;
pub mod episode;
pub mod ownership;
pub mod purchase;
pub mod rate_limit;
pub mod user;

pub use auto_purchase::{AutoPurchaseFlags, AutoPurchaseNotice, AutoPurchaseState, LockReason};
pub use episode::{
    Episode, EpisodeId, EpisodeImage, EpisodeSummary, Navigation, Series, SeriesId, SeriesKind,
};
pub use ownership::{CommitOutcome, OwnershipRecord, PricedEpisode, PurchaseReceipt};
pub use purchase::{Locale, PurchaseFailure, PurchaseOutcome};
pub use rate_limit::{FailurePolicy, RateLimitDecision, RateLimitRule, DEFAULT_KEY_PREFIX};
pub use user::{User, UserId, Wallet};
