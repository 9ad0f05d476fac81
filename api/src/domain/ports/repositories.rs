//! Repository port traits
//!
//! These traits define the interface for data persistence.
//! Implementations are provided by adapters (e.g., PostgreSQL).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{
    CommitOutcome, Episode, EpisodeId, EpisodeImage, Navigation, PricedEpisode, Series, SeriesId,
    User, UserId,
};
use crate::error::DomainError;

/// Repository for User entities
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError>;

    /// Find the user owning a live session, by SHA-256 hash of the session token
    async fn find_by_session_hash(&self, token_hash: &str) -> Result<Option<User>, DomainError>;

    /// Toggle the auto-purchase opt-in
    async fn set_auto_purchase(&self, id: &UserId, enabled: bool) -> Result<(), DomainError>;
}

/// Read-only catalog of series, episodes and episode images
#[async_trait]
pub trait EpisodeRepository: Send + Sync {
    /// Find a series by its public UUID
    async fn find_series_by_uuid(&self, uuid: Uuid) -> Result<Option<Series>, DomainError>;

    /// Find an episode by ID
    async fn find_by_id(&self, id: &EpisodeId) -> Result<Option<Episode>, DomainError>;

    /// Find every episode whose UUID is in `uuids`; unknown UUIDs are ignored
    async fn find_by_uuids(&self, uuids: &[Uuid]) -> Result<Vec<Episode>, DomainError>;

    /// Find an episode by its sequence number within a series
    async fn find_by_series_and_number(
        &self,
        series_id: &SeriesId,
        ep_no: i32,
    ) -> Result<Option<Episode>, DomainError>;

    /// All episodes of a series ordered by sequence number
    async fn find_by_series(&self, series_id: &SeriesId) -> Result<Vec<Episode>, DomainError>;

    /// Closest previous and next episodes around `ep_no`
    async fn find_neighbors(
        &self,
        series_id: &SeriesId,
        ep_no: i32,
    ) -> Result<Navigation, DomainError>;

    /// One page of an episode's images ordered by position
    async fn find_images(
        &self,
        episode_id: &EpisodeId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<EpisodeImage>, DomainError>;

    /// Total number of images in an episode
    async fn count_images(&self, episode_id: &EpisodeId) -> Result<u64, DomainError>;
}

/// Read access to ownership records
#[async_trait]
pub trait OwnershipRepository: Send + Sync {
    /// Whether an ownership record exists for (user, episode)
    async fn exists(&self, user_id: &UserId, episode_id: &EpisodeId) -> Result<bool, DomainError>;

    /// The subset of `episode_ids` the user owns
    async fn owned_among(
        &self,
        user_id: &UserId,
        episode_ids: &[EpisodeId],
    ) -> Result<Vec<EpisodeId>, DomainError>;
}

/// The atomic purchase step
///
/// The only way points are debited or ownership granted.
#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// In one all-or-nothing unit, serialized per user: skip episodes the user
    /// already owns, check the balance covers the rest, debit it and create one
    /// ownership record per remaining episode.
    async fn commit(
        &self,
        user_id: &UserId,
        episodes: &[PricedEpisode],
    ) -> Result<CommitOutcome, DomainError>;
}
