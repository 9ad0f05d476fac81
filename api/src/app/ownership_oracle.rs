//! Ownership oracle
//!
//! Answers "may this user read this episode". Free episodes are always owned,
//! priced episodes need an ownership record. Reads only, safe to call
//! repeatedly.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::entities::{Episode, EpisodeId, UserId};
use crate::domain::ports::OwnershipRepository;
use crate::error::AppError;

pub struct OwnershipOracle<OR>
where
    OR: OwnershipRepository,
{
    ownership: Arc<OR>,
}

impl<OR> OwnershipOracle<OR>
where
    OR: OwnershipRepository,
{
    pub fn new(ownership: Arc<OR>) -> Self {
        Self { ownership }
    }

    /// Whether `user_id` may read the episode
    pub async fn is_owned(
        &self,
        episode_id: &EpisodeId,
        episode_price: i64,
        user_id: Option<&UserId>,
    ) -> Result<bool, AppError> {
        if episode_price == 0 {
            return Ok(true);
        }
        let Some(user_id) = user_id else {
            return Ok(false);
        };
        Ok(self.ownership.exists(user_id, episode_id).await?)
    }

    /// Ownership for several episodes at once, free episodes included
    pub async fn owned_set(
        &self,
        episodes: &[Episode],
        user_id: Option<&UserId>,
    ) -> Result<HashSet<EpisodeId>, AppError> {
        let mut owned: HashSet<EpisodeId> = episodes
            .iter()
            .filter(|e| e.is_free())
            .map(|e| e.id)
            .collect();

        let Some(user_id) = user_id else {
            return Ok(owned);
        };

        let priced: Vec<EpisodeId> = episodes
            .iter()
            .filter(|e| !e.is_free())
            .map(|e| e.id)
            .collect();
        if priced.is_empty() {
            return Ok(owned);
        }

        owned.extend(self.ownership.owned_among(user_id, &priced).await?);
        Ok(owned)
    }
}
