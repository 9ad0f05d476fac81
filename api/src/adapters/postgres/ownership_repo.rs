//! PostgreSQL adapter for OwnershipRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

use crate::domain::entities::{EpisodeId, UserId};
use crate::domain::ports::OwnershipRepository;
use crate::entity::episode_purchases;
use crate::error::DomainError;

/// PostgreSQL implementation of OwnershipRepository
pub struct PostgresOwnershipRepository {
    db: DatabaseConnection,
}

impl PostgresOwnershipRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OwnershipRepository for PostgresOwnershipRepository {
    async fn exists(&self, user_id: &UserId, episode_id: &EpisodeId) -> Result<bool, DomainError> {
        let count = episode_purchases::Entity::find()
            .filter(episode_purchases::Column::UserId.eq(user_id.0))
            .filter(episode_purchases::Column::EpisodeId.eq(episode_id.0))
            .count(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    async fn owned_among(
        &self,
        user_id: &UserId,
        episode_ids: &[EpisodeId],
    ) -> Result<Vec<EpisodeId>, DomainError> {
        if episode_ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = episode_purchases::Entity::find()
            .filter(episode_purchases::Column::UserId.eq(user_id.0))
            .filter(episode_purchases::Column::EpisodeId.is_in(episode_ids.iter().map(|id| id.0)))
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| EpisodeId(m.episode_id)).collect())
    }
}
