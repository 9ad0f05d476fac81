//! PostgreSQL adapter for EpisodeRepository

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::domain::entities::{
    Episode, EpisodeId, EpisodeImage, EpisodeSummary, Navigation, Series, SeriesId, SeriesKind,
};
use crate::domain::ports::EpisodeRepository;
use crate::entity::{episode_images, episodes, series};
use crate::error::DomainError;

/// PostgreSQL implementation of EpisodeRepository
pub struct PostgresEpisodeRepository {
    db: DatabaseConnection,
}

impl PostgresEpisodeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EpisodeRepository for PostgresEpisodeRepository {
    async fn find_series_by_uuid(&self, uuid: Uuid) -> Result<Option<Series>, DomainError> {
        let result = series::Entity::find()
            .filter(series::Column::Uuid.eq(uuid))
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_id(&self, id: &EpisodeId) -> Result<Option<Episode>, DomainError> {
        let result = episodes::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_uuids(&self, uuids: &[Uuid]) -> Result<Vec<Episode>, DomainError> {
        if uuids.is_empty() {
            return Ok(Vec::new());
        }

        let results = episodes::Entity::find()
            .filter(episodes::Column::Uuid.is_in(uuids.iter().copied()))
            .order_by_asc(episodes::Column::SeriesId)
            .order_by_asc(episodes::Column::EpNo)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_series_and_number(
        &self,
        series_id: &SeriesId,
        ep_no: i32,
    ) -> Result<Option<Episode>, DomainError> {
        let result = episodes::Entity::find()
            .filter(episodes::Column::SeriesId.eq(series_id.0))
            .filter(episodes::Column::EpNo.eq(ep_no))
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_series(&self, series_id: &SeriesId) -> Result<Vec<Episode>, DomainError> {
        let results = episodes::Entity::find()
            .filter(episodes::Column::SeriesId.eq(series_id.0))
            .order_by_asc(episodes::Column::EpNo)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_neighbors(
        &self,
        series_id: &SeriesId,
        ep_no: i32,
    ) -> Result<Navigation, DomainError> {
        let prev = episodes::Entity::find()
            .filter(episodes::Column::SeriesId.eq(series_id.0))
            .filter(episodes::Column::EpNo.lt(ep_no))
            .order_by_desc(episodes::Column::EpNo)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        let next = episodes::Entity::find()
            .filter(episodes::Column::SeriesId.eq(series_id.0))
            .filter(episodes::Column::EpNo.gt(ep_no))
            .order_by_asc(episodes::Column::EpNo)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(Navigation {
            prev: prev.map(|m| EpisodeSummary::from(&Episode::from(m))),
            next: next.map(|m| EpisodeSummary::from(&Episode::from(m))),
        })
    }

    async fn find_images(
        &self,
        episode_id: &EpisodeId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<EpisodeImage>, DomainError> {
        let results = episode_images::Entity::find()
            .filter(episode_images::Column::EpisodeId.eq(episode_id.0))
            .order_by_asc(episode_images::Column::Position)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results
            .into_iter()
            .map(|m| EpisodeImage {
                position: m.position,
                url: m.url,
            })
            .collect())
    }

    async fn count_images(&self, episode_id: &EpisodeId) -> Result<u64, DomainError> {
        episode_images::Entity::find()
            .filter(episode_images::Column::EpisodeId.eq(episode_id.0))
            .count(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))
    }
}

/// Convert SeaORM model to domain entity
impl From<episodes::Model> for Episode {
    fn from(model: episodes::Model) -> Self {
        Episode {
            id: EpisodeId(model.id),
            uuid: model.uuid,
            series_id: SeriesId(model.series_id),
            ep_no: model.ep_no,
            name: model.name,
            price: model.price,
        }
    }
}

/// Convert SeaORM model to domain entity
impl From<series::Model> for Series {
    fn from(model: series::Model) -> Self {
        Series {
            id: SeriesId(model.id),
            uuid: model.uuid,
            title: model.title,
            kind: model.kind.parse().unwrap_or(SeriesKind::Manga),
        }
    }
}
