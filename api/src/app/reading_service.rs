//! Reading service
//!
//! Locates episodes, builds prev/next navigation and serves ownership-gated
//! episode images.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::app::OwnershipOracle;
use crate::domain::entities::{
    Episode, EpisodeId, EpisodeImage, EpisodeSummary, Navigation, Series, UserId,
};
use crate::domain::ports::{EpisodeRepository, OwnershipRepository};
use crate::error::{AppError, DomainError};

pub const DEFAULT_PAGE_LIMIT: u64 = 20;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// An episode together with its series and neighbours
#[derive(Debug, Clone)]
pub struct LocatedEpisode {
    pub series: Series,
    pub episode: Episode,
    pub navigation: Navigation,
}

/// One page of episode images
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPage {
    pub images: Vec<EpisodeImage>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub has_more: bool,
}

/// Result of an ownership-gated content fetch
#[derive(Debug, Clone)]
pub enum ContentAccess {
    Granted {
        located: LocatedEpisode,
        content: ContentPage,
    },
    Denied {
        located: LocatedEpisode,
    },
}

/// Ownership of one episode in a series listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeOwnership {
    #[serde(flatten)]
    pub episode: EpisodeSummary,
    pub is_owned: bool,
}

pub struct ReadingService<ER, OR>
where
    ER: EpisodeRepository,
    OR: OwnershipRepository,
{
    episodes: Arc<ER>,
    oracle: Arc<OwnershipOracle<OR>>,
}

impl<ER, OR> ReadingService<ER, OR>
where
    ER: EpisodeRepository,
    OR: OwnershipRepository,
{
    pub fn new(episodes: Arc<ER>, oracle: Arc<OwnershipOracle<OR>>) -> Self {
        Self { episodes, oracle }
    }

    /// Find an episode by series UUID and sequence number
    pub async fn locate(&self, series_uuid: Uuid, ep_no: i32) -> Result<LocatedEpisode, AppError> {
        let series = self
            .episodes
            .find_series_by_uuid(series_uuid)
            .await?
            .ok_or_else(|| not_found(format!("series {}", series_uuid)))?;

        let episode = self
            .episodes
            .find_by_series_and_number(&series.id, ep_no)
            .await?
            .ok_or_else(|| not_found(format!("episode {} of series {}", ep_no, series_uuid)))?;

        let navigation = self.episodes.find_neighbors(&series.id, ep_no).await?;

        Ok(LocatedEpisode {
            series,
            episode,
            navigation,
        })
    }

    /// Images of an episode, `page` is 1-based
    pub async fn content_page(
        &self,
        episode_id: &EpisodeId,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> Result<ContentPage, AppError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        // OFFSET is a signed bigint in SQL
        let page = page.unwrap_or(1).clamp(1, i64::MAX as u64 / limit);
        let offset = (page - 1) * limit;

        let total = self.episodes.count_images(episode_id).await?;
        let images = self.episodes.find_images(episode_id, offset, limit).await?;
        let has_more = offset.saturating_add(images.len() as u64) < total;

        Ok(ContentPage {
            images,
            page,
            limit,
            total,
            has_more,
        })
    }

    /// Ownership-gated fetch of one page of an episode
    pub async fn fetch(
        &self,
        viewer: Option<&UserId>,
        series_uuid: Uuid,
        ep_no: i32,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> Result<ContentAccess, AppError> {
        let located = self.locate(series_uuid, ep_no).await?;
        let owned = self
            .oracle
            .is_owned(&located.episode.id, located.episode.price, viewer)
            .await?;

        if !owned {
            tracing::debug!(
                episode_id = %located.episode.id,
                viewer = ?viewer,
                "Content requested for locked episode"
            );
            return Ok(ContentAccess::Denied { located });
        }

        let content = self.content_page(&located.episode.id, page, limit).await?;
        Ok(ContentAccess::Granted { located, content })
    }

    /// Every episode of a series with the viewer's ownership
    pub async fn series_ownership(
        &self,
        viewer: &UserId,
        series_uuid: Uuid,
    ) -> Result<Vec<EpisodeOwnership>, AppError> {
        let series = self
            .episodes
            .find_series_by_uuid(series_uuid)
            .await?
            .ok_or_else(|| not_found(format!("series {}", series_uuid)))?;

        let episodes = self.episodes.find_by_series(&series.id).await?;
        let owned = self.oracle.owned_set(&episodes, Some(viewer)).await?;

        Ok(episodes
            .iter()
            .map(|e| EpisodeOwnership {
                episode: EpisodeSummary::from(e),
                is_owned: owned.contains(&e.id),
            })
            .collect())
    }
}

fn not_found(what: String) -> AppError {
    AppError::Domain(DomainError::NotFound(what))
}
