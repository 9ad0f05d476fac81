//! Ownership listing handlers

use axum::{
    extract::State,
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::app::EpisodeOwnership;
use crate::domain::entities::User;
use crate::error::AppError;
use crate::handlers::extract::AppPath;
use crate::AppState;

/// Response for GET /series/:series_uuid/ownership
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesOwnershipResponse {
    pub series_uuid: Uuid,
    pub episodes: Vec<EpisodeOwnership>,
    pub owned_count: usize,
}

/// GET /series/:series_uuid/ownership
///
/// Every episode of the series with whether the caller may read it.
pub async fn get_series_ownership(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppPath(series_uuid): AppPath<Uuid>,
) -> Result<Json<SeriesOwnershipResponse>, AppError> {
    let episodes = state
        .reading_service
        .series_ownership(&user.id, series_uuid)
        .await?;
    let owned_count = episodes.iter().filter(|e| e.is_owned).count();

    Ok(Json(SeriesOwnershipResponse {
        series_uuid,
        episodes,
        owned_count,
    }))
}
