//! Ownership-gated content handlers

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::{ContentAccess, ContentPage, LocatedEpisode};
use crate::domain::entities::{EpisodeSummary, Locale, Navigation, Series, SeriesKind, User};
use crate::error::AppError;
use crate::handlers::extract::AppQuery;
use crate::handlers::purchase::locale_of;
use crate::AppState;

/// Query parameters for GET /episodes/content
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuery {
    pub cartoon_uuid: Uuid,
    pub episode: i32,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Series fields shown next to an episode
#[derive(Debug, Serialize)]
pub struct SeriesInfo {
    pub uuid: Uuid,
    pub title: String,
    pub kind: SeriesKind,
}

impl From<&Series> for SeriesInfo {
    fn from(series: &Series) -> Self {
        Self {
            uuid: series.uuid,
            title: series.title.clone(),
            kind: series.kind,
        }
    }
}

/// 200 body: the requested page of images
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub is_owned: bool,
    pub series: SeriesInfo,
    pub episode_info: EpisodeSummary,
    pub navigation: Navigation,
    pub content: ContentPage,
}

/// 403 body: enough to render an unlock prompt without another round trip
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedResponse {
    pub error: String,
    pub is_owned: bool,
    pub episode_info: EpisodeSummary,
    pub navigation: Navigation,
}

impl LockedResponse {
    pub fn new(located: &LocatedEpisode, locale: Locale) -> Self {
        let error = match locale {
            Locale::En => "Purchase this episode to read it.",
            Locale::Ko => "이 에피소드를 구매해야 볼 수 있습니다.",
        };
        Self {
            error: error.to_string(),
            is_owned: false,
            episode_info: EpisodeSummary::from(&located.episode),
            navigation: located.navigation.clone(),
        }
    }
}

/// GET /episodes/content?cartoonUuid=&episode=&page=&limit=
///
/// Images of an episode if the caller owns it (free episodes are owned by
/// everyone), otherwise 403 with the episode and navigation.
pub async fn get_content(
    State(state): State<AppState>,
    user: Option<Extension<User>>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<ContentQuery>,
) -> Result<Response, AppError> {
    let viewer = user.map(|Extension(u)| u.id);

    let access = state
        .reading_service
        .fetch(
            viewer.as_ref(),
            query.cartoon_uuid,
            query.episode,
            query.page,
            query.limit,
        )
        .await?;

    Ok(match access {
        ContentAccess::Granted { located, content } => Json(ContentResponse {
            is_owned: true,
            series: SeriesInfo::from(&located.series),
            episode_info: EpisodeSummary::from(&located.episode),
            navigation: located.navigation,
            content,
        })
        .into_response(),
        ContentAccess::Denied { located } => (
            StatusCode::FORBIDDEN,
            Json(LockedResponse::new(&located, locale_of(&headers))),
        )
            .into_response(),
    })
}
