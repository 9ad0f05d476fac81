//! Purchase handlers
//!
//! Single and batch episode purchases. Failures come back as a
//! `PurchaseResponse` with a reason code and a localized message, never as a
//! raw error page.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::MAX_BATCH_SIZE;
use crate::domain::entities::{
    EpisodeId, Locale, PurchaseFailure, PurchaseOutcome, User, UserId,
};
use crate::error::AppError;
use crate::handlers::extract::AppJson;
use crate::AppState;

/// Request body for POST /purchase/episode
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEpisodeRequest {
    pub cartoon_uuid: Uuid,
    pub episode: i32,
    #[serde(default)]
    pub ep_id: Option<i64>,
}

/// Request body for POST /purchase/batch
///
/// Older clients send a single `{cartoonUuid, episode}` instead of a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BatchPurchaseRequest {
    Uuids {
        #[serde(rename = "episodeUuids")]
        episode_uuids: Vec<Uuid>,
    },
    Legacy {
        #[serde(rename = "cartoonUuid")]
        cartoon_uuid: Uuid,
        episode: i32,
    },
}

/// Response body for both purchase endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PurchaseFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub granted: Vec<EpisodeId>,
    pub charged: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_after: Option<i64>,
}

impl PurchaseResponse {
    fn from_outcome(outcome: PurchaseOutcome, locale: Locale) -> Self {
        Self {
            success: outcome.success,
            error: outcome.error,
            message: outcome.error.map(|e| e.message(locale).to_string()),
            granted: outcome.granted,
            charged: outcome.charged,
            balance_after: outcome.balance_after,
        }
    }
}

/// HTTP status for a purchase outcome
fn status_for(outcome: &PurchaseOutcome) -> StatusCode {
    match outcome.error {
        None => StatusCode::OK,
        Some(PurchaseFailure::Unauthenticated) => StatusCode::UNAUTHORIZED,
        Some(PurchaseFailure::EpisodeNotFound) => StatusCode::NOT_FOUND,
        Some(PurchaseFailure::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
        Some(PurchaseFailure::InsufficientPoints) | Some(PurchaseFailure::AlreadyOwned) => {
            StatusCode::BAD_REQUEST
        }
    }
}

pub(crate) fn locale_of(headers: &HeaderMap) -> Locale {
    Locale::from_accept_language(
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok()),
    )
}

fn respond(outcome: PurchaseOutcome, headers: &HeaderMap) -> (StatusCode, Json<PurchaseResponse>) {
    let status = status_for(&outcome);
    (
        status,
        Json(PurchaseResponse::from_outcome(outcome, locale_of(headers))),
    )
}

/// POST /purchase/episode
///
/// Buy one episode addressed by series UUID and episode number.
pub async fn purchase_episode(
    State(state): State<AppState>,
    user: Option<Extension<User>>,
    headers: HeaderMap,
    AppJson(request): AppJson<PurchaseEpisodeRequest>,
) -> (StatusCode, Json<PurchaseResponse>) {
    let user_id: Option<UserId> = user.map(|Extension(u)| u.id);

    let outcome = state
        .purchase_service
        .purchase_episode(
            user_id.as_ref(),
            request.cartoon_uuid,
            request.episode,
            request.ep_id.map(EpisodeId),
        )
        .await;

    respond(outcome, &headers)
}

/// POST /purchase/batch
///
/// Buy several episodes as one all-or-nothing unit. Already-owned episodes
/// are skipped and not charged.
pub async fn purchase_batch(
    State(state): State<AppState>,
    user: Option<Extension<User>>,
    headers: HeaderMap,
    AppJson(request): AppJson<BatchPurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), AppError> {
    let user_id: Option<UserId> = user.map(|Extension(u)| u.id);

    let outcome = match request {
        BatchPurchaseRequest::Uuids { episode_uuids } => {
            if episode_uuids.is_empty() {
                return Err(AppError::BadRequest(
                    "episodeUuids must not be empty".to_string(),
                ));
            }
            if episode_uuids.len() > MAX_BATCH_SIZE {
                return Err(AppError::BadRequest(format!(
                    "At most {} episodes can be bought at once",
                    MAX_BATCH_SIZE
                )));
            }
            state
                .purchase_service
                .purchase_uuids(user_id.as_ref(), &episode_uuids)
                .await
        }
        BatchPurchaseRequest::Legacy {
            cartoon_uuid,
            episode,
        } => {
            state
                .purchase_service
                .purchase_episode(user_id.as_ref(), cartoon_uuid, episode, None)
                .await
        }
    };

    Ok(respond(outcome, &headers))
}
