//! Episode read path
//!
//! Opening a priced episode may buy it on the spot (see
//! `AutoPurchaseService`). By default the outcome is rendered in the same
//! response; with `AUTO_PURCHASE_REDIRECTS` the handler answers with a 303
//! back to the episode URL carrying the outcome flags instead.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::app::{ContentPage, EpisodePage};
use crate::domain::entities::{
    AutoPurchaseFlags, AutoPurchaseNotice, AutoPurchaseState, EpisodeSummary, LockReason,
    Navigation, User,
};
use crate::error::AppError;
use crate::handlers::content::SeriesInfo;
use crate::handlers::extract::{AppPath, AppQuery};
use crate::handlers::purchase::locale_of;
use crate::AppState;

/// Episode page as rendered for the reader
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodePageResponse {
    pub series: SeriesInfo,
    pub episode_info: EpisodeSummary,
    pub navigation: Navigation,
    pub is_owned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentPage>,
    /// Final read-path state
    pub auto_purchase: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_reason: Option<LockReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<AutoPurchaseNotice>,
}

fn state_name(state: &AutoPurchaseState) -> &'static str {
    match state {
        AutoPurchaseState::Locked => "locked",
        AutoPurchaseState::Checking => "checking",
        AutoPurchaseState::AutoBuying { .. } => "auto_buying",
        AutoPurchaseState::Purchased { .. } => "purchased",
        AutoPurchaseState::AutoBuyFailed { .. } => "auto_buy_failed",
        AutoPurchaseState::AwaitingManualUnlock(_) => "awaiting_manual_unlock",
    }
}

impl From<EpisodePage> for EpisodePageResponse {
    fn from(page: EpisodePage) -> Self {
        Self {
            series: SeriesInfo::from(&page.located.series),
            episode_info: EpisodeSummary::from(&page.located.episode),
            navigation: page.located.navigation,
            is_owned: page.owned,
            content: page.content,
            auto_purchase: state_name(&page.state),
            lock_reason: page.lock_reason,
            notice: page.notice,
        }
    }
}

/// Episode URL carrying outcome flags
fn redirect_target(
    base_url: &str,
    series_uuid: Uuid,
    ep_no: i32,
    flags: &AutoPurchaseFlags,
) -> String {
    format!(
        "{}/series/{}/episodes/{}?{}",
        base_url,
        series_uuid,
        ep_no,
        flags.to_query()
    )
}

/// GET /series/:series_uuid/episodes/:ep_no
///
/// Accepts `autoPurchased`, `epPrice`, `epNo`, `autoPurchaseFailed` and
/// `error` from a previous redirect. A request flagged as failed never
/// retries the auto-buy.
pub async fn get_episode(
    State(state): State<AppState>,
    AppPath((series_uuid, ep_no)): AppPath<(Uuid, i32)>,
    AppQuery(flags): AppQuery<AutoPurchaseFlags>,
    user: Option<Extension<User>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let viewer = user.map(|Extension(u)| u.id);

    let page = state
        .auto_purchase_service
        .open(
            viewer.as_ref(),
            series_uuid,
            ep_no,
            &flags,
            locale_of(&headers),
        )
        .await?;

    Ok(render(
        page,
        state.config.auto_purchase_redirects,
        &state.config.public_base_url,
        series_uuid,
        ep_no,
    ))
}

/// Response for an opened episode
///
/// In redirect mode a request that bought the episode, or failed to, gets a
/// 303 back to the episode URL with the outcome flags. Everything else is
/// rendered in place.
fn render(
    page: EpisodePage,
    redirects: bool,
    base_url: &str,
    series_uuid: Uuid,
    ep_no: i32,
) -> Response {
    if redirects {
        if let Some(outcome) = page.redirect_flags() {
            let target = redirect_target(base_url, series_uuid, ep_no, &outcome);
            return Redirect::to(&target).into_response();
        }
    }

    Json(EpisodePageResponse::from(page)).into_response()
}
