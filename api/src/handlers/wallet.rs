//! Wallet and reader settings handlers

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{User, Wallet};
use crate::error::AppError;
use crate::handlers::extract::AppJson;
use crate::AppState;

/// Response for the wallet endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub point_balance: i64,
    pub auto_purchase: bool,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            point_balance: wallet.point_balance,
            auto_purchase: wallet.auto_purchase,
        }
    }
}

/// Request body for PUT /me/settings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub auto_purchase: bool,
}

/// GET /me/wallet
pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = state.point_ledger.wallet(&user.id).await?;
    Ok(Json(wallet.into()))
}

/// PUT /me/settings
///
/// Opt in or out of auto-purchase on read.
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppJson(request): AppJson<UpdateSettingsRequest>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = state
        .point_ledger
        .set_auto_purchase(&user.id, request.auto_purchase)
        .await?;
    Ok(Json(wallet.into()))
}
