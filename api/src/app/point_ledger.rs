//! Point ledger
//!
//! Read side of the point balance. Debits happen only inside
//! `PurchaseRepository::commit`, together with the ownership grant, so there is
//! no way to spend points here without receiving an episode.

use std::sync::Arc;

use crate::domain::entities::{User, UserId, Wallet};
use crate::domain::ports::UserRepository;
use crate::error::{AppError, DomainError};

pub struct PointLedger<UR>
where
    UR: UserRepository,
{
    users: Arc<UR>,
}

impl<UR> PointLedger<UR>
where
    UR: UserRepository,
{
    pub fn new(users: Arc<UR>) -> Self {
        Self { users }
    }

    /// Current point balance
    pub async fn balance(&self, user_id: &UserId) -> Result<i64, AppError> {
        Ok(self.account(user_id).await?.point_balance)
    }

    /// Balance and auto-purchase setting
    pub async fn wallet(&self, user_id: &UserId) -> Result<Wallet, AppError> {
        Ok(Wallet::from(&self.account(user_id).await?))
    }

    /// Opt in or out of auto-purchase on read
    pub async fn set_auto_purchase(
        &self,
        user_id: &UserId,
        enabled: bool,
    ) -> Result<Wallet, AppError> {
        self.users.set_auto_purchase(user_id, enabled).await?;
        tracing::info!(user_id = %user_id, enabled, "Auto-purchase setting changed");
        self.wallet(user_id).await
    }

    /// Load the account, if it still exists
    pub async fn find_account(&self, user_id: &UserId) -> Result<Option<User>, AppError> {
        Ok(self.users.find_by_id(user_id).await?)
    }

    async fn account(&self, user_id: &UserId) -> Result<User, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Domain(DomainError::NotFound(format!("user {}", user_id))))
    }
}
