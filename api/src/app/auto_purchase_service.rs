//! Auto-purchase orchestrator
//!
//! Runs on the episode read path. A priced, locked episode is bought on the
//! spot when the reader opted into auto-purchase and can afford it. The
//! purchase commits before the owned view is built, so one request can both
//! buy and render. Redirect mode turns the outcome into query flags for
//! clients that expect the `autoPurchased` / `autoPurchaseFailed` contract.

use std::sync::Arc;

use uuid::Uuid;

use crate::app::{
    ContentPage, LocatedEpisode, OwnershipOracle, PointLedger, PurchaseService, ReadingService,
};
use crate::domain::entities::{
    AutoPurchaseFlags, AutoPurchaseNotice, AutoPurchaseState, Locale, LockReason, PurchaseFailure,
    UserId,
};
use crate::domain::ports::{
    EpisodeRepository, OwnershipRepository, PurchaseRepository, UserRepository,
};
use crate::error::AppError;

/// Everything needed to render an episode page
#[derive(Debug, Clone)]
pub struct EpisodePage {
    pub located: LocatedEpisode,
    pub owned: bool,
    /// First page of images, present only when owned
    pub content: Option<ContentPage>,
    /// Final state of the read-path state machine
    pub state: AutoPurchaseState,
    pub lock_reason: Option<LockReason>,
    pub notice: Option<AutoPurchaseNotice>,
}

impl EpisodePage {
    /// Flags to carry on a redirect, when this request changed state
    pub fn redirect_flags(&self) -> Option<AutoPurchaseFlags> {
        match self.state {
            AutoPurchaseState::Purchased { price, ep_no } => {
                Some(AutoPurchaseFlags::purchased(price, ep_no))
            }
            AutoPurchaseState::AutoBuyFailed { reason } => Some(AutoPurchaseFlags::failed(reason)),
            _ => None,
        }
    }
}

pub struct AutoPurchaseService<UR, ER, OR, PR>
where
    UR: UserRepository,
    ER: EpisodeRepository,
    OR: OwnershipRepository,
    PR: PurchaseRepository,
{
    reading: Arc<ReadingService<ER, OR>>,
    oracle: Arc<OwnershipOracle<OR>>,
    ledger: Arc<PointLedger<UR>>,
    purchases: Arc<PurchaseService<UR, ER, OR, PR>>,
}

impl<UR, ER, OR, PR> AutoPurchaseService<UR, ER, OR, PR>
where
    UR: UserRepository,
    ER: EpisodeRepository,
    OR: OwnershipRepository,
    PR: PurchaseRepository,
{
    pub fn new(
        reading: Arc<ReadingService<ER, OR>>,
        oracle: Arc<OwnershipOracle<OR>>,
        ledger: Arc<PointLedger<UR>>,
        purchases: Arc<PurchaseService<UR, ER, OR, PR>>,
    ) -> Self {
        Self {
            reading,
            oracle,
            ledger,
            purchases,
        }
    }

    /// Open an episode for reading, auto-buying it when allowed
    ///
    /// `flags` are the outcome flags of a previous redirect, if any.
    pub async fn open(
        &self,
        viewer: Option<&UserId>,
        series_uuid: Uuid,
        ep_no: i32,
        flags: &AutoPurchaseFlags,
        locale: Locale,
    ) -> Result<EpisodePage, AppError> {
        let located = self.reading.locate(series_uuid, ep_no).await?;
        let episode = located.episode.clone();

        if self
            .oracle
            .is_owned(&episode.id, episode.price, viewer)
            .await?
        {
            // Stale failure flags are moot once the reader owns the episode
            let notice = flags
                .notice(locale)
                .filter(|n| matches!(n, AutoPurchaseNotice::AutoPurchased { .. }));
            return self
                .owned_page(located, AutoPurchaseState::Locked, notice)
                .await;
        }

        let mut state = AutoPurchaseState::Locked;
        tracing::debug!(episode_id = %episode.id, ?state, "Episode locked");

        state = AutoPurchaseState::Checking;
        let account = match viewer {
            None => None,
            Some(user_id) => Some(match self.ledger.find_account(user_id).await {
                Ok(account) => account,
                Err(e) => {
                    tracing::warn!(error = %e, user_id = %user_id, "Could not load reader account");
                    None
                }
            }),
        };
        tracing::debug!(episode_id = %episode.id, ?state, "Checking auto-purchase");

        state = AutoPurchaseState::after_check(
            account.as_ref().map(|a| a.as_ref()),
            episode.price,
            flags.is_failure(),
        );

        let (Some(user_id), AutoPurchaseState::AutoBuying { price }) = (viewer, state) else {
            let lock_reason = match state {
                AutoPurchaseState::AwaitingManualUnlock(reason) => Some(reason),
                _ => None,
            };
            return Ok(EpisodePage {
                located,
                owned: false,
                content: None,
                state,
                lock_reason,
                notice: flags.notice(locale),
            });
        };

        tracing::debug!(episode_id = %episode.id, user_id = %user_id, price, "Auto-buying episode");
        let balance = account.flatten().map(|a| a.point_balance);
        let outcome = self
            .purchases
            .purchase(Some(user_id), std::slice::from_ref(&episode), balance)
            .await;

        if outcome.success {
            state = AutoPurchaseState::Purchased {
                price,
                ep_no: episode.ep_no,
            };
            tracing::info!(
                episode_id = %episode.id,
                user_id = %user_id,
                price,
                "Episode auto-purchased"
            );
            let notice = Some(AutoPurchaseNotice::AutoPurchased {
                price,
                ep_no: episode.ep_no,
            });
            return self.owned_page(located, state, notice).await;
        }

        let reason = outcome.error.unwrap_or(PurchaseFailure::Internal);

        // A concurrent request may have bought it first
        if reason == PurchaseFailure::AlreadyOwned
            && self
                .oracle
                .is_owned(&episode.id, episode.price, Some(user_id))
                .await?
        {
            return self
                .owned_page(located, AutoPurchaseState::Locked, None)
                .await;
        }

        state = AutoPurchaseState::AutoBuyFailed { reason };
        tracing::warn!(
            episode_id = %episode.id,
            user_id = %user_id,
            reason = %reason,
            "Auto-purchase failed"
        );
        Ok(EpisodePage {
            located,
            owned: false,
            content: None,
            state,
            lock_reason: None,
            notice: AutoPurchaseFlags::failed(reason).notice(locale),
        })
    }

    async fn owned_page(
        &self,
        located: LocatedEpisode,
        state: AutoPurchaseState,
        notice: Option<AutoPurchaseNotice>,
    ) -> Result<EpisodePage, AppError> {
        let content = self
            .reading
            .content_page(&located.episode.id, None, None)
            .await?;
        Ok(EpisodePage {
            located,
            owned: true,
            content: Some(content),
            state,
            lock_reason: None,
            notice,
        })
    }
}
