//! Purchase service
//!
//! Resolves what the caller wants to buy, re-checks ownership and balance, and
//! hands the remaining episodes to the atomic purchase step.
//!
//! Already-owned handling is the same for single and batch purchases: owned
//! (and free) episodes are skipped and only the rest is charged. When nothing
//! is left to charge the outcome is `already_owned` and nothing changes.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::app::{OwnershipOracle, PointLedger};
use crate::domain::entities::{
    CommitOutcome, Episode, EpisodeId, PricedEpisode, PurchaseFailure, PurchaseOutcome, UserId,
};
use crate::domain::ports::{
    EpisodeRepository, OwnershipRepository, PurchaseRepository, UserRepository,
};
use crate::error::{AppError, DomainError};

/// Most episodes accepted in one batch purchase
pub const MAX_BATCH_SIZE: usize = 100;

pub struct PurchaseService<UR, ER, OR, PR>
where
    UR: UserRepository,
    ER: EpisodeRepository,
    OR: OwnershipRepository,
    PR: PurchaseRepository,
{
    episodes: Arc<ER>,
    oracle: Arc<OwnershipOracle<OR>>,
    ledger: Arc<PointLedger<UR>>,
    purchases: Arc<PR>,
}

impl<UR, ER, OR, PR> PurchaseService<UR, ER, OR, PR>
where
    UR: UserRepository,
    ER: EpisodeRepository,
    OR: OwnershipRepository,
    PR: PurchaseRepository,
{
    pub fn new(
        episodes: Arc<ER>,
        oracle: Arc<OwnershipOracle<OR>>,
        ledger: Arc<PointLedger<UR>>,
        purchases: Arc<PR>,
    ) -> Self {
        Self {
            episodes,
            oracle,
            ledger,
            purchases,
        }
    }

    /// Buy one episode addressed by series UUID and sequence number
    ///
    /// `ep_id`, when given, must match the resolved episode.
    pub async fn purchase_episode(
        &self,
        user_id: Option<&UserId>,
        series_uuid: Uuid,
        ep_no: i32,
        ep_id: Option<EpisodeId>,
    ) -> PurchaseOutcome {
        let episode = match self.resolve_by_number(series_uuid, ep_no).await {
            Ok(Some(episode)) => episode,
            Ok(None) => return PurchaseOutcome::failed(PurchaseFailure::EpisodeNotFound),
            Err(e) => return internal_failure("resolve episode", e),
        };

        if ep_id.is_some_and(|id| id != episode.id) {
            tracing::debug!(
                requested = ?ep_id,
                resolved = %episode.id,
                "Episode id does not match series/number"
            );
            return PurchaseOutcome::failed(PurchaseFailure::EpisodeNotFound);
        }

        self.purchase(user_id, &[episode], None).await
    }

    /// Buy every episode in `uuids` as one all-or-nothing unit
    pub async fn purchase_uuids(&self, user_id: Option<&UserId>, uuids: &[Uuid]) -> PurchaseOutcome {
        let mut seen = HashSet::new();
        let unique: Vec<Uuid> = uuids.iter().copied().filter(|u| seen.insert(*u)).collect();

        let episodes = match self.episodes.find_by_uuids(&unique).await {
            Ok(episodes) => episodes,
            Err(e) => return internal_failure("resolve episodes", e.into()),
        };

        if episodes.len() != unique.len() {
            tracing::debug!(
                requested = unique.len(),
                found = episodes.len(),
                "Batch purchase references unknown episodes"
            );
            return PurchaseOutcome::failed(PurchaseFailure::EpisodeNotFound);
        }

        self.purchase(user_id, &episodes, None).await
    }

    /// Core purchase over resolved episodes
    ///
    /// `current_balance` is the caller's view of the balance, used to fail
    /// fast; the atomic step re-checks it under the user lock.
    pub async fn purchase(
        &self,
        user_id: Option<&UserId>,
        episodes: &[Episode],
        current_balance: Option<i64>,
    ) -> PurchaseOutcome {
        let priced: Vec<Episode> = episodes.iter().filter(|e| !e.is_free()).cloned().collect();
        if priced.is_empty() {
            return PurchaseOutcome::failed(PurchaseFailure::AlreadyOwned);
        }

        let Some(user_id) = user_id else {
            return PurchaseOutcome::failed(PurchaseFailure::Unauthenticated);
        };

        let owned = match self.oracle.owned_set(&priced, Some(user_id)).await {
            Ok(owned) => owned,
            Err(e) => return internal_failure("check ownership", e),
        };

        let to_buy: Vec<PricedEpisode> = priced
            .iter()
            .filter(|e| !owned.contains(&e.id))
            .map(|e| PricedEpisode {
                id: e.id,
                price: e.price,
            })
            .collect();
        if to_buy.is_empty() {
            return PurchaseOutcome::failed(PurchaseFailure::AlreadyOwned);
        }

        let total: i64 = to_buy.iter().map(|e| e.price).sum();
        let balance = match current_balance {
            Some(balance) => balance,
            None => match self.ledger.balance(user_id).await {
                Ok(balance) => balance,
                Err(AppError::Domain(DomainError::NotFound(_))) => {
                    return PurchaseOutcome::failed(PurchaseFailure::Unauthenticated)
                }
                Err(e) => return internal_failure("load balance", e),
            },
        };
        if balance < total {
            return PurchaseOutcome::failed(PurchaseFailure::InsufficientPoints);
        }

        match self.purchases.commit(user_id, &to_buy).await {
            Ok(CommitOutcome::Granted(receipt)) => {
                tracing::info!(
                    user_id = %user_id,
                    charged = receipt.charged,
                    granted = receipt.granted.len(),
                    skipped = receipt.skipped.len(),
                    balance_after = receipt.balance_after,
                    "Episodes purchased"
                );
                PurchaseOutcome::from(receipt)
            }
            Ok(CommitOutcome::AlreadyOwned) => {
                tracing::debug!(user_id = %user_id, "Purchase lost race, already owned");
                PurchaseOutcome::failed(PurchaseFailure::AlreadyOwned)
            }
            Ok(CommitOutcome::InsufficientPoints { balance, required }) => {
                tracing::debug!(user_id = %user_id, balance, required, "Insufficient points at commit");
                PurchaseOutcome::failed(PurchaseFailure::InsufficientPoints)
            }
            Err(DomainError::NotFound(_)) => PurchaseOutcome::failed(PurchaseFailure::Unauthenticated),
            Err(e) => internal_failure("commit purchase", e.into()),
        }
    }

    async fn resolve_by_number(
        &self,
        series_uuid: Uuid,
        ep_no: i32,
    ) -> Result<Option<Episode>, AppError> {
        let Some(series) = self.episodes.find_series_by_uuid(series_uuid).await? else {
            return Ok(None);
        };
        Ok(self
            .episodes
            .find_by_series_and_number(&series.id, ep_no)
            .await?)
    }
}

fn internal_failure(step: &str, e: AppError) -> PurchaseOutcome {
    tracing::error!(error = %e, step, "Purchase failed");
    PurchaseOutcome::failed(PurchaseFailure::Internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        test_episode, test_series, test_user, InMemoryAccountStore, InMemoryCatalog,
    };

    type Service = PurchaseService<
        InMemoryAccountStore,
        InMemoryCatalog,
        InMemoryAccountStore,
        InMemoryAccountStore,
    >;

    fn create_service(store: Arc<InMemoryAccountStore>, catalog: Arc<InMemoryCatalog>) -> Service {
        PurchaseService::new(
            catalog,
            Arc::new(OwnershipOracle::new(store.clone())),
            Arc::new(PointLedger::new(store.clone())),
            store,
        )
    }

    #[tokio::test]
    async fn purchase_debits_and_grants() {
        let user = test_user(100);
        let episode = test_episode(1, 3, 30);
        let store = Arc::new(InMemoryAccountStore::new().with_user(user.clone()));
        let catalog = Arc::new(InMemoryCatalog::new().with_episode(episode.clone()));
        let service = create_service(store.clone(), catalog);

        let outcome = service.purchase(Some(&user.id), &[episode.clone()], None).await;

        assert!(outcome.success);
        assert_eq!(outcome.charged, 30);
        assert_eq!(outcome.granted, vec![episode.id]);
        assert_eq!(outcome.balance_after, Some(70));
        assert_eq!(store.balance_of(&user.id), Some(70));
        assert!(store.owns(&user.id, &episode.id));
    }

    #[tokio::test]
    async fn second_purchase_is_already_owned_and_free() {
        let user = test_user(100);
        let episode = test_episode(1, 1, 30);
        let store = Arc::new(InMemoryAccountStore::new().with_user(user.clone()));
        let catalog = Arc::new(InMemoryCatalog::new().with_episode(episode.clone()));
        let service = create_service(store.clone(), catalog);

        assert!(service.purchase(Some(&user.id), &[episode.clone()], None).await.success);
        let second = service.purchase(Some(&user.id), &[episode.clone()], None).await;

        assert!(!second.success);
        assert_eq!(second.error, Some(PurchaseFailure::AlreadyOwned));
        assert_eq!(store.balance_of(&user.id), Some(70));
        assert_eq!(store.ownership_count(&user.id), 1);
    }

    #[tokio::test]
    async fn insufficient_points_changes_nothing() {
        let user = test_user(20);
        let episode = test_episode(1, 1, 30);
        let store = Arc::new(InMemoryAccountStore::new().with_user(user.clone()));
        let catalog = Arc::new(InMemoryCatalog::new().with_episode(episode.clone()));
        let service = create_service(store.clone(), catalog);

        let outcome = service.purchase(Some(&user.id), &[episode.clone()], None).await;

        assert_eq!(outcome.error, Some(PurchaseFailure::InsufficientPoints));
        assert_eq!(store.balance_of(&user.id), Some(20));
        assert_eq!(store.ownership_count(&user.id), 0);
    }

    #[tokio::test]
    async fn insufficient_points_in_batch_grants_nothing() {
        let user = test_user(40);
        let episodes = vec![
            test_episode(1, 1, 20),
            test_episode(2, 2, 20),
            test_episode(3, 3, 20),
        ];
        let store = Arc::new(InMemoryAccountStore::new().with_user(user.clone()));
        let catalog = Arc::new(InMemoryCatalog::new().with_episodes(episodes.clone()));
        let service = create_service(store.clone(), catalog);

        let uuids: Vec<Uuid> = episodes.iter().map(|e| e.uuid).collect();
        let outcome = service.purchase_uuids(Some(&user.id), &uuids).await;

        assert_eq!(outcome.error, Some(PurchaseFailure::InsufficientPoints));
        assert_eq!(store.balance_of(&user.id), Some(40));
        assert_eq!(store.ownership_count(&user.id), 0);
    }

    #[tokio::test]
    async fn stale_caller_balance_is_rechecked_at_commit() {
        let user = test_user(10);
        let episode = test_episode(1, 1, 30);
        let store = Arc::new(InMemoryAccountStore::new().with_user(user.clone()));
        let catalog = Arc::new(InMemoryCatalog::new().with_episode(episode.clone()));
        let service = create_service(store.clone(), catalog);

        let outcome = service
            .purchase(Some(&user.id), std::slice::from_ref(&episode), Some(500))
            .await;

        assert_eq!(outcome.error, Some(PurchaseFailure::InsufficientPoints));
        assert_eq!(store.balance_of(&user.id), Some(10));
    }

    #[tokio::test]
    async fn batch_skips_owned_and_charges_the_rest() {
        let user = test_user(50);
        let owned = test_episode(1, 1, 10);
        let second = test_episode(2, 2, 20);
        let third = test_episode(3, 3, 15);
        let store = Arc::new(
            InMemoryAccountStore::new()
                .with_user(user.clone())
                .with_ownership(user.id, owned.id),
        );
        let catalog = Arc::new(InMemoryCatalog::new().with_episodes(vec![
            owned.clone(),
            second.clone(),
            third.clone(),
        ]));
        let service = create_service(store.clone(), catalog);

        let outcome = service
            .purchase_uuids(Some(&user.id), &[owned.uuid, second.uuid, third.uuid])
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.charged, 35);
        assert_eq!(store.balance_of(&user.id), Some(15));
        assert_eq!(store.ownership_count(&user.id), 3);
    }

    #[tokio::test]
    async fn batch_collapses_duplicate_uuids() {
        let user = test_user(50);
        let episode = test_episode(1, 1, 20);
        let store = Arc::new(InMemoryAccountStore::new().with_user(user.clone()));
        let catalog = Arc::new(InMemoryCatalog::new().with_episode(episode.clone()));
        let service = create_service(store.clone(), catalog);

        let outcome = service
            .purchase_uuids(Some(&user.id), &[episode.uuid, episode.uuid])
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.charged, 20);
        assert_eq!(store.balance_of(&user.id), Some(30));
    }

    #[tokio::test]
    async fn unknown_uuid_fails_whole_batch() {
        let user = test_user(50);
        let episode = test_episode(1, 1, 20);
        let store = Arc::new(InMemoryAccountStore::new().with_user(user.clone()));
        let catalog = Arc::new(InMemoryCatalog::new().with_episode(episode.clone()));
        let service = create_service(store.clone(), catalog);

        let outcome = service
            .purchase_uuids(Some(&user.id), &[episode.uuid, Uuid::new_v4()])
            .await;

        assert_eq!(outcome.error, Some(PurchaseFailure::EpisodeNotFound));
        assert_eq!(store.balance_of(&user.id), Some(50));
    }

    #[tokio::test]
    async fn anonymous_purchase_of_priced_episode_is_unauthenticated() {
        let episode = test_episode(1, 1, 20);
        let store = Arc::new(InMemoryAccountStore::new());
        let catalog = Arc::new(InMemoryCatalog::new().with_episode(episode.clone()));
        let service = create_service(store, catalog);

        let outcome = service.purchase(None, &[episode], None).await;

        assert_eq!(outcome.error, Some(PurchaseFailure::Unauthenticated));
    }

    #[tokio::test]
    async fn free_episode_never_enters_transaction() {
        let user = test_user(50);
        let episode = test_episode(1, 1, 0);
        let store = Arc::new(InMemoryAccountStore::new().with_user(user.clone()));
        let catalog = Arc::new(InMemoryCatalog::new().with_episode(episode.clone()));
        let service = create_service(store.clone(), catalog);

        let outcome = service.purchase(Some(&user.id), &[episode], None).await;

        assert_eq!(outcome.error, Some(PurchaseFailure::AlreadyOwned));
        assert_eq!(store.commit_calls(), 0);
    }

    #[tokio::test]
    async fn purchase_episode_resolves_by_series_and_number() {
        let user = test_user(50);
        let series = test_series();
        let mut episode = test_episode(9, 4, 25);
        episode.series_id = series.id;
        let store = Arc::new(InMemoryAccountStore::new().with_user(user.clone()));
        let catalog = Arc::new(
            InMemoryCatalog::new()
                .with_series(series.clone())
                .with_episode(episode.clone()),
        );
        let service = create_service(store.clone(), catalog);

        let outcome = service
            .purchase_episode(Some(&user.id), series.uuid, 4, Some(episode.id))
            .await;
        assert!(outcome.success);
        assert_eq!(store.balance_of(&user.id), Some(25));

        let wrong_id = service
            .purchase_episode(Some(&user.id), series.uuid, 4, Some(EpisodeId(1234)))
            .await;
        assert_eq!(wrong_id.error, Some(PurchaseFailure::EpisodeNotFound));

        let missing = service
            .purchase_episode(Some(&user.id), series.uuid, 5, None)
            .await;
        assert_eq!(missing.error, Some(PurchaseFailure::EpisodeNotFound));
    }

    #[tokio::test]
    async fn store_failure_is_internal_error_without_effects() {
        let user = test_user(50);
        let episode = test_episode(1, 1, 20);
        let store = Arc::new(InMemoryAccountStore::new().with_user(user.clone()));
        let catalog = Arc::new(InMemoryCatalog::new().with_episode(episode.clone()));
        let service = create_service(store.clone(), catalog);

        store.set_failing(true);
        let outcome = service.purchase(Some(&user.id), &[episode], None).await;
        store.set_failing(false);

        assert_eq!(outcome.error, Some(PurchaseFailure::Internal));
        assert_eq!(store.balance_of(&user.id), Some(50));
        assert_eq!(store.ownership_count(&user.id), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_purchases_debit_exactly_once() {
        let user = test_user(100);
        let episode = test_episode(1, 1, 30);
        let store = Arc::new(InMemoryAccountStore::new().with_user(user.clone()));
        let catalog = Arc::new(InMemoryCatalog::new().with_episode(episode.clone()));
        let service = Arc::new(create_service(store.clone(), catalog));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let service = service.clone();
            let user_id = user.id;
            let uuid = episode.uuid;
            handles.push(tokio::spawn(async move {
                service.purchase_uuids(Some(&user_id), &[uuid]).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            let outcome = handle.await.unwrap();
            if outcome.success {
                successes += 1;
            } else {
                assert_eq!(outcome.error, Some(PurchaseFailure::AlreadyOwned));
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.balance_of(&user.id), Some(70));
        assert_eq!(store.ownership_count(&user.id), 1);
    }
}
