//! Mock implementations of port traits
//!
//! These are in-memory implementations that can be configured for testing.
//! They store data in memory and allow tests to verify behavior.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::domain::entities::{
    CommitOutcome, Episode, EpisodeId, EpisodeImage, EpisodeSummary, Navigation, OwnershipRecord,
    PricedEpisode, PurchaseReceipt, Series, SeriesId, User, UserId,
};
use crate::domain::ports::{
    Clock, EpisodeRepository, OwnershipRepository, PurchaseRepository, UserRepository,
    WindowStore,
};
use crate::error::{DomainError, RateLimitError};

// ============================================================================
// In-Memory Account Store (users, sessions, ownership, atomic purchase)
// ============================================================================

#[derive(Default)]
struct Accounts {
    users: HashMap<UserId, User>,
    owned: HashSet<(UserId, EpisodeId)>,
}

/// Users, sessions and ownership records behind one lock
///
/// `commit` holds the write lock for the whole check-debit-grant sequence,
/// which makes it all-or-nothing and serialized like the database path.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<Accounts>>,
    sessions: Arc<RwLock<HashMap<String, UserId>>>,
    failing: AtomicBool,
    failing_commits: AtomicBool,
    commit_calls: AtomicUsize,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with a user for testing
    pub fn with_user(self, user: User) -> Self {
        self.accounts.write().unwrap().users.insert(user.id, user);
        self
    }

    /// Pre-populate with an ownership record
    pub fn with_ownership(self, user_id: UserId, episode_id: EpisodeId) -> Self {
        self.grant(user_id, episode_id);
        self
    }

    /// Register a live session by token hash
    pub fn with_session(self, token_hash: &str, user_id: UserId) -> Self {
        self.sessions
            .write()
            .unwrap()
            .insert(token_hash.to_string(), user_id);
        self
    }

    /// Make every operation fail with a database error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make only `commit` fail with a database error
    pub fn fail_commits(&self, failing: bool) {
        self.failing_commits.store(failing, Ordering::SeqCst);
    }

    /// Insert an ownership record without charging, e.g. a concurrent purchase
    pub fn grant(&self, user_id: UserId, episode_id: EpisodeId) {
        self.accounts
            .write()
            .unwrap()
            .owned
            .insert((user_id, episode_id));
    }

    pub fn balance_of(&self, user_id: &UserId) -> Option<i64> {
        self.accounts
            .read()
            .unwrap()
            .users
            .get(user_id)
            .map(|u| u.point_balance)
    }

    pub fn owns(&self, user_id: &UserId, episode_id: &EpisodeId) -> bool {
        self.accounts
            .read()
            .unwrap()
            .owned
            .contains(&(*user_id, *episode_id))
    }

    pub fn ownership_count(&self, user_id: &UserId) -> usize {
        self.accounts
            .read()
            .unwrap()
            .owned
            .iter()
            .filter(|(owner, _)| owner == user_id)
            .count()
    }

    /// Number of times `commit` was reached
    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::Database("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryAccountStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        self.check_available()?;
        Ok(self.accounts.read().unwrap().users.get(id).cloned())
    }

    async fn find_by_session_hash(&self, token_hash: &str) -> Result<Option<User>, DomainError> {
        self.check_available()?;
        let user_id = match self.sessions.read().unwrap().get(token_hash) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.accounts.read().unwrap().users.get(&user_id).cloned())
    }

    async fn set_auto_purchase(&self, id: &UserId, enabled: bool) -> Result<(), DomainError> {
        self.check_available()?;
        let mut accounts = self.accounts.write().unwrap();
        let user = accounts
            .users
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound(format!("user {}", id)))?;
        user.auto_purchase = enabled;
        Ok(())
    }
}

#[async_trait]
impl OwnershipRepository for InMemoryAccountStore {
    async fn exists(&self, user_id: &UserId, episode_id: &EpisodeId) -> Result<bool, DomainError> {
        self.check_available()?;
        Ok(self.owns(user_id, episode_id))
    }

    async fn owned_among(
        &self,
        user_id: &UserId,
        episode_ids: &[EpisodeId],
    ) -> Result<Vec<EpisodeId>, DomainError> {
        self.check_available()?;
        let accounts = self.accounts.read().unwrap();
        Ok(episode_ids
            .iter()
            .filter(|id| accounts.owned.contains(&(*user_id, **id)))
            .copied()
            .collect())
    }
}

#[async_trait]
impl PurchaseRepository for InMemoryAccountStore {
    async fn commit(
        &self,
        user_id: &UserId,
        episodes: &[PricedEpisode],
    ) -> Result<CommitOutcome, DomainError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        // let racing callers interleave before the lock
        tokio::task::yield_now().await;

        self.check_available()?;
        if self.failing_commits.load(Ordering::SeqCst) {
            return Err(DomainError::Database("transaction aborted".to_string()));
        }

        let mut accounts = self.accounts.write().unwrap();
        let balance = accounts
            .users
            .get(user_id)
            .map(|u| u.point_balance)
            .ok_or_else(|| DomainError::NotFound(format!("user {}", user_id)))?;

        let (skipped, to_grant): (Vec<PricedEpisode>, Vec<PricedEpisode>) = episodes
            .iter()
            .partition(|e| accounts.owned.contains(&(*user_id, e.id)));

        if to_grant.is_empty() {
            return Ok(CommitOutcome::AlreadyOwned);
        }

        let total: i64 = to_grant.iter().map(|e| e.price).sum();
        if balance < total {
            return Ok(CommitOutcome::InsufficientPoints {
                balance,
                required: total,
            });
        }

        let now = Utc::now();
        let records: Vec<OwnershipRecord> = to_grant
            .iter()
            .map(|e| OwnershipRecord::new(*user_id, e, now))
            .collect();
        for record in &records {
            accounts.owned.insert((record.user_id, record.episode_id));
        }
        let user = accounts
            .users
            .get_mut(user_id)
            .ok_or_else(|| DomainError::NotFound(format!("user {}", user_id)))?;
        user.point_balance -= total;

        Ok(CommitOutcome::Granted(PurchaseReceipt {
            granted: records,
            skipped: skipped.iter().map(|e| e.id).collect(),
            charged: total,
            balance_after: user.point_balance,
        }))
    }
}

// ============================================================================
// In-Memory Catalog
// ============================================================================

#[derive(Default)]
pub struct InMemoryCatalog {
    series: Arc<RwLock<HashMap<SeriesId, Series>>>,
    episodes: Arc<RwLock<HashMap<EpisodeId, Episode>>>,
    images: Arc<RwLock<HashMap<EpisodeId, Vec<EpisodeImage>>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(self, series: Series) -> Self {
        self.series.write().unwrap().insert(series.id, series);
        self
    }

    pub fn with_episode(self, episode: Episode) -> Self {
        self.episodes.write().unwrap().insert(episode.id, episode);
        self
    }

    pub fn with_episodes(self, episodes: Vec<Episode>) -> Self {
        episodes
            .into_iter()
            .fold(self, |catalog, episode| catalog.with_episode(episode))
    }

    pub fn with_images(self, episode_id: EpisodeId, mut images: Vec<EpisodeImage>) -> Self {
        images.sort_by_key(|i| i.position);
        self.images.write().unwrap().insert(episode_id, images);
        self
    }

    fn series_episodes(&self, series_id: &SeriesId) -> Vec<Episode> {
        let mut episodes: Vec<Episode> = self
            .episodes
            .read()
            .unwrap()
            .values()
            .filter(|e| e.series_id == *series_id)
            .cloned()
            .collect();
        episodes.sort_by_key(|e| e.ep_no);
        episodes
    }
}

#[async_trait]
impl EpisodeRepository for InMemoryCatalog {
    async fn find_series_by_uuid(&self, uuid: Uuid) -> Result<Option<Series>, DomainError> {
        Ok(self
            .series
            .read()
            .unwrap()
            .values()
            .find(|s| s.uuid == uuid)
            .cloned())
    }

    async fn find_by_id(&self, id: &EpisodeId) -> Result<Option<Episode>, DomainError> {
        Ok(self.episodes.read().unwrap().get(id).cloned())
    }

    async fn find_by_uuids(&self, uuids: &[Uuid]) -> Result<Vec<Episode>, DomainError> {
        let mut found: Vec<Episode> = self
            .episodes
            .read()
            .unwrap()
            .values()
            .filter(|e| uuids.contains(&e.uuid))
            .cloned()
            .collect();
        found.sort_by_key(|e| (e.series_id, e.ep_no));
        Ok(found)
    }

    async fn find_by_series_and_number(
        &self,
        series_id: &SeriesId,
        ep_no: i32,
    ) -> Result<Option<Episode>, DomainError> {
        Ok(self
            .episodes
            .read()
            .unwrap()
            .values()
            .find(|e| e.series_id == *series_id && e.ep_no == ep_no)
            .cloned())
    }

    async fn find_by_series(&self, series_id: &SeriesId) -> Result<Vec<Episode>, DomainError> {
        Ok(self.series_episodes(series_id))
    }

    async fn find_neighbors(
        &self,
        series_id: &SeriesId,
        ep_no: i32,
    ) -> Result<Navigation, DomainError> {
        let episodes = self.series_episodes(series_id);
        Ok(Navigation {
            prev: episodes
                .iter()
                .rev()
                .find(|e| e.ep_no < ep_no)
                .map(EpisodeSummary::from),
            next: episodes
                .iter()
                .find(|e| e.ep_no > ep_no)
                .map(EpisodeSummary::from),
        })
    }

    async fn find_images(
        &self,
        episode_id: &EpisodeId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<EpisodeImage>, DomainError> {
        // Postgres rejects an OFFSET that does not fit a bigint
        if offset > i64::MAX as u64 {
            return Err(DomainError::Database(
                "OFFSET must not be negative".to_string(),
            ));
        }
        Ok(self
            .images
            .read()
            .unwrap()
            .get(episode_id)
            .map(|images| {
                images
                    .iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count_images(&self, episode_id: &EpisodeId) -> Result<u64, DomainError> {
        Ok(self
            .images
            .read()
            .unwrap()
            .get(episode_id)
            .map(|images| images.len() as u64)
            .unwrap_or(0))
    }
}

// ============================================================================
// Mock Clock
// ============================================================================

/// Manually advanced clock
pub struct MockClock {
    now_ms: AtomicI64,
}

impl MockClock {
    pub fn at(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now_ms.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// ============================================================================
// In-Memory Window Store
// ============================================================================

#[derive(Default)]
struct Window {
    /// member -> score
    members: HashMap<String, i64>,
    expires_at_ms: Option<i64>,
}

/// Sorted-set store with key expiry driven by a `MockClock`
pub struct InMemoryWindowStore {
    clock: Arc<MockClock>,
    windows: RwLock<HashMap<String, Window>>,
    failing: AtomicBool,
}

impl InMemoryWindowStore {
    pub fn new(clock: Arc<MockClock>) -> Self {
        Self {
            clock,
            windows: RwLock::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every command fail as if the store were unreachable
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Members under `key`, zero once the key has expired
    pub fn len(&self, key: &str) -> usize {
        self.evict_expired();
        self.windows
            .read()
            .unwrap()
            .get(key)
            .map(|w| w.members.len())
            .unwrap_or(0)
    }

    /// Remaining time-to-live in whole seconds, rounded up
    pub fn ttl(&self, key: &str) -> Option<u64> {
        self.evict_expired();
        let now = self.clock.now_millis();
        self.windows
            .read()
            .unwrap()
            .get(key)
            .and_then(|w| w.expires_at_ms)
            .map(|at| ((at - now + 999) / 1000) as u64)
    }

    fn evict_expired(&self) {
        let now = self.clock.now_millis();
        self.windows
            .write()
            .unwrap()
            .retain(|_, w| w.expires_at_ms.map_or(true, |at| at > now));
    }

    fn check_available(&self) -> Result<(), RateLimitError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RateLimitError::Unavailable("connection refused".to_string()));
        }
        self.evict_expired();
        Ok(())
    }
}

#[async_trait]
impl WindowStore for InMemoryWindowStore {
    async fn add(&self, key: &str, member: &str, score_ms: i64) -> Result<(), RateLimitError> {
        self.check_available()?;
        self.windows
            .write()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .members
            .insert(member.to_string(), score_ms);
        Ok(())
    }

    async fn remove_before(&self, key: &str, cutoff_ms: i64) -> Result<(), RateLimitError> {
        self.check_available()?;
        let mut windows = self.windows.write().unwrap();
        if let Some(window) = windows.get_mut(key) {
            window.members.retain(|_, score| *score >= cutoff_ms);
            if window.members.is_empty() {
                windows.remove(key);
            }
        }
        Ok(())
    }

    async fn count(&self, key: &str) -> Result<u64, RateLimitError> {
        self.check_available()?;
        Ok(self
            .windows
            .read()
            .unwrap()
            .get(key)
            .map(|w| w.members.len() as u64)
            .unwrap_or(0))
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), RateLimitError> {
        self.check_available()?;
        let expires_at = self.clock.now_millis() + (ttl_seconds as i64) * 1000;
        if let Some(window) = self.windows.write().unwrap().get_mut(key) {
            window.expires_at_ms = Some(expires_at);
        }
        Ok(())
    }
}
