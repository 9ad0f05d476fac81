//! Ownership domain entities
//!
//! An ownership record lets a user read one priced episode. Records are only
//! created by the atomic purchase step and never deleted; at most one exists
//! per (user, episode) pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EpisodeId, UserId};

/// Durable grant for a user to read an episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRecord {
    pub user_id: UserId,
    pub episode_id: EpisodeId,
    /// Points charged when the record was created
    pub price_paid: i64,
    pub purchased_at: DateTime<Utc>,
}

impl OwnershipRecord {
    pub fn new(user_id: UserId, episode: &PricedEpisode, purchased_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            episode_id: episode.id,
            price_paid: episode.price,
            purchased_at,
        }
    }
}

/// Episode handed to the atomic purchase step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedEpisode {
    pub id: EpisodeId,
    pub price: i64,
}

/// Result of a committed purchase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    /// Ownership records created by this purchase
    pub granted: Vec<OwnershipRecord>,
    /// Episodes skipped because the user already owned them
    pub skipped: Vec<EpisodeId>,
    /// Total debited from the balance
    pub charged: i64,
    pub balance_after: i64,
}

impl PurchaseReceipt {
    pub fn granted_ids(&self) -> Vec<EpisodeId> {
        self.granted.iter().map(|r| r.episode_id).collect()
    }
}

/// What the atomic purchase step decided
///
/// Only `Granted` implies any mutation happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Granted(PurchaseReceipt),
    /// Every requested episode was owned when the lock was taken
    AlreadyOwned,
    InsufficientPoints { balance: i64, required: i64 },
}
