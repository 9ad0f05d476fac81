//! User domain entity
//!
//! A reader account holding a point balance and the auto-purchase opt-in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reader account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Spendable points, never negative
    pub point_balance: i64,
    /// Spend points automatically when opening a locked episode
    pub auto_purchase: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the balance covers `amount`
    pub fn can_afford(&self, amount: i64) -> bool {
        self.point_balance >= amount
    }
}

/// Balance and settings snapshot shown to the owner of the account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wallet {
    pub point_balance: i64,
    pub auto_purchase: bool,
}

impl From<&User> for Wallet {
    fn from(user: &User) -> Self {
        Self {
            point_balance: user.point_balance,
            auto_purchase: user.auto_purchase,
        }
    }
}
