//! Auto-purchase read-path state machine
//!
//! Each read of a priced, not-yet-owned episode walks
//! `Locked -> Checking -> AutoBuying -> Purchased | AutoBuyFailed` or stops at
//! `AwaitingManualUnlock`. The outcome travels to the next render either in
//! the response itself or as query flags on a redirect.

use serde::{Deserialize, Serialize};

use super::{Locale, PurchaseFailure, User};

/// Why the episode stays locked without an auto-buy attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LockReason {
    Anonymous,
    AutoPurchaseDisabled,
    /// Balance could not be loaded
    BalanceUnknown,
    InsufficientPoints { balance: i64, price: i64 },
    /// The previous render already reported a failed auto-buy
    RetrySuppressed,
}

/// States of the read path for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoPurchaseState {
    Locked,
    Checking,
    AutoBuying { price: i64 },
    Purchased { price: i64, ep_no: i32 },
    AutoBuyFailed { reason: PurchaseFailure },
    AwaitingManualUnlock(LockReason),
}

impl AutoPurchaseState {
    /// `Checking` transition: decide whether to auto-buy
    ///
    /// `viewer` is `None` for anonymous callers and `Some(None)` when the
    /// caller is known but their account could not be loaded.
    pub fn after_check(viewer: Option<Option<&User>>, price: i64, retry_suppressed: bool) -> Self {
        let user = match viewer {
            None => return Self::AwaitingManualUnlock(LockReason::Anonymous),
            Some(None) => return Self::AwaitingManualUnlock(LockReason::BalanceUnknown),
            Some(Some(user)) => user,
        };

        if retry_suppressed {
            return Self::AwaitingManualUnlock(LockReason::RetrySuppressed);
        }
        if !user.auto_purchase {
            return Self::AwaitingManualUnlock(LockReason::AutoPurchaseDisabled);
        }
        if price <= 0 || !user.can_afford(price) {
            return Self::AwaitingManualUnlock(LockReason::InsufficientPoints {
                balance: user.point_balance,
                price,
            });
        }
        Self::AutoBuying { price }
    }
}

/// Query flags carried by the read-path redirect
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPurchaseFlags {
    pub auto_purchased: Option<bool>,
    pub ep_price: Option<i64>,
    pub ep_no: Option<i32>,
    pub auto_purchase_failed: Option<bool>,
    pub error: Option<String>,
}

impl AutoPurchaseFlags {
    pub fn purchased(price: i64, ep_no: i32) -> Self {
        Self {
            auto_purchased: Some(true),
            ep_price: Some(price),
            ep_no: Some(ep_no),
            ..Default::default()
        }
    }

    pub fn failed(reason: PurchaseFailure) -> Self {
        Self {
            auto_purchase_failed: Some(true),
            error: Some(reason.code().to_string()),
            ..Default::default()
        }
    }

    pub fn is_failure(&self) -> bool {
        self.auto_purchase_failed == Some(true)
    }

    /// Render as a query string (without the leading `?`)
    pub fn to_query(&self) -> String {
        let mut parts = Vec::new();
        if self.auto_purchased == Some(true) {
            parts.push("autoPurchased=true".to_string());
            if let Some(price) = self.ep_price {
                parts.push(format!("epPrice={}", price));
            }
            if let Some(ep_no) = self.ep_no {
                parts.push(format!("epNo={}", ep_no));
            }
        }
        if self.is_failure() {
            parts.push("autoPurchaseFailed=true".to_string());
            if let Some(error) = &self.error {
                parts.push(format!("error={}", urlencoding::encode(error)));
            }
        }
        parts.join("&")
    }

    /// Banner or toast to show for these flags, if any
    pub fn notice(&self, locale: Locale) -> Option<AutoPurchaseNotice> {
        if self.is_failure() {
            let raw = self.error.clone().unwrap_or_default();
            let message = match raw.parse::<PurchaseFailure>() {
                Ok(reason) => reason.message(locale).to_string(),
                Err(_) if raw.is_empty() => PurchaseFailure::Internal.message(locale).to_string(),
                Err(_) => raw.clone(),
            };
            return Some(AutoPurchaseNotice::AutoPurchaseFailed {
                reason: raw,
                message,
            });
        }
        if self.auto_purchased == Some(true) {
            return Some(AutoPurchaseNotice::AutoPurchased {
                price: self.ep_price.unwrap_or_default(),
                ep_no: self.ep_no.unwrap_or_default(),
            });
        }
        None
    }
}

/// Confirmation toast or error banner attached to an episode page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AutoPurchaseNotice {
    AutoPurchased {
        price: i64,
        #[serde(rename = "epNo")]
        ep_no: i32,
    },
    AutoPurchaseFailed {
        reason: String,
        message: String,
    },
}
