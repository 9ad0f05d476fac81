//! Purchase outcome value objects
//!
//! A purchase never surfaces as an error to its caller: it returns a
//! `PurchaseOutcome` carrying a machine reason code and a localized message.

use serde::{Serialize, Serializer};

use super::{EpisodeId, PurchaseReceipt};

/// Why a purchase did not happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseFailure {
    EpisodeNotFound,
    Unauthenticated,
    InsufficientPoints,
    AlreadyOwned,
    Internal,
}

impl PurchaseFailure {
    /// Stable reason code sent to clients and carried in redirect flags
    pub fn code(&self) -> &'static str {
        match self {
            PurchaseFailure::EpisodeNotFound => "episode_not_found",
            PurchaseFailure::Unauthenticated => "unauthenticated",
            PurchaseFailure::InsufficientPoints => "insufficient_points",
            PurchaseFailure::AlreadyOwned => "already_owned",
            PurchaseFailure::Internal => "internal_error",
        }
    }

    /// Human-readable message in the caller's language
    pub fn message(&self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::En, PurchaseFailure::EpisodeNotFound) => "Episode not found.",
            (Locale::En, PurchaseFailure::Unauthenticated) => "Please log in to unlock episodes.",
            (Locale::En, PurchaseFailure::InsufficientPoints) => {
                "Not enough points to unlock this episode."
            }
            (Locale::En, PurchaseFailure::AlreadyOwned) => "You already own this episode.",
            (Locale::En, PurchaseFailure::Internal) => {
                "The purchase could not be completed. Please try again."
            }
            (Locale::Ko, PurchaseFailure::EpisodeNotFound) => "에피소드를 찾을 수 없습니다.",
            (Locale::Ko, PurchaseFailure::Unauthenticated) => "로그인 후 구매할 수 있습니다.",
            (Locale::Ko, PurchaseFailure::InsufficientPoints) => "포인트가 부족합니다.",
            (Locale::Ko, PurchaseFailure::AlreadyOwned) => "이미 구매한 에피소드입니다.",
            (Locale::Ko, PurchaseFailure::Internal) => {
                "구매를 완료하지 못했습니다. 잠시 후 다시 시도해주세요."
            }
        }
    }
}

impl std::fmt::Display for PurchaseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for PurchaseFailure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "episode_not_found" => Ok(PurchaseFailure::EpisodeNotFound),
            "unauthenticated" => Ok(PurchaseFailure::Unauthenticated),
            "insufficient_points" => Ok(PurchaseFailure::InsufficientPoints),
            "already_owned" => Ok(PurchaseFailure::AlreadyOwned),
            "internal_error" => Ok(PurchaseFailure::Internal),
            _ => Err(format!("Unknown purchase failure: {}", s)),
        }
    }
}

impl Serialize for PurchaseFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// Language for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ko,
}

impl Locale {
    /// Pick a locale from an `Accept-Language` header value
    pub fn from_accept_language(header: Option<&str>) -> Self {
        let Some(header) = header else {
            return Locale::En;
        };

        for tag in header.split(',') {
            let lang = tag.split(';').next().unwrap_or("").trim().to_lowercase();
            if lang.starts_with("ko") {
                return Locale::Ko;
            }
            if lang.starts_with("en") {
                return Locale::En;
            }
        }
        Locale::En
    }
}

/// Result of a purchase attempt, consumed immediately by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOutcome {
    pub success: bool,
    pub error: Option<PurchaseFailure>,
    pub granted: Vec<EpisodeId>,
    pub charged: i64,
    pub balance_after: Option<i64>,
}

impl PurchaseOutcome {
    pub fn failed(reason: PurchaseFailure) -> Self {
        Self {
            success: false,
            error: Some(reason),
            granted: Vec::new(),
            charged: 0,
            balance_after: None,
        }
    }
}

impl From<PurchaseReceipt> for PurchaseOutcome {
    fn from(receipt: PurchaseReceipt) -> Self {
        Self {
            success: true,
            error: None,
            granted: receipt.granted_ids(),
            charged: receipt.charged,
            balance_after: Some(receipt.balance_after),
        }
    }
}
