//! Rate limiting value objects
//!
//! A sliding window keyed by `<key_prefix>:<identifier>` holding one
//! timestamped token per request seen within the trailing window.

use serde::Serialize;

pub const DEFAULT_KEY_PREFIX: &str = "ratelimit";

/// What to do when the window store cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Allow the request with a full quota
    #[default]
    FailOpen,
    /// Deny the request
    Strict,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::FailOpen => write!(f, "fail_open"),
            FailurePolicy::Strict => write!(f, "strict"),
        }
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fail_open" | "open" => Ok(FailurePolicy::FailOpen),
            "strict" | "fail_closed" | "closed" => Ok(FailurePolicy::Strict),
            _ => Err(format!("Unknown rate limit failure policy: {}", s)),
        }
    }
}

/// Limit applied to one class of requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    pub max_requests: u64,
    pub window_seconds: u64,
    pub key_prefix: String,
}

impl RateLimitRule {
    pub fn new(max_requests: u64, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window_seconds,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    /// Store key for an identifier
    pub fn key_for(&self, identifier: &str) -> String {
        format!("{}:{}", self.key_prefix, identifier)
    }

    /// Key time-to-live; abandoned windows expire one second after they empty
    pub fn ttl_seconds(&self) -> u64 {
        self.window_seconds + 1
    }
}

/// Verdict for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u64,
    /// Seconds until the window fully resets
    pub reset_in: u64,
}

impl RateLimitDecision {
    /// Verdict used when the store is unavailable and the policy fails open
    pub fn unrestricted(rule: &RateLimitRule) -> Self {
        Self {
            allowed: true,
            remaining: rule.max_requests,
            reset_in: rule.window_seconds,
        }
    }

    /// Verdict used when the store is unavailable and the policy is strict
    pub fn denied(rule: &RateLimitRule) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            reset_in: rule.window_seconds,
        }
    }

    /// Verdict for a window that now holds `count` tokens, including this request
    pub fn from_count(rule: &RateLimitRule, count: u64) -> Self {
        Self {
            allowed: count <= rule.max_requests,
            remaining: rule.max_requests.saturating_sub(count),
            reset_in: rule.window_seconds,
        }
    }
}
