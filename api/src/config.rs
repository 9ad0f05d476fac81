use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context};

use crate::domain::entities::{FailurePolicy, RateLimitRule, DEFAULT_KEY_PREFIX};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    /// Redis URL for the rate-limit window store
    pub redis_url: String,
    pub port: u16,
    /// Base URL used to build read-path redirect targets
    pub public_base_url: String,
    pub purchase_rate_limit: RateLimitRule,
    pub content_rate_limit: RateLimitRule,
    pub rate_limit_failure_policy: FailurePolicy,
    pub rate_limit_store_timeout_ms: u64,
    /// Emit 303 redirects carrying outcome flags instead of rendering in place
    pub auto_purchase_redirects: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let key_prefix =
            env::var("RATE_LIMIT_KEY_PREFIX").unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string());

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            port: parse_var("PORT", 8080)?,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string())
                .trim_end_matches('/')
                .to_string(),
            purchase_rate_limit: RateLimitRule::new(
                parse_var("PURCHASE_RATE_LIMIT_MAX", 10)?,
                parse_var("PURCHASE_RATE_LIMIT_WINDOW_SECS", 60)?,
            )
            .with_prefix(format!("{}:purchase", key_prefix)),
            content_rate_limit: RateLimitRule::new(
                parse_var("CONTENT_RATE_LIMIT_MAX", 120)?,
                parse_var("CONTENT_RATE_LIMIT_WINDOW_SECS", 60)?,
            )
            .with_prefix(format!("{}:content", key_prefix)),
            rate_limit_failure_policy: match env::var("RATE_LIMIT_FAILURE_POLICY") {
                Ok(raw) => raw.parse().map_err(|e: String| anyhow!(e))?,
                Err(_) => FailurePolicy::FailOpen,
            },
            rate_limit_store_timeout_ms: parse_var("RATE_LIMIT_STORE_TIMEOUT_MS", 250)?,
            auto_purchase_redirects: parse_var("AUTO_PURCHASE_REDIRECTS", false)?,
        })
    }
}

/// Read an optional variable, falling back to `default` when unset
fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}
