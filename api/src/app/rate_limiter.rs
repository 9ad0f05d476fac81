//! Sliding-window rate limiter
//!
//! Every check inserts a token scored by the current time, prunes tokens older
//! than the window, counts what is left and refreshes the key's TTL. The four
//! store calls are independent, so concurrent requests on one key can
//! overshoot `max_requests` by the number of requests in flight; the count
//! converges once they land.

use std::sync::Arc;

use crate::domain::entities::{FailurePolicy, RateLimitDecision, RateLimitRule};
use crate::domain::ports::{Clock, WindowStore};
use crate::error::RateLimitError;

/// Rate limiter over a shared window store
pub struct RateLimiter<S, C>
where
    S: WindowStore,
    C: Clock,
{
    store: Arc<S>,
    clock: Arc<C>,
    policy: FailurePolicy,
}

impl<S, C> RateLimiter<S, C>
where
    S: WindowStore,
    C: Clock,
{
    pub fn new(store: Arc<S>, clock: Arc<C>, policy: FailurePolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Record a request from `identifier` and decide whether it may proceed
    ///
    /// Store failures never propagate: they resolve according to the
    /// configured `FailurePolicy`.
    pub async fn check(&self, identifier: &str, rule: &RateLimitRule) -> RateLimitDecision {
        match self.record(identifier, rule).await {
            Ok(decision) => decision,
            Err(e) => match self.policy {
                FailurePolicy::FailOpen => {
                    tracing::warn!(
                        error = %e,
                        key = %rule.key_for(identifier),
                        "Rate limit store unavailable, allowing request"
                    );
                    RateLimitDecision::unrestricted(rule)
                }
                FailurePolicy::Strict => {
                    tracing::error!(
                        error = %e,
                        key = %rule.key_for(identifier),
                        "Rate limit store unavailable, denying request"
                    );
                    RateLimitDecision::denied(rule)
                }
            },
        }
    }

    async fn record(
        &self,
        identifier: &str,
        rule: &RateLimitRule,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let key = rule.key_for(identifier);
        let now = self.clock.now_millis();
        let window_start = now - window_millis(rule);
        let token = format!("{}-{:016x}", now, rand::random::<u64>());

        self.store.add(&key, &token, now).await?;
        self.store.remove_before(&key, window_start).await?;
        let count = self.store.count(&key).await?;
        self.store.expire(&key, rule.ttl_seconds()).await?;

        let decision = RateLimitDecision::from_count(rule, count);
        if !decision.allowed {
            tracing::debug!(key = %key, count, max = rule.max_requests, "Rate limit exceeded");
        }
        Ok(decision)
    }
}

fn window_millis(rule: &RateLimitRule) -> i64 {
    i64::try_from(rule.window_seconds)
        .unwrap_or(i64::MAX / 1000)
        .saturating_mul(1000)
}
