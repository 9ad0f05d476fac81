//! Rate-limit middleware
//!
//! Applies one `RateLimitRule` to a route group. Authenticated callers are
//! limited per user, everyone else per peer IP, so this layer must run after
//! the session middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::RateLimiter;
use crate::domain::entities::{RateLimitDecision, RateLimitRule, User};
use crate::domain::ports::{Clock, WindowStore};
use crate::error::AppError;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Limiter and rule for one route group
pub struct RouteLimit<S, C>
where
    S: WindowStore,
    C: Clock,
{
    limiter: Arc<RateLimiter<S, C>>,
    rule: RateLimitRule,
}

impl<S, C> RouteLimit<S, C>
where
    S: WindowStore,
    C: Clock,
{
    pub fn new(limiter: Arc<RateLimiter<S, C>>, rule: RateLimitRule) -> Self {
        Self { limiter, rule }
    }
}

impl<S, C> Clone for RouteLimit<S, C>
where
    S: WindowStore,
    C: Clock,
{
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            rule: self.rule.clone(),
        }
    }
}

/// Rate-limit key identifier for the caller
fn caller_identifier(request: &Request<Body>) -> String {
    if let Some(user) = request.extensions().get::<User>() {
        return format!("user:{}", user.id);
    }
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "ip:unknown".to_string(),
    }
}

fn apply_headers(headers: &mut HeaderMap, rule: &RateLimitRule, decision: &RateLimitDecision) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(rule.max_requests));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(decision.reset_in));
}

/// Rate-limit middleware
///
/// Denied requests get `429 Too Many Requests` with `Retry-After`; every
/// response carries the `X-RateLimit-*` headers.
pub async fn rate_limit<S, C>(
    State(route): State<RouteLimit<S, C>>,
    request: Request<Body>,
    next: Next,
) -> Response
where
    S: WindowStore + 'static,
    C: Clock + 'static,
{
    let identifier = caller_identifier(&request);
    let decision = route.limiter.check(&identifier, &route.rule).await;

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::info!(
            identifier = %identifier,
            key_prefix = %route.rule.key_prefix,
            "Rate limit exceeded"
        );
        AppError::TooManyRequests {
            retry_after: decision.reset_in,
        }
        .into_response()
    };

    apply_headers(response.headers_mut(), &route.rule, &decision);
    response
}
