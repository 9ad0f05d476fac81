//! Session token authentication middleware
//!
//! Callers present `Authorization: Bearer <session token>`. Only the SHA-256
//! hash of a token is stored, so the raw token is hashed before lookup.

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use sha2::{Digest, Sha256};

use crate::domain::ports::UserRepository;
use crate::error::AppError;

/// Hex-encoded SHA-256 of a session token
pub fn hash_session_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Extract the session token from the Authorization header
fn extract_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware
///
/// Resolves the session and injects the `User` into request extensions.
/// Purchase and wallet routes use this middleware.
pub async fn require_session<UR>(
    State(users): State<Arc<UR>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError>
where
    UR: UserRepository + 'static,
{
    let token = extract_token(&request).ok_or(AppError::Unauthorized)?;

    let user = users
        .find_by_session_hash(&hash_session_token(token))
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Optional authentication middleware
///
/// Like `require_session` but lets anonymous callers through. A missing,
/// unknown or unverifiable token leaves no `User` in extensions.
pub async fn optional_session<UR>(
    State(users): State<Arc<UR>>,
    mut request: Request<Body>,
    next: Next,
) -> Response
where
    UR: UserRepository + 'static,
{
    if let Some(token) = extract_token(&request) {
        match users.find_by_session_hash(&hash_session_token(token)).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(user);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed, continuing anonymously");
            }
        }
    }

    next.run(request).await
}
