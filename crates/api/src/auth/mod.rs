//! Admin token authentication
//!
//! Site management endpoints require `Authorization: Bearer <ADMIN_API_TOKEN>`.
//! When no token is configured every admin request is rejected.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

/// Middleware guarding the admin routes
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.admin_api_token.as_deref() else {
        tracing::warn!("Admin request rejected: ADMIN_API_TOKEN is not configured");
        return Err(ApiError::Unauthorized);
    };

    match bearer_token(request.headers()) {
        Some(token) if constant_time_compare(token, expected) => Ok(next.run(request).await),
        _ => {
            tracing::debug!(uri = %request.uri(), "Admin request with missing or invalid token");
            Err(ApiError::Unauthorized)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        // still do the work so the length is not leaked through timing
        let dummy = vec![0u8; a.len()];
        let _ = a.as_bytes().ct_eq(&dummy);
        return false;
    }

    a.as_bytes().ct_eq(b.as_bytes()).into()
}
