//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use hostcms_shared::SiteError;

use crate::mirror::SyncError;
use crate::routing::ResolveError;
use crate::sites::SiteServiceError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication errors
    #[error("Authentication required")]
    Unauthorized,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),

    // Resource errors
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Resource already exists")]
    Conflict(String),
    #[error("No site found for host '{host}' and path '{path}'")]
    NoSite { host: String, path: String },

    // Mirroring
    #[error("Mirror sync failed: {0}")]
    MirrorSync(String),
    #[error("Mirror sync timed out")]
    MirrorTimeout,

    // Internal errors
    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Authentication
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),

            // Validation
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),

            // Resources
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            ApiError::NoSite { .. } => (StatusCode::NOT_FOUND, "SITE_NOT_FOUND", self.to_string()),

            // Mirroring
            ApiError::MirrorSync(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "MIRROR_SYNC_FAILED", msg.clone()),
            ApiError::MirrorTimeout => (StatusCode::GATEWAY_TIMEOUT, "MIRROR_SYNC_TIMEOUT", self.to_string()),

            // Internal
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR", "Database error".to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<SiteError> for ApiError {
    fn from(err: SiteError) -> Self {
        match err {
            SiteError::NotFound(what) => ApiError::NotFound(what),
            SiteError::Validation(msg) => ApiError::Validation(msg),
            SiteError::Conflict(msg) => ApiError::Conflict(msg),
            SiteError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ApiError::Database(msg)
            }
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound { host, path } => ApiError::NoSite { host, path },
            ResolveError::Storage(err) => err.into(),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        tracing::error!(error = %err, "Mirror sync failed");
        match err {
            SyncError::TimedOut { .. } => ApiError::MirrorTimeout,
            other => ApiError::MirrorSync(other.to_string()),
        }
    }
}

impl From<SiteServiceError> for ApiError {
    fn from(err: SiteServiceError) -> Self {
        match err {
            SiteServiceError::Site(err) => err.into(),
            SiteServiceError::MirrorSync { site, source } => {
                tracing::warn!(site_id = %site.id, "Site saved, mirror partner left partially synced");
                source.into()
            }
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
