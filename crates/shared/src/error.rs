//! Error types for HostCMS

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for SiteError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => SiteError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // PostgreSQL unique violation
                if db_err.code().as_deref() == Some("23505") {
                    return SiteError::Conflict(db_err.message().to_string());
                }
                SiteError::Database(db_err.to_string())
            }
            _ => SiteError::Database(err.to_string()),
        }
    }
}

pub type SiteResult<T> = Result<T, SiteError>;
