use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the arena engine.
///
/// An already-cast vote is not an error; see [`crate::domain::CastOutcome`].
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("At least two competitors are required to create a matchup")]
    InsufficientCompetitors,
    #[error("Invalid pairing: {0}")]
    InvalidPairing(String),
    #[error("Invalid winner: {0}")]
    InvalidWinner(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Unsupported schema version {found} (expected {expected})")]
    UnsupportedSchemaVersion { found: i64, expected: i64 },
    #[error("Corrupt data: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl LedgerError {
    /// SQLite busy/locked conditions that are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            LedgerError::Db(sqlx::Error::Database(db)) => {
                let code = db.code();
                matches!(code.as_deref(), Some("5" | "6" | "517" | "261"))
                    || db.message().contains("database is locked")
            }
            LedgerError::Db(sqlx::Error::PoolTimedOut) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(msg) => AppError::NotFound(msg),
            LedgerError::InsufficientCompetitors => AppError::Conflict(err.to_string()),
            LedgerError::InvalidPairing(_)
            | LedgerError::InvalidWinner(_)
            | LedgerError::Validation(_)
            | LedgerError::UnsupportedSchemaVersion { .. } => AppError::BadRequest(err.to_string()),
            LedgerError::Corrupt(_) | LedgerError::Db(_) => {
                tracing::error!(error = %err, "Arena storage failure");
                AppError::Internal("Storage failure".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
