use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shared::errors::{ErrorCategory, ErrorCode, ServiceError};
use shared::ValidationError;

/// Postgres SQLSTATEs that mean "try again": serialization failure,
/// deadlock detected, lock not available (lock_timeout).
const TRANSIENT_SQLSTATES: [&str; 3] = ["40001", "40P01", "55P03"];

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Idempotency key {0} belongs to another request")]
    IdempotencyKeyReused(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        AppError::InvalidState(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Validation(_) | AppError::MissingField(_) | AppError::IdempotencyKeyReused(_) => {
                ErrorCategory::Validation
            }
            AppError::InsufficientBalance { .. } => ErrorCategory::InsufficientBalance,
            AppError::NotFound(_) => ErrorCategory::NotFound,
            AppError::InvalidState(_) => ErrorCategory::InvalidState,
            AppError::ConcurrencyConflict(_) => ErrorCategory::ConcurrencyConflict,
            AppError::Unauthorized(_) => ErrorCategory::Unauthorized,
            AppError::Database(_)
            | AppError::Redis(_)
            | AppError::Persistence(_)
            | AppError::Internal(_) => ErrorCategory::PersistenceFailure,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::VALIDATION_INVALID_INPUT,
            AppError::MissingField(_) => ErrorCode::VALIDATION_MISSING_FIELD,
            AppError::IdempotencyKeyReused(_) => ErrorCode::VALIDATION_IDEMPOTENCY_KEY_REUSED,
            AppError::InsufficientBalance { .. } => ErrorCode::INSUFFICIENT_BALANCE,
            AppError::NotFound(_) => ErrorCode::NOT_FOUND_GAME,
            AppError::InvalidState(_) => ErrorCode::INVALID_STATE_TRANSITION,
            AppError::ConcurrencyConflict(_) => ErrorCode::CONCURRENCY_CONFLICT,
            AppError::Unauthorized(_) => ErrorCode::UNAUTHORIZED_MISSING_PRINCIPAL,
            AppError::Database(_) => ErrorCode::PERSISTENCE_DATABASE,
            AppError::Redis(_) => ErrorCode::PERSISTENCE_EVENT_STREAM,
            AppError::Persistence(_) | AppError::Internal(_) => ErrorCode::PERSISTENCE_UNEXPECTED,
        }
    }

    /// Message safe to return to callers; storage internals stay in the logs
    fn public_message(&self) -> String {
        match self.category() {
            ErrorCategory::PersistenceFailure => {
                "A storage error occurred; the operation was rolled back".to_string()
            }
            ErrorCategory::ConcurrencyConflict => {
                "Another request for this account is in progress, please retry".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = error {
            if let Some(code) = db.code() {
                if TRANSIENT_SQLSTATES.contains(&&*code) {
                    return AppError::ConcurrencyConflict(format!("database reported {}", code));
                }
            }
        }
        if matches!(error, sqlx::Error::PoolTimedOut) {
            return AppError::ConcurrencyConflict("connection pool exhausted".to_string());
        }
        AppError::Database(error)
    }
}

impl From<ValidationError> for AppError {
    fn from(error: ValidationError) -> Self {
        AppError::Validation(error.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .map(|e| describe_field_error(e))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}: {}", field, detail)
            })
            .collect();
        fields.sort();
        AppError::Validation(format!("Invalid request: {}", fields.join("; ")))
    }
}

fn describe_field_error(error: &validator::ValidationError) -> String {
    let mut detail = error.code.to_string();
    let min = error.params.get("min").map(|v| v.to_string());
    let max = error.params.get("max").map(|v| v.to_string());
    match (min, max) {
        (Some(min), Some(max)) => detail.push_str(&format!(" (expected {}..={})", min, max)),
        (Some(min), None) => detail.push_str(&format!(" (expected >= {})", min)),
        (None, Some(max)) => detail.push_str(&format!(" (expected <= {})", max)),
        (None, None) => {}
    }
    detail
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let category = self.category();
        let code = self.code();

        match category.log_level() {
            "error" => {
                tracing::error!(error_code = %code, error = ?self, "Request failed in storage layer")
            }
            "warn" => tracing::warn!(error_code = %code, error = %self, "Request rejected"),
            _ => tracing::info!(error_code = %code, error = %self, "Request rejected"),
        }

        metrics::counter!(
            "errors_total",
            "category" => category.as_str(),
            "code" => code.as_str()
        )
        .increment(1);

        let status = StatusCode::from_u16(category.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let error = ServiceError::new(category, code, self.public_message());

        (status, Json(json!({ "error": error }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_and_codes() {
        let err = AppError::InsufficientBalance { required: 50, available: 10 };
        assert_eq!(err.category(), ErrorCategory::InsufficientBalance);
        assert_eq!(err.code(), ErrorCode::INSUFFICIENT_BALANCE);

        let err = AppError::invalid_state("game finished");
        assert_eq!(err.category().status_code(), 409);

        let err = AppError::Persistence("disk on fire".to_string());
        assert_eq!(err.category(), ErrorCategory::PersistenceFailure);
        assert!(!err.public_message().contains("disk"));
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AppError::ConcurrencyConflict(_)));
    }

    #[test]
    fn test_shared_validation_error_converts() {
        let err: AppError = shared::ClientSeed::try_from(String::new()).unwrap_err().into();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.to_string().contains("Client seed"));
    }

    #[tokio::test]
    async fn test_response_body_shape() {
        let response = AppError::Persistence("disk on fire".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "PERSISTENCE_UNEXPECTED");
        assert_eq!(body["error"]["category"], "PersistenceFailure");
        assert!(!body["error"]["message"].as_str().unwrap().contains("disk"));
    }

    #[test]
    fn test_response_status() {
        let response = AppError::not_found("Game abc not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::ConcurrencyConflict("busy".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
