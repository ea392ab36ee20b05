/// Shared error types for the casino services
///
/// Design Philosophy:
/// - Standardized error codes for consistent error handling across services
/// - Categorized by failure kind (Validation, InsufficientBalance, NotFound,
///   InvalidState, ConcurrencyConflict, PersistenceFailure)
/// - The wire body carries a machine-readable category and code plus a
///   human-readable message, never internal diagnostics
///
/// Usage:
/// - The backend maps its `AppError` into a `ServiceError` when responding
/// - Error codes follow pattern: <CATEGORY>_<SPECIFIC>
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error categories that map to HTTP status codes and logging severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Malformed or out-of-range input (400 Bad Request)
    /// Rejected before any mutation
    Validation,

    /// Derived balance below the requested debit (400 Bad Request)
    InsufficientBalance,

    /// Resource missing or not owned by the caller (404 Not Found)
    NotFound,

    /// Operation against a game in the wrong status (409 Conflict)
    InvalidState,

    /// Per-user critical section contended after one retry (503)
    ConcurrencyConflict,

    /// Store failure; the unit of work was rolled back (500)
    PersistenceFailure,

    /// Missing authenticated principal (401)
    Unauthorized,
}

impl ErrorCategory {
    /// Map error category to HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCategory::Validation => 400,
            ErrorCategory::InsufficientBalance => 400,
            ErrorCategory::NotFound => 404,
            ErrorCategory::InvalidState => 409,
            ErrorCategory::ConcurrencyConflict => 503,
            ErrorCategory::PersistenceFailure => 500,
            ErrorCategory::Unauthorized => 401,
        }
    }

    /// Map error category to log level
    pub fn log_level(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "warn",
            ErrorCategory::InsufficientBalance => "info",
            ErrorCategory::NotFound => "info",
            ErrorCategory::InvalidState => "warn",
            ErrorCategory::ConcurrencyConflict => "warn",
            ErrorCategory::PersistenceFailure => "error",
            ErrorCategory::Unauthorized => "warn",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "Validation",
            ErrorCategory::InsufficientBalance => "InsufficientBalance",
            ErrorCategory::NotFound => "NotFound",
            ErrorCategory::InvalidState => "InvalidState",
            ErrorCategory::ConcurrencyConflict => "ConcurrencyConflict",
            ErrorCategory::PersistenceFailure => "PersistenceFailure",
            ErrorCategory::Unauthorized => "Unauthorized",
        }
    }
}

/// Standard error codes used across all services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    // Validation errors
    pub const VALIDATION_INVALID_INPUT: ErrorCode = ErrorCode("VALIDATION_INVALID_INPUT");
    pub const VALIDATION_MISSING_FIELD: ErrorCode = ErrorCode("VALIDATION_MISSING_FIELD");
    pub const VALIDATION_INVALID_AMOUNT: ErrorCode = ErrorCode("VALIDATION_INVALID_AMOUNT");
    pub const VALIDATION_IDEMPOTENCY_KEY_REUSED: ErrorCode =
        ErrorCode("VALIDATION_IDEMPOTENCY_KEY_REUSED");

    // Balance errors
    pub const INSUFFICIENT_BALANCE: ErrorCode = ErrorCode("INSUFFICIENT_BALANCE");

    // Resource errors
    pub const NOT_FOUND_GAME: ErrorCode = ErrorCode("NOT_FOUND_GAME");
    pub const NOT_FOUND_SEED: ErrorCode = ErrorCode("NOT_FOUND_SEED");

    // State machine errors
    pub const INVALID_STATE_GAME_FINISHED: ErrorCode = ErrorCode("INVALID_STATE_GAME_FINISHED");
    pub const INVALID_STATE_TRANSITION: ErrorCode = ErrorCode("INVALID_STATE_TRANSITION");

    // Transient errors
    pub const CONCURRENCY_CONFLICT: ErrorCode = ErrorCode("CONCURRENCY_CONFLICT");
    pub const PERSISTENCE_DATABASE: ErrorCode = ErrorCode("PERSISTENCE_DATABASE");
    pub const PERSISTENCE_EVENT_STREAM: ErrorCode = ErrorCode("PERSISTENCE_EVENT_STREAM");
    pub const PERSISTENCE_UNEXPECTED: ErrorCode = ErrorCode("PERSISTENCE_UNEXPECTED");

    // Identity errors
    pub const UNAUTHORIZED_MISSING_PRINCIPAL: ErrorCode =
        ErrorCode("UNAUTHORIZED_MISSING_PRINCIPAL");

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Standardized error body returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceError {
    /// Structured error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Error category (determines status code and log level)
    pub category: ErrorCategory,
}

impl ServiceError {
    pub fn new(category: ErrorCategory, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_string(),
            message: message.into(),
            category,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ServiceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_status_codes() {
        assert_eq!(ErrorCategory::Validation.status_code(), 400);
        assert_eq!(ErrorCategory::InsufficientBalance.status_code(), 400);
        assert_eq!(ErrorCategory::NotFound.status_code(), 404);
        assert_eq!(ErrorCategory::InvalidState.status_code(), 409);
        assert_eq!(ErrorCategory::ConcurrencyConflict.status_code(), 503);
        assert_eq!(ErrorCategory::PersistenceFailure.status_code(), 500);
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(ErrorCategory::PersistenceFailure.log_level(), "error");
        assert_eq!(ErrorCategory::ConcurrencyConflict.log_level(), "warn");
        assert_eq!(ErrorCategory::NotFound.log_level(), "info");
    }

    #[test]
    fn test_service_error_serialization() {
        let error = ServiceError::new(
            ErrorCategory::NotFound,
            ErrorCode::NOT_FOUND_GAME,
            "Game not found: abc-123",
        );
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], "NOT_FOUND_GAME");
        assert_eq!(json["category"], "NotFound");
        assert!(json["message"].as_str().unwrap().contains("abc-123"));
    }

    #[test]
    fn test_service_error_display() {
        let error = ServiceError::new(
            ErrorCategory::InsufficientBalance,
            ErrorCode::INSUFFICIENT_BALANCE,
            "Insufficient balance",
        );
        assert_eq!(error.to_string(), "[INSUFFICIENT_BALANCE] Insufficient balance");
    }
}
