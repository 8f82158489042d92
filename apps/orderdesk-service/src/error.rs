//! # Service Error Type
//!
//! Unified error type for every service operation.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in OrderDesk                              │
//! │                                                                         │
//! │  CoreError ──────────────────────────────► ServiceError::Core           │
//! │  (pricing, draft, status rules)                                         │
//! │                                                                         │
//! │  DbError::NotFound ──────────────────────► ServiceError::NotFound       │
//! │  DbError::VersionConflict ───────────────► ConcurrentWriteConflict      │
//! │  DbError::ConnectionFailed/PoolExhausted ► UpstreamUnavailable          │
//! │  any other DbError ──────────────────────► ServiceError::Storage        │
//! │                                                                         │
//! │  ConfigError ────────────────────────────► ServiceError::Config         │
//! │                                                                         │
//! │  ServiceError::code() ───────────────────► ErrorCode for callers        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invoicing failures never become a `ServiceError`: they are logged and
//! the order stands.

use orderdesk_core::CoreError;
use orderdesk_db::DbError;
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by the services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A pricing, composition or status rule was violated.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The addressed entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The actor may not perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Someone else wrote the order between our read and our write.
    #[error("Order {id} was modified concurrently; reload and retry")]
    ConcurrentWriteConflict { id: String },

    /// The store or a remote collaborator could not be reached.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Any other storage failure.
    #[error("Storage error: {0}")]
    Storage(DbError),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Machine-readable error codes.
///
/// ## Serialization
/// ```json
/// { "code": "CONFLICT", "message": "Order 42 was modified concurrently; reload and retry" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Business rule violated (422)
    BusinessLogic,

    /// Actor not allowed (403)
    Forbidden,

    /// Optimistic lock lost (409)
    Conflict,

    /// Store or collaborator unreachable (503)
    UpstreamUnavailable,

    /// Storage operation failed (500)
    DatabaseError,

    /// Bad configuration (500)
    ConfigError,
}

impl ServiceError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// The code callers should branch on.
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Core(err) => match err {
                CoreError::ProductNotFound(_) | CoreError::VariationNotFound { .. } => {
                    ErrorCode::NotFound
                }
                CoreError::InvalidQuantity(_)
                | CoreError::QuantityTooLarge { .. }
                | CoreError::UnknownStatus(_)
                | CoreError::Validation(_) => ErrorCode::ValidationError,
                CoreError::NoPriceDefined { .. }
                | CoreError::TooManyLines { .. }
                | CoreError::LineNotFound { .. }
                | CoreError::EmptyOrder
                | CoreError::MissingCustomer
                | CoreError::InvalidStatusTransition { .. } => ErrorCode::BusinessLogic,
            },
            ServiceError::NotFound { .. } => ErrorCode::NotFound,
            ServiceError::Forbidden(_) => ErrorCode::Forbidden,
            ServiceError::ConcurrentWriteConflict { .. } => ErrorCode::Conflict,
            ServiceError::UpstreamUnavailable(_) => ErrorCode::UpstreamUnavailable,
            ServiceError::Storage(_) => ErrorCode::DatabaseError,
            ServiceError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// Serializable form for callers outside the process.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// What a caller receives when an operation fails.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DbError::VersionConflict { id, .. } => ServiceError::ConcurrentWriteConflict { id },
            DbError::Validation(err) => ServiceError::Core(CoreError::Validation(err)),
            err if err.is_unavailable() => ServiceError::UpstreamUnavailable(err.to_string()),
            err => {
                tracing::error!(error = %err, "Storage operation failed");
                ServiceError::Storage(err)
            }
        }
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_are_categorized() {
        let err: ServiceError = DbError::VersionConflict {
            id: "o-1".into(),
            expected: 3,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::Conflict);

        let err: ServiceError = DbError::PoolExhausted.into();
        assert_eq!(err.code(), ErrorCode::UpstreamUnavailable);

        let err: ServiceError = DbError::not_found("Order", "o-1").into();
        assert!(matches!(err, ServiceError::NotFound { .. }));

        let err: ServiceError = DbError::QueryFailed("syntax".into()).into();
        assert_eq!(err.code(), ErrorCode::DatabaseError);

        let err: ServiceError = DbError::Validation(orderdesk_core::ValidationError::Required {
            field: "name".into(),
        })
        .into();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_core_errors_are_categorized() {
        let err = ServiceError::from(CoreError::EmptyOrder);
        assert_eq!(err.code(), ErrorCode::BusinessLogic);

        let err = ServiceError::from(CoreError::InvalidQuantity(0));
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = ServiceError::from(CoreError::ProductNotFound("p".into()));
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_response_serializes_screaming_snake_case() {
        let response = ServiceError::ConcurrentWriteConflict { id: "o-1".into() }.to_response();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], "CONFLICT");
        assert!(json["message"].as_str().unwrap().contains("o-1"));
    }
}
