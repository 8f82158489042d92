//! # Error Types
//!
//! Domain-specific error types for orderdesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  orderdesk-core errors (this file)                                      │
//! │  ├── CoreError        - Pricing, draft and status rule failures         │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  orderdesk-db errors (separate crate)                                   │
//! │  └── DbError          - Storage operation failures                      │
//! │                                                                         │
//! │  orderdesk-service errors                                               │
//! │  └── ServiceError     - What callers see (with an ErrorCode)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → Portal             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure here is local: it aborts the single resolve / add / finalize
//! call that raised it and leaves the draft exactly as it was.

use thiserror::Error;

use crate::status::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The selector points past the product's variation list.
    ///
    /// ## When This Occurs
    /// - A cart kept a variation index after the admin removed a variation
    /// - A stale override key was replayed
    #[error("Variation {index} not found for product {product_id} ({available} available)")]
    VariationNotFound {
        product_id: String,
        index: usize,
        available: usize,
    },

    /// Neither an override nor a catalog price applies.
    #[error("No price defined for product {product_id} (variation {variation})")]
    NoPriceDefined { product_id: String, variation: i64 },

    /// Line quantity below 1.
    #[error("Invalid quantity {0}: must be at least 1")]
    InvalidQuantity(i64),

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Draft has exceeded the maximum number of lines.
    #[error("Order cannot have more than {max} lines")]
    TooManyLines { max: usize },

    /// No line at that position in the draft.
    #[error("Line {index} not found (draft has {len} lines)")]
    LineNotFound { index: usize, len: usize },

    /// Finalize was called on a draft without lines.
    #[error("Cannot finalize an empty order")]
    EmptyOrder,

    /// Finalize was called without a customer reference.
    #[error("Cannot finalize an order without a customer")]
    MissingCustomer,

    /// Status change not allowed by the state machine.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Status text that is not one of the six canonical statuses.
    #[error("Unknown order status: {0:?}")]
    UnknownStatus(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic runs, mostly on admin writes.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Duplicate value (e.g., two variations with one name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::VariationNotFound {
            product_id: "p-oil".to_string(),
            index: 4,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Variation 4 not found for product p-oil (2 available)"
        );

        let err = CoreError::InvalidStatusTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Processing,
        };
        assert_eq!(
            err.to_string(),
            "Cannot change order status from completed to processing"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "customer_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
