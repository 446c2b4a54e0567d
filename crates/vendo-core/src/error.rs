//! # Error Types
//!
//! Domain-specific error types for vendo-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vendo-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule / invariant violations           │
//! │  └── ValidationError  - Structural input failures                      │
//! │                                                                         │
//! │  vendo-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  vendo-service errors                                                  │
//! │  └── ServiceError     - What callers see (with an ErrorCode)           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → request layer      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the value objects and aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A monetary amount below zero was constructed.
    #[error("Monetary amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    /// Subtraction would have produced a negative amount.
    #[error("Cannot subtract {subtrahend} from {minuend}: result would be negative")]
    NegativeDifference { minuend: Decimal, subtrahend: Decimal },

    /// Money was multiplied by a negative factor.
    #[error("Multiplier cannot be negative: {0}")]
    NegativeMultiplier(Decimal),

    /// Arithmetic exceeded the decimal range.
    #[error("Monetary arithmetic overflowed")]
    Overflow,

    /// Percentage outside `[0, 100]`.
    #[error("Percentage must be between 0 and 100, got {0}")]
    PercentageOutOfRange(Decimal),

    /// Line quantity above the per-line maximum.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 21)
    ///      │
    ///      ▼
    /// Discount rules: limit check runs first
    ///      │
    ///      ▼
    /// QuantityLimitExceeded { requested: 21, max: 20 }
    ///      │
    ///      ▼
    /// Cart unchanged
    /// ```
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityLimitExceeded { requested: u32, max: u32 },

    /// Quantity of zero reached the pricing rules.
    #[error("Quantity must be positive")]
    ZeroQuantity,

    /// The product already has a line in this cart.
    #[error("Product {product_id} is already in cart {cart_id}")]
    DuplicateProduct { cart_id: i64, product_id: i64 },

    /// The cart is not in a status that allows the operation.
    #[error("Cart {cart_id} is {status}, cannot perform operation")]
    InvalidCartStatus { cart_id: i64, status: String },

    /// Conversion requested for a cart with nothing left to sell.
    #[error("Cart {cart_id} has no active items")]
    EmptyCart { cart_id: i64 },

    /// No line for the product in the cart.
    #[error("Product {product_id} is not in cart {cart_id}")]
    CartItemNotFound { cart_id: i64, product_id: i64 },

    /// No item with this id in the sale.
    #[error("Item {item_id} not found in sale {sale_id}")]
    SaleItemNotFound { sale_id: i64, item_id: i64 },

    /// Cancellation is one-way and already happened.
    #[error("{entity} {id} is already canceled")]
    AlreadyCanceled { entity: String, id: i64 },

    /// Unrecognised cart status text.
    #[error("Unknown cart status: '{0}'")]
    UnknownCartStatus(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an AlreadyCanceled error for a given entity type and ID.
    pub fn already_canceled(entity: impl Into<String>, id: i64) -> Self {
        CoreError::AlreadyCanceled {
            entity: entity.into(),
            id,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any lookup or write happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
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

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
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
        let err = CoreError::QuantityLimitExceeded {
            requested: 21,
            max: 20,
        };
        assert_eq!(err.to_string(), "Quantity 21 exceeds maximum allowed (20)");

        let err = CoreError::DuplicateProduct {
            cart_id: 3,
            product_id: 9,
        };
        assert_eq!(err.to_string(), "Product 9 is already in cart 3");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "cart_id".to_string(),
        };
        assert_eq!(err.to_string(), "cart_id must be positive");

        let err = ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: 20,
        };
        assert_eq!(err.to_string(), "quantity must be between 1 and 20");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "title".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
