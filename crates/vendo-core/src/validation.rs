//! # Validation Module
//!
//! Structural input checks that run before any lookup or write.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (structural)                                     │
//! │  ├── ids positive, quantity in 1..=20                                  │
//! │  └── text present and bounded                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Aggregates (business rules)                                  │
//! │  ├── cart status, duplicate products                                   │
//! │  └── discount tiers, non-negative money                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (cart_id, product_id)                                      │
//! │  ├── one active cart per user (partial unique index)                   │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vendo_core::validation::{validate_id, validate_quantity};
//!
//! validate_id("cart_id", 12).unwrap();
//! assert_eq!(validate_quantity(5).unwrap(), 5u32);
//! assert!(validate_quantity(21).is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates that an id is present and positive.
///
/// `0` is the "not yet stored" marker, so it is never a valid reference.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a requested line quantity and narrows it to `u32`.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Add Item                                                         │
/// │                                                                         │
/// │  User enters quantity: 5                                               │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0?  → Error: "quantity must be positive"              │
/// │       │                                                                 │
/// │       ├── qty > 20?  → Error: "quantity must be between 1 and 20"      │
/// │       │                                                                 │
/// │       └── OK → Proceed with add_item                                   │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<u32> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    let max = i64::from(MAX_ITEM_QUANTITY);
    if qty > max {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max,
        });
    }

    u32::try_from(qty).map_err(|_| ValidationError::OutOfRange {
        field: "quantity".to_string(),
        min: 1,
        max,
    })
}

/// Validates a unit price.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use vendo_core::validation::validate_price;
///
/// assert!(validate_price(Decimal::new(1099, 2)).is_ok());
/// assert!(validate_price(Decimal::ZERO).is_ok());     // Free item
/// assert!(validate_price(Decimal::from(-1)).is_err());
/// ```
pub fn validate_price(price: Decimal) -> ValidationResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::InvalidFormat {
            field: "price".to_string(),
            reason: "cannot be negative".to_string(),
        });
    }
    if price.scale() > 2 {
        return Err(ValidationError::InvalidFormat {
            field: "price".to_string(),
            reason: "at most two decimal places".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product title: required, at most 200 characters.
pub fn validate_title(title: &str) -> ValidationResult<()> {
    validate_text("title", title, 200)
}

/// Validates a branch or user name: required, at most 100 characters.
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    validate_text(field, name, 100)
}

/// Minimal email shape check: one `@` with text on both sides.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    validate_text("email", email, 254)?;

    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain.tld".to_string(),
        }),
    }
}

/// Validates the prefix used for sale numbers.
///
/// ## Rules
/// - 1 to 10 characters
/// - ASCII letters and digits only (the number itself adds the hyphens)
pub fn validate_number_prefix(prefix: &str) -> ValidationResult<()> {
    validate_text("number_prefix", prefix, 10)?;

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "number_prefix".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("cart_id", 1).is_ok());
        assert_eq!(
            validate_id("branch_id", 0),
            Err(ValidationError::MustBePositive {
                field: "branch_id".to_string()
            })
        );
        assert!(validate_id("cart_id", -5).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert_eq!(validate_quantity(1).unwrap(), 1);
        assert_eq!(validate_quantity(20).unwrap(), 20);

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(matches!(
            validate_quantity(21),
            Err(ValidationError::OutOfRange { max: 20, .. })
        ));
        assert!(validate_quantity(i64::MAX).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Decimal::new(1099, 2)).is_ok());
        assert!(validate_price(Decimal::new(-1, 2)).is_err());
        assert!(validate_price(Decimal::new(1, 3)).is_err());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Espresso Beans 1kg").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ana@localhost").is_err());
    }

    #[test]
    fn test_validate_number_prefix() {
        assert!(validate_number_prefix("VND").is_ok());
        assert!(validate_number_prefix("").is_err());
        assert!(validate_number_prefix("V-N").is_err());
        assert!(validate_number_prefix("ABCDEFGHIJK").is_err());
    }
}
