//! # Sale Numbers
//!
//! Receipt-style numbers: `{prefix}-{YYYYMMDD}-{12 hex}`.
//!
//! ```text
//! VND-20260314-3F2A9C01B7E4
//! ─┬─ ───┬──── ─────┬──────
//!  │     │          └── first 12 hex digits of a v4 UUID
//!  │     └── UTC date of issue
//!  └── configured prefix ([sales] number_prefix)
//! ```
//!
//! 48 random bits per day keep collisions out of reach for any realistic
//! volume; the unique index on `sales.number` catches the rest as a
//! conflict.

use chrono::Utc;
use uuid::Uuid;

use vendo_core::validation::validate_number_prefix;

use crate::error::ServiceResult;
use crate::ports::SaleNumberGenerator;

pub const DEFAULT_PREFIX: &str = "VND";

const RANDOM_DIGITS: usize = 12;

#[derive(Debug, Clone)]
pub struct ReceiptNumberGenerator {
    prefix: String,
}

impl ReceiptNumberGenerator {
    /// ## Errors
    /// `Validation` unless the prefix is 1-10 ASCII letters or digits.
    pub fn new(prefix: impl Into<String>) -> ServiceResult<Self> {
        let prefix = prefix.into();
        validate_number_prefix(&prefix)?;
        Ok(ReceiptNumberGenerator { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for ReceiptNumberGenerator {
    fn default() -> Self {
        ReceiptNumberGenerator {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl SaleNumberGenerator for ReceiptNumberGenerator {
    fn next_number(&self) -> String {
        let mut random = Uuid::new_v4().simple().to_string();
        random.truncate(RANDOM_DIGITS);

        format!(
            "{}-{}-{}",
            self.prefix,
            Utc::now().format("%Y%m%d"),
            random.to_uppercase()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_number_format() {
        let generator = ReceiptNumberGenerator::new("SHOP1").unwrap();
        let number = generator.next_number();
        let parts: Vec<&str> = number.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "SHOP1");
        assert_eq!(parts[1], Utc::now().format("%Y%m%d").to_string());
        assert_eq!(parts[2].len(), 12);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_numbers_are_unique() {
        let generator = ReceiptNumberGenerator::default();
        let numbers: HashSet<String> = (0..1000).map(|_| generator.next_number()).collect();
        assert_eq!(numbers.len(), 1000);
    }

    #[test]
    fn test_invalid_prefix() {
        assert!(ReceiptNumberGenerator::new("").is_err());
        assert!(ReceiptNumberGenerator::new("BAD-PREFIX").is_err());
        assert_eq!(ReceiptNumberGenerator::default().prefix(), DEFAULT_PREFIX);
    }
}
