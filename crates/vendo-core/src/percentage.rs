//! # Percentage Module
//!
//! A percentage in the closed range `[0, 100]`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

/// A validated percentage value.
///
/// Stored as the percentage itself (`10` means ten percent), not as a
/// fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percentage(Decimal);

impl Percentage {
    /// Zero percent.
    pub const ZERO: Percentage = Percentage(Decimal::ZERO);

    /// Creates a percentage, rejecting values outside `[0, 100]`.
    pub fn new(value: Decimal) -> CoreResult<Self> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(CoreError::PercentageOutOfRange(value));
        }
        Ok(Percentage(value))
    }

    /// Creates a whole-number percentage.
    pub fn whole(value: u32) -> CoreResult<Self> {
        Self::new(Decimal::from(value))
    }

    /// Whole-number percentage known to be in range at the call site.
    pub(crate) fn capped_whole(value: u8) -> Self {
        Percentage(Decimal::from(value.min(100)))
    }

    /// Returns the percentage value.
    #[inline]
    pub fn value(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns this share of `amount`.
    ///
    /// ## Example
    /// ```rust
    /// use vendo_core::{Money, Percentage};
    ///
    /// let ten = Percentage::whole(10).unwrap();
    /// assert_eq!(ten.apply_to(Money::whole(100)).unwrap(), Money::whole(10));
    /// ```
    pub fn apply_to(&self, amount: Money) -> CoreResult<Money> {
        amount.multiply(self.0 / Decimal::ONE_HUNDRED)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::ZERO
    }
}

impl TryFrom<Decimal> for Percentage {
    type Error = CoreError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Percentage::new(value)
    }
}

impl From<Percentage> for Decimal {
    fn from(percentage: Percentage) -> Self {
        percentage.0
    }
}
