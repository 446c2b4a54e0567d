//! # Money Module
//!
//! Provides the `Money` type: a non-negative decimal amount.
//!
//! ## Why a Guarded Decimal?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE TWO WAYS AN INVOICE GOES WRONG                                     │
//! │                                                                         │
//! │  Binary floating point:                                                 │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  Unchecked subtraction:                                                 │
//! │    line total 10.00 - discount 12.00 = -2.00  ❌                        │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal + checked operations                        │
//! │    Base-10 arithmetic, and every operation that could go below zero    │
//! │    returns an error instead of a value                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use vendo_core::money::Money;
//!
//! let price = Money::new(Decimal::new(1099, 2)).unwrap(); // 10.99
//! let doubled = price.multiply_quantity(2).unwrap();      // 21.98
//! assert_eq!(doubled.amount(), Decimal::new(2198, 2));
//!
//! // Going negative is an error, never a clamp
//! assert!(price.subtract(doubled).is_err());
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount that is never negative.
///
/// ## Where Money is Used
/// ```text
/// Product.price ──► CartItem.unit_price ──► CartItem.total_amount
///                                                  │
///                                                  ▼
///                   SaleItem.total_amount ──► Sale.total_amount
/// ```
///
/// Every amount in the system flows through this type, so no line item or
/// sale total can become negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero money value.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Creates a Money value, rejecting negative amounts.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use vendo_core::money::Money;
    ///
    /// assert!(Money::new(Decimal::from(5)).is_ok());
    /// assert!(Money::new(Decimal::from(-5)).is_err());
    /// ```
    pub fn new(amount: Decimal) -> CoreResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(CoreError::NegativeAmount(amount));
        }
        Ok(Money(amount))
    }

    /// Creates a Money value from whole currency units.
    #[inline]
    pub fn whole(units: u32) -> Self {
        Money(Decimal::from(units))
    }

    /// Creates a Money value from cents (two decimal places).
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use vendo_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.amount(), Decimal::new(1099, 2));
    /// ```
    #[inline]
    pub fn from_cents(cents: u32) -> Self {
        Money(Decimal::new(i64::from(cents), 2))
    }

    /// Returns the underlying amount.
    #[inline]
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Adds two amounts.
    pub fn add(self, other: Money) -> CoreResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(CoreError::Overflow)
    }

    /// Subtracts `other`, failing if the result would be negative.
    ///
    /// ## Example
    /// ```rust
    /// use vendo_core::money::Money;
    ///
    /// let a = Money::whole(10);
    /// let b = Money::whole(4);
    /// assert_eq!(a.subtract(b).unwrap(), Money::whole(6));
    /// assert!(b.subtract(a).is_err());
    /// ```
    pub fn subtract(self, other: Money) -> CoreResult<Money> {
        if other.0 > self.0 {
            return Err(CoreError::NegativeDifference {
                minuend: self.0,
                subtrahend: other.0,
            });
        }
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or(CoreError::Overflow)
    }

    /// Multiplies by a non-negative factor.
    pub fn multiply(self, factor: Decimal) -> CoreResult<Money> {
        if factor.is_sign_negative() && !factor.is_zero() {
            return Err(CoreError::NegativeMultiplier(factor));
        }
        self.0
            .checked_mul(factor)
            .map(Money)
            .ok_or(CoreError::Overflow)
    }

    /// Multiplies by a line quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Net unit price: 90.00
    /// Quantity: 5
    ///      │
    ///      ▼
    /// multiply_quantity(5) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line Total: 450.00
    /// ```
    pub fn multiply_quantity(self, qty: u32) -> CoreResult<Money> {
        self.multiply(Decimal::from(qty))
    }

    /// Rounds to two decimal places using Bankers Rounding
    /// (round half to even).
    ///
    /// ```text
    /// 0.125 → 0.12    0.135 → 0.14    (no systematic upward bias)
    /// ```
    pub fn round_to_cents(self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven),
        )
    }

    /// Sums a sequence of amounts.
    pub fn total<I>(amounts: I) -> CoreResult<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.add(amount))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount with two decimals. Currency formatting belongs to the
/// presentation layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

impl TryFrom<Decimal> for Money {
    type Error = CoreError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Money::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
