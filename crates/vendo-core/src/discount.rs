//! # Discount Module
//!
//! Quantity-tiered line discounts.
//!
//! ## Rule Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Evaluated top to bottom, first match wins                              │
//! │                                                                         │
//! │  #  Rule                 Condition                    Outcome           │
//! │  ─  ───────────────────  ───────────────────────────  ───────────────   │
//! │  1  quantity-limit       qty > 20                     reject            │
//! │  2  no-discount          qty < 4 AND current > 0%     clear to 0%, flag │
//! │  3  ten-percent          4 <= qty <= 9                10%               │
//! │  4  twenty-percent       10 <= qty <= 20              20%               │
//! │     (no match)           1 <= qty <= 3                0%                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The limit rule sits first because it is a hard rejection, not a tier.
//!
//! ## Usage
//! ```rust
//! use vendo_core::discount::{evaluate, DiscountTier};
//! use vendo_core::Percentage;
//!
//! let matched = evaluate(12, Percentage::ZERO).unwrap();
//! assert_eq!(matched.tier, DiscountTier::TwentyPercent);
//! assert!(evaluate(21, Percentage::ZERO).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::percentage::Percentage;
use crate::{MAX_ITEM_QUANTITY, TEN_PERCENT_MIN_QUANTITY, TWENTY_PERCENT_MIN_QUANTITY};

// =============================================================================
// Tiers
// =============================================================================

/// The discount bucket a line falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountTier {
    /// 1 to 3 units.
    None,
    /// 4 to 9 units.
    TenPercent,
    /// 10 to 20 units.
    TwentyPercent,
}

impl DiscountTier {
    /// The percentage this tier grants.
    pub fn percentage(self) -> Percentage {
        match self {
            DiscountTier::None => Percentage::ZERO,
            DiscountTier::TenPercent => Percentage::capped_whole(10),
            DiscountTier::TwentyPercent => Percentage::capped_whole(20),
        }
    }
}

/// Result of running the rule table for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierMatch {
    pub tier: DiscountTier,
    /// True when the line carried a discount its quantity does not earn
    /// and the no-discount rule reset it.
    pub cleared_stale_discount: bool,
}

impl TierMatch {
    #[inline]
    pub fn percentage(&self) -> Percentage {
        self.tier.percentage()
    }
}

// =============================================================================
// Rule Table
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum RuleOutcome {
    Reject,
    ClearStale,
    Tier(DiscountTier),
}

#[derive(Debug, Clone, Copy)]
struct DiscountRule {
    applies: fn(u32, Percentage) -> bool,
    outcome: RuleOutcome,
}

fn exceeds_limit(quantity: u32, _current: Percentage) -> bool {
    quantity > MAX_ITEM_QUANTITY
}

fn carries_unearned_discount(quantity: u32, current: Percentage) -> bool {
    quantity < TEN_PERCENT_MIN_QUANTITY && !current.is_zero()
}

fn in_ten_percent_range(quantity: u32, _current: Percentage) -> bool {
    (TEN_PERCENT_MIN_QUANTITY..TWENTY_PERCENT_MIN_QUANTITY).contains(&quantity)
}

fn in_twenty_percent_range(quantity: u32, _current: Percentage) -> bool {
    (TWENTY_PERCENT_MIN_QUANTITY..=MAX_ITEM_QUANTITY).contains(&quantity)
}

const RULES: [DiscountRule; 4] = [
    DiscountRule {
        applies: exceeds_limit,
        outcome: RuleOutcome::Reject,
    },
    DiscountRule {
        applies: carries_unearned_discount,
        outcome: RuleOutcome::ClearStale,
    },
    DiscountRule {
        applies: in_ten_percent_range,
        outcome: RuleOutcome::Tier(DiscountTier::TenPercent),
    },
    DiscountRule {
        applies: in_twenty_percent_range,
        outcome: RuleOutcome::Tier(DiscountTier::TwentyPercent),
    },
];

/// Runs the rule table for a line of `quantity` units currently carrying
/// `current`.
///
/// ## Errors
/// - `ZeroQuantity` for a quantity of zero
/// - `QuantityLimitExceeded` above [`MAX_ITEM_QUANTITY`]
pub fn evaluate(quantity: u32, current: Percentage) -> CoreResult<TierMatch> {
    if quantity == 0 {
        return Err(CoreError::ZeroQuantity);
    }

    let matched = RULES
        .iter()
        .find(|rule| (rule.applies)(quantity, current))
        .map(|rule| rule.outcome);

    match matched {
        Some(RuleOutcome::Reject) => Err(CoreError::QuantityLimitExceeded {
            requested: quantity,
            max: MAX_ITEM_QUANTITY,
        }),
        Some(RuleOutcome::ClearStale) => Ok(TierMatch {
            tier: DiscountTier::None,
            cleared_stale_discount: true,
        }),
        Some(RuleOutcome::Tier(tier)) => Ok(TierMatch {
            tier,
            cleared_stale_discount: false,
        }),
        None => Ok(TierMatch {
            tier: DiscountTier::None,
            cleared_stale_discount: false,
        }),
    }
}

// =============================================================================
// Engine
// =============================================================================

/// A line that can be priced by the [`DiscountEngine`].
pub trait PricedLine {
    fn quantity(&self) -> u32;
    fn unit_price(&self) -> Money;
    fn discount(&self) -> Percentage;
    /// Stores the engine's result on the line.
    fn set_pricing(&mut self, discount: Percentage, total_amount: Money);
}

/// Stamps lines with their tier discount and recomputed total.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscountEngine;

impl DiscountEngine {
    /// Prices `line` in place.
    ///
    /// ## User Workflow
    /// ```text
    /// CartItem { qty: 5, unit_price: 100.00, discount: 0% }
    ///      │
    ///      ▼
    /// DiscountEngine::apply ← THIS FUNCTION
    ///      │
    ///      ▼
    /// CartItem { qty: 5, unit_price: 100.00, discount: 10%, total: 450.00 }
    /// ```
    ///
    /// On error the line is left untouched.
    pub fn apply<L: PricedLine + ?Sized>(line: &mut L) -> CoreResult<TierMatch> {
        let matched = evaluate(line.quantity(), line.discount())?;
        let discount = matched.percentage();
        let total = Self::line_total(line.unit_price(), discount, line.quantity())?;
        line.set_pricing(discount, total);
        Ok(matched)
    }

    /// `(unit_price - unit_price × discount) × quantity`, rounded to cents.
    pub fn line_total(unit_price: Money, discount: Percentage, quantity: u32) -> CoreResult<Money> {
        let markdown = discount.apply_to(unit_price)?;
        let net_unit = unit_price.subtract(markdown)?;
        Ok(net_unit.multiply_quantity(quantity)?.round_to_cents())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    struct Line {
        quantity: u32,
        unit_price: Money,
        discount: Percentage,
        total: Money,
    }

    impl PricedLine for Line {
        fn quantity(&self) -> u32 {
            self.quantity
        }
        fn unit_price(&self) -> Money {
            self.unit_price
        }
        fn discount(&self) -> Percentage {
            self.discount
        }
        fn set_pricing(&mut self, discount: Percentage, total_amount: Money) {
            self.discount = discount;
            self.total = total_amount;
        }
    }

    fn line(quantity: u32, unit: u32) -> Line {
        Line {
            quantity,
            unit_price: Money::whole(unit),
            discount: Percentage::ZERO,
            total: Money::ZERO,
        }
    }

    #[test]
    fn test_tier_boundaries() {
        for quantity in 1..=3 {
            assert_eq!(evaluate(quantity, Percentage::ZERO).unwrap().tier, DiscountTier::None);
        }
        for quantity in 4..=9 {
            assert_eq!(
                evaluate(quantity, Percentage::ZERO).unwrap().tier,
                DiscountTier::TenPercent
            );
        }
        for quantity in 10..=20 {
            assert_eq!(
                evaluate(quantity, Percentage::ZERO).unwrap().tier,
                DiscountTier::TwentyPercent
            );
        }
        for quantity in [21, 22, 100, u32::MAX] {
            assert_eq!(
                evaluate(quantity, Percentage::ZERO),
                Err(CoreError::QuantityLimitExceeded {
                    requested: quantity,
                    max: 20
                })
            );
        }
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        assert_eq!(evaluate(0, Percentage::ZERO), Err(CoreError::ZeroQuantity));
    }

    #[test]
    fn test_limit_wins_over_existing_discount() {
        let twenty = Percentage::whole(20).unwrap();
        assert!(matches!(
            evaluate(25, twenty),
            Err(CoreError::QuantityLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_stale_discount_is_cleared() {
        let ten = Percentage::whole(10).unwrap();
        let matched = evaluate(2, ten).unwrap();
        assert_eq!(matched.tier, DiscountTier::None);
        assert!(matched.cleared_stale_discount);
        assert!(matched.percentage().is_zero());

        // An earned discount is not flagged
        assert!(!evaluate(5, ten).unwrap().cleared_stale_discount);
    }

    #[test]
    fn test_engine_scenarios() {
        let mut two = line(2, 100);
        DiscountEngine::apply(&mut two).unwrap();
        assert!(two.discount.is_zero());
        assert_eq!(two.total, Money::whole(200));

        let mut five = line(5, 100);
        DiscountEngine::apply(&mut five).unwrap();
        assert_eq!(five.discount.value(), Decimal::from(10));
        assert_eq!(five.total, Money::whole(450));

        let mut fifteen = line(15, 100);
        DiscountEngine::apply(&mut fifteen).unwrap();
        assert_eq!(fifteen.discount.value(), Decimal::from(20));
        assert_eq!(fifteen.total, Money::whole(1200));
    }

    #[test]
    fn test_engine_leaves_rejected_line_untouched() {
        let mut too_many = line(21, 100);
        assert!(DiscountEngine::apply(&mut too_many).is_err());
        assert!(too_many.total.is_zero());
        assert!(too_many.discount.is_zero());
    }

    #[test]
    fn test_line_total_rounds_to_cents() {
        // 9.99 - 0.999 = 8.991 per unit, × 5 = 44.955 → 44.96 (half to even)
        let total = DiscountEngine::line_total(
            Money::from_cents(999),
            Percentage::whole(10).unwrap(),
            5,
        )
        .unwrap();
        assert_eq!(total.amount(), Decimal::new(4496, 2));
    }
}
