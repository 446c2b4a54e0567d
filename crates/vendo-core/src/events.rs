//! # Sale Events
//!
//! Outbound notifications produced by the sale workflows.
//!
//! Events are plain values: the orchestration returns them to its caller
//! and hands them to an announcer, in the order they occurred.
//!
//! ```text
//! convert cart      → SaleCreated
//! cancel sale       → SaleCanceled
//! cancel sale item  → SaleItemCanceled, SaleModified
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::sale::{Sale, SaleItem};

/// A notification about a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SaleEvent {
    SaleCreated {
        sale_id: i64,
        number: String,
        user_id: i64,
        branch_id: i64,
        total_amount: Money,
        occurred_at: DateTime<Utc>,
    },
    SaleModified {
        sale_id: i64,
        total_amount: Money,
        occurred_at: DateTime<Utc>,
    },
    SaleCanceled {
        sale_id: i64,
        number: String,
        occurred_at: DateTime<Utc>,
    },
    SaleItemCanceled {
        sale_id: i64,
        item_id: i64,
        product_id: i64,
        occurred_at: DateTime<Utc>,
    },
}

impl SaleEvent {
    pub fn created(sale: &Sale) -> Self {
        SaleEvent::SaleCreated {
            sale_id: sale.id,
            number: sale.number.clone(),
            user_id: sale.user_id,
            branch_id: sale.branch_id,
            total_amount: sale.total_amount,
            occurred_at: sale.created_at,
        }
    }

    pub fn modified(sale: &Sale) -> Self {
        SaleEvent::SaleModified {
            sale_id: sale.id,
            total_amount: sale.total_amount,
            occurred_at: sale.updated_at,
        }
    }

    pub fn canceled(sale: &Sale) -> Self {
        SaleEvent::SaleCanceled {
            sale_id: sale.id,
            number: sale.number.clone(),
            occurred_at: sale.canceled_at.unwrap_or(sale.updated_at),
        }
    }

    pub fn item_canceled(item: &SaleItem) -> Self {
        SaleEvent::SaleItemCanceled {
            sale_id: item.sale_id,
            item_id: item.id,
            product_id: item.product_id,
            occurred_at: item.canceled_at.unwrap_or(item.updated_at),
        }
    }

    /// Stable name used as the outbox `event_type` column.
    pub fn event_type(&self) -> &'static str {
        match self {
            SaleEvent::SaleCreated { .. } => "sale_created",
            SaleEvent::SaleModified { .. } => "sale_modified",
            SaleEvent::SaleCanceled { .. } => "sale_canceled",
            SaleEvent::SaleItemCanceled { .. } => "sale_item_canceled",
        }
    }

    pub fn sale_id(&self) -> i64 {
        match self {
            SaleEvent::SaleCreated { sale_id, .. }
            | SaleEvent::SaleModified { sale_id, .. }
            | SaleEvent::SaleCanceled { sale_id, .. }
            | SaleEvent::SaleItemCanceled { sale_id, .. } => *sale_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SaleEvent::SaleCreated { occurred_at, .. }
            | SaleEvent::SaleModified { occurred_at, .. }
            | SaleEvent::SaleCanceled { occurred_at, .. }
            | SaleEvent::SaleItemCanceled { occurred_at, .. } => *occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{Cart, CartItem};

    fn sale() -> Sale {
        let mut cart = Cart::new(5);
        cart.add_item(CartItem::priced(9, Money::whole(100), 2).unwrap())
            .unwrap();
        let mut sale = Sale::from_cart(&cart, 2, "VND-20260101-abc").unwrap();
        sale.id = 42;
        sale
    }

    #[test]
    fn test_serialized_tag_matches_event_type() {
        let event = SaleEvent::created(&sale());
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["sale_id"], 42);
        let total: rust_decimal::Decimal = json["total_amount"].as_str().unwrap().parse().unwrap();
        assert_eq!(total, rust_decimal::Decimal::from(200));
    }

    #[test]
    fn test_json_round_trip() {
        let event = SaleEvent::modified(&sale());
        let json = serde_json::to_string(&event).unwrap();
        let back: SaleEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.sale_id(), 42);
    }

    #[test]
    fn test_canceled_uses_cancellation_time() {
        let mut sale = sale();
        sale.cancel().unwrap();
        let event = SaleEvent::canceled(&sale);
        assert_eq!(Some(event.occurred_at()), sale.canceled_at);
        assert_eq!(event.event_type(), "sale_canceled");
    }
}
