use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical order shape used by every aggregation. Produced from the Square
/// wire payload by [`Order::from_wire`], which is the only place that deals
/// with the provider's optional/alternative fields.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub state: OrderState,
    pub customer_id: Option<String>,
    pub location_id: Option<String>,
    /// Total in the currency's minor unit (cents).
    pub total_minor: i64,
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price_minor: i64,
    pub total_minor: i64,
    pub catalog_object_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    Completed,
    Open,
    Canceled,
    Draft,
    Unknown,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Completed => "completed",
            OrderState::Open => "open",
            OrderState::Canceled => "canceled",
            OrderState::Draft => "draft",
            OrderState::Unknown => "unknown",
        }
    }

    fn from_wire(s: Option<&str>) -> Self {
        match s {
            Some("COMPLETED") => OrderState::Completed,
            Some("OPEN") => OrderState::Open,
            Some("CANCELED") => OrderState::Canceled,
            Some("DRAFT") => OrderState::Draft,
            _ => OrderState::Unknown,
        }
    }
}

// ============ SQUARE WIRE TYPES ============

#[derive(Debug, Deserialize)]
pub struct SquareOrder {
    pub id: String,
    pub created_at: Option<String>,
    pub state: Option<String>,
    pub customer_id: Option<String>,
    pub location_id: Option<String>,
    pub total_money: Option<Money>,
    #[serde(default)]
    pub line_items: Vec<SquareLineItem>,
}

#[derive(Debug, Deserialize)]
pub struct SquareLineItem {
    pub name: Option<String>,
    pub variation_name: Option<String>,
    pub catalog_object_id: Option<String>,
    /// Square sends quantity as a decimal string, e.g. "2".
    pub quantity: Option<String>,
    pub base_price_money: Option<Money>,
    pub total_money: Option<Money>,
    pub variation_total_price_money: Option<Money>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Money {
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

fn amount(money: &Option<Money>) -> Option<i64> {
    money.as_ref().and_then(|m| m.amount)
}

impl Order {
    /// Normalize a Square order. Returns `None` when the payload carries no
    /// usable `created_at`, since every aggregation buckets by that field.
    pub fn from_wire(wire: SquareOrder) -> Option<Self> {
        let created_at = wire.created_at.as_deref()?;
        let created_at = match DateTime::parse_from_rfc3339(created_at) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(err) => {
                tracing::warn!("Skipping order {} with bad created_at: {}", wire.id, err);
                return None;
            }
        };

        Some(Self {
            id: wire.id,
            created_at,
            state: OrderState::from_wire(wire.state.as_deref()),
            customer_id: wire.customer_id,
            location_id: wire.location_id,
            total_minor: amount(&wire.total_money).unwrap_or(0),
            line_items: wire.line_items.into_iter().map(LineItem::from_wire).collect(),
        })
    }
}

impl LineItem {
    fn from_wire(wire: SquareLineItem) -> Self {
        // Item name is populated inconsistently across catalog and ad-hoc
        // items; resolve the whole fallback chain here so nothing downstream
        // has to care.
        let name = wire
            .name
            .or(wire.variation_name)
            .or_else(|| wire.catalog_object_id.clone())
            .unwrap_or_else(|| "Unknown Item".to_string());

        let quantity = wire
            .quantity
            .as_deref()
            .and_then(|q| q.parse::<f64>().ok())
            .map(|q| q.round() as u32)
            .filter(|&q| q > 0)
            .unwrap_or(1);

        // Prefer the line's own total over recomputing from the unit price:
        // modifiers and discounts make them legitimately differ.
        let total_minor = amount(&wire.total_money)
            .or_else(|| amount(&wire.base_price_money).map(|unit| unit * quantity as i64))
            .or_else(|| amount(&wire.variation_total_price_money))
            .unwrap_or(0);

        let unit_price_minor =
            amount(&wire.base_price_money).unwrap_or(total_minor / quantity as i64);

        Self {
            name,
            quantity,
            unit_price_minor,
            total_minor,
            catalog_object_id: wire.catalog_object_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(amount: i64) -> Option<Money> {
        Some(Money {
            amount: Some(amount),
            currency: Some("USD".to_string()),
        })
    }

    fn wire_item() -> SquareLineItem {
        SquareLineItem {
            name: None,
            variation_name: None,
            catalog_object_id: None,
            quantity: None,
            base_price_money: None,
            total_money: None,
            variation_total_price_money: None,
        }
    }

    #[test]
    fn name_falls_back_through_the_chain() {
        let item = LineItem::from_wire(SquareLineItem {
            variation_name: Some("Large".to_string()),
            ..wire_item()
        });
        assert_eq!(item.name, "Large");

        let item = LineItem::from_wire(SquareLineItem {
            catalog_object_id: Some("CAT123".to_string()),
            ..wire_item()
        });
        assert_eq!(item.name, "CAT123");

        let item = LineItem::from_wire(wire_item());
        assert_eq!(item.name, "Unknown Item");

        // Explicit name always wins.
        let item = LineItem::from_wire(SquareLineItem {
            name: Some("Burger".to_string()),
            variation_name: Some("Large".to_string()),
            ..wire_item()
        });
        assert_eq!(item.name, "Burger");
    }

    #[test]
    fn line_total_prefers_total_money_over_unit_price() {
        let item = LineItem::from_wire(SquareLineItem {
            name: Some("Burger".to_string()),
            quantity: Some("2".to_string()),
            base_price_money: money(1250),
            // Discounted below 2 x 1250.
            total_money: money(2000),
            ..wire_item()
        });
        assert_eq!(item.total_minor, 2000);
        assert_eq!(item.unit_price_minor, 1250);
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn missing_prices_yield_zero_revenue_but_keep_quantity() {
        let item = LineItem::from_wire(SquareLineItem {
            name: Some("Water".to_string()),
            quantity: Some("3".to_string()),
            ..wire_item()
        });
        assert_eq!(item.quantity, 3);
        assert_eq!(item.total_minor, 0);
        assert_eq!(item.unit_price_minor, 0);
    }

    #[test]
    fn unparsable_quantity_defaults_to_one() {
        let item = LineItem::from_wire(SquareLineItem {
            name: Some("Soup".to_string()),
            quantity: Some("a lot".to_string()),
            base_price_money: money(600),
            ..wire_item()
        });
        assert_eq!(item.quantity, 1);
        assert_eq!(item.total_minor, 600);
    }

    #[test]
    fn order_without_created_at_is_dropped() {
        let order = Order::from_wire(SquareOrder {
            id: "o1".to_string(),
            created_at: None,
            state: Some("COMPLETED".to_string()),
            customer_id: None,
            location_id: None,
            total_money: money(100),
            line_items: vec![],
        });
        assert!(order.is_none());
    }

    #[test]
    fn order_normalizes_state_and_total() {
        let order = Order::from_wire(SquareOrder {
            id: "o1".to_string(),
            created_at: Some("2026-03-01T12:30:00Z".to_string()),
            state: Some("COMPLETED".to_string()),
            customer_id: Some("cust_a".to_string()),
            location_id: Some("L1".to_string()),
            total_money: money(4500),
            line_items: vec![],
        })
        .unwrap();

        assert_eq!(order.state, OrderState::Completed);
        assert_eq!(order.total_minor, 4500);
        assert_eq!(order.created_at.to_rfc3339(), "2026-03-01T12:30:00+00:00");
    }
}
