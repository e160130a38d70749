use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Note recorded on an order after the "order placed" SMS alert went out.
pub const ORDER_PLACED_NOTE: &str =
    "\"Order placed\" SMS alert (to store owner) has been sent";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub total: f64,
    #[serde(default)]
    pub notes: Vec<OrderNote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderNote {
    pub text: String,
    pub display_to_customer: bool,
    pub created_at: DateTime<Utc>,
}

impl OrderNote {
    /// A note visible to store staff only.
    pub fn internal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            display_to_customer: false,
            created_at: Utc::now(),
        }
    }
}

/// Store-owner notification text for a placed order. The total always
/// carries two decimal places.
pub fn format_order_summary(order: &Order) -> String {
    format!(
        "New order #{} was placed for the total amount {:.2}",
        order.id, order.total
    )
}

/// Order persistence owned by the host application.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn order_by_id(&self, id: u64) -> Result<Option<Order>>;
    async fn update_order(&self, order: &Order) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_summary_pads_total_to_two_decimals() {
        let order = Order {
            id: 42,
            total: 19.5,
            notes: Vec::new(),
        };
        assert_eq!(
            format_order_summary(&order),
            "New order #42 was placed for the total amount 19.50"
        );
    }

    #[test]
    fn order_summary_keeps_whole_totals_padded() {
        let order = Order {
            id: 7,
            total: 1000.0,
            notes: Vec::new(),
        };
        assert_eq!(
            format_order_summary(&order),
            "New order #7 was placed for the total amount 1000.00"
        );
    }

    #[test]
    fn internal_note_is_hidden_from_customers() {
        let note = OrderNote::internal(ORDER_PLACED_NOTE);
        assert!(!note.display_to_customer);
        assert_eq!(note.text, ORDER_PLACED_NOTE);
    }
}
