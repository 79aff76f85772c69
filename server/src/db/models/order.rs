//! Order Model
//!
//! Orders are committed atomically with their stock-settlement side effects:
//! there is no state where an order exists without its batch/stock mutations
//! being durable, or vice versa.

use serde::{Deserialize, Serialize};
use shared::types::{OrderStatus, PaymentStatus, PlateType};
use surrealdb::RecordId;

use super::product::DealComponent;
use super::serde_helpers;

/// One committed order line
///
/// Product attributes are denormalized at order time (name, price, flags,
/// bundle composition) so later catalog edits never rewrite history — the
/// reversal algorithm replays the snapshot, not the current product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// "product:id" reference
    pub product: String,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    #[serde(default)]
    pub is_stock_able: bool,
    /// "product:id" of the base dish when this line is a plate variant
    #[serde(default)]
    pub parent_product: Option<String>,
    #[serde(default)]
    pub plate_type: Option<PlateType>,
    #[serde(default)]
    pub deal_products: Vec<DealComponent>,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// Committed order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    pub order_number: String,
    /// "shop:id" reference
    pub shop: String,
    pub user_id: String,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub items: Vec<OrderItem>,
    /// Unix millis; also anchors the business day used for reversal
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Whether item updates / cancellation are still allowed
    pub fn is_terminal(&self) -> bool {
        self.payment_status.is_terminal() || self.order_status.is_terminal()
    }

    pub fn total_of(items: &[OrderItem]) -> f64 {
        items.iter().map(|i| i.line_total()).sum()
    }
}
