//! Request DTOs accepted by the HTTP API
//!
//! IDs cross the wire as `table:id` strings. Validation here covers shape
//! only; business checks (catalog lookup, stock) happen in the settlement
//! engine.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::PlateType;

/// One requested order line: product id plus quantity.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItemInput {
    #[validate(length(min = 1, message = "product id is required"))]
    pub product_id: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i64,
}

/// Body for POST /api/orders
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, message = "shop id is required"))]
    pub shop_id: String,
    #[validate(nested)]
    #[validate(length(min = 1, message = "order must contain at least one item"))]
    pub items: Vec<OrderItemInput>,
    /// Optional effective date (unix millis); defaults to now.
    /// Selects which business day's stock batches settle the order.
    pub order_date: Option<i64>,
    pub payment_method: Option<String>,
}

/// Body for PUT /api/orders/{id}/items
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateOrderItemsRequest {
    #[validate(nested)]
    #[validate(length(min = 1, message = "order must contain at least one item"))]
    pub items: Vec<OrderItemInput>,
}

/// Stock line kind selector for batch creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLineKindInput {
    /// Simple quantity-tracked line
    Plain,
    /// Plate-variant line with full/half consumption counters
    PlateCapable,
}

/// One product allotment inside a new stock batch
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StockLineInput {
    #[validate(length(min = 1, message = "product id is required"))]
    pub product_id: String,
    #[validate(range(min = 0, message = "quantity must not be negative"))]
    pub quantity: i64,
    #[serde(default = "default_line_kind")]
    pub kind: StockLineKindInput,
}

fn default_line_kind() -> StockLineKindInput {
    StockLineKindInput::Plain
}

/// Body for POST /api/stock-batches
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StockBatchCreate {
    #[validate(length(min = 1, message = "shop id is required"))]
    pub shop_id: String,
    #[validate(nested)]
    #[validate(length(min = 1, message = "batch must contain at least one line"))]
    pub lines: Vec<StockLineInput>,
    #[serde(default)]
    pub is_default: bool,
}

/// Body for PUT /api/stock-batches/{id}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockBatchUpdate {
    pub is_default: Option<bool>,
    /// Toggle availability of a plate-capable line by product id
    pub set_available: Option<LineAvailabilityUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineAvailabilityUpdate {
    pub product_id: String,
    pub is_available: bool,
}

/// Deal bundle component as submitted on product create/update
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DealComponentInput {
    #[validate(length(min = 1, message = "product id is required"))]
    pub product_id: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i64,
}

/// Body for POST /api/products
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductCreateRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: f64,
    pub unit: Option<String>,
    pub category_id: Option<String>,
    pub plate_type: Option<PlateType>,
    /// Marks this product as a plate variant of the given base dish
    pub parent_product_id: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub deal_products: Vec<DealComponentInput>,
    #[serde(default)]
    pub is_stock_able: bool,
    #[serde(default)]
    pub stock: i64,
}

/// Body for PUT /api/products/{id}
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductUpdateRequest {
    pub name: Option<String>,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: Option<f64>,
    pub unit: Option<String>,
    pub category_id: Option<String>,
    pub plate_type: Option<PlateType>,
    pub parent_product_id: Option<String>,
    #[validate(nested)]
    pub deal_products: Option<Vec<DealComponentInput>>,
    pub is_stock_able: Option<bool>,
    pub stock: Option<i64>,
    pub is_active: Option<bool>,
}
