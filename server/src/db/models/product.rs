//! Product Model

use serde::{Deserialize, Serialize};
use shared::types::PlateType;
use surrealdb::RecordId;

use super::serde_helpers;

/// Fixed bundle composition entry: buying the owning product implicitly
/// consumes `quantity` units of `product`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealComponent {
    /// "product:id" reference
    pub product: String,
    /// Denormalized at definition time, used in insufficient-stock reports
    pub name: String,
    pub quantity: i64,
}

/// Product model
///
/// Two availability mechanisms coexist:
/// - daily stock batches (the settlement engine's main ledger);
/// - `is_stock_able` products additionally carry their own `stock` counter,
///   decremented on every order regardless of batch coverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub unit: Option<String>,
    /// "category:id" reference
    #[serde(default)]
    pub category: Option<String>,
    /// Set when this product is a full/half plate variant of a base dish
    #[serde(default)]
    pub plate_type: Option<PlateType>,
    /// "product:id" of the base dish this plate variant belongs to
    #[serde(default)]
    pub parent_product: Option<String>,
    #[serde(default)]
    pub deal_products: Vec<DealComponent>,
    #[serde(default)]
    pub is_stock_able: bool,
    /// Simple availability counter, only meaningful when `is_stock_able`.
    /// Invariant: never negative after a settlement.
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_true", deserialize_with = "serde_helpers::bool_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: i64,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Stable "product:id" key used by the settlement engine
    pub fn key(&self) -> String {
        self.id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default()
    }
}
