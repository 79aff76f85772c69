//! Stock Batch Model ("regular stock")
//!
//! One inventory snapshot entered by a shop operator for a business day.
//! A shop may have several batches per day (morning/evening replenishment);
//! the settlement engine consumes them oldest-first.

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use super::serde_helpers;

/// How a stock line tracks consumption.
///
/// The kind is an explicit tag: a line either counts simple units or plate
/// servings, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockLineKind {
    /// Simple unit consumption. Invariant: `consumed <= quantity`.
    Plain { consumed: i64 },
    /// Plate-variant consumption counters for a base dish. Counters are
    /// tracked but not capacity-limited; consumption is gated by
    /// `is_available` only.
    PlateCapable {
        full_consumed: i64,
        half_consumed: i64,
        is_available: bool,
    },
}

/// One product's allotment within a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    /// "product:id" reference
    pub product: String,
    /// Denormalized product name (stock reports, error messages)
    pub name: String,
    /// Total allotted quantity
    pub quantity: i64,
    #[serde(flatten)]
    pub kind: StockLineKind,
}

impl StockLine {
    pub fn plain(product: impl Into<String>, name: impl Into<String>, quantity: i64) -> Self {
        Self {
            product: product.into(),
            name: name.into(),
            quantity,
            kind: StockLineKind::Plain { consumed: 0 },
        }
    }

    pub fn plate_capable(
        product: impl Into<String>,
        name: impl Into<String>,
        quantity: i64,
        is_available: bool,
    ) -> Self {
        Self {
            product: product.into(),
            name: name.into(),
            quantity,
            kind: StockLineKind::PlateCapable {
                full_consumed: 0,
                half_consumed: 0,
                is_available,
            },
        }
    }

    /// Remaining simple units, zero for plate-capable lines
    pub fn available(&self) -> i64 {
        match &self.kind {
            StockLineKind::Plain { consumed } => self.quantity - consumed,
            StockLineKind::PlateCapable { .. } => 0,
        }
    }
}

/// Daily stock batch
///
/// `version` is an optimistic-concurrency counter: every settlement write
/// updates the batch with a `WHERE version = $expected` guard and bumps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockBatch {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    /// "shop:id" reference
    pub shop: String,
    pub lines: Vec<StockLine>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub version: i64,
    /// Unix millis; defines the batch's business day in the shop's timezone
    pub created_at: i64,
}

impl StockBatch {
    /// Whether any line carries plate counters
    pub fn has_plate_lines(&self) -> bool {
        self.lines
            .iter()
            .any(|l| matches!(l.kind, StockLineKind::PlateCapable { .. }))
    }
}
