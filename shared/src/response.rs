//! Response DTOs returned by the HTTP API

use serde::{Deserialize, Serialize};

/// Per-product availability summary for the current business day
///
/// Plain lines across batches merge by summing quantity and consumption;
/// plate-capable lines surface the currently-available line's counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStockSummaryEntry {
    pub product_id: String,
    pub name: String,
    /// Total allotted across the day's batches (plain lines)
    pub quantity: i64,
    /// Total consumed as simple units (plain lines)
    pub consumed: i64,
    /// Plate counters from the available plate-capable line, if any
    pub full_plate_consumed: Option<i64>,
    pub half_plate_consumed: Option<i64>,
    pub is_available: Option<bool>,
    /// Number of plate-capable lines seen across batches
    pub plate_line_count: i64,
}

impl DailyStockSummaryEntry {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            quantity: 0,
            consumed: 0,
            full_plate_consumed: None,
            half_plate_consumed: None,
            is_available: None,
            plate_line_count: 0,
        }
    }
}
