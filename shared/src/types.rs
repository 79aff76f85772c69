//! Domain enums shared between server and clients

use serde::{Deserialize, Serialize};

/// Plate serving size for plate-variant products.
///
/// A plate variant is a product that represents a "full" or "half" serving
/// of a base dish. Consumption is tracked on the base dish's stock line via
/// separate full/half counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlateType {
    Full,
    Half,
}

/// Payment status state machine: unpaid → paid → cancelled.
///
/// `cancelled` is terminal; no further transitions are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Cancelled,
}

/// Order fulfilment status: pending → completed, or → cancelled.
///
/// Both `completed` and `cancelled` are terminal: item updates and
/// cancellation are rejected once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl PaymentStatus {
    /// Whether the status accepts no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Cancelled)
    }
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}
