//! Settlement error taxonomy
//!
//! Every error raised inside an order lifecycle operation aborts the whole
//! transaction; partial stock mutation is never visible outside a failed
//! call.

use thiserror::Error;

use crate::db::repository::RepoError;

#[derive(Debug, Error)]
pub enum SettlementError {
    /// Malformed order items; rejected before any I/O
    #[error("Validation error: {0}")]
    Validation(String),

    /// No stock batch exists for the shop/business day. Deliberately not
    /// folded into zero availability: "no stock configured today" usually
    /// means operator misconfiguration.
    #[error("No stock configured for shop {shop} on {date}")]
    NoStock { shop: String, date: String },

    /// Demand exceeds available batch + stockable capacity
    #[error("Insufficient stock for: {}", products.join(", "))]
    InsufficientStock { products: Vec<String> },

    /// Update/cancel attempted on an order in a terminal state
    #[error("Order state error: {0}")]
    OrderState(String),

    /// Referenced order/product/shop does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic-concurrency retries exhausted
    #[error("Concurrent settlement conflict: {0}")]
    Conflict(String),

    /// Persistence failure, propagated unchanged
    #[error("Database error: {0}")]
    Database(String),
}

pub type SettlementResult<T> = Result<T, SettlementError>;

impl From<RepoError> for SettlementError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(msg) => SettlementError::NotFound(msg),
            RepoError::Validation(msg) => SettlementError::Validation(msg),
            RepoError::Duplicate(msg) | RepoError::Database(msg) => {
                SettlementError::Database(msg)
            }
        }
    }
}
