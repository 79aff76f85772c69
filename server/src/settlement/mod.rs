//! Stock Settlement Engine
//!
//! Converts an order's requested line items into deterministic decrements
//! against a shop's daily stock batches, and reverses those decrements on
//! order update/cancel. Composition:
//!
//! ```text
//! place_order(req)
//!     ├─ 1. Enrich items from the catalog (denormalized snapshots)
//!     ├─ 2. Demand Aggregator     (demand)    — pure
//!     ├─ 3. Daily Stock Locator   (repository) — read-only query
//!     ├─ 4. Allocation Algorithm  (allocation) — pure, in-memory
//!     ├─ 5. Guarded transaction commit (batches + stock + order)
//!     └─ 6. Retry on version conflict, bounded
//! ```
//!
//! Update runs Reversal then Allocation against the order's original
//! business day; Cancel runs Reversal and flips the order terminal.
//! Nothing is persisted unless every demand entry is fully satisfied.

pub mod allocation;
pub mod demand;
pub mod engine;
pub mod error;
pub mod reversal;

#[cfg(test)]
mod tests;

pub use allocation::{AllocationOutcome, LOW_STOCK_REFRESH_THRESHOLD, allocate};
pub use demand::{DemandEntry, DemandMap, PlainDemand, PlateDemand, aggregate};
pub use engine::{OrderReceipt, SettlementEngine};
pub use error::{SettlementError, SettlementResult};
pub use reversal::{RevertOutcome, revert};
