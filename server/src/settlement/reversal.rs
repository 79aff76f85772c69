//! Reversal Algorithm
//!
//! Inverse of allocation: rebuilds the demand map from an order's historical
//! items (snapshot bundle compositions included) and restores the quantities
//! and plate counters it consumed. Runs against the order's own business-day
//! batch set, not today's.
//!
//! Counters clamp at zero rather than asserting the prior value, so a
//! double revert under-restores silently instead of failing.

use std::collections::{BTreeMap, BTreeSet};

use shared::types::PlateType;

use crate::db::models::{OrderItem, StockBatch, StockLineKind};

use super::demand::{DemandEntry, aggregate};
use super::error::SettlementResult;

/// What reversal touched, for the caller to commit
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RevertOutcome {
    /// Indices into the batch slice whose lines were mutated
    pub modified: BTreeSet<usize>,
    /// product key -> counter increment for stockable products
    pub stockable_increments: BTreeMap<String, i64>,
}

/// Restore the consumption recorded for `items` back into `batches`
pub fn revert(batches: &mut [StockBatch], items: &[OrderItem]) -> SettlementResult<RevertOutcome> {
    let mut demand = aggregate(items)?;
    let mut outcome = RevertOutcome::default();

    for (index, batch) in batches.iter_mut().enumerate() {
        for line in batch.lines.iter_mut() {
            let Some(entry) = demand.get_mut(&line.product) else {
                continue;
            };
            match (&mut line.kind, entry) {
                (StockLineKind::Plain { consumed }, DemandEntry::Plain(plain)) => {
                    // Restore at most what this line actually holds; spill
                    // the rest onto later lines of the same product.
                    let restore = plain.remaining.min(*consumed).max(0);
                    if restore > 0 {
                        *consumed -= restore;
                        plain.remaining -= restore;
                        outcome.modified.insert(index);
                    }
                }
                (
                    StockLineKind::PlateCapable {
                        full_consumed,
                        half_consumed,
                        ..
                    },
                    DemandEntry::PlateGroup(group),
                ) => {
                    // Availability gating does not apply on the way back:
                    // a line closed after the sale still gives its
                    // counters up.
                    for variant in group.iter_mut().filter(|v| v.remaining > 0) {
                        let counter = match variant.plate_type {
                            PlateType::Full => &mut *full_consumed,
                            PlateType::Half => &mut *half_consumed,
                        };
                        let restore = variant.remaining.min(*counter).max(0);
                        if restore > 0 {
                            *counter -= restore;
                            variant.remaining -= restore;
                            outcome.modified.insert(index);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // Stockable counters come back in full, independent of batch state
    for (key, entry) in demand.iter() {
        if let DemandEntry::Plain(plain) = entry
            && plain.is_stock_able
        {
            outcome.stockable_increments.insert(key.clone(), plain.quantity);
        }
    }

    Ok(outcome)
}
