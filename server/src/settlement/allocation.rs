//! Allocation Algorithm
//!
//! Walks a shop's daily batches oldest-first and greedily satisfies the
//! demand map, splitting consumption between quantity-tracked plain lines
//! and plate-type (full/half) counters. Pure with respect to persistence:
//! batches are mutated in memory and the caller commits (or discards) the
//! whole result.

use std::collections::{BTreeMap, BTreeSet};

use shared::types::PlateType;

use crate::db::models::{StockBatch, StockLineKind};

use super::demand::{DemandEntry, DemandMap};
use super::error::{SettlementError, SettlementResult};

/// 低库存预警阈值 / Low-stock early-warning threshold.
/// Policy constant, not derived. When a matched plain line's pre-consumption
/// availability is at or under this, the outcome asks the caller to surface
/// a refresh signal.
pub const LOW_STOCK_REFRESH_THRESHOLD: i64 = 12;

/// What allocation touched, for the caller to commit
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AllocationOutcome {
    /// Indices into the batch slice whose lines were mutated
    pub modified: BTreeSet<usize>,
    /// product key -> counter decrement for stockable products
    pub stockable_decrements: BTreeMap<String, i64>,
    /// Low-stock warning was tripped on at least one matched line
    pub needs_refresh: bool,
}

/// Satisfy `demand` from `batches` (mutating both), then settle stockable
/// counters against `stock_levels` (current `Product.stock` per product key).
///
/// Fails with `InsufficientStock` naming every product whose demand could
/// not be fully satisfied; the caller must then discard all mutations.
pub fn allocate(
    batches: &mut [StockBatch],
    demand: &mut DemandMap,
    stock_levels: &BTreeMap<String, i64>,
) -> SettlementResult<AllocationOutcome> {
    let mut outcome = AllocationOutcome::default();

    for (index, batch) in batches.iter_mut().enumerate() {
        for line in batch.lines.iter_mut() {
            let Some(entry) = demand.get_mut(&line.product) else {
                continue;
            };
            // Line shape and demand shape must agree; a plate-capable line
            // never serves plain demand and vice versa.
            match (&mut line.kind, entry) {
                (StockLineKind::Plain { consumed }, DemandEntry::Plain(plain)) => {
                    let available = line.quantity - *consumed;
                    if available <= LOW_STOCK_REFRESH_THRESHOLD {
                        outcome.needs_refresh = true;
                    }
                    let take = plain.remaining.min(available).max(0);
                    if take > 0 {
                        *consumed += take;
                        plain.remaining -= take;
                        outcome.modified.insert(index);
                    }
                }
                (
                    StockLineKind::PlateCapable {
                        full_consumed,
                        half_consumed,
                        is_available,
                    },
                    DemandEntry::PlateGroup(group),
                ) => {
                    if !*is_available {
                        continue;
                    }
                    // Plate consumption is never partial: the first open
                    // line absorbs each variant's full remaining amount.
                    // Tracked, not capacity-limited.
                    for variant in group.iter_mut().filter(|v| v.remaining > 0) {
                        match variant.plate_type {
                            PlateType::Full => *full_consumed += variant.remaining,
                            PlateType::Half => *half_consumed += variant.remaining,
                        }
                        variant.remaining = 0;
                        outcome.modified.insert(index);
                    }
                }
                _ => {}
            }
        }
    }

    // Stockable products keep their own counter, independent of batches.
    // The counter is a hard gate: a shortfall rejects the demand even when
    // batch lines covered the walk. A covered check decrements by the full
    // originally-requested amount and settles whatever the walk left.
    for (key, entry) in demand.iter_mut() {
        let DemandEntry::Plain(plain) = entry else {
            continue;
        };
        if !plain.is_stock_able {
            continue;
        }
        let level = stock_levels.get(key).copied().unwrap_or(0);
        if level < plain.quantity {
            plain.remaining = plain.remaining.max(plain.quantity - level);
            continue;
        }
        outcome
            .stockable_decrements
            .insert(key.clone(), plain.quantity);
        plain.remaining = 0;
    }

    let unsatisfied: Vec<String> = demand
        .values()
        .flat_map(|entry| entry.unsatisfied_names())
        .collect();
    if !unsatisfied.is_empty() {
        return Err(SettlementError::InsufficientStock {
            products: unsatisfied,
        });
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{StockLine, OrderItem};
    use crate::settlement::demand::aggregate;

    fn batch(shop: &str, created_at: i64, lines: Vec<StockLine>) -> StockBatch {
        StockBatch {
            id: None,
            shop: shop.to_string(),
            lines,
            is_default: false,
            version: 0,
            created_at,
        }
    }

    fn plain_item(product: &str, quantity: i64) -> OrderItem {
        OrderItem {
            product: product.to_string(),
            name: product.to_string(),
            price: 5.0,
            quantity,
            is_stock_able: false,
            parent_product: None,
            plate_type: None,
            deal_products: Vec::new(),
        }
    }

    fn plate_item(product: &str, parent: &str, plate_type: PlateType, quantity: i64) -> OrderItem {
        OrderItem {
            parent_product: Some(parent.to_string()),
            plate_type: Some(plate_type),
            ..plain_item(product, quantity)
        }
    }

    #[test]
    fn demand_spills_across_batches_oldest_first() {
        let mut batches = vec![
            batch("shop:a", 100, vec![StockLine::plain("product:p", "P", 10)]),
            batch("shop:a", 200, vec![StockLine::plain("product:p", "P", 5)]),
        ];
        let mut demand = aggregate(&[plain_item("product:p", 12)]).unwrap();
        let outcome = allocate(&mut batches, &mut demand, &BTreeMap::new()).unwrap();

        match &batches[0].lines[0].kind {
            StockLineKind::Plain { consumed } => assert_eq!(*consumed, 10),
            _ => unreachable!(),
        }
        match &batches[1].lines[0].kind {
            StockLineKind::Plain { consumed } => assert_eq!(*consumed, 2),
            _ => unreachable!(),
        }
        assert_eq!(outcome.modified, BTreeSet::from([0, 1]));
        assert_eq!(demand["product:p"].remaining(), 0);
    }

    #[test]
    fn shortfall_names_the_product_and_leaves_partial_in_memory_only() {
        let mut line = StockLine::plain("product:p", "P", 10);
        if let StockLineKind::Plain { consumed } = &mut line.kind {
            *consumed = 9;
        }
        let mut batches = vec![batch("shop:a", 100, vec![line])];
        let mut demand = aggregate(&[plain_item("product:p", 5)]).unwrap();

        let err = allocate(&mut batches, &mut demand, &BTreeMap::new()).unwrap_err();
        match err {
            SettlementError::InsufficientStock { products } => {
                assert_eq!(products, vec!["product:p".to_string()]);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
        // The in-memory partial take happened; the caller discards it
        match &batches[0].lines[0].kind {
            StockLineKind::Plain { consumed } => assert_eq!(*consumed, 10),
            _ => unreachable!(),
        }
        assert_eq!(demand["product:p"].remaining(), 4);
    }

    #[test]
    fn plate_variants_land_on_first_open_line() {
        let mut batches = vec![batch(
            "shop:a",
            100,
            vec![StockLine::plate_capable("product:karahi", "Karahi", 20, true)],
        )];
        let mut demand = aggregate(&[
            plate_item("product:karahi_full", "product:karahi", PlateType::Full, 3),
            plate_item("product:karahi_half", "product:karahi", PlateType::Half, 2),
        ])
        .unwrap();
        let outcome = allocate(&mut batches, &mut demand, &BTreeMap::new()).unwrap();

        match &batches[0].lines[0].kind {
            StockLineKind::PlateCapable {
                full_consumed,
                half_consumed,
                ..
            } => {
                assert_eq!(*full_consumed, 3);
                assert_eq!(*half_consumed, 2);
            }
            _ => unreachable!(),
        }
        assert!(outcome.modified.contains(&0));
    }

    #[test]
    fn closed_plate_line_is_skipped() {
        let mut batches = vec![
            batch(
                "shop:a",
                100,
                vec![StockLine::plate_capable("product:karahi", "Karahi", 20, false)],
            ),
            batch(
                "shop:a",
                200,
                vec![StockLine::plate_capable("product:karahi", "Karahi", 20, true)],
            ),
        ];
        let mut demand = aggregate(&[plate_item(
            "product:karahi_full",
            "product:karahi",
            PlateType::Full,
            1,
        )])
        .unwrap();
        allocate(&mut batches, &mut demand, &BTreeMap::new()).unwrap();

        match &batches[0].lines[0].kind {
            StockLineKind::PlateCapable { full_consumed, .. } => assert_eq!(*full_consumed, 0),
            _ => unreachable!(),
        }
        match &batches[1].lines[0].kind {
            StockLineKind::PlateCapable { full_consumed, .. } => assert_eq!(*full_consumed, 1),
            _ => unreachable!(),
        }
    }

    #[test]
    fn no_open_plate_line_means_insufficient() {
        let mut batches = vec![batch(
            "shop:a",
            100,
            vec![StockLine::plate_capable("product:karahi", "Karahi", 20, false)],
        )];
        let mut demand = aggregate(&[plate_item(
            "product:karahi_full",
            "product:karahi",
            PlateType::Full,
            1,
        )])
        .unwrap();
        assert!(matches!(
            allocate(&mut batches, &mut demand, &BTreeMap::new()),
            Err(SettlementError::InsufficientStock { .. })
        ));
    }

    #[test]
    fn stockable_counter_settles_demand_without_batches() {
        let mut item = plain_item("product:soda", 4);
        item.is_stock_able = true;
        let mut demand = aggregate(&[item]).unwrap();
        let levels = BTreeMap::from([("product:soda".to_string(), 10)]);

        let outcome = allocate(&mut [], &mut demand, &levels).unwrap();
        assert_eq!(outcome.stockable_decrements["product:soda"], 4);
        assert_eq!(demand["product:soda"].remaining(), 0);
    }

    #[test]
    fn stockable_shortfall_is_insufficient() {
        let mut item = plain_item("product:soda", 4);
        item.is_stock_able = true;
        let mut demand = aggregate(&[item]).unwrap();
        let levels = BTreeMap::from([("product:soda".to_string(), 3)]);

        assert!(matches!(
            allocate(&mut [], &mut demand, &levels),
            Err(SettlementError::InsufficientStock { .. })
        ));
    }

    #[test]
    fn stockable_gate_rejects_even_when_batches_cover_the_walk() {
        let mut item = plain_item("product:soda", 4);
        item.is_stock_able = true;
        let mut batches = vec![batch(
            "shop:a",
            100,
            vec![StockLine::plain("product:soda", "Soda", 50)],
        )];
        let mut demand = aggregate(&[item]).unwrap();
        let levels = BTreeMap::from([("product:soda".to_string(), 3)]);

        assert!(matches!(
            allocate(&mut batches, &mut demand, &levels),
            Err(SettlementError::InsufficientStock { .. })
        ));
    }

    #[test]
    fn stockable_decrement_fires_alongside_batch_consumption() {
        // Tracked in two ledgers: the batch line depletes AND the product
        // counter drops by the full requested amount.
        let mut item = plain_item("product:soda", 4);
        item.is_stock_able = true;
        let mut batches = vec![batch(
            "shop:a",
            100,
            vec![StockLine::plain("product:soda", "Soda", 50)],
        )];
        let mut demand = aggregate(&[item]).unwrap();
        let levels = BTreeMap::from([("product:soda".to_string(), 10)]);

        let outcome = allocate(&mut batches, &mut demand, &levels).unwrap();
        match &batches[0].lines[0].kind {
            StockLineKind::Plain { consumed } => assert_eq!(*consumed, 4),
            _ => unreachable!(),
        }
        assert_eq!(outcome.stockable_decrements["product:soda"], 4);
    }

    #[test]
    fn low_stock_raises_refresh_flag() {
        let mut batches = vec![batch(
            "shop:a",
            100,
            vec![StockLine::plain("product:p", "P", LOW_STOCK_REFRESH_THRESHOLD)],
        )];
        let mut demand = aggregate(&[plain_item("product:p", 1)]).unwrap();
        let outcome = allocate(&mut batches, &mut demand, &BTreeMap::new()).unwrap();
        assert!(outcome.needs_refresh);

        let mut batches = vec![batch(
            "shop:a",
            100,
            vec![StockLine::plain("product:p", "P", LOW_STOCK_REFRESH_THRESHOLD + 1)],
        )];
        let mut demand = aggregate(&[plain_item("product:p", 1)]).unwrap();
        let outcome = allocate(&mut batches, &mut demand, &BTreeMap::new()).unwrap();
        assert!(!outcome.needs_refresh);
    }

    #[test]
    fn allocation_is_deterministic() {
        let make = || {
            let batches = vec![
                batch("shop:a", 100, vec![StockLine::plain("product:p", "P", 7)]),
                batch("shop:a", 200, vec![StockLine::plain("product:p", "P", 7)]),
            ];
            let demand = aggregate(&[plain_item("product:p", 9)]).unwrap();
            (batches, demand)
        };
        let (mut b1, mut d1) = make();
        let (mut b2, mut d2) = make();
        let o1 = allocate(&mut b1, &mut d1, &BTreeMap::new()).unwrap();
        let o2 = allocate(&mut b2, &mut d2, &BTreeMap::new()).unwrap();
        assert_eq!(o1, o2);
        assert_eq!(b1, b2);
    }
}
