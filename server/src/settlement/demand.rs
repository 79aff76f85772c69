//! Demand Aggregator
//!
//! Normalizes an order's line items into a canonical per-product demand map.
//! Pure: no I/O, and `remaining` fields are fresh copies that never alias the
//! caller's items.
//!
//! Grouping rule: the key is `parent_product ?? product`. Plate-variant
//! lines collect into an ordered group under their base dish; everything
//! else merges into a single plain entry per product. Deal bundles expand
//! into additional plain demand for each component.

use std::collections::BTreeMap;

use shared::types::PlateType;

use crate::db::models::OrderItem;

use super::error::{SettlementError, SettlementResult};

/// Quantity-based need for a non-plate product
#[derive(Debug, Clone, PartialEq)]
pub struct PlainDemand {
    pub product: String,
    pub name: String,
    /// Originally requested total (stockable decrements use this)
    pub quantity: i64,
    /// Mutated downward during allocation; 0 = satisfied
    pub remaining: i64,
    pub is_stock_able: bool,
}

/// One plate-variant line's need, tracked under the base dish's key
#[derive(Debug, Clone, PartialEq)]
pub struct PlateDemand {
    pub product: String,
    pub name: String,
    pub plate_type: PlateType,
    pub quantity: i64,
    pub remaining: i64,
}

/// Either one merged plain record or an ordered group of plate variants.
/// A key never holds both: an item cannot simultaneously have and not have
/// a parent product for the same id.
#[derive(Debug, Clone, PartialEq)]
pub enum DemandEntry {
    Plain(PlainDemand),
    PlateGroup(Vec<PlateDemand>),
}

impl DemandEntry {
    /// Total unsatisfied quantity across the entry
    pub fn remaining(&self) -> i64 {
        match self {
            DemandEntry::Plain(d) => d.remaining,
            DemandEntry::PlateGroup(group) => group.iter().map(|d| d.remaining).sum(),
        }
    }

    /// Names of products with unsatisfied demand
    pub fn unsatisfied_names(&self) -> Vec<String> {
        match self {
            DemandEntry::Plain(d) if d.remaining > 0 => vec![d.name.clone()],
            DemandEntry::PlateGroup(group) => group
                .iter()
                .filter(|d| d.remaining > 0)
                .map(|d| d.name.clone())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// BTreeMap keeps iteration deterministic, which keeps allocation and its
/// error messages reproducible for the same input.
pub type DemandMap = BTreeMap<String, DemandEntry>;

/// Build the demand map for a set of order items
pub fn aggregate(items: &[OrderItem]) -> SettlementResult<DemandMap> {
    let mut demand = DemandMap::new();

    for item in items {
        if item.product.is_empty() {
            return Err(SettlementError::Validation(
                "order item is missing a product id".into(),
            ));
        }
        if item.quantity <= 0 {
            return Err(SettlementError::Validation(format!(
                "order item {} has non-positive quantity",
                item.name
            )));
        }

        match &item.parent_product {
            Some(parent) => {
                let plate_type = item.plate_type.ok_or_else(|| {
                    SettlementError::Validation(format!(
                        "plate variant {} is missing its plate type",
                        item.name
                    ))
                })?;
                let record = PlateDemand {
                    product: item.product.clone(),
                    name: item.name.clone(),
                    plate_type,
                    quantity: item.quantity,
                    remaining: item.quantity,
                };
                match demand
                    .entry(parent.clone())
                    .or_insert_with(|| DemandEntry::PlateGroup(Vec::new()))
                {
                    DemandEntry::PlateGroup(group) => group.push(record),
                    DemandEntry::Plain(_) => {
                        return Err(SettlementError::Validation(format!(
                            "product {} appears both as plate parent and plain demand",
                            parent
                        )));
                    }
                }
            }
            None => {
                merge_plain(
                    &mut demand,
                    &item.product,
                    &item.name,
                    item.quantity,
                    item.is_stock_able,
                )?;
            }
        }

        // Bundle expansion: selling the deal consumes its components
        for component in &item.deal_products {
            if component.product.is_empty() {
                return Err(SettlementError::Validation(format!(
                    "deal component of {} is missing a product id",
                    item.name
                )));
            }
            merge_plain(
                &mut demand,
                &component.product,
                &component.name,
                component.quantity * item.quantity,
                // Components carry no stockable flag of their own; a direct
                // line for the same product keeps its flag on merge.
                false,
            )?;
        }
    }

    Ok(demand)
}

fn merge_plain(
    demand: &mut DemandMap,
    product: &str,
    name: &str,
    quantity: i64,
    is_stock_able: bool,
) -> SettlementResult<()> {
    match demand.entry(product.to_string()).or_insert_with(|| {
        DemandEntry::Plain(PlainDemand {
            product: product.to_string(),
            name: name.to_string(),
            quantity: 0,
            remaining: 0,
            is_stock_able: false,
        })
    }) {
        DemandEntry::Plain(existing) => {
            existing.quantity += quantity;
            existing.remaining += quantity;
            existing.is_stock_able |= is_stock_able;
            Ok(())
        }
        DemandEntry::PlateGroup(_) => Err(SettlementError::Validation(format!(
            "product {} appears both as plate parent and plain demand",
            product
        ))),
    }
}
