//! Order Lifecycle Orchestration
//!
//! 订单生命周期编排 — 下单 / 改单 / 取消 / 支付。
//!
//! Every operation follows the same shape: read the world, run the pure
//! algorithms in memory, then commit everything (batch lines, stockable
//! counters, the order document) in a single guarded transaction. A failed
//! guard means another settlement won the race; the whole read-compute-commit
//! cycle retries from scratch, bounded.

use std::collections::{BTreeMap, BTreeSet};

use chrono_tz::Tz;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use uuid::Uuid;

use shared::request::{OrderItemInput, PlaceOrderRequest, UpdateOrderItemsRequest};
use shared::types::{OrderStatus, PaymentStatus};

use crate::db::models::{Order, OrderItem, Product, Shop, StockBatch};
use crate::db::repository::{
    OrderRepository, ProductRepository, ShopRepository, StockBatchRepository, TxnScript,
    is_conflict_error, parse_record_id,
};
use crate::utils::time::{business_day_bounds, millis_to_business_date, now_millis};

use super::allocation::allocate;
use super::demand::aggregate;
use super::error::{SettlementError, SettlementResult};
use super::reversal::revert;

const ORDER_TABLE: &str = "order";
const PRODUCT_TABLE: &str = "product";

/// Bounded retries for optimistic-concurrency conflicts
const MAX_COMMIT_ATTEMPTS: usize = 3;

/// Result of a successful create/update settlement
#[derive(Debug, Clone)]
pub struct OrderReceipt {
    pub order: Order,
    /// Low-stock warning tripped during allocation; callers surface this
    /// to the operator UI as a "refresh stock" prompt
    pub needs_refresh: bool,
}

/// Stock Settlement Engine facade
#[derive(Clone)]
pub struct SettlementEngine {
    db: Surreal<Db>,
    products: ProductRepository,
    shops: ShopRepository,
    orders: OrderRepository,
    batches: StockBatchRepository,
}

impl SettlementEngine {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            products: ProductRepository::new(db.clone()),
            shops: ShopRepository::new(db.clone()),
            orders: OrderRepository::new(db.clone()),
            batches: StockBatchRepository::new(db.clone()),
            db,
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Place an order: enrich, aggregate, locate, allocate, commit.
    /// Nothing is persisted unless every demand entry is satisfied.
    pub async fn place_order(
        &self,
        user_id: &str,
        req: PlaceOrderRequest,
    ) -> SettlementResult<OrderReceipt> {
        let shop = self.load_shop(&req.shop_id).await?;
        let tz = parse_shop_timezone(&shop)?;
        let items = self.enrich_items(&req.items).await?;
        let demand_template = aggregate(&items)?;

        let effective = req.order_date.unwrap_or_else(now_millis);
        let (day_start, day_end) = business_day_bounds(effective, tz);
        let shop_key = shop_key(&shop);

        for attempt in 0.. {
            let mut batches = self
                .batches
                .find_for_business_day(&shop_key, day_start, day_end)
                .await?;
            if batches.is_empty() {
                return Err(SettlementError::NoStock {
                    shop: shop_key,
                    date: millis_to_business_date(effective, tz).to_string(),
                });
            }

            // Counter levels are re-read every attempt; a retry must not
            // trust levels captured before the conflicting commit.
            let stock_levels = self.load_stock_levels(&items).await?;

            let mut demand = demand_template.clone();
            let outcome = allocate(&mut batches, &mut demand, &stock_levels)?;

            let created_at = now_millis();
            let order = Order {
                id: None,
                order_number: next_order_number(),
                shop: shop_key.clone(),
                user_id: user_id.to_string(),
                total_amount: Order::total_of(&items),
                payment_status: PaymentStatus::Unpaid,
                order_status: OrderStatus::Pending,
                payment_method: req.payment_method.clone(),
                items: items.clone(),
                created_at,
                updated_at: created_at,
            };

            let mut txn = TxnScript::new();
            push_batch_updates(&mut txn, &batches, &outcome.modified)?;
            push_stock_deltas(&mut txn, &negate(&outcome.stockable_decrements))?;

            let order_id = parse_record_id(ORDER_TABLE, &Uuid::new_v4().simple().to_string())?;
            let mut content =
                serde_json::to_value(&order).map_err(|e| SettlementError::Database(e.to_string()))?;
            if let Some(obj) = content.as_object_mut() {
                obj.remove("id");
            }
            let rid = txn.bind_record(order_id.clone());
            let content_var = txn.bind_value(content);
            txn.push(format!("CREATE {rid} CONTENT {content_var}"));

            match txn.run(&self.db).await {
                Ok(()) => {
                    let order = self
                        .orders
                        .find_by_id(&order_id.to_string())
                        .await?
                        .ok_or_else(|| {
                            SettlementError::Database("Order vanished after commit".into())
                        })?;
                    tracing::info!(
                        order = %order.order_number,
                        shop = %order.shop,
                        total = order.total_amount,
                        "Order placed"
                    );
                    return Ok(OrderReceipt {
                        order,
                        needs_refresh: outcome.needs_refresh,
                    });
                }
                Err(e) if is_conflict_error(&e) && attempt + 1 < MAX_COMMIT_ATTEMPTS => {
                    tracing::warn!(attempt, "Settlement conflict on place_order, retrying");
                    continue;
                }
                Err(e) if is_conflict_error(&e) => {
                    return Err(SettlementError::Conflict(
                        "retries exhausted while placing order".into(),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }
        unreachable!("bounded retry loop always returns");
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Replace an order's items: revert the old consumption, then allocate
    /// the new demand against the order's original business day.
    pub async fn update_order_items(
        &self,
        user_id: &str,
        order_id: &str,
        req: UpdateOrderItemsRequest,
    ) -> SettlementResult<OrderReceipt> {
        let order = self.load_order(order_id).await?;
        if order.is_terminal() {
            return Err(SettlementError::OrderState(format!(
                "Order {} can no longer be updated",
                order.order_number
            )));
        }

        let shop = self.load_shop(&order.shop).await?;
        let tz = parse_shop_timezone(&shop)?;
        // The original order's day, not today's
        let (day_start, day_end) = business_day_bounds(order.created_at, tz);

        let new_items = self.enrich_items(&req.items).await?;
        let demand_template = aggregate(&new_items)?;

        for attempt in 0.. {
            let mut batches = self
                .batches
                .find_for_business_day(&order.shop, day_start, day_end)
                .await?;
            if batches.is_empty() {
                return Err(SettlementError::NoStock {
                    shop: order.shop.clone(),
                    date: millis_to_business_date(order.created_at, tz).to_string(),
                });
            }

            let reverted = revert(&mut batches, &order.items)?;

            // Pending restores count toward availability before the new
            // demand is checked against stockable counters.
            let mut stock_levels = self.load_stock_levels(&new_items).await?;
            for (key, inc) in &reverted.stockable_increments {
                *stock_levels.entry(key.clone()).or_insert(0) += inc;
            }

            let mut demand = demand_template.clone();
            let outcome = allocate(&mut batches, &mut demand, &stock_levels)?;

            let mut deltas = reverted.stockable_increments.clone();
            for (key, dec) in &outcome.stockable_decrements {
                *deltas.entry(key.clone()).or_insert(0) -= dec;
            }

            let modified: BTreeSet<usize> =
                reverted.modified.union(&outcome.modified).copied().collect();

            let mut txn = TxnScript::new();
            push_batch_updates(&mut txn, &batches, &modified)?;
            push_stock_deltas(&mut txn, &deltas)?;

            let rid = order
                .id
                .clone()
                .ok_or_else(|| SettlementError::Database("Order missing id".into()))?;
            let rid_var = txn.bind_record(rid);
            let items_var = txn.bind_value(
                serde_json::to_value(&new_items)
                    .map_err(|e| SettlementError::Database(e.to_string()))?,
            );
            let total_var = txn.bind_value(serde_json::json!(Order::total_of(&new_items)));
            let updated_var = txn.bind_value(serde_json::json!(now_millis()));
            txn.push_guarded(format!(
                "UPDATE {rid_var} SET items = {items_var}, total_amount = {total_var}, \
                 updated_at = {updated_var} RETURN AFTER"
            ));

            match txn.run(&self.db).await {
                Ok(()) => {
                    let order = self.load_order(order_id).await?;
                    tracing::info!(order = %order.order_number, by = %user_id, "Order items updated");
                    return Ok(OrderReceipt {
                        order,
                        needs_refresh: outcome.needs_refresh,
                    });
                }
                Err(e) if is_conflict_error(&e) && attempt + 1 < MAX_COMMIT_ATTEMPTS => {
                    tracing::warn!(attempt, "Settlement conflict on update, retrying");
                    continue;
                }
                Err(e) if is_conflict_error(&e) => {
                    return Err(SettlementError::Conflict(
                        "retries exhausted while updating order".into(),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }
        unreachable!("bounded retry loop always returns");
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    /// Cancel an order, restoring everything it consumed
    pub async fn cancel_order(&self, user_id: &str, order_id: &str) -> SettlementResult<Order> {
        let order = self.load_order(order_id).await?;
        if order.is_terminal() {
            return Err(SettlementError::OrderState(format!(
                "Order {} is already finalized",
                order.order_number
            )));
        }

        let shop = self.load_shop(&order.shop).await?;
        let tz = parse_shop_timezone(&shop)?;
        let (day_start, day_end) = business_day_bounds(order.created_at, tz);

        for attempt in 0.. {
            // Batches may have been deleted since the sale; restore what is
            // still there and always give stockable counters back.
            let mut batches = self
                .batches
                .find_for_business_day(&order.shop, day_start, day_end)
                .await?;
            let reverted = revert(&mut batches, &order.items)?;

            let mut txn = TxnScript::new();
            push_batch_updates(&mut txn, &batches, &reverted.modified)?;
            push_stock_deltas(&mut txn, &reverted.stockable_increments)?;

            let rid = order
                .id
                .clone()
                .ok_or_else(|| SettlementError::Database("Order missing id".into()))?;
            let rid_var = txn.bind_record(rid);
            let payment_var = txn.bind_value(serde_json::json!(PaymentStatus::Cancelled));
            let status_var = txn.bind_value(serde_json::json!(OrderStatus::Cancelled));
            let updated_var = txn.bind_value(serde_json::json!(now_millis()));
            txn.push_guarded(format!(
                "UPDATE {rid_var} SET payment_status = {payment_var}, \
                 order_status = {status_var}, updated_at = {updated_var} RETURN AFTER"
            ));

            match txn.run(&self.db).await {
                Ok(()) => {
                    let order = self.load_order(order_id).await?;
                    tracing::info!(order = %order.order_number, by = %user_id, "Order cancelled");
                    return Ok(order);
                }
                Err(e) if is_conflict_error(&e) && attempt + 1 < MAX_COMMIT_ATTEMPTS => {
                    tracing::warn!(attempt, "Settlement conflict on cancel, retrying");
                    continue;
                }
                Err(e) if is_conflict_error(&e) => {
                    return Err(SettlementError::Conflict(
                        "retries exhausted while cancelling order".into(),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }
        unreachable!("bounded retry loop always returns");
    }

    // =========================================================================
    // Pay
    // =========================================================================

    /// unpaid → paid; no stock effects. The write itself carries the state
    /// guard, so a cancellation landing between our read and this commit
    /// cannot be overwritten.
    pub async fn pay_order(&self, user_id: &str, order_id: &str) -> SettlementResult<Order> {
        let order = self.load_order(order_id).await?;
        let rid = order
            .id
            .clone()
            .ok_or_else(|| SettlementError::Database("Order missing id".into()))?;

        let mut txn = TxnScript::new();
        let rid_var = txn.bind_record(rid);
        let paid_var = txn.bind_value(serde_json::json!(PaymentStatus::Paid));
        let unpaid_var = txn.bind_value(serde_json::json!(PaymentStatus::Unpaid));
        let updated_var = txn.bind_value(serde_json::json!(now_millis()));
        txn.push_guarded(format!(
            "UPDATE {rid_var} SET payment_status = {paid_var}, updated_at = {updated_var} \
             WHERE payment_status = {unpaid_var} RETURN AFTER"
        ));

        match txn.run(&self.db).await {
            Ok(()) => {}
            Err(e) if is_conflict_error(&e) => {
                let current = self.load_order(order_id).await?;
                let reason = match current.payment_status {
                    PaymentStatus::Paid => "already paid",
                    PaymentStatus::Cancelled => "cancelled",
                    PaymentStatus::Unpaid => "not payable",
                };
                return Err(SettlementError::OrderState(format!(
                    "Order {} is {}",
                    current.order_number, reason
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let order = self.load_order(order_id).await?;
        tracing::info!(order = %order.order_number, by = %user_id, "Order paid");
        Ok(order)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load_order(&self, order_id: &str) -> SettlementResult<Order> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("Order {} not found", order_id)))
    }

    async fn load_shop(&self, shop_id: &str) -> SettlementResult<Shop> {
        self.shops
            .find_by_id(shop_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("Shop {} not found", shop_id)))
    }

    /// Snapshot requested lines from the catalog as denormalized order items
    async fn enrich_items(
        &self,
        inputs: &[OrderItemInput],
    ) -> SettlementResult<Vec<OrderItem>> {
        let ids: Vec<String> = inputs.iter().map(|i| i.product_id.clone()).collect();
        let products = self.products.find_by_ids(&ids).await?;
        let by_key: BTreeMap<String, Product> =
            products.into_iter().map(|p| (p.key(), p)).collect();

        let mut items = Vec::with_capacity(inputs.len());
        for input in inputs {
            let key = parse_record_id(PRODUCT_TABLE, &input.product_id)?.to_string();
            let product = by_key.get(&key).ok_or_else(|| {
                SettlementError::NotFound(format!("Product {} not found", input.product_id))
            })?;
            if !product.is_active {
                return Err(SettlementError::Validation(format!(
                    "Product {} is not available",
                    product.name
                )));
            }
            let parent = match &product.parent_product {
                Some(p) => Some(parse_record_id(PRODUCT_TABLE, p)?.to_string()),
                None => None,
            };
            if parent.is_some() && product.plate_type.is_none() {
                return Err(SettlementError::Validation(format!(
                    "Plate variant {} has no plate type",
                    product.name
                )));
            }
            items.push(OrderItem {
                product: key,
                name: product.name.clone(),
                price: product.price,
                quantity: input.quantity,
                is_stock_able: product.is_stock_able,
                parent_product: parent,
                plate_type: product.plate_type,
                deal_products: product.deal_products.clone(),
            });
        }
        Ok(items)
    }

    /// Current stockable counter levels for the given items, keyed like the
    /// demand map. Read once per settlement attempt.
    async fn load_stock_levels(
        &self,
        items: &[OrderItem],
    ) -> SettlementResult<BTreeMap<String, i64>> {
        let ids: Vec<String> = items
            .iter()
            .filter(|i| i.is_stock_able)
            .map(|i| i.product.clone())
            .collect();
        if ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let products = self.products.find_by_ids(&ids).await?;
        Ok(products
            .into_iter()
            .filter(|p| p.is_stock_able)
            .map(|p| (p.key(), p.stock))
            .collect())
    }
}

fn shop_key(shop: &Shop) -> String {
    shop.id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_default()
}

fn parse_shop_timezone(shop: &Shop) -> SettlementResult<Tz> {
    shop.timezone
        .parse::<Tz>()
        .map_err(|_| SettlementError::Validation(format!("Invalid timezone: {}", shop.timezone)))
}

fn next_order_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ORD-{}", suffix[..12].to_uppercase())
}

/// Queue guarded line/version writes for every touched batch
fn push_batch_updates(
    txn: &mut TxnScript,
    batches: &[StockBatch],
    modified: &BTreeSet<usize>,
) -> SettlementResult<()> {
    for &index in modified {
        let batch = &batches[index];
        let Some(id) = batch.id.clone() else {
            continue;
        };
        let rid = txn.bind_record(id);
        let lines = txn.bind_value(
            serde_json::to_value(&batch.lines)
                .map_err(|e| SettlementError::Database(e.to_string()))?,
        );
        let version = txn.bind_value(serde_json::json!(batch.version));
        txn.push_guarded(format!(
            "UPDATE {rid} SET lines = {lines}, version = version + 1 \
             WHERE version = {version}"
        ));
    }
    Ok(())
}

/// Queue stockable counter writes. Decrements are guarded so a counter can
/// never go negative even when a concurrent order slipped in between our
/// read and this commit.
fn push_stock_deltas(
    txn: &mut TxnScript,
    deltas: &BTreeMap<String, i64>,
) -> SettlementResult<()> {
    for (key, net) in deltas {
        if *net == 0 {
            continue;
        }
        let rid = txn.bind_record(parse_record_id(PRODUCT_TABLE, key)?);
        if *net > 0 {
            let amount = txn.bind_value(serde_json::json!(net));
            txn.push(format!("UPDATE {rid} SET stock = stock + {amount}"));
        } else {
            let amount = txn.bind_value(serde_json::json!(-net));
            txn.push_guarded(format!(
                "UPDATE {rid} SET stock = stock - {amount} WHERE stock >= {amount}"
            ));
        }
    }
    Ok(())
}

fn negate(decrements: &BTreeMap<String, i64>) -> BTreeMap<String, i64> {
    decrements.iter().map(|(k, v)| (k.clone(), -v)).collect()
}
