//! Settlement engine end-to-end tests against an in-memory database
//!
//! Each test owns its own database; no shared state between tests.

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use shared::request::{OrderItemInput, PlaceOrderRequest, UpdateOrderItemsRequest};
use shared::types::{OrderStatus, PaymentStatus, PlateType};

use crate::db::DbService;
use crate::db::models::{Product, StockBatch, StockLine, StockLineKind};
use crate::db::repository::{ProductRepository, ShopRepository, StockBatchRepository};
use crate::utils::time::{business_day_bounds, now_millis};

use super::engine::SettlementEngine;
use super::error::SettlementError;

struct TestCtx {
    db: Surreal<Db>,
    engine: SettlementEngine,
    products: ProductRepository,
    shops: ShopRepository,
    batches: StockBatchRepository,
}

async fn setup() -> TestCtx {
    let service = DbService::memory().await.expect("in-memory db");
    let db = service.db;
    TestCtx {
        engine: SettlementEngine::new(db.clone()),
        products: ProductRepository::new(db.clone()),
        shops: ShopRepository::new(db.clone()),
        batches: StockBatchRepository::new(db.clone()),
        db,
    }
}

async fn seed_shop(ctx: &TestCtx) -> String {
    let shop = ctx
        .shops
        .create(crate::db::models::ShopCreate {
            name: "Test Shop".to_string(),
            timezone: Some("UTC".to_string()),
        })
        .await
        .expect("create shop");
    shop.id.expect("shop id").to_string()
}

async fn seed_product(ctx: &TestCtx, name: &str, price: f64) -> Product {
    ctx.products
        .create(shared::request::ProductCreateRequest {
            name: name.to_string(),
            price,
            unit: None,
            category_id: None,
            plate_type: None,
            parent_product_id: None,
            deal_products: Vec::new(),
            is_stock_able: false,
            stock: 0,
        })
        .await
        .expect("create product")
}

async fn seed_stockable(ctx: &TestCtx, name: &str, price: f64, stock: i64) -> Product {
    ctx.products
        .create(shared::request::ProductCreateRequest {
            name: name.to_string(),
            price,
            unit: None,
            category_id: None,
            plate_type: None,
            parent_product_id: None,
            deal_products: Vec::new(),
            is_stock_able: true,
            stock,
        })
        .await
        .expect("create stockable product")
}

async fn seed_plate_variant(
    ctx: &TestCtx,
    name: &str,
    price: f64,
    parent: &Product,
    plate_type: PlateType,
) -> Product {
    ctx.products
        .create(shared::request::ProductCreateRequest {
            name: name.to_string(),
            price,
            unit: None,
            category_id: None,
            plate_type: Some(plate_type),
            parent_product_id: Some(parent.key()),
            deal_products: Vec::new(),
            is_stock_able: false,
            stock: 0,
        })
        .await
        .expect("create plate variant")
}

async fn seed_batch(ctx: &TestCtx, shop: &str, lines: Vec<StockLine>) -> StockBatch {
    let created_at = now_millis();
    let (start, end) = business_day_bounds(created_at, chrono_tz::UTC);
    ctx.batches
        .create_for_day(
            StockBatch {
                id: None,
                shop: shop.to_string(),
                lines,
                is_default: false,
                version: 0,
                created_at,
            },
            start,
            end,
        )
        .await
        .expect("create batch")
}

fn order_request(shop: &str, items: Vec<(&Product, i64)>) -> PlaceOrderRequest {
    PlaceOrderRequest {
        shop_id: shop.to_string(),
        items: items
            .into_iter()
            .map(|(product, quantity)| OrderItemInput {
                product_id: product.key(),
                quantity,
            })
            .collect(),
        order_date: None,
        payment_method: None,
    }
}

async fn reload_batch(ctx: &TestCtx, batch: &StockBatch) -> StockBatch {
    ctx.batches
        .find_by_id(&batch.id.clone().expect("batch id").to_string())
        .await
        .expect("reload batch")
        .expect("batch exists")
}

async fn reload_product(ctx: &TestCtx, product: &Product) -> Product {
    ctx.products
        .find_by_id(&product.key())
        .await
        .expect("reload product")
        .expect("product exists")
}

fn plain_consumed(batch: &StockBatch, product: &Product) -> i64 {
    batch
        .lines
        .iter()
        .filter(|l| l.product == product.key())
        .map(|l| match &l.kind {
            StockLineKind::Plain { consumed } => *consumed,
            StockLineKind::PlateCapable { .. } => 0,
        })
        .sum()
}

fn plate_counters(batch: &StockBatch, product: &Product) -> (i64, i64) {
    for line in &batch.lines {
        if line.product == product.key()
            && let StockLineKind::PlateCapable {
                full_consumed,
                half_consumed,
                ..
            } = &line.kind
        {
            return (*full_consumed, *half_consumed);
        }
    }
    (0, 0)
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn place_order_consumes_batch_and_persists_order() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let rice = seed_product(&ctx, "Rice", 4.5).await;
    let batch = seed_batch(&ctx, &shop, vec![StockLine::plain(rice.key(), "Rice", 20)]).await;

    let receipt = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&rice, 4)]))
        .await
        .expect("place order");

    assert_eq!(receipt.order.payment_status, PaymentStatus::Unpaid);
    assert_eq!(receipt.order.order_status, OrderStatus::Pending);
    assert_eq!(receipt.order.total_amount, 18.0);
    assert_eq!(receipt.order.items.len(), 1);
    assert!(!receipt.needs_refresh);

    let after = reload_batch(&ctx, &batch).await;
    assert_eq!(plain_consumed(&after, &rice), 4);
    assert_eq!(after.version, batch.version + 1);
}

#[tokio::test]
async fn demand_spills_to_second_batch_oldest_first() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let rice = seed_product(&ctx, "Rice", 4.5).await;
    let first = seed_batch(&ctx, &shop, vec![StockLine::plain(rice.key(), "Rice", 10)]).await;
    let second = seed_batch(&ctx, &shop, vec![StockLine::plain(rice.key(), "Rice", 5)]).await;

    ctx.engine
        .place_order("user-1", order_request(&shop, vec![(&rice, 12)]))
        .await
        .expect("place order");

    assert_eq!(plain_consumed(&reload_batch(&ctx, &first).await, &rice), 10);
    assert_eq!(plain_consumed(&reload_batch(&ctx, &second).await, &rice), 2);
}

#[tokio::test]
async fn no_batch_for_the_day_aborts_with_no_stock() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let rice = seed_product(&ctx, "Rice", 4.5).await;

    let err = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&rice, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::NoStock { .. }));
}

#[tokio::test]
async fn insufficient_stock_leaves_nothing_modified() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let rice = seed_product(&ctx, "Rice", 4.5).await;
    let naan = seed_product(&ctx, "Naan", 1.5).await;
    let batch = seed_batch(
        &ctx,
        &shop,
        vec![
            StockLine::plain(rice.key(), "Rice", 20),
            StockLine::plain(naan.key(), "Naan", 2),
        ],
    )
    .await;

    let err = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&rice, 4), (&naan, 5)]))
        .await
        .unwrap_err();
    match err {
        SettlementError::InsufficientStock { products } => {
            assert_eq!(products, vec!["Naan".to_string()]);
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }

    // All-or-nothing: the satisfiable rice line was not committed either
    let after = reload_batch(&ctx, &batch).await;
    assert_eq!(plain_consumed(&after, &rice), 0);
    assert_eq!(plain_consumed(&after, &naan), 0);
    assert_eq!(after.version, batch.version);

    let orders = crate::db::repository::OrderRepository::new(ctx.db.clone())
        .find_all(None, None, 10, 0)
        .await
        .expect("list orders");
    assert!(orders.is_empty());
}

#[tokio::test]
async fn low_stock_batch_raises_refresh_flag() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let rice = seed_product(&ctx, "Rice", 4.5).await;
    seed_batch(&ctx, &shop, vec![StockLine::plain(rice.key(), "Rice", 10)]).await;

    let receipt = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&rice, 1)]))
        .await
        .expect("place order");
    assert!(receipt.needs_refresh);
}

// =============================================================================
// Stockable products
// =============================================================================

#[tokio::test]
async fn stockable_counter_decrements_and_restores() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let soda = seed_stockable(&ctx, "Soda", 2.0, 10).await;
    seed_batch(&ctx, &shop, vec![StockLine::plain(soda.key(), "Soda", 50)]).await;

    let receipt = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&soda, 4)]))
        .await
        .expect("place order");
    assert_eq!(reload_product(&ctx, &soda).await.stock, 6);

    ctx.engine
        .cancel_order("user-1", &receipt.order.id.clone().unwrap().to_string())
        .await
        .expect("cancel order");
    assert_eq!(reload_product(&ctx, &soda).await.stock, 10);
}

#[tokio::test]
async fn stockable_shortfall_rejects_the_order() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let soda = seed_stockable(&ctx, "Soda", 2.0, 3).await;
    seed_batch(&ctx, &shop, vec![StockLine::plain(soda.key(), "Soda", 50)]).await;

    let err = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&soda, 4)]))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::InsufficientStock { .. }));
    assert_eq!(reload_product(&ctx, &soda).await.stock, 3);
}

// =============================================================================
// Plate variants
// =============================================================================

#[tokio::test]
async fn plate_order_consumes_counters_and_cancel_restores_them() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let karahi = seed_product(&ctx, "Karahi", 0.0).await;
    let full = seed_plate_variant(&ctx, "Karahi Full", 12.0, &karahi, PlateType::Full).await;
    let half = seed_plate_variant(&ctx, "Karahi Half", 7.0, &karahi, PlateType::Half).await;
    let batch = seed_batch(
        &ctx,
        &shop,
        vec![StockLine::plate_capable(karahi.key(), "Karahi", 20, true)],
    )
    .await;

    let receipt = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&full, 3), (&half, 2)]))
        .await
        .expect("place order");
    assert_eq!(
        plate_counters(&reload_batch(&ctx, &batch).await, &karahi),
        (3, 2)
    );

    ctx.engine
        .cancel_order("user-1", &receipt.order.id.clone().unwrap().to_string())
        .await
        .expect("cancel order");
    assert_eq!(
        plate_counters(&reload_batch(&ctx, &batch).await, &karahi),
        (0, 0)
    );
}

#[tokio::test]
async fn closed_plate_line_rejects_plate_orders() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let karahi = seed_product(&ctx, "Karahi", 0.0).await;
    let full = seed_plate_variant(&ctx, "Karahi Full", 12.0, &karahi, PlateType::Full).await;
    let batch = seed_batch(
        &ctx,
        &shop,
        vec![StockLine::plate_capable(karahi.key(), "Karahi", 20, true)],
    )
    .await;
    ctx.batches
        .set_line_availability(
            &batch.id.clone().unwrap().to_string(),
            &karahi.key(),
            false,
        )
        .await
        .expect("close plate line");

    let err = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&full, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::InsufficientStock { .. }));
}

#[tokio::test]
async fn new_plate_batch_closes_earlier_same_day_plate_lines() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let karahi = seed_product(&ctx, "Karahi", 0.0).await;
    let first = seed_batch(
        &ctx,
        &shop,
        vec![StockLine::plate_capable(karahi.key(), "Karahi", 20, true)],
    )
    .await;
    seed_batch(
        &ctx,
        &shop,
        vec![StockLine::plate_capable(karahi.key(), "Karahi", 20, true)],
    )
    .await;

    let after = reload_batch(&ctx, &first).await;
    match &after.lines[0].kind {
        StockLineKind::PlateCapable { is_available, .. } => assert!(!is_available),
        _ => unreachable!(),
    }
}

// =============================================================================
// Deal bundles
// =============================================================================

#[tokio::test]
async fn deal_bundle_consumes_component_stock() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let naan = seed_product(&ctx, "Naan", 1.5).await;
    let combo = ctx
        .products
        .create(shared::request::ProductCreateRequest {
            name: "Family Combo".to_string(),
            price: 25.0,
            unit: None,
            category_id: None,
            plate_type: None,
            parent_product_id: None,
            deal_products: vec![shared::request::DealComponentInput {
                product_id: naan.key(),
                quantity: 2,
            }],
            is_stock_able: false,
            stock: 0,
        })
        .await
        .expect("create combo");
    let batch = seed_batch(
        &ctx,
        &shop,
        vec![
            StockLine::plain(combo.key(), "Family Combo", 20),
            StockLine::plain(naan.key(), "Naan", 20),
        ],
    )
    .await;

    let receipt = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&combo, 3)]))
        .await
        .expect("place order");

    let after = reload_batch(&ctx, &batch).await;
    assert_eq!(plain_consumed(&after, &combo), 3);
    assert_eq!(plain_consumed(&after, &naan), 6);

    // Cancellation restores the expanded component demand too
    ctx.engine
        .cancel_order("user-1", &receipt.order.id.clone().unwrap().to_string())
        .await
        .expect("cancel order");
    let restored = reload_batch(&ctx, &batch).await;
    assert_eq!(plain_consumed(&restored, &combo), 0);
    assert_eq!(plain_consumed(&restored, &naan), 0);
}

// =============================================================================
// Update / cancel / pay lifecycle
// =============================================================================

#[tokio::test]
async fn update_reverts_old_items_and_allocates_new_ones() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let rice = seed_product(&ctx, "Rice", 4.5).await;
    let naan = seed_product(&ctx, "Naan", 1.5).await;
    let batch = seed_batch(
        &ctx,
        &shop,
        vec![
            StockLine::plain(rice.key(), "Rice", 20),
            StockLine::plain(naan.key(), "Naan", 20),
        ],
    )
    .await;

    let receipt = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&rice, 6)]))
        .await
        .expect("place order");

    let updated = ctx
        .engine
        .update_order_items(
            "user-1",
            &receipt.order.id.clone().unwrap().to_string(),
            UpdateOrderItemsRequest {
                items: vec![OrderItemInput {
                    product_id: naan.key(),
                    quantity: 2,
                }],
            },
        )
        .await
        .expect("update order");

    assert_eq!(updated.order.total_amount, 3.0);
    assert_eq!(updated.order.items.len(), 1);

    let after = reload_batch(&ctx, &batch).await;
    assert_eq!(plain_consumed(&after, &rice), 0);
    assert_eq!(plain_consumed(&after, &naan), 2);
}

#[tokio::test]
async fn failed_update_leaves_original_order_and_stock_untouched() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let rice = seed_product(&ctx, "Rice", 4.5).await;
    let naan = seed_product(&ctx, "Naan", 1.5).await;
    let batch = seed_batch(
        &ctx,
        &shop,
        vec![
            StockLine::plain(rice.key(), "Rice", 20),
            StockLine::plain(naan.key(), "Naan", 3),
        ],
    )
    .await;

    let receipt = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&rice, 6)]))
        .await
        .expect("place order");
    let order_id = receipt.order.id.clone().unwrap().to_string();

    let err = ctx
        .engine
        .update_order_items(
            "user-1",
            &order_id,
            UpdateOrderItemsRequest {
                items: vec![OrderItemInput {
                    product_id: naan.key(),
                    quantity: 5,
                }],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::InsufficientStock { .. }));

    // Revert was in-memory only; the original consumption stands
    let after = reload_batch(&ctx, &batch).await;
    assert_eq!(plain_consumed(&after, &rice), 6);
    assert_eq!(plain_consumed(&after, &naan), 0);

    let order = crate::db::repository::OrderRepository::new(ctx.db.clone())
        .find_by_id(&order_id)
        .await
        .expect("find order")
        .expect("order exists");
    assert_eq!(order.items[0].product, rice.key());
    assert_eq!(order.total_amount, 27.0);
}

#[tokio::test]
async fn update_after_day_batches_deleted_reports_no_stock() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let rice = seed_product(&ctx, "Rice", 4.5).await;
    let batch = seed_batch(&ctx, &shop, vec![StockLine::plain(rice.key(), "Rice", 20)]).await;

    let receipt = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&rice, 6)]))
        .await
        .expect("place order");
    let order_id = receipt.order.id.clone().unwrap().to_string();

    ctx.batches
        .delete(&batch.id.clone().unwrap().to_string())
        .await
        .expect("delete batch");

    // Nothing left to settle against: this is a configuration problem, not
    // zero availability
    let err = ctx
        .engine
        .update_order_items(
            "user-1",
            &order_id,
            UpdateOrderItemsRequest {
                items: vec![OrderItemInput {
                    product_id: rice.key(),
                    quantity: 2,
                }],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::NoStock { .. }));

    let order = crate::db::repository::OrderRepository::new(ctx.db.clone())
        .find_by_id(&order_id)
        .await
        .expect("find order")
        .expect("order exists");
    assert_eq!(order.total_amount, 27.0);
    assert_eq!(order.items[0].quantity, 6);
}

#[tokio::test]
async fn cancel_flips_status_and_conserves_stock() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let rice = seed_product(&ctx, "Rice", 4.5).await;
    let batch = seed_batch(&ctx, &shop, vec![StockLine::plain(rice.key(), "Rice", 20)]).await;

    let receipt = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&rice, 6)]))
        .await
        .expect("place order");
    let order_id = receipt.order.id.clone().unwrap().to_string();

    let cancelled = ctx.engine.cancel_order("user-1", &order_id).await.expect("cancel");
    assert_eq!(cancelled.payment_status, PaymentStatus::Cancelled);
    assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
    assert_eq!(plain_consumed(&reload_batch(&ctx, &batch).await, &rice), 0);

    // Terminal: neither cancel nor update is allowed any more
    assert!(matches!(
        ctx.engine.cancel_order("user-1", &order_id).await,
        Err(SettlementError::OrderState(_))
    ));
    assert!(matches!(
        ctx.engine
            .update_order_items(
                "user-1",
                &order_id,
                UpdateOrderItemsRequest {
                    items: vec![OrderItemInput {
                        product_id: rice.key(),
                        quantity: 1,
                    }],
                },
            )
            .await,
        Err(SettlementError::OrderState(_))
    ));
}

#[tokio::test]
async fn pay_transitions_once_and_paid_orders_can_still_cancel() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let rice = seed_product(&ctx, "Rice", 4.5).await;
    seed_batch(&ctx, &shop, vec![StockLine::plain(rice.key(), "Rice", 20)]).await;

    let receipt = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&rice, 2)]))
        .await
        .expect("place order");
    let order_id = receipt.order.id.clone().unwrap().to_string();

    let paid = ctx.engine.pay_order("user-1", &order_id).await.expect("pay");
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    assert!(matches!(
        ctx.engine.pay_order("user-1", &order_id).await,
        Err(SettlementError::OrderState(_))
    ));

    let cancelled = ctx.engine.cancel_order("user-1", &order_id).await.expect("cancel");
    assert_eq!(cancelled.payment_status, PaymentStatus::Cancelled);

    assert!(matches!(
        ctx.engine.pay_order("user-1", &order_id).await,
        Err(SettlementError::OrderState(_))
    ));
}

#[tokio::test]
async fn pay_never_resurrects_a_cancelled_order() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let rice = seed_product(&ctx, "Rice", 4.5).await;
    seed_batch(&ctx, &shop, vec![StockLine::plain(rice.key(), "Rice", 20)]).await;

    let receipt = ctx
        .engine
        .place_order("user-1", order_request(&shop, vec![(&rice, 2)]))
        .await
        .expect("place order");
    let order_id = receipt.order.id.clone().unwrap().to_string();

    ctx.engine
        .cancel_order("user-1", &order_id)
        .await
        .expect("cancel");

    // The pay write is guarded on `unpaid`; a terminal order stays terminal
    assert!(matches!(
        ctx.engine.pay_order("user-1", &order_id).await,
        Err(SettlementError::OrderState(_))
    ));

    let order = crate::db::repository::OrderRepository::new(ctx.db.clone())
        .find_by_id(&order_id)
        .await
        .expect("find order")
        .expect("order exists");
    assert_eq!(order.payment_status, PaymentStatus::Cancelled);
    assert_eq!(order.order_status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn unknown_product_is_rejected_before_any_write() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let rice = seed_product(&ctx, "Rice", 4.5).await;
    seed_batch(&ctx, &shop, vec![StockLine::plain(rice.key(), "Rice", 20)]).await;

    let err = ctx
        .engine
        .place_order(
            "user-1",
            PlaceOrderRequest {
                shop_id: shop.clone(),
                items: vec![OrderItemInput {
                    product_id: "product:doesnotexist".to_string(),
                    quantity: 1,
                }],
                order_date: None,
                payment_method: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::NotFound(_)));
}

#[tokio::test]
async fn allocation_split_is_deterministic_across_runs() {
    for _ in 0..2 {
        let ctx = setup().await;
        let shop = seed_shop(&ctx).await;
        let rice = seed_product(&ctx, "Rice", 4.5).await;
        let first = seed_batch(&ctx, &shop, vec![StockLine::plain(rice.key(), "Rice", 7)]).await;
        let second = seed_batch(&ctx, &shop, vec![StockLine::plain(rice.key(), "Rice", 7)]).await;

        ctx.engine
            .place_order("user-1", order_request(&shop, vec![(&rice, 9)]))
            .await
            .expect("place order");

        assert_eq!(plain_consumed(&reload_batch(&ctx, &first).await, &rice), 7);
        assert_eq!(plain_consumed(&reload_batch(&ctx, &second).await, &rice), 2);
    }
}

#[tokio::test]
async fn concurrent_orders_never_oversell() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let rice = seed_product(&ctx, "Rice", 4.5).await;
    let batch = seed_batch(&ctx, &shop, vec![StockLine::plain(rice.key(), "Rice", 10)]).await;

    let mut handles = Vec::new();
    for i in 0..4 {
        let engine = ctx.engine.clone();
        let req = order_request(&shop, vec![(&rice, 4)]);
        let user = format!("user-{i}");
        handles.push(tokio::spawn(async move {
            engine.place_order(&user, req).await
        }));
    }

    let mut placed: i64 = 0;
    for handle in handles {
        if handle.await.expect("join").is_ok() {
            placed += 1;
        }
    }

    // 10 units can satisfy at most two 4-unit orders
    assert!(placed <= 2, "placed {} orders against 10 units", placed);
    let consumed = plain_consumed(&reload_batch(&ctx, &batch).await, &rice);
    assert_eq!(consumed, placed * 4);
    assert!(consumed <= 10);
}

#[tokio::test]
async fn concurrent_stockable_orders_surface_shortfall_not_conflict() {
    let ctx = setup().await;
    let shop = seed_shop(&ctx).await;
    let soda = seed_stockable(&ctx, "Soda", 2.0, 5).await;
    seed_batch(&ctx, &shop, vec![StockLine::plain(soda.key(), "Soda", 50)]).await;

    let mut handles = Vec::new();
    for i in 0..2 {
        let engine = ctx.engine.clone();
        let req = order_request(&shop, vec![(&soda, 3)]);
        let user = format!("user-{i}");
        handles.push(tokio::spawn(async move {
            engine.place_order(&user, req).await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await.expect("join") {
            Ok(_) => placed += 1,
            // The loser re-reads counter levels on retry, so the shortfall
            // comes back as a business error, not a retry exhaustion
            Err(err) => assert!(
                matches!(err, SettlementError::InsufficientStock { .. }),
                "expected InsufficientStock, got {:?}",
                err
            ),
        }
    }

    assert_eq!(placed, 1);
    assert_eq!(reload_product(&ctx, &soda).await.stock, 2);
}
