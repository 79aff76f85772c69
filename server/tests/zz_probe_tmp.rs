//! Temporary diagnostic probe — not part of the suite; delete after use.

use shared::request::{OrderItemInput, PlaceOrderRequest};
use tiffin_server::db::DbService;
use tiffin_server::db::models::{StockBatch, StockLine};
use tiffin_server::db::repository::{ProductRepository, ShopRepository, StockBatchRepository};
use tiffin_server::settlement::SettlementEngine;
use tiffin_server::utils::time::{business_day_bounds, now_millis};

#[tokio::test]
async fn probe_pay_twice() {
    let service = DbService::memory().await.expect("db");
    let db = service.db;
    let engine = SettlementEngine::new(db.clone());
    let products = ProductRepository::new(db.clone());
    let shops = ShopRepository::new(db.clone());
    let batches = StockBatchRepository::new(db.clone());

    let shop = shops
        .create(tiffin_server::db::models::ShopCreate {
            name: "Test Shop".to_string(),
            timezone: Some("UTC".to_string()),
        })
        .await
        .expect("shop")
        .id
        .expect("shop id")
        .to_string();

    let rice = products
        .create(shared::request::ProductCreateRequest {
            name: "Rice".to_string(),
            price: 4.5,
            unit: None,
            category_id: None,
            plate_type: None,
            parent_product_id: None,
            deal_products: Vec::new(),
            is_stock_able: false,
            stock: 0,
        })
        .await
        .expect("product");

    let created_at = now_millis();
    let (start, end) = business_day_bounds(created_at, chrono_tz::UTC);
    batches
        .create_for_day(
            StockBatch {
                id: None,
                shop: shop.clone(),
                lines: vec![StockLine::plain(rice.key(), "Rice", 20)],
                is_default: false,
                version: 0,
                created_at,
            },
            start,
            end,
        )
        .await
        .expect("batch");

    let receipt = engine
        .place_order(
            "user-1",
            PlaceOrderRequest {
                shop_id: shop.clone(),
                items: vec![OrderItemInput {
                    product_id: rice.key(),
                    quantity: 2,
                }],
                order_date: None,
                payment_method: None,
            },
        )
        .await
        .expect("place");
    let order_id = receipt.order.id.clone().unwrap().to_string();

    let first = engine.pay_order("user-1", &order_id).await;
    println!("FIRST PAY => {:?}", first.as_ref().map(|o| o.payment_status.clone()));

    let second = engine.pay_order("user-1", &order_id).await;
    println!("SECOND PAY => {:?}", second.map(|o| o.payment_status.clone()));
}
