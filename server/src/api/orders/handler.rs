//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use shared::error::ApiResponse;
use shared::request::{PlaceOrderRequest, UpdateOrderItemsRequest};

use crate::core::ServerState;
use crate::db::models::Order;
use crate::db::repository::OrderRepository;
use crate::utils::{AppError, AppResult, ok};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub shop_id: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Settlement result: the committed order plus the low-stock signal the
/// operator UI turns into a "refresh stock" prompt.
#[derive(Debug, Serialize)]
pub struct SettledOrderResponse {
    pub order: Order,
    pub needs_refresh: bool,
}

/// 调用方身份；无认证层时退化为 anonymous
fn caller_id(headers: &HeaderMap) -> String {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string()
}

/// GET /api/orders - 订单列表 (新→旧，可按店铺/用户过滤)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let repo = OrderRepository::new(state.db.clone());
    let orders = repo
        .find_all(
            query.shop_id,
            query.user_id,
            query.limit.unwrap_or(50).clamp(1, 200),
            query.offset.unwrap_or(0).max(0),
        )
        .await?;
    Ok(ok(orders))
}

/// GET /api/orders/:id - 获取单个订单
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let repo = OrderRepository::new(state.db.clone());
    let order = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {} not found", id)))?;
    Ok(ok(order))
}

/// POST /api/orders - 下单 (结算 + 创建)
pub async fn create(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(payload): Json<PlaceOrderRequest>,
) -> AppResult<Json<ApiResponse<SettledOrderResponse>>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let receipt = state.settlement.place_order(&caller_id(&headers), payload).await?;
    Ok(ok(SettledOrderResponse {
        order: receipt.order,
        needs_refresh: receipt.needs_refresh,
    }))
}

/// PUT /api/orders/:id/items - 改单 (回滚旧明细再按原营业日重新结算)
pub async fn update_items(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateOrderItemsRequest>,
) -> AppResult<Json<ApiResponse<SettledOrderResponse>>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let receipt = state
        .settlement
        .update_order_items(&caller_id(&headers), &id, payload)
        .await?;
    Ok(ok(SettledOrderResponse {
        order: receipt.order,
        needs_refresh: receipt.needs_refresh,
    }))
}

/// POST /api/orders/:id/cancel - 取消订单并返还库存
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.settlement.cancel_order(&caller_id(&headers), &id).await?;
    Ok(ok(order))
}

/// POST /api/orders/:id/pay - 标记已支付 (unpaid → paid)
pub async fn pay(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.settlement.pay_order(&caller_id(&headers), &id).await?;
    Ok(ok(order))
}
