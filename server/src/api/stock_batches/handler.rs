//! Stock Batch API Handlers

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use validator::Validate;

use shared::error::ApiResponse;
use shared::request::{StockBatchCreate, StockBatchUpdate, StockLineKindInput};
use shared::response::DailyStockSummaryEntry;

use crate::core::ServerState;
use crate::db::models::{StockBatch, StockLine, StockLineKind};
use crate::db::repository::{ProductRepository, ShopRepository, StockBatchRepository};
use crate::utils::time::{business_day_bounds, now_millis, parse_timezone};
use crate::utils::{AppError, AppResult, ok};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub shop_id: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TodayQuery {
    pub shop_id: String,
}

/// GET /api/stock-batches?shop_id= - 按店铺列出批次 (新→旧)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<StockBatch>>>> {
    let shop = load_shop_key(&state, &query.shop_id).await?.0;
    let repo = StockBatchRepository::new(state.db.clone());
    let batches = repo
        .find_by_shop(
            &shop,
            query.limit.unwrap_or(50).clamp(1, 200),
            query.offset.unwrap_or(0).max(0),
        )
        .await?;
    Ok(ok(batches))
}

/// GET /api/stock-batches/:id - 获取单个批次
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<StockBatch>>> {
    let repo = StockBatchRepository::new(state.db.clone());
    let batch = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Stock batch {} not found", id)))?;
    Ok(ok(batch))
}

/// POST /api/stock-batches - 录入当日批次
///
/// 商品名称在此冗余到库存线上；批次归属的营业日由店铺时区决定。
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<StockBatchCreate>,
) -> AppResult<Json<ApiResponse<StockBatch>>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let (shop_key, timezone) = load_shop_key(&state, &payload.shop_id).await?;
    let tz = parse_timezone(&timezone)?;

    let products = ProductRepository::new(state.db.clone());
    let mut lines = Vec::with_capacity(payload.lines.len());
    for input in &payload.lines {
        let product = products
            .find_by_id(&input.product_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Product {} not found", input.product_id))
            })?;
        let line = match input.kind {
            StockLineKindInput::Plain => {
                StockLine::plain(product.key(), product.name.clone(), input.quantity)
            }
            StockLineKindInput::PlateCapable => {
                StockLine::plate_capable(product.key(), product.name.clone(), input.quantity, true)
            }
        };
        lines.push(line);
    }

    let created_at = now_millis();
    let (day_start, day_end) = business_day_bounds(created_at, tz);
    let repo = StockBatchRepository::new(state.db.clone());
    let batch = repo
        .create_for_day(
            StockBatch {
                id: None,
                shop: shop_key,
                lines,
                is_default: false,
                version: 0,
                created_at,
            },
            day_start,
            day_end,
        )
        .await?;

    let batch = if payload.is_default {
        let id = batch
            .id
            .as_ref()
            .ok_or_else(|| AppError::database("Created batch missing id"))?
            .to_string();
        repo.set_default(&id).await?
    } else {
        batch
    };

    Ok(ok(batch))
}

/// GET /api/stock-batches/today?shop_id= - 当日库存汇总
///
/// plain 线跨批次合并数量与消耗；plate 线取当前可用线的计数器。
pub async fn today_summary(
    State(state): State<ServerState>,
    Query(query): Query<TodayQuery>,
) -> AppResult<Json<ApiResponse<Vec<DailyStockSummaryEntry>>>> {
    let (shop_key, timezone) = load_shop_key(&state, &query.shop_id).await?;
    let tz = parse_timezone(&timezone)?;
    let (day_start, day_end) = business_day_bounds(now_millis(), tz);

    let repo = StockBatchRepository::new(state.db.clone());
    let batches = repo
        .find_for_business_day(&shop_key, day_start, day_end)
        .await?;

    let mut entries: BTreeMap<String, DailyStockSummaryEntry> = BTreeMap::new();
    for batch in &batches {
        for line in &batch.lines {
            let entry = entries
                .entry(line.product.clone())
                .or_insert_with(|| DailyStockSummaryEntry::new(line.product.clone(), line.name.clone()));
            match &line.kind {
                StockLineKind::Plain { consumed } => {
                    entry.quantity += line.quantity;
                    entry.consumed += consumed;
                }
                StockLineKind::PlateCapable {
                    full_consumed,
                    half_consumed,
                    is_available,
                } => {
                    entry.plate_line_count += 1;
                    // Later batches win; the open line's counters are the
                    // ones the operator is selling against right now.
                    if *is_available || entry.is_available != Some(true) {
                        entry.full_plate_consumed = Some(*full_consumed);
                        entry.half_plate_consumed = Some(*half_consumed);
                    }
                    entry.is_available =
                        Some(entry.is_available.unwrap_or(false) || *is_available);
                }
            }
        }
    }

    Ok(ok(entries.into_values().collect()))
}

/// PUT /api/stock-batches/:id - 更新批次 (默认标记 / plate 线可用性)
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<StockBatchUpdate>,
) -> AppResult<Json<ApiResponse<StockBatch>>> {
    let repo = StockBatchRepository::new(state.db.clone());

    if let Some(toggle) = &payload.set_available {
        let products = ProductRepository::new(state.db.clone());
        let product = products
            .find_by_id(&toggle.product_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Product {} not found", toggle.product_id))
            })?;
        repo.set_line_availability(&id, &product.key(), toggle.is_available)
            .await?;
    }

    match payload.is_default {
        Some(true) => {
            repo.set_default(&id).await?;
        }
        Some(false) => {
            repo.unset_default(&id).await?;
        }
        None => {}
    }

    let batch = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Stock batch {} not found", id)))?;
    Ok(ok(batch))
}

/// DELETE /api/stock-batches/:id - 删除批次
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<bool>>> {
    let repo = StockBatchRepository::new(state.db.clone());
    let result = repo.delete(&id).await?;
    Ok(ok(result))
}

/// Resolve a shop reference to its ("shop:id", timezone) pair
async fn load_shop_key(state: &ServerState, shop_id: &str) -> AppResult<(String, String)> {
    let shops = ShopRepository::new(state.db.clone());
    let shop = shops
        .find_by_id(shop_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Shop {} not found", shop_id)))?;
    let key = shop
        .id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_default();
    Ok((key, shop.timezone))
}
