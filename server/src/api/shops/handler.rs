//! Shop API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::ApiResponse;

use crate::core::ServerState;
use crate::db::models::{Shop, ShopCreate, ShopUpdate};
use crate::db::repository::ShopRepository;
use crate::utils::time::parse_timezone;
use crate::utils::{AppError, AppResult, ok};

/// GET /api/shops - 获取所有店铺
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<ApiResponse<Vec<Shop>>>> {
    let repo = ShopRepository::new(state.db.clone());
    let shops = repo.find_all().await?;
    Ok(ok(shops))
}

/// GET /api/shops/:id - 获取单个店铺
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let repo = ShopRepository::new(state.db.clone());
    let shop = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Shop {} not found", id)))?;
    Ok(ok(shop))
}

/// POST /api/shops - 创建店铺
///
/// 时区必须是合法 IANA 名称，营业日边界依赖它。
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ShopCreate>,
) -> AppResult<Json<ApiResponse<Shop>>> {
    if let Some(tz) = &payload.timezone {
        parse_timezone(tz)?;
    }
    let repo = ShopRepository::new(state.db.clone());
    let shop = repo.create(payload).await?;
    Ok(ok(shop))
}

/// PUT /api/shops/:id - 更新店铺
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<ShopUpdate>,
) -> AppResult<Json<ApiResponse<Shop>>> {
    if let Some(tz) = &payload.timezone {
        parse_timezone(tz)?;
    }
    let repo = ShopRepository::new(state.db.clone());
    let shop = repo.update(&id, payload).await?;
    Ok(ok(shop))
}

/// DELETE /api/shops/:id - 删除店铺 (软删除)
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<bool>>> {
    let repo = ShopRepository::new(state.db.clone());
    let result = repo.delete(&id).await?;
    Ok(ok(result))
}
