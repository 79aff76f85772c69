//! Stock Batch API 模块
//!
//! 每日库存批次的录入与管理。创建批次会在同一事务里关闭当天早前批次的
//! plate 线 (可用性翻转)，保证整盘/半盘消耗只落在最新批次上。

mod handler;

use axum::{
    Router,
    routing::get,
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/stock-batches", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        // Day summary (must be before /{id} to avoid path conflicts)
        .route("/today", get(handler::today_summary))
        .route(
            "/{id}",
            get(handler::get_by_id)
                .put(handler::update)
                .delete(handler::delete),
        )
}
