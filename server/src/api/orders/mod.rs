//! Order API 模块
//!
//! 订单的创建/改单/取消/支付都经过库存结算引擎，
//! 订单文档与库存副作用在同一事务提交。

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/items", put(handler::update_items))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/pay", post(handler::pay))
}
