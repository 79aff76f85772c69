//! HTTP API 模块
//!
//! 每个资源一个子模块，统一暴露 `router()`，由
//! [`crate::core::server::build_router`] 合并挂载。

pub mod categories;
pub mod health;
pub mod orders;
pub mod products;
pub mod shops;
pub mod stock_batches;
