//! Tiffin Server - 多租户门店订单管理后端
//!
//! # 架构概述
//!
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储，按表划分 repository
//! - **库存结算** (`settlement`): 订单生命周期的日库存扣减/回补引擎
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── utils/         # 错误、日志、营业日时间
//! ├── db/            # 数据库层 (models + repository)
//! ├── settlement/    # 库存结算引擎
//! └── api/           # HTTP 路由和处理器
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod settlement;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use settlement::{SettlementEngine, SettlementError};
pub use utils::{AppError, AppResult};
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
  ______ _  ____ ____ _
 /_  __/(_)/ __// __/(_)___
  / /  / // /_ / /_ / // _ \
 / /  / // __// __// // // /
/_/  /_//_/  /_/  /_//_//_/
    "#
    );
}
