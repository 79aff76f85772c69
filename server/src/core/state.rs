//! 服务器状态
//!
//! ServerState 持有所有共享服务的引用，使用 Arc/Clone 浅拷贝传递给
//! axum handler。

use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::core::Config;
use crate::db::DbService;
use crate::settlement::SettlementEngine;
use crate::utils::AppError;

/// 服务器状态 - 持有所有服务的单例引用
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Surreal<Db> | 嵌入式数据库 |
/// | settlement | Arc<SettlementEngine> | 库存结算引擎 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SurrealDB)
    pub db: Surreal<Db>,
    /// 库存结算引擎
    pub settlement: Arc<SettlementEngine>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/database/tiffin.db)
    /// 3. 库存结算引擎
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::Internal(format!("Failed to create work directory: {e}")))?;

        let db_path = config.database_dir().join("tiffin.db");
        let db_service = DbService::new(&db_path.to_string_lossy()).await?;
        let db = db_service.db;

        let settlement = Arc::new(SettlementEngine::new(db.clone()));

        Ok(Self {
            config: config.clone(),
            db,
            settlement,
        })
    }

    /// 基于已有数据库连接构造状态 (测试用)
    pub fn with_db(config: Config, db: Surreal<Db>) -> Self {
        let settlement = Arc::new(SettlementEngine::new(db.clone()));
        Self {
            config,
            db,
            settlement,
        }
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }
}
