//! 工具模块 - 通用工具函数和类型
//!
//! - [`AppError`] / [`AppResult`] - 应用错误类型和响应映射
//! - [`logger`] - 日志初始化
//! - [`time`] - 营业日时间转换

pub mod error;
pub mod logger;
pub mod time;

pub use error::{AppError, AppResult, ok};
