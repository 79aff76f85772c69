//! 统一 API 响应结构和错误码
//!
//! 服务端和客户端共用的错误码约定：
//!
//! | 前缀 | 分类 | 示例 |
//! |------|------|------|
//! | E0xxx | 业务逻辑错误 | E0003 资源不存在 |
//! | E4xxx | 库存结算错误 | E4001 当日无库存 |
//! | E9xxx | 系统错误 | E9002 数据库错误 |

use serde::{Deserialize, Serialize};

/// Stable error codes carried in [`ApiResponse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// E0000 成功
    #[serde(rename = "E0000")]
    Ok,
    /// E0002 验证失败
    #[serde(rename = "E0002")]
    Validation,
    /// E0003 资源不存在
    #[serde(rename = "E0003")]
    NotFound,
    /// E0004 资源冲突
    #[serde(rename = "E0004")]
    Conflict,
    /// E4001 当日未配置库存
    #[serde(rename = "E4001")]
    NoStock,
    /// E4002 库存不足
    #[serde(rename = "E4002")]
    InsufficientStock,
    /// E4003 订单状态不允许操作
    #[serde(rename = "E4003")]
    OrderState,
    /// E9001 内部错误
    #[serde(rename = "E9001")]
    Internal,
    /// E9002 数据库错误
    #[serde(rename = "E9002")]
    Database,
}

/// API 统一响应结构
///
/// ```json
/// {
///   "code": "E0000",
///   "message": "Success",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            code: ErrorCode::Ok,
            message: "Success".to_string(),
            data: Some(data),
        }
    }

    /// 创建错误响应
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}
