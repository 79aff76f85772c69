//! 统一错误处理
//!
//! 提供应用级错误类型和 HTTP 响应映射：
//! - [`AppError`] - 应用错误枚举
//! - [`AppResult`] - handler 层 Result 别名
//!
//! 库存结算错误 ([`SettlementError`]) 在此统一映射为 HTTP 状态码：
//! 验证 → 400，不存在 → 404，订单状态 → 409，无库存/库存不足 → 422，
//! 并发冲突/数据库 → 5xx。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shared::error::{ApiResponse, ErrorCode};
use tracing::error;

use crate::db::repository::RepoError;
use crate::settlement::SettlementError;

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== 业务逻辑错误 (4xx) ==========
    #[error("Resource not found: {0}")]
    /// 资源不存在 (404)
    NotFound(String),

    #[error("Resource conflict: {0}")]
    /// 资源冲突 (409)
    Conflict(String),

    #[error("Validation failed: {0}")]
    /// 验证失败 (400)
    Validation(String),

    #[error(transparent)]
    /// 库存结算错误 (按变体映射)
    Settlement(#[from] SettlementError),

    // ========== 系统错误 (5xx) ==========
    #[error("Database error: {0}")]
    /// 数据库错误 (500)
    Database(String),

    #[error("Internal server error: {0}")]
    /// 内部错误 (500)
    Internal(String),
}

/// handler 层 Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Settlement 错误 → (HTTP 状态, 业务错误码)
fn settlement_status(e: &SettlementError) -> (StatusCode, ErrorCode) {
    match e {
        SettlementError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::Validation),
        SettlementError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
        SettlementError::OrderState(_) => (StatusCode::CONFLICT, ErrorCode::OrderState),
        SettlementError::NoStock { .. } => (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::NoStock),
        SettlementError::InsufficientStock { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::InsufficientStock)
        }
        SettlementError::Conflict(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Internal),
        SettlementError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Database),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Conflict, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::Validation, msg.clone())
            }
            AppError::Settlement(e) => {
                let (status, code) = settlement_status(e);
                if status.is_server_error() {
                    error!(target: "settlement", error = %e, "Settlement failed");
                }
                (status, code, e.to_string())
            }
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Database,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Internal,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ApiResponse::<()>::error(code, message));
        (status, body).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::Conflict(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

// ========== Helper functions ==========

/// Create a successful response envelope
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}
