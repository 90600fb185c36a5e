//! HTTP 层错误类型
//!
//! 将服务层错误映射为状态码和统一的错误响应体。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orders_shared::error::OrdersError;
use serde_json::json;

/// HTTP 层错误
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("订单不存在: {0}")]
    OrderNotFound(String),

    /// 事件通道不可用；同一请求的存储写入可能已生效
    #[error("事件通道不可用: {0}")]
    DependencyUnavailable(String),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::OrderNotFound(_) => StatusCode::NOT_FOUND,
            Self::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::DependencyUnavailable(_) => "DEPENDENCY_UNAVAILABLE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Storage(e) => {
                tracing::error!(error = %e, "存储操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::DependencyUnavailable(e) => {
                tracing::warn!(error = %e, "事件通道不可用");
                "事件通道不可用，订单状态可能已变更但未发出通知".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 从共享库错误转换
impl From<OrdersError> for ApiError {
    fn from(err: OrdersError) -> Self {
        match err {
            OrdersError::Validation(msg) => Self::Validation(msg),
            OrdersError::NotFound { id, .. } => Self::OrderNotFound(id),
            OrdersError::Publish(msg) => Self::DependencyUnavailable(msg),
            OrdersError::Database(e) => Self::Database(e),
            OrdersError::Storage(msg) => Self::Storage(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;
