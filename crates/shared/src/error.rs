//! 统一错误处理模块
//!
//! 定义订单事件管道中共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum OrdersError {
    // ==================== 输入错误 ====================
    #[error("参数验证失败: {0}")]
    Validation(String),

    // ==================== 存储错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    // ==================== Kafka 错误 ====================
    /// 生产端发送失败（broker 不可用、未获 ack 等）
    #[error("事件发布失败: {0}")]
    Publish(String),

    /// 消费端或管理端的传输错误
    #[error("Kafka 错误: {0}")]
    Kafka(String),

    // ==================== 通用错误 ====================
    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, OrdersError>;

impl OrdersError {
    /// 构造订单不存在错误
    pub fn order_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Order".to_string(),
            id: id.into(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Publish(_) => "DEPENDENCY_UNAVAILABLE",
            Self::Kafka(_) => "KAFKA_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为瞬时错误
    ///
    /// 发布与存储路径内部都不做自动重试；启动阶段创建 topic 时据此决定是否重试。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Publish(_) | Self::Kafka(_))
    }

    /// 是否为存储侧错误
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Storage(_))
    }
}
