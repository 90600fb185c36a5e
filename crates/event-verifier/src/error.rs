//! 事件校验错误类型
//!
//! 区分"在时间窗口内没有观察到事件"和"观察到了事件但内容摘要不一致"，
//! 后者意味着负载损坏或串线，不能当作未找到处理。

use orders_shared::error::OrdersError;
use orders_shared::events::EventKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorrelationError {
    #[error("等待 {kind} 事件超时: key={key}, 已等待 {waited_ms}ms")]
    Timeout {
        kind: EventKind,
        key: String,
        waited_ms: u128,
    },

    #[error("事件流已关闭，未观察到 {kind} 事件: key={key}")]
    StreamClosed { kind: EventKind, key: String },

    #[error("{kind} 事件摘要不一致: key={key}, expected={expected}, observed={observed}")]
    DigestMismatch {
        kind: EventKind,
        key: String,
        expected: String,
        observed: String,
    },

    #[error("不应出现的 {kind} 事件: key={key}, partition={partition}, offset={offset}")]
    UnexpectedEvent {
        kind: EventKind,
        key: String,
        partition: i32,
        offset: i64,
    },

    #[error(transparent)]
    Stream(#[from] OrdersError),
}

impl CorrelationError {
    /// 是否属于"未观察到事件"一类（超时或事件流提前关闭）
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::StreamClosed { .. })
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::DigestMismatch { .. })
    }
}
