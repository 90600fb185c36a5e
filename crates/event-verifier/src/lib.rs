//! 订单事件校验
//!
//! 从订单事件 topic 读取消息，并与变更接口同步返回的摘要做关联校验。

pub mod correlator;
pub mod error;
pub mod reader;
pub mod record;

pub use correlator::EventCorrelator;
pub use error::CorrelationError;
pub use reader::{Diagnostics, EventStreamReader, MessageSource, ReaderOptions, ReaderState};
pub use record::ConsumedRecord;
