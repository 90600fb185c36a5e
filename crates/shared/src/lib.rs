//! 订单事件管道共享库
//!
//! 提供订单 API 与事件校验工具共用的基础设施：配置加载、错误类型、
//! 数据库连接、Kafka 生产/消费/管理、负载摘要、事件模型、退避与可观测性。

pub mod config;
pub mod database;
pub mod digest;
pub mod error;
pub mod events;
pub mod kafka;
pub mod observability;
pub mod retry;

pub use error::{OrdersError, Result};
