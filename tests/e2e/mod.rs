//! 订单系统端到端测试
//!
//! 需要运行中的 orders-api、PostgreSQL 和 Kafka，全部用例默认忽略：
//! - 创建订单并校验事件摘要
//! - 未知订单的状态更新
//! - 事件通道不可用时的写入窗口
//! - 连续状态更新的事件顺序

pub mod helpers;
pub mod setup;
pub mod suites;

pub use setup::TestEnvironment;
