//! 订单服务
//!
//! 记录订单生命周期变更，并为每次成功的变更发布带摘要的领域事件。
//!
//! ## 模块结构
//!
//! - `models`: 订单实体与查询条件
//! - `repository`: 订单仓储（PostgreSQL / 内存）
//! - `publisher`: 事件发布接口
//! - `service`: 先写存储、再发布事件的变更编排
//! - `dto` / `handlers` / `routes` / `state`: HTTP 层
//! - `error`: HTTP 错误映射

pub mod dto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod publisher;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

pub use error::{ApiError, Result};
pub use models::{Order, OrderFilter};
pub use service::{MutationOutcome, OrderService};
