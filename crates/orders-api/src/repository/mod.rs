//! 仓储层
//!
//! `OrderRepository` 是服务层依赖的抽象；PostgreSQL 实现用于部署，
//! 内存实现用于单元测试和本地调试。

mod memory;
mod order_repo;
mod traits;

pub use memory::InMemoryOrderRepository;
pub use order_repo::PgOrderRepository;
pub use traits::OrderRepository;

#[cfg(test)]
pub use traits::MockOrderRepository;

use chrono::{DateTime, SubsecRound, Utc};

/// 生成订单 ID
///
/// UUID v7：按时间排序，同一进程内单调递增，连字符小写形式可按字典序比较。
pub(crate) fn new_order_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// 当前时间，截断到微秒（与 TIMESTAMPTZ 精度一致，写入后读回不变）
pub(crate) fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
