//! 仓储 Trait 定义

use async_trait::async_trait;
use orders_shared::error::Result;

use crate::models::{Order, OrderFilter};

/// 订单仓储接口
///
/// 只负责存储；状态值除非空外不做任何校验，也没有状态流转表。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 创建订单：分配新 ID，状态为初始值，`created_at = updated_at = now`
    async fn create(&self, customer: &str, items: &[String]) -> Result<Order>;

    /// 更新状态并刷新 `updated_at`；订单不存在时返回 NotFound
    async fn update_status(&self, id: &str, status: &str) -> Result<Order>;

    /// 按 ID 查询；不存在时返回 NotFound
    async fn get(&self, id: &str) -> Result<Order>;

    /// 按条件分页列出，按创建时间倒序、ID 倒序
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>>;

    /// 存储可用性探测
    async fn ping(&self) -> Result<()>;
}
