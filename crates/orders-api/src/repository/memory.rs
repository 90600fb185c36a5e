//! 内存订单仓储
//!
//! 基于 DashMap 的线程安全存储，语义与 PostgreSQL 实现一致。

use async_trait::async_trait;
use dashmap::DashMap;
use orders_shared::error::{OrdersError, Result};

use super::traits::OrderRepository;
use super::{new_order_id, now_micros};
use crate::models::{INITIAL_STATUS, Order, OrderFilter};

/// 内存订单仓储
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: DashMap<String, Order>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, customer: &str, items: &[String]) -> Result<Order> {
        let now = now_micros();
        let order = Order {
            id: new_order_id(),
            customer: customer.to_string(),
            status: INITIAL_STATUS.to_string(),
            items: items.to_vec(),
            created_at: now,
            updated_at: now,
        };
        self.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn update_status(&self, id: &str, status: &str) -> Result<Order> {
        let mut entry = self
            .orders
            .get_mut(id)
            .ok_or_else(|| OrdersError::order_not_found(id))?;

        entry.status = status.to_string();
        entry.updated_at = now_micros().max(entry.created_at);
        Ok(entry.clone())
    }

    async fn get(&self, id: &str) -> Result<Order> {
        self.orders
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| OrdersError::order_not_found(id))
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let mut matched: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(matched
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
