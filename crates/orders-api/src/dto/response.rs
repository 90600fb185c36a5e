//! 响应 DTO 定义

use serde::Serialize;

use crate::models::Order;

/// 订单列表响应
#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub items: Vec<Order>,
    pub limit: i64,
    pub offset: i64,
    pub count: usize,
}

impl OrderListResponse {
    pub fn new(items: Vec<Order>, limit: i64, offset: i64) -> Self {
        Self {
            count: items.len(),
            items,
            limit,
            offset,
        }
    }
}
