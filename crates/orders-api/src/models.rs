//! 订单实体与查询条件

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 新建订单的初始状态
pub const INITIAL_STATUS: &str = "OPEN";

/// 状态字段的最大长度（与 orders.status 列宽一致）
pub const MAX_STATUS_LEN: usize = 32;

/// 订单
///
/// 只由仓储创建和修改，从不删除；`updated_at >= created_at` 恒成立。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer: String,
    pub status: String,
    /// 保持下单时的顺序
    pub items: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 列表查询条件
///
/// 各谓词之间为 AND 关系；未设置的谓词不参与过滤。
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFilter {
    /// 状态精确匹配
    pub status: Option<String>,
    /// 客户名子串匹配（不区分大小写）
    pub customer: Option<String>,
    /// 创建时间下界（含）
    pub since: Option<DateTime<Utc>>,
    /// 创建时间上界（含）
    pub until: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl OrderFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 500;

    /// 规范化分页参数
    ///
    /// limit 不在 1..=500 范围内时回退到默认值 50；offset 为负时视为 0。
    pub fn with_page(mut self, limit: Option<i64>, offset: Option<i64>) -> Self {
        self.limit = match limit {
            Some(n) if (1..=Self::MAX_LIMIT).contains(&n) => n,
            _ => Self::DEFAULT_LIMIT,
        };
        self.offset = offset.filter(|n| *n >= 0).unwrap_or(0);
        self
    }

    /// 判断订单是否满足全部谓词（内存实现使用）
    pub fn matches(&self, order: &Order) -> bool {
        let status_ok = self.status.as_ref().is_none_or(|s| order.status == *s);
        let customer_ok = self.customer.as_ref().is_none_or(|c| {
            order
                .customer
                .to_lowercase()
                .contains(&c.to_lowercase())
        });
        let since_ok = self.since.is_none_or(|since| order.created_at >= since);
        let until_ok = self.until.is_none_or(|until| order.created_at <= until);

        status_ok && customer_ok && since_ok && until_ok
    }
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            status: None,
            customer: None,
            since: None,
            until: None,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}
