//! 请求 DTO 定义

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::models::OrderFilter;

/// 创建订单请求
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 255, message = "customer 长度必须在1-255个字符之间"))]
    pub customer: String,
    /// 缺省视为空列表
    #[serde(default)]
    pub items: Vec<String>,
}

/// 更新订单状态请求
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(length(min = 1, max = 32, message = "status 长度必须在1-32个字符之间"))]
    pub status: String,
}

/// 订单列表查询参数
///
/// 所有参数按原始字符串接收：无法解析的时间或分页值被忽略并回退到默认行为，
/// 而不是拒绝请求。
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub customer: Option<String>,
    /// RFC 3339 创建时间下界
    pub since: Option<String>,
    /// RFC 3339 创建时间上界
    pub until: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_instant(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl ListOrdersQuery {
    /// 转换为仓储查询条件
    pub fn into_filter(self) -> OrderFilter {
        let limit = self.limit.as_deref().and_then(|v| v.parse::<i64>().ok());
        let offset = self.offset.as_deref().and_then(|v| v.parse::<i64>().ok());

        OrderFilter {
            since: parse_instant(self.since.as_deref()),
            until: parse_instant(self.until.as_deref()),
            status: non_empty(self.status),
            customer: non_empty(self.customer),
            ..Default::default()
        }
        .with_page(limit, offset)
    }
}
