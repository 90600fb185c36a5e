//! 测试套件模块
//!
//! 按场景组织的测试用例集合。

pub mod order_created;
pub mod publish_outage;
pub mod status_sequence;
pub mod unknown_order;

/// 生成唯一客户名，避免并行测试数据冲突
pub fn unique_customer(prefix: &str) -> String {
    format!("{prefix}-{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}
