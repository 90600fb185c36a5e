//! 数据库验证工具
//!
//! 绕过 API 直接查询订单表，验证写入是否真的落库。

use anyhow::Result;
use sqlx::PgPool;

/// 数据库验证器
#[derive(Clone)]
pub struct DbVerifier {
    pool: PgPool,
}

impl DbVerifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 订单是否存在
    pub async fn order_exists(&self, id: &str) -> Result<bool> {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists.0)
    }

    /// 订单当前状态
    pub async fn order_status(&self, id: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT status FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }
}
