//! 数据库连接管理模块
//!
//! 提供 PostgreSQL 连接池管理、启动期就绪等待以及 orders 表的结构引导。

use crate::config::DatabaseConfig;
use crate::error::{OrdersError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

/// 等待数据库就绪的总时长
const READY_DEADLINE: Duration = Duration::from_secs(60);
/// 两次探测之间的间隔
const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// orders 表结构
///
/// items 以 JSONB 保存以保留顺序；status/created_at 索引服务于列表查询。
const CREATE_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id          VARCHAR(36)  PRIMARY KEY,
    customer    VARCHAR(255) NOT NULL,
    status      VARCHAR(32)  NOT NULL,
    items       JSONB        NOT NULL,
    created_at  TIMESTAMPTZ  NOT NULL,
    updated_at  TIMESTAMPTZ  NOT NULL
)
"#;

const CREATE_STATUS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_orders_status ON orders (status)";
const CREATE_CREATED_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders (created_at)";

/// 数据库连接池包装
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 创建数据库连接池
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_lazy(&config.url)?;

        let db = Self { pool };
        db.wait_until_ready().await?;

        info!("Database connection pool created");

        Ok(db)
    }

    /// 获取连接池引用
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(OrdersError::from)
    }

    /// 轮询直到数据库可用
    ///
    /// 容器编排下数据库常晚于服务启动，超过截止时间仍不可用则返回最后一次错误。
    async fn wait_until_ready(&self) -> Result<()> {
        let deadline = Instant::now() + READY_DEADLINE;
        loop {
            match self.health_check().await {
                Ok(()) => return Ok(()),
                Err(e) if Instant::now() >= deadline => {
                    return Err(OrdersError::Storage(format!("数据库就绪等待超时: {e}")));
                }
                Err(e) => {
                    warn!(error = %e, "数据库尚未就绪，稍后重试");
                    tokio::time::sleep(READY_POLL_INTERVAL).await;
                }
            }
        }
    }

    /// 引导 orders 表结构
    ///
    /// `reset = true` 时先删除再重建，用于每次启动都需要空表的测试部署。
    #[instrument(skip(self))]
    pub async fn bootstrap_schema(&self, reset: bool) -> Result<()> {
        if reset {
            warn!("重置 orders 表");
            sqlx::query("DROP TABLE IF EXISTS orders")
                .execute(&self.pool)
                .await?;
        }

        for ddl in [CREATE_ORDERS_TABLE, CREATE_STATUS_INDEX, CREATE_CREATED_INDEX] {
            sqlx::query(ddl).execute(&self.pool).await?;
        }

        info!("orders 表结构已就绪");
        Ok(())
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}
