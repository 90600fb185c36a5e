//! 订单仓储（PostgreSQL）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orders_shared::error::{OrdersError, Result};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use super::traits::OrderRepository;
use super::{new_order_id, now_micros};
use crate::models::{INITIAL_STATUS, Order, OrderFilter};

const ORDER_COLUMNS: &str = "id, customer, status, items, created_at, updated_at";

/// 数据库行映射，items 列为 JSONB
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    customer: String,
    status: String,
    items: Json<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            customer: row.customer,
            status: row.status,
            items: row.items.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 订单仓储
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// 转义 LIKE 通配符，使客户名按字面子串匹配
fn like_pattern(raw: &str) -> String {
    let escaped = raw
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    #[instrument(skip(self, items), fields(items = items.len()))]
    async fn create(&self, customer: &str, items: &[String]) -> Result<Order> {
        let now = now_micros();
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (id, customer, status, items, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(new_order_id())
        .bind(customer)
        .bind(INITIAL_STATUS)
        .bind(Json(items))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: &str, status: &str) -> Result<Order> {
        // GREATEST 保证时钟回拨时 updated_at 仍不早于 created_at
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE orders
            SET status = $2, updated_at = GREATEST($3, created_at)
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(now_micros())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::from)
            .ok_or_else(|| OrdersError::order_not_found(id))
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Order> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::from)
            .ok_or_else(|| OrdersError::order_not_found(id))
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let customer = filter.customer.as_deref().map(like_pattern);

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR customer ILIKE $2)
              AND ($3::timestamptz IS NULL OR created_at >= $3)
              AND ($4::timestamptz IS NULL OR created_at <= $4)
            ORDER BY created_at DESC, id DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(filter.status.as_deref())
        .bind(customer)
        .bind(filter.since)
        .bind(filter.until)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
