//! 订单变更编排
//!
//! 每个变更请求严格按两步执行：先写存储，再发布事件。两步之间没有补偿事务：
//! 存储失败则不发布；发布失败时存储写入不回滚，调用方收到失败，
//! 订单保持已持久化但没有对应事件。

use std::sync::Arc;
use std::time::Instant;

use orders_shared::error::{OrdersError, Result};
use orders_shared::events::{EventEnvelope, EventKind, OrderEvent};
use orders_shared::observability::metrics;
use tracing::{info, instrument, warn};

use crate::models::{MAX_STATUS_LEN, Order, OrderFilter};
use crate::publisher::EventPublisher;
use crate::repository::OrderRepository;

/// 客户名最大长度（与 orders.customer 列宽一致）
pub const MAX_CUSTOMER_LEN: usize = 255;

/// 变更成功的结果
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub order: Order,
    /// 已发布事件负载的 SHA-256 摘要
    pub digest: String,
}

/// 订单服务
pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { repo, publisher }
    }

    /// 创建订单并发布 OrderCreated
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn create_order(&self, customer: &str, items: &[String]) -> Result<MutationOutcome> {
        let kind = EventKind::OrderCreated;
        if let Err(e) = validate_create(customer) {
            metrics::record_order_mutation(kind.as_str(), "validation");
            return Err(e);
        }

        let order = self
            .repo
            .create(customer, items)
            .await
            .inspect_err(|e| record_storage_failure(kind, e))?;

        let event = OrderEvent::OrderCreated {
            id: order.id.clone(),
            customer: order.customer.clone(),
            status: order.status.clone(),
            items: order.items.clone(),
            ts: order.created_at,
        };
        self.publish_after_write(order, &event).await
    }

    /// 更新订单状态并发布 OrderStatusUpdated
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: &str, status: &str) -> Result<MutationOutcome> {
        let kind = EventKind::OrderStatusUpdated;
        if let Err(e) = validate_status(status) {
            metrics::record_order_mutation(kind.as_str(), "validation");
            return Err(e);
        }

        let order = self
            .repo
            .update_status(id, status)
            .await
            .inspect_err(|e| record_storage_failure(kind, e))?;

        let event = OrderEvent::OrderStatusUpdated {
            id: order.id.clone(),
            status: order.status.clone(),
            ts: order.updated_at,
        };
        self.publish_after_write(order, &event).await
    }

    pub async fn get_order(&self, id: &str) -> Result<Order> {
        self.repo.get(id).await
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        self.repo.list(filter).await
    }

    /// 存储可用性（就绪探针使用）
    pub async fn storage_ready(&self) -> bool {
        self.repo.ping().await.is_ok()
    }

    /// 存储写入已成功后的发布步骤
    async fn publish_after_write(&self, order: Order, event: &OrderEvent) -> Result<MutationOutcome> {
        let kind = event.kind();
        let envelope = EventEnvelope::seal(event)?;

        let started = Instant::now();
        let result = self.publisher.publish(&envelope).await;
        metrics::record_event_publish(kind.as_str(), result.is_ok(), started.elapsed().as_secs_f64());

        match result {
            Ok(receipt) => {
                metrics::record_order_mutation(kind.as_str(), "ok");
                info!(
                    order_id = %order.id,
                    kind = %kind,
                    status = %order.status,
                    partition = receipt.partition,
                    offset = receipt.offset,
                    digest = %receipt.digest,
                    "订单变更已发布"
                );
                Ok(MutationOutcome {
                    order,
                    digest: receipt.digest,
                })
            }
            Err(e) => {
                metrics::record_order_mutation(kind.as_str(), "publish_failed");
                // 存储已提交，不回滚
                warn!(
                    order_id = %order.id,
                    kind = %kind,
                    error = %e,
                    "事件发布失败，订单已持久化但无对应事件"
                );
                Err(match e {
                    OrdersError::Publish(_) => e,
                    other => OrdersError::Publish(other.to_string()),
                })
            }
        }
    }
}

fn record_storage_failure(kind: EventKind, err: &OrdersError) {
    let status = match err {
        OrdersError::NotFound { .. } => "not_found",
        _ => "storage_failed",
    };
    metrics::record_order_mutation(kind.as_str(), status);
}

/// 只拒绝存不进去的输入；items 原样保存，可以为空
fn validate_create(customer: &str) -> Result<()> {
    if customer.is_empty() {
        return Err(OrdersError::Validation("customer 不能为空".to_string()));
    }
    if customer.chars().count() > MAX_CUSTOMER_LEN {
        return Err(OrdersError::Validation(format!(
            "customer 长度不能超过 {MAX_CUSTOMER_LEN}"
        )));
    }
    Ok(())
}

/// 不校验取值与流转，任意非空字符串都接受
fn validate_status(status: &str) -> Result<()> {
    if status.is_empty() {
        return Err(OrdersError::Validation("status 不能为空".to_string()));
    }
    if status.chars().count() > MAX_STATUS_LEN {
        return Err(OrdersError::Validation(format!(
            "status 长度不能超过 {MAX_STATUS_LEN}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::MockEventPublisher;
    use crate::repository::{InMemoryOrderRepository, MockOrderRepository};
    use orders_shared::digest;
    use orders_shared::kafka::PublishReceipt;
    use tokio_test::{assert_err, assert_ok};

    fn items() -> Vec<String> {
        vec!["sku1".to_string(), "sku2".to_string()]
    }

    /// 按真实发布器的方式回传信封摘要
    fn accepting_publisher(expected_calls: usize) -> MockEventPublisher {
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .times(expected_calls)
            .returning(|envelope| {
                Ok(PublishReceipt {
                    digest: envelope.digest().to_string(),
                    partition: 0,
                    offset: 7,
                })
            });
        publisher
    }

    fn failing_publisher() -> MockEventPublisher {
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .times(1)
            .returning(|_| Err(OrdersError::Publish("broker unreachable".to_string())));
        publisher
    }

    #[tokio::test]
    async fn test_create_publishes_order_created_with_digest() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .withf(|envelope| {
                let value: serde_json::Value = serde_json::from_slice(envelope.payload()).unwrap();
                envelope.kind() == EventKind::OrderCreated
                    && value["type"] == "OrderCreated"
                    && value["customer"] == "acme"
                    && value["status"] == "OPEN"
                    && value["items"] == serde_json::json!(["sku1", "sku2"])
                    && value["id"] == envelope.key()
            })
            .times(1)
            .returning(|envelope| {
                Ok(PublishReceipt {
                    digest: envelope.digest().to_string(),
                    partition: 0,
                    offset: 1,
                })
            });

        let service = OrderService::new(repo.clone(), Arc::new(publisher));
        let outcome = service.create_order("acme", &items()).await.unwrap();

        assert_eq!(outcome.order.status, "OPEN");
        assert_eq!(outcome.order.items, items());
        assert_eq!(outcome.digest.len(), 64);
        assert_eq!(repo.get(&outcome.order.id).await.unwrap(), outcome.order);
    }

    #[tokio::test]
    async fn test_digest_matches_published_bytes() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let captured = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = captured.clone();

        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().returning(move |envelope| {
            sink.lock().unwrap().push(envelope.payload().to_vec());
            Ok(PublishReceipt {
                digest: envelope.digest().to_string(),
                partition: 0,
                offset: 0,
            })
        });

        let service = OrderService::new(repo, Arc::new(publisher));
        let outcome = service.create_order("acme", &items()).await.unwrap();

        let bytes = captured.lock().unwrap()[0].clone();
        assert!(digest::verify(&bytes, &outcome.digest));
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_stored_order() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let service = OrderService::new(repo.clone(), Arc::new(failing_publisher()));

        let err = service.create_order("acme", &items()).await.unwrap_err();
        assert!(matches!(err, OrdersError::Publish(_)));
        assert_eq!(err.code(), "DEPENDENCY_UNAVAILABLE");

        // 存储写入不回滚
        assert_eq!(repo.len(), 1);
        let stored = repo.list(&OrderFilter::default()).await.unwrap();
        assert_eq!(stored[0].customer, "acme");
    }

    #[tokio::test]
    async fn test_storage_failure_skips_publish() {
        let mut repo = MockOrderRepository::new();
        repo.expect_create()
            .times(1)
            .returning(|_, _| Err(OrdersError::Storage("disk full".to_string())));
        let service = OrderService::new(Arc::new(repo), Arc::new(accepting_publisher(0)));

        let err = service.create_order("acme", &items()).await.unwrap_err();
        assert!(err.is_storage());
    }

    #[tokio::test]
    async fn test_update_unknown_order_does_not_publish() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let service = OrderService::new(repo, Arc::new(accepting_publisher(0)));

        let err = service.update_status("missing-id", "PACKED").await.unwrap_err();
        assert!(matches!(err, OrdersError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_consecutive_updates_publish_in_order() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let statuses = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = statuses.clone();

        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().times(3).returning(move |envelope| {
            let value: serde_json::Value = serde_json::from_slice(envelope.payload()).unwrap();
            sink.lock()
                .unwrap()
                .push((envelope.kind(), value["status"].as_str().unwrap().to_string()));
            Ok(PublishReceipt {
                digest: envelope.digest().to_string(),
                partition: 0,
                offset: 0,
            })
        });

        let service = OrderService::new(repo, Arc::new(publisher));
        let created = service.create_order("acme", &items()).await.unwrap();
        let packed = assert_ok!(service.update_status(&created.order.id, "PACKED").await);
        let shipped = assert_ok!(service.update_status(&created.order.id, "SHIPPED").await);

        assert_ne!(packed.digest, shipped.digest);
        assert!(shipped.order.updated_at >= packed.order.updated_at);
        assert_eq!(
            *statuses.lock().unwrap(),
            vec![
                (EventKind::OrderCreated, "OPEN".to_string()),
                (EventKind::OrderStatusUpdated, "PACKED".to_string()),
                (EventKind::OrderStatusUpdated, "SHIPPED".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_validation_rejects_before_write() {
        let mut repo = MockOrderRepository::new();
        repo.expect_create().times(0);
        repo.expect_update_status().times(0);
        let service = OrderService::new(Arc::new(repo), Arc::new(accepting_publisher(0)));

        assert_err!(service.create_order("", &items()).await);
        assert_err!(service.create_order(&"c".repeat(256), &items()).await);
        assert_err!(service.update_status("id", "").await);
        assert_err!(service.update_status("id", &"X".repeat(33)).await);
    }

    #[tokio::test]
    async fn test_whitespace_status_is_accepted() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let service = OrderService::new(repo.clone(), Arc::new(accepting_publisher(2)));
        let created = service.create_order("acme", &items()).await.unwrap();

        let outcome = assert_ok!(service.update_status(&created.order.id, "   ").await);
        assert_eq!(outcome.order.status, "   ");
        assert_eq!(repo.get(&created.order.id).await.unwrap().status, "   ");

        // 长度上限按字符计
        let at_limit = "状".repeat(MAX_STATUS_LEN);
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().times(0);
        let rejecting = OrderService::new(repo.clone(), Arc::new(publisher));
        assert_err!(rejecting.update_status(&created.order.id, &format!("{at_limit}X")).await);
    }

    #[tokio::test]
    async fn test_empty_items_are_accepted() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let service = OrderService::new(repo.clone(), Arc::new(accepting_publisher(2)));

        let empty = assert_ok!(service.create_order("acme", &[]).await);
        assert!(empty.order.items.is_empty());

        let blank = assert_ok!(service.create_order("acme", &["".to_string()]).await);
        assert_eq!(blank.order.items, vec![String::new()]);
        assert_eq!(repo.len(), 2);
    }
}
