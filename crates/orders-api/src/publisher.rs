//! 事件发布接口
//!
//! 服务层只依赖 `EventPublisher`，Kafka 实现委托给共享库的生产者。

use async_trait::async_trait;
use orders_shared::error::Result;
use orders_shared::events::EventEnvelope;
use orders_shared::kafka::{KafkaProducer, PublishReceipt};

/// 事件发布接口
///
/// 一次调用对应一次带确认的同步发送，失败即返回，不做内部重试。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<PublishReceipt>;
}

/// Kafka 事件发布器
pub struct KafkaEventPublisher {
    producer: KafkaProducer,
}

impl KafkaEventPublisher {
    pub fn new(producer: KafkaProducer) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<PublishReceipt> {
        self.producer.publish_envelope(envelope).await
    }
}
