//! Kafka 基础设施封装
//!
//! 将 rdkafka 的底层 API 封装为业务友好的 Producer/Consumer/Admin 抽象，
//! 统一消息序列化、摘要头、错误映射和起始位置语义。

use std::time::Duration;

use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::RDKafkaErrorCode;
use rdkafka::message::{BorrowedMessage, Header, Headers, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::{Offset, TopicPartitionList};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::KafkaConfig;
use crate::digest;
use crate::error::OrdersError;
use crate::events::EventEnvelope;

// ---------------------------------------------------------------------------
// Topic 常量
// ---------------------------------------------------------------------------

/// 集中管理 Kafka topic 名称，防止字符串散落在各处导致拼写不一致
pub mod topics {
    pub const ORDER_EVENTS: &str = "orders.events";
}

/// 自动创建 topic 时使用的分区数
pub const DEFAULT_PARTITIONS: i32 = 1;
/// 自动创建 topic 时使用的副本数
pub const DEFAULT_REPLICATION: i32 = 1;

/// topic 创建后等待其出现在元数据中的上限
const TOPIC_VISIBLE_DEADLINE: Duration = Duration::from_secs(10);
const TOPIC_VISIBLE_POLL: Duration = Duration::from_millis(200);
const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// ConsumerMessage
// ---------------------------------------------------------------------------

/// 消费到的 Kafka 消息的统一表示
///
/// 将 rdkafka 的 `BorrowedMessage`（带生命周期约束）转换为拥有所有权的结构体，
/// 使消息可以安全地跨 await 点和 channel 传递。
#[derive(Debug, Clone)]
pub struct ConsumerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub timestamp: Option<i64>,
    /// 按发送顺序保留的消息头，同名头不合并
    pub headers: Vec<(String, String)>,
}

impl ConsumerMessage {
    /// 从 rdkafka 的借用消息构造，提取并拥有所有字段
    fn from_borrowed(msg: &BorrowedMessage<'_>) -> Self {
        let key = msg
            .key()
            .and_then(|k| std::str::from_utf8(k).ok())
            .map(String::from);

        let payload = msg.payload().map(|p| p.to_vec()).unwrap_or_default();

        let timestamp = msg.timestamp().to_millis();

        let headers: Vec<(String, String)> = msg
            .headers()
            .map(|h| {
                h.iter()
                    .map(|header| {
                        let value = header
                            .value
                            .and_then(|raw| std::str::from_utf8(raw).ok())
                            .unwrap_or_default();
                        (header.key.to_string(), value.to_string())
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key,
            payload,
            timestamp,
            headers,
        }
    }

    /// 将负载视为 UTF-8 字符串返回
    pub fn payload_str(&self) -> Result<&str, OrdersError> {
        std::str::from_utf8(&self.payload)
            .map_err(|e| OrdersError::Kafka(format!("负载非 UTF-8 编码: {e}")))
    }

    /// 将 JSON 格式负载反序列化为目标类型
    pub fn deserialize_payload<T: DeserializeOwned>(&self) -> Result<T, OrdersError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| OrdersError::Kafka(format!("负载反序列化失败: {e}")))
    }

    /// 读取指定消息头；同名头出现多次时取第一个
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// KafkaProducer
// ---------------------------------------------------------------------------

/// 发布回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// 负载字节的 SHA-256 摘要
    pub digest: String,
    pub partition: i32,
    pub offset: i64,
}

/// 面向业务的 Kafka 生产者
///
/// 封装 `FutureProducer`，内部已派生 Clone（`FutureProducer` 本身是 Arc 包装的）。
/// 每次发送都同步等待所有副本确认，不做内部重试：一次瞬时失败即返回错误。
#[derive(Clone)]
pub struct KafkaProducer {
    producer: FutureProducer,
    topic: String,
    queue_timeout: Duration,
}

impl KafkaProducer {
    /// 根据配置创建生产者
    ///
    /// `acks=all` 要求分区所有副本确认；`message.send.max.retries=0`
    /// 关闭 librdkafka 的内部重试，失败直接暴露给调用方。
    pub fn new(config: &KafkaConfig) -> Result<Self, OrdersError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", &config.client_id)
            .set("acks", "all")
            .set("enable.idempotence", "false")
            .set("message.send.max.retries", "0")
            .set("message.timeout.ms", config.message_timeout_ms.to_string())
            .create()
            .map_err(|e| OrdersError::Publish(format!("创建生产者失败: {e}")))?;

        info!(
            brokers = %config.brokers,
            topic = %config.topic,
            client_id = %config.client_id,
            "Kafka 生产者已初始化"
        );
        Ok(Self {
            producer,
            topic: config.topic.clone(),
            queue_timeout: Duration::from_millis(config.message_timeout_ms),
        })
    }

    /// 发送原始字节消息并附带消息头
    pub async fn send_with_headers(
        &self,
        key: &str,
        payload: &[u8],
        headers: &[(String, String)],
    ) -> Result<(i32, i64), OrdersError> {
        let mut owned = OwnedHeaders::new_with_capacity(headers.len());
        for (name, value) in headers {
            owned = owned.insert(Header {
                key: name.as_str(),
                value: Some(value.as_bytes()),
            });
        }

        let record = FutureRecord::to(&self.topic)
            .key(key)
            .payload(payload)
            .headers(owned);

        // rdkafka 0.39+ 返回 Delivery 结构体而非元组
        let delivery = self
            .producer
            .send(record, self.queue_timeout)
            .await
            .map_err(|(e, _)| OrdersError::Publish(format!("发送消息失败: {e}")))?;

        debug!(
            topic = %self.topic,
            key,
            partition = delivery.partition,
            offset = delivery.offset,
            "消息已发送"
        );
        Ok((delivery.partition, delivery.offset))
    }

    /// 发送已封装的事件信封
    ///
    /// 信封中的负载字节只序列化过一次，摘要与发送使用同一份字节；
    /// 成功时摘要随回执返回。
    pub async fn publish_envelope(
        &self,
        envelope: &EventEnvelope,
    ) -> Result<PublishReceipt, OrdersError> {
        let digest = envelope.digest().to_string();
        let headers = transport_headers(&envelope.base_headers(), &digest);

        let (partition, offset) = self
            .send_with_headers(envelope.key(), envelope.payload(), &headers)
            .await?;
        Ok(PublishReceipt {
            digest,
            partition,
            offset,
        })
    }
}

/// 组装发送时的消息头
///
/// 保留调用方的头（丢弃其中的 `x-sha256`），摘要头固定追加在最后。
fn transport_headers(extra: &[(String, String)], digest: &str) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = extra
        .iter()
        .filter(|(name, _)| name != digest::DIGEST_HEADER)
        .cloned()
        .collect();
    headers.push((digest::DIGEST_HEADER.to_string(), digest.to_string()));
    headers
}

// ---------------------------------------------------------------------------
// 起始位置
// ---------------------------------------------------------------------------

/// 订阅的起始位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// 从最早保留的消息开始
    Beginning,
    /// 只消费订阅建立之后写入的消息
    End,
}

impl std::str::FromStr for StartPosition {
    type Err = OrdersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginning" => Ok(Self::Beginning),
            "end" => Ok(Self::End),
            other => Err(OrdersError::Validation(format!(
                "无效的起始位置 {other:?}（可选 \"beginning\" 或 \"end\"）"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// KafkaAdmin
// ---------------------------------------------------------------------------

/// 确保 topic 存在
///
/// 幂等：topic 已存在时视为成功。
pub async fn ensure_topic(
    config: &KafkaConfig,
    topic: &str,
    partitions: i32,
    replication: i32,
) -> Result<(), OrdersError> {
    let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", &config.brokers)
        .set("client.id", format!("{}-admin", config.client_id))
        .create()
        .map_err(|e| OrdersError::Kafka(format!("创建管理客户端失败: {e}")))?;

    let new_topic = NewTopic::new(topic, partitions, TopicReplication::Fixed(replication));
    let options = AdminOptions::new().operation_timeout(Some(Duration::from_secs(10)));

    let results = admin
        .create_topics(&[new_topic], &options)
        .await
        .map_err(|e| OrdersError::Kafka(format!("创建 topic 失败: {e}")))?;

    for result in results {
        match result {
            Ok(name) => info!(topic = %name, partitions, replication, "topic 已创建"),
            Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                debug!(topic = %name, "topic 已存在");
            }
            Err((name, code)) => {
                return Err(OrdersError::Kafka(format!("创建 topic {name} 失败: {code}")));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// KafkaConsumer
// ---------------------------------------------------------------------------

/// 面向校验场景的 Kafka 消费者
///
/// 不走消费组再均衡：启动时直接按分区分配并固定起始偏移，
/// 使 `End` 的语义精确等于"订阅建立时刻之后写入的消息"。
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    group_id: String,
    client_id: String,
}

impl KafkaConsumer {
    /// 创建消费者并分配 topic 的全部分区
    ///
    /// `group_id_suffix` 用于区分同一进程中的多个读取者，偏移量不提交。
    pub async fn assign(
        config: &KafkaConfig,
        group_id_suffix: Option<&str>,
        topic: &str,
        position: StartPosition,
    ) -> Result<Self, OrdersError> {
        let group_id = match group_id_suffix {
            Some(suffix) => format!("{}.{}", config.consumer_group, suffix),
            None => config.consumer_group.clone(),
        };
        let client_id = format!("{}-reader", config.client_id);

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &group_id)
            .set("client.id", &client_id)
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false")
            .set(
                "auto.offset.reset",
                match position {
                    StartPosition::Beginning => "earliest",
                    StartPosition::End => "latest",
                },
            )
            .create()
            .map_err(|e| OrdersError::Kafka(format!("创建消费者失败: {e}")))?;

        // 元数据与水位查询是阻塞调用，放到阻塞线程池执行
        let topic_owned = topic.to_string();
        let consumer = tokio::task::spawn_blocking(move || {
            assign_partitions(&consumer, &topic_owned, position).map(|()| consumer)
        })
        .await
        .map_err(|e| OrdersError::Internal(format!("分配分区任务异常: {e}")))??;

        info!(
            brokers = %config.brokers,
            group_id,
            topic,
            ?position,
            "Kafka 消费者已分配分区"
        );
        Ok(Self {
            consumer,
            group_id,
            client_id,
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// 拉取下一条消息
    pub async fn recv(&self) -> Result<ConsumerMessage, OrdersError> {
        let msg = self
            .consumer
            .recv()
            .await
            .map_err(|e| OrdersError::Kafka(format!("接收 Kafka 消息出错: {e}")))?;
        Ok(ConsumerMessage::from_borrowed(&msg))
    }
}

/// 等待 topic 出现在元数据中，并按起始位置分配全部分区
fn assign_partitions(
    consumer: &StreamConsumer,
    topic: &str,
    position: StartPosition,
) -> Result<(), OrdersError> {
    let partitions = wait_for_partitions(consumer, topic)?;

    let mut assignment = TopicPartitionList::new();
    for partition in partitions {
        let offset = match position {
            StartPosition::Beginning => Offset::Beginning,
            StartPosition::End => {
                let (_low, high) = consumer
                    .fetch_watermarks(topic, partition, METADATA_TIMEOUT)
                    .map_err(|e| OrdersError::Kafka(format!("查询水位失败: {e}")))?;
                Offset::Offset(high)
            }
        };
        assignment
            .add_partition_offset(topic, partition, offset)
            .map_err(|e| OrdersError::Kafka(format!("设置起始偏移失败: {e}")))?;
    }

    consumer
        .assign(&assignment)
        .map_err(|e| OrdersError::Kafka(format!("分配分区失败: {e}")))
}

fn wait_for_partitions<C: Consumer>(consumer: &C, topic: &str) -> Result<Vec<i32>, OrdersError> {
    let deadline = std::time::Instant::now() + TOPIC_VISIBLE_DEADLINE;
    loop {
        match consumer.fetch_metadata(Some(topic), METADATA_TIMEOUT) {
            Ok(metadata) => {
                let partitions: Vec<i32> = metadata
                    .topics()
                    .iter()
                    .filter(|t| t.name() == topic && t.error().is_none())
                    .flat_map(|t| t.partitions().iter().map(|p| p.id()))
                    .collect();
                if !partitions.is_empty() {
                    return Ok(partitions);
                }
            }
            Err(e) => warn!(topic, error = %e, "获取元数据失败"),
        }

        if std::time::Instant::now() >= deadline {
            return Err(OrdersError::Kafka(format!("topic {topic:?} 创建后仍不可见")));
        }
        std::thread::sleep(TOPIC_VISIBLE_POLL);
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
