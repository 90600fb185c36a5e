//! 已消费记录
//!
//! 读取循环从事件流取出的一条消息：尽力解码的 JSON、原始字节和流元数据。
//! 解码失败不影响投递，原始字节始终保留以便重新计算摘要。

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat};
use orders_shared::digest::{self, DIGEST_HEADER};
use orders_shared::events::{EventKind, OrderEvent};
use orders_shared::kafka::ConsumerMessage;
use serde_json::Value;

/// 空值占位符
const EMPTY: &str = "∅";

/// 已消费记录
#[derive(Debug, Clone)]
pub struct ConsumedRecord {
    /// 解码后的负载；不是合法 JSON 时为 None
    pub decoded: Option<Value>,
    pub raw: Vec<u8>,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    /// 按发送顺序保留的消息头
    pub headers: Vec<(String, String)>,
    /// 消息时间戳（毫秒）
    pub timestamp: Option<i64>,
}

impl ConsumedRecord {
    pub fn from_message(message: ConsumerMessage) -> Self {
        let decoded = serde_json::from_slice::<Value>(&message.payload).ok();
        Self {
            decoded,
            raw: message.payload,
            topic: message.topic,
            partition: message.partition,
            offset: message.offset,
            key: message.key,
            headers: message.headers,
            timestamp: message.timestamp,
        }
    }

    /// 负载中的 `type` 字段
    pub fn kind(&self) -> Option<&str> {
        self.decoded.as_ref()?.get("type")?.as_str()
    }

    /// 负载中的 `id` 字段，即业务键
    pub fn business_key(&self) -> Option<&str> {
        self.decoded.as_ref()?.get("id")?.as_str()
    }

    /// 种类和业务键是否都与期望一致
    pub fn matches(&self, kind: EventKind, key: &str) -> bool {
        self.kind() == Some(kind.as_str()) && self.business_key() == Some(key)
    }

    /// 按已知事件类型解释负载
    pub fn event(&self) -> Option<OrderEvent> {
        OrderEvent::from_value(self.decoded.as_ref()?)
    }

    /// 生产端随消息携带的摘要头
    pub fn digest_header(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == DIGEST_HEADER)
            .map(|(_, v)| v.as_str())
    }

    /// 对原始字节重新计算的摘要
    pub fn observed_digest(&self) -> String {
        digest::compute(&self.raw)
    }

    pub fn verify_digest(&self, expected: &str) -> bool {
        digest::verify(&self.raw, expected)
    }

    /// 诊断输出格式
    pub fn render(&self, group: &str, client: &str) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "\n◆ Kafka consumer\n  \
             ├─ group     → {}\n  \
             ├─ client    → {}\n  \
             └─ topic     → {}\n\
             ◆ Kafka message\n  \
             ├─ partition  → {}\n  \
             ├─ offset     → {}\n  \
             ├─ time       → {}\n  \
             ├─ key        → {}\n  \
             ├─ headers    → {}\n  \
             └─ value      →\n{}\n",
            or_empty(group),
            or_empty(client),
            self.topic,
            self.partition,
            self.offset,
            self.render_time(),
            self.key.as_deref().map_or(EMPTY, or_empty),
            self.render_headers(),
            self.pretty_payload(),
        );
        out
    }

    fn render_time(&self) -> String {
        self.timestamp
            .and_then(DateTime::from_timestamp_millis)
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| EMPTY.to_string())
    }

    /// 按发送顺序输出，同名头各占一项
    fn render_headers(&self) -> String {
        if self.headers.is_empty() {
            return EMPTY.to_string();
        }
        self.headers
            .iter()
            .map(|(k, v)| format!("{k}={}", or_empty(v)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn pretty_payload(&self) -> String {
        match &self.decoded {
            Some(value) => serde_json::to_string_pretty(value)
                .unwrap_or_else(|_| String::from_utf8_lossy(&self.raw).into_owned()),
            None => String::from_utf8_lossy(&self.raw).into_owned(),
        }
    }
}

fn or_empty(s: &str) -> &str {
    if s.is_empty() { EMPTY } else { s }
}
