//! 订单领域事件模型
//!
//! 内部以带标签的枚举表示已知事件类型，线上格式仍是普通 JSON 对象
//! `{type, id, ...字段, ts}`，消费端在解释字段前先校验 `type`。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest;
use crate::error::{OrdersError, Result};

// ---------------------------------------------------------------------------
// EventKind: 事件类型
// ---------------------------------------------------------------------------

/// 订单事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    OrderCreated,
    OrderStatusUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderCreated => "OrderCreated",
            Self::OrderStatusUpdated => "OrderStatusUpdated",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = OrdersError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OrderCreated" => Ok(Self::OrderCreated),
            "OrderStatusUpdated" => Ok(Self::OrderStatusUpdated),
            other => Err(OrdersError::Validation(format!("未知事件类型: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// OrderEvent: 事件负载
// ---------------------------------------------------------------------------

/// 订单事件负载
///
/// 字段顺序即序列化顺序，`type` 标签总在最前。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrderEvent {
    OrderCreated {
        id: String,
        customer: String,
        status: String,
        items: Vec<String>,
        #[serde(with = "rfc3339_nanos")]
        ts: DateTime<Utc>,
    },
    OrderStatusUpdated {
        id: String,
        status: String,
        #[serde(with = "rfc3339_nanos")]
        ts: DateTime<Utc>,
    },
}

impl OrderEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::OrderCreated { .. } => EventKind::OrderCreated,
            Self::OrderStatusUpdated { .. } => EventKind::OrderStatusUpdated,
        }
    }

    /// 业务键，即订单 ID，同时作为 Kafka 分区键
    pub fn key(&self) -> &str {
        match self {
            Self::OrderCreated { id, .. } | Self::OrderStatusUpdated { id, .. } => id,
        }
    }

    pub fn status(&self) -> &str {
        match self {
            Self::OrderCreated { status, .. } | Self::OrderStatusUpdated { status, .. } => status,
        }
    }

    pub fn ts(&self) -> DateTime<Utc> {
        match self {
            Self::OrderCreated { ts, .. } | Self::OrderStatusUpdated { ts, .. } => *ts,
        }
    }

    /// 从已解码的 JSON 中解释事件
    ///
    /// 先校验 `type` 属于已知类型，再按类型解析字段；任一步失败返回 None，
    /// 未知类型的事件由调用方按原始 JSON 处理。
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let kind = value.get("type")?.as_str()?;
        kind.parse::<EventKind>().ok()?;
        serde_json::from_value(value.clone()).ok()
    }
}

// ---------------------------------------------------------------------------
// EventEnvelope: 已封装的事件
// ---------------------------------------------------------------------------

/// 已封装、不可变的事件信封
///
/// 封装时只序列化一次：摘要和发送使用同一份字节，构造后不再重新计算。
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    kind: EventKind,
    key: String,
    payload: Vec<u8>,
    digest: String,
}

impl EventEnvelope {
    /// 序列化事件并计算摘要
    pub fn seal(event: &OrderEvent) -> Result<Self> {
        let payload = serde_json::to_vec(event)?;
        let digest = digest::compute(&payload);
        Ok(Self {
            kind: event.kind(),
            key: event.key().to_string(),
            payload,
            digest,
        })
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// 线上发送的原始字节
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// 该事件固定携带的传输头（不含摘要头）
    pub fn base_headers(&self) -> Vec<(String, String)> {
        vec![(
            digest::EVENT_KIND_HEADER.to_string(),
            self.kind.as_str().to_string(),
        )]
    }
}

/// RFC 3339 纳秒精度时间戳
mod rfc3339_nanos {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
