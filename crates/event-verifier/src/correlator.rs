//! 事件关联器
//!
//! 从读取器的投递队列中按事件类型和业务键查找期望的事件，
//! 并用同步响应中拿到的摘要校验事件内容。

use std::time::Duration;

use orders_shared::config::KafkaConfig;
use orders_shared::events::EventKind;
use orders_shared::kafka::StartPosition;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::CorrelationError;
use crate::reader::EventStreamReader;
use crate::record::ConsumedRecord;

/// 事件关联器
///
/// 检查过且不匹配的记录直接丢弃，不会重新入队。
pub struct EventCorrelator {
    records: mpsc::Receiver<ConsumedRecord>,
}

impl EventCorrelator {
    pub fn new(records: mpsc::Receiver<ConsumedRecord>) -> Self {
        Self { records }
    }

    /// 启动读取器并关联到它的投递队列
    ///
    /// 一般在触发变更之前以 `End` 订阅，只观察之后产生的事件。
    pub async fn subscribe(
        reader: &mut EventStreamReader,
        config: &KafkaConfig,
        topic: &str,
        position: StartPosition,
    ) -> Result<Self, CorrelationError> {
        let records = reader.start_kafka(config, topic, position).await?;
        Ok(Self::new(records))
    }

    /// 等待指定类型和业务键的事件
    ///
    /// 截止时间、队列关闭、匹配到记录三者先到者决定结果。
    /// 给出期望摘要时，对匹配记录的原始字节重新计算并比较。
    pub async fn await_event(
        &mut self,
        kind: EventKind,
        key: &str,
        expected_digest: Option<&str>,
        timeout: Duration,
    ) -> Result<ConsumedRecord, CorrelationError> {
        let started = Instant::now();
        let deadline = started + timeout;

        loop {
            let record = match tokio::time::timeout_at(deadline, self.records.recv()).await {
                Err(_) => {
                    return Err(CorrelationError::Timeout {
                        kind,
                        key: key.to_string(),
                        waited_ms: started.elapsed().as_millis(),
                    });
                }
                Ok(None) => {
                    return Err(CorrelationError::StreamClosed {
                        kind,
                        key: key.to_string(),
                    });
                }
                Ok(Some(record)) => record,
            };

            if !record.matches(kind, key) {
                debug!(
                    offset = record.offset,
                    observed_kind = record.kind().unwrap_or(""),
                    observed_key = record.business_key().unwrap_or(""),
                    "跳过不匹配的记录"
                );
                continue;
            }

            if let Some(expected) = expected_digest {
                if !record.verify_digest(expected) {
                    let observed = record.observed_digest();
                    warn!(%kind, key, expected, observed = %observed, "事件摘要不一致");
                    return Err(CorrelationError::DigestMismatch {
                        kind,
                        key: key.to_string(),
                        expected: expected.to_string(),
                        observed,
                    });
                }
            }

            info!(
                %kind,
                key,
                partition = record.partition,
                offset = record.offset,
                waited_ms = started.elapsed().as_millis() as u64,
                "观察到期望事件"
            );
            return Ok(record);
        }
    }

    /// 在观察窗口内确认没有指定事件
    ///
    /// 窗口结束或队列关闭都算通过。
    pub async fn ensure_absent(
        &mut self,
        kind: EventKind,
        key: &str,
        window: Duration,
    ) -> Result<(), CorrelationError> {
        match self.await_event(kind, key, None, window).await {
            Ok(record) => Err(CorrelationError::UnexpectedEvent {
                kind,
                key: key.to_string(),
                partition: record.partition,
                offset: record.offset,
            }),
            Err(e) if e.is_timeout() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// 取出队列中当前已有的全部记录，不等待
    ///
    /// 事件流由并行的变更共享，调用方应按业务字段自行筛选。
    pub fn drain_records(&mut self) -> Vec<ConsumedRecord> {
        let mut drained = Vec::new();
        while let Ok(record) = self.records.try_recv() {
            drained.push(record);
        }
        if !drained.is_empty() {
            debug!(drained = drained.len(), "已清空投递队列");
        }
        drained
    }
}
