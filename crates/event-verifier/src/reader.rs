//! 事件流读取器
//!
//! 持有一个长期订阅，在独立任务中循环拉取消息，解码后投递到有界队列。
//! 队列是读取任务与外部的唯一交互面：读取任务退出时发送端随之释放，
//! 下游看到的就是队列关闭。

use async_trait::async_trait;
use orders_shared::config::KafkaConfig;
use orders_shared::error::OrdersError;
use orders_shared::kafka::{
    self, ConsumerMessage, DEFAULT_PARTITIONS, DEFAULT_REPLICATION, KafkaConsumer, StartPosition,
};
use orders_shared::observability::metrics;
use orders_shared::retry::{Backoff, RetryPolicy, retry_with_policy};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::record::ConsumedRecord;

/// 默认投递队列容量
pub const DEFAULT_CAPACITY: usize = 256;

/// 打开诊断输出的环境变量
pub const VERBOSE_ENV: &str = "KAFKA_VERBOSE";

// ---------------------------------------------------------------------------
// MessageSource: 消息来源
// ---------------------------------------------------------------------------

/// 读取循环的消息来源
///
/// 生产环境是 Kafka 消费者，测试中可替换为脚本化的来源。
#[async_trait]
pub trait MessageSource: Send + 'static {
    async fn next_message(&mut self) -> Result<ConsumerMessage, OrdersError>;

    fn group_id(&self) -> &str;

    fn client_id(&self) -> &str;
}

#[async_trait]
impl MessageSource for KafkaConsumer {
    async fn next_message(&mut self) -> Result<ConsumerMessage, OrdersError> {
        self.recv().await
    }

    fn group_id(&self) -> &str {
        KafkaConsumer::group_id(self)
    }

    fn client_id(&self) -> &str {
        KafkaConsumer::client_id(self)
    }
}

// ---------------------------------------------------------------------------
// Diagnostics: 诊断输出
// ---------------------------------------------------------------------------

/// 诊断输出设置
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub print: bool,
    /// 只输出负载或头中包含该片段的消息
    pub filter: Option<String>,
}

impl Diagnostics {
    /// `KAFKA_VERBOSE=true`（不区分大小写）时即使未显式要求也会输出
    pub fn new(print: bool, filter: Option<String>) -> Self {
        let verbose = std::env::var(VERBOSE_ENV)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self {
            print: print || verbose,
            filter: filter.filter(|f| !f.is_empty()),
        }
    }

    /// 负载按原文匹配，头的键和值不区分大小写
    pub fn should_print(&self, record: &ConsumedRecord) -> bool {
        if !self.print {
            return false;
        }
        let Some(filter) = &self.filter else {
            return true;
        };

        if String::from_utf8_lossy(&record.raw).contains(filter.as_str()) {
            return true;
        }
        let needle = filter.to_lowercase();
        record.headers.iter().any(|(k, v)| {
            k.to_lowercase().contains(&needle) || v.to_lowercase().contains(&needle)
        })
    }
}

// ---------------------------------------------------------------------------
// EventStreamReader
// ---------------------------------------------------------------------------

/// 读取器配置
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub capacity: usize,
    pub diagnostics: Diagnostics,
    /// 拉取失败时的退避策略
    pub backoff: RetryPolicy,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            diagnostics: Diagnostics::default(),
            backoff: RetryPolicy::stream_reader(),
        }
    }
}

/// 读取器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Stopped,
    Starting,
    Reading,
}

/// 事件流读取器
///
/// 显式的 `start`/`stop` 生命周期；重复启动会先停止上一次的读取任务。
pub struct EventStreamReader {
    options: ReaderOptions,
    state: ReaderState,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Default for EventStreamReader {
    fn default() -> Self {
        Self::new(ReaderOptions::default())
    }
}

impl EventStreamReader {
    pub fn new(options: ReaderOptions) -> Self {
        Self {
            options,
            state: ReaderState::Stopped,
            shutdown: None,
            task: None,
        }
    }

    /// 当前状态；读取任务自行退出后视为已停止
    pub fn state(&self) -> ReaderState {
        match (&self.state, &self.task) {
            (ReaderState::Reading, Some(task)) if task.is_finished() => ReaderState::Stopped,
            (state, _) => *state,
        }
    }

    /// 确保 topic 存在并从指定位置订阅 Kafka
    ///
    /// 每次启动使用独立的消费组后缀，偏移量不提交，多个读取者互不影响。
    pub async fn start_kafka(
        &mut self,
        config: &KafkaConfig,
        topic: &str,
        position: StartPosition,
    ) -> Result<mpsc::Receiver<ConsumedRecord>, OrdersError> {
        self.stop().await;
        self.state = ReaderState::Starting;

        let connected = async {
            retry_with_policy(
                &RetryPolicy::default(),
                "ensure_topic",
                |e| e.is_retryable(),
                || kafka::ensure_topic(config, topic, DEFAULT_PARTITIONS, DEFAULT_REPLICATION),
            )
            .await?;

            let suffix = Uuid::now_v7().simple().to_string();
            KafkaConsumer::assign(config, Some(&suffix), topic, position).await
        }
        .await;

        match connected {
            Ok(consumer) => Ok(self.start(consumer, topic).await),
            Err(e) => {
                self.state = ReaderState::Stopped;
                warn!(topic, error = %e, "事件流读取器启动失败");
                Err(e)
            }
        }
    }

    /// 以给定来源启动读取任务，返回投递队列的接收端
    pub async fn start<S: MessageSource>(
        &mut self,
        source: S,
        topic: &str,
    ) -> mpsc::Receiver<ConsumedRecord> {
        if self.task.is_some() {
            self.stop().await;
        }

        let (tx, rx) = mpsc::channel(self.options.capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            topic,
            group_id = source.group_id(),
            client_id = source.client_id(),
            capacity = self.options.capacity,
            "事件流读取器已启动"
        );

        let task = tokio::spawn(read_loop(
            source,
            topic.to_string(),
            tx,
            shutdown_rx,
            self.options.diagnostics.clone(),
            Backoff::new(self.options.backoff.clone()),
        ));

        self.shutdown = Some(shutdown_tx);
        self.task = Some(task);
        self.state = ReaderState::Reading;
        rx
    }

    /// 停止读取任务并等待其退出
    ///
    /// 未启动或已停止时为空操作。
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "读取任务异常退出");
            }
            info!("事件流读取器已停止");
        }
        self.state = ReaderState::Stopped;
    }
}

/// 读取循环
///
/// 每个等待点都与停止信号竞争，停止后正在进行的拉取、退避或投递立即放弃。
async fn read_loop<S: MessageSource>(
    mut source: S,
    topic: String,
    tx: mpsc::Sender<ConsumedRecord>,
    mut shutdown: watch::Receiver<bool>,
    diagnostics: Diagnostics,
    mut backoff: Backoff,
) {
    loop {
        let pulled = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            pulled = source.next_message() => pulled,
        };

        match pulled {
            Ok(message) => {
                backoff.reset();
                let record = ConsumedRecord::from_message(message);
                metrics::record_stream_record(&topic, record.decoded.is_some());
                debug!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    decoded = record.decoded.is_some(),
                    "收到消息"
                );

                if diagnostics.should_print(&record) {
                    println!("{}", record.render(source.group_id(), source.client_id()));
                }

                // 队列满时在此阻塞，直到下游取走或收到停止信号
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    sent = tx.send(record) => {
                        if sent.is_err() {
                            debug!(topic = %topic, "投递队列接收端已释放");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                metrics::record_stream_pull_error(&topic);
                let delay = backoff.next_delay();
                warn!(
                    topic = %topic,
                    failures = backoff.failures(),
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "拉取消息失败，退避后重试"
                );
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
    debug!(topic = %topic, "读取循环已退出");
}
