//! 重试策略与退避
//!
//! 提供指数退避计算，供事件流拉取循环在传输错误后等待，以及启动期的
//! 基础设施准备（创建 topic 等）在瞬时故障下重试。
//! 订单写入与事件发布路径不使用这里的任何重试。

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::OrdersError;

// ---------------------------------------------------------------------------
// RetryPolicy: 重试策略配置
// ---------------------------------------------------------------------------

/// 重试策略配置
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大重试次数（不含首次执行），None 表示不限次数
    pub max_retries: Option<u32>,
    /// 首次重试前的等待时间
    pub initial_delay: Duration,
    /// 退避时间上限
    pub max_delay: Duration,
    /// 每次重试的退避倍数
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    /// 最多重试 3 次，初始等待 1 秒，最大等待 30 秒，倍数 2.0
    fn default() -> Self {
        Self {
            max_retries: Some(3),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 拉取循环使用的退避：200ms 起步、每次翻倍、2s 封顶、不限次数
    pub fn stream_reader() -> Self {
        Self {
            max_retries: None,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }

    /// 计算第 N 次重试的等待时间（attempt 从 0 开始）
    ///
    /// 公式: initial_delay * multiplier^attempt，结果不超过 max_delay。
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        // 指数封顶，避免 powi 溢出为 inf
        let exponent = attempt.min(32) as i32;
        let delay_ms = base_ms * self.multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// 是否应继续重试
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_retries.is_none_or(|max| attempt < max)
    }
}

// ---------------------------------------------------------------------------
// Backoff: 连续失败计数
// ---------------------------------------------------------------------------

/// 有状态的退避器
///
/// 每次失败推进一步，成功后复位；长时间运行的循环用它代替手写计数。
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    failures: u32,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    /// 记录一次失败，返回本次应等待的时长
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.policy.delay_for_attempt(self.failures);
        self.failures = self.failures.saturating_add(1);
        delay
    }

    /// 成功后复位
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// 当前连续失败次数
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

// ---------------------------------------------------------------------------
// retry_with_policy: 带重试的异步执行器
// ---------------------------------------------------------------------------

/// 带重试的异步执行器
///
/// 仅在操作返回可重试错误时才重试，其余错误直接向上传播。
pub async fn retry_with_policy<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: impl Fn(&OrdersError) -> bool,
    mut operation: F,
) -> Result<T, OrdersError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OrdersError>>,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation = operation_name, attempt, "操作在重试后成功");
                }
                return Ok(value);
            }
            Err(err) => {
                if !is_retryable(&err) {
                    warn!(operation = operation_name, error = %err, "操作失败且不可重试");
                    return Err(err);
                }

                if !policy.should_retry(attempt) {
                    warn!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "已达最大重试次数，放弃重试"
                    );
                    return Err(err);
                }

                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "操作失败，将在退避后重试"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 单元测试
// ---------------------------------------------------------------------------
