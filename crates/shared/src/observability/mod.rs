//! 统一可观测性模块
//!
//! 提供 metrics、tracing、logging 的统一初始化和管理。
//! 所有服务通过单一入口点配置可观测性，确保一致的指标命名和追踪传播。

pub mod metrics;
pub mod middleware;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

pub use crate::config::ObservabilityConfig;

/// 可观测性资源守卫
///
/// 持有各种可观测性资源的生命周期。
/// 当 Guard 被 drop 时，会优雅关闭追踪 provider 并刷新待发送数据。
pub struct ObservabilityGuard {
    _metrics_handle: Option<metrics::MetricsHandle>,
    _tracing_guard: Option<tracing::TracingGuard>,
}

impl ObservabilityGuard {
    /// 创建一个空的 Guard（用于测试或禁用可观测性时）
    pub fn empty() -> Self {
        Self {
            _metrics_handle: None,
            _tracing_guard: None,
        }
    }
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        if self._tracing_guard.is_some() {
            info!("Shutting down observability...");
        }
    }
}

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志和追踪）
/// 2. Metrics（Prometheus 指标，`metrics_enabled = false` 时跳过）
///
/// # Example
///
/// ```ignore
/// use orders_shared::config::AppConfig;
/// use orders_shared::observability;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = AppConfig::load("orders-api")?;
///     let obs = config.observability.clone().with_service_name("orders-api");
///     let _guard = observability::init(&obs).await?;
///     Ok(())
/// }
/// ```
pub async fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    let tracing_guard = tracing::init(config)?;

    info!(
        service = %config.service_name,
        metrics_enabled = config.metrics_enabled,
        metrics_port = %config.metrics_port,
        otlp_endpoint = ?config.otlp_endpoint,
        "Observability initialized"
    );

    let metrics_handle = if config.metrics_enabled {
        Some(metrics::init(config).await?)
    } else {
        None
    };

    Ok(ObservabilityGuard {
        _metrics_handle: metrics_handle,
        _tracing_guard: Some(tracing_guard),
    })
}

/// 只初始化日志（命令行工具使用，不启动指标端口）
pub fn init_logging(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    let tracing_guard = tracing::init(config)?;
    Ok(ObservabilityGuard {
        _metrics_handle: None,
        _tracing_guard: Some(tracing_guard),
    })
}
