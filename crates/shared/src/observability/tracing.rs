//! OpenTelemetry 追踪模块
//!
//! 提供日志与分布式追踪的初始化。
//! 配置 OTLP 端点时通过 gRPC 导出到 Jaeger/Tempo 等后端。

use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use super::ObservabilityConfig;

/// Tracing 资源守卫
///
/// 持有 TracerProvider，在 Drop 时优雅关闭并刷新待发送的 span。
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {:?}", e);
            }
        }
    }
}

/// 构建环境过滤器：RUST_LOG 优先，其次配置中的日志级别
fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化 tracing（日志 + 追踪）
pub fn init(config: &ObservabilityConfig) -> Result<TracingGuard> {
    let fmt_layer = if config.json_logs {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    let (otel_layer, provider) = match &config.otlp_endpoint {
        Some(endpoint) if !endpoint.is_empty() => {
            let provider = init_tracer_provider(&config.service_name, endpoint)?;
            let tracer = provider.tracer(config.service_name.clone());
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            (Some(otel_layer), Some(provider))
        }
        _ => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt_layer);

    if let Some(otel_layer) = otel_layer {
        subscriber.with(otel_layer).try_init()?;
    } else {
        subscriber.try_init()?;
    }

    Ok(TracingGuard { provider })
}

/// 初始化 OpenTelemetry TracerProvider
fn init_tracer_provider(service_name: &str, endpoint: &str) -> Result<SdkTracerProvider> {
    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build();

    opentelemetry::global::set_tracer_provider(provider.clone());

    Ok(provider)
}

/// 从当前 span 获取 trace ID（用于日志关联）
pub fn current_trace_id() -> Option<String> {
    use opentelemetry::trace::TraceContextExt;
    use tracing_opentelemetry::OpenTelemetrySpanExt;

    let context = tracing::Span::current().context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    span_context
        .is_valid()
        .then(|| span_context.trace_id().to_string())
}
