//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标
///
/// 描述信息会出现在 /metrics 端点的 HELP 注释中。
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "order_mutations_total",
        "Order mutations by event kind and outcome"
    );
    metrics::describe_counter!(
        "order_events_published_total",
        "Order event publish attempts by kind and outcome"
    );
    metrics::describe_histogram!(
        "order_event_publish_duration_seconds",
        "Time from send to broker acknowledgement"
    );

    metrics::describe_counter!(
        "event_stream_records_total",
        "Records delivered by the event stream reader"
    );
    metrics::describe_counter!(
        "event_stream_pull_errors_total",
        "Transient pull failures in the event stream reader"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录一次订单变更的最终结果
///
/// status 取值：`ok`、`validation`、`not_found`、`storage_failed`、`publish_failed`
#[inline]
pub fn record_order_mutation(kind: &str, status: &str) {
    metrics::counter!(
        "order_mutations_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录事件发布
#[inline]
pub fn record_event_publish(kind: &str, success: bool, duration_secs: f64) {
    let status = if success { "ok" } else { "failed" };
    metrics::counter!(
        "order_events_published_total",
        "kind" => kind.to_string(),
        "status" => status
    )
    .increment(1);

    metrics::histogram!(
        "order_event_publish_duration_seconds",
        "kind" => kind.to_string()
    )
    .record(duration_secs);
}

/// 记录读取循环投递的记录
#[inline]
pub fn record_stream_record(topic: &str, decoded: bool) {
    metrics::counter!(
        "event_stream_records_total",
        "topic" => topic.to_string(),
        "decoded" => decoded.to_string()
    )
    .increment(1);
}

/// 记录读取循环的拉取失败
#[inline]
pub fn record_stream_pull_error(topic: &str) {
    metrics::counter!("event_stream_pull_errors_total", "topic" => topic.to_string()).increment(1);
}
