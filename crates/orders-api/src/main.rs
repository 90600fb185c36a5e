//! 订单 API 服务入口

use std::sync::Arc;

use orders_api::{
    publisher::KafkaEventPublisher, repository::PgOrderRepository, routes, service::OrderService,
    state::AppState,
};
use orders_shared::{
    config::AppConfig,
    database::Database,
    kafka::{self, KafkaProducer},
    observability,
    retry::{RetryPolicy, retry_with_policy},
};
use tokio::net::TcpListener;
use tracing::{info, warn};

const SERVICE_NAME: &str = "orders-api";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting {} on {}", SERVICE_NAME, config.server_addr());

    let db = Database::connect(&config.database).await?;
    db.bootstrap_schema(config.database.reset_schema).await?;

    // 提前创建 topic；失败不阻止启动，首次发布时由 broker 报错
    let topic_ready = retry_with_policy(
        &RetryPolicy::default(),
        "ensure_topic",
        |e| e.is_retryable(),
        || {
            kafka::ensure_topic(
                &config.kafka,
                &config.kafka.topic,
                kafka::DEFAULT_PARTITIONS,
                kafka::DEFAULT_REPLICATION,
            )
        },
    )
    .await;
    if let Err(e) = topic_ready {
        warn!(topic = %config.kafka.topic, error = %e, "无法确认 topic 存在");
    }

    let producer = KafkaProducer::new(&config.kafka)?;
    let service = OrderService::new(
        Arc::new(PgOrderRepository::new(db.pool().clone())),
        Arc::new(KafkaEventPublisher::new(producer)),
    );
    let app = routes::app(AppState::new(Arc::new(service)));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
