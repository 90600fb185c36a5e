//! 订单事件查看工具
//!
//! 订阅订单事件 topic 并按诊断格式打印每条消息，Ctrl+C 退出。

use anyhow::Context;
use clap::Parser;
use event_verifier::{Diagnostics, EventStreamReader, ReaderOptions};
use orders_shared::config::AppConfig;
use orders_shared::kafka::StartPosition;
use orders_shared::observability;
use tracing::info;

const SERVICE_NAME: &str = "orders-events-tail";

#[derive(Parser, Debug)]
#[command(name = "orders-events-tail")]
#[command(version, about = "订单事件流查看工具")]
struct Cli {
    /// 起始位置 (beginning, end)
    #[arg(short, long, default_value = "end")]
    from: String,

    /// 只打印负载或头中包含该片段的消息
    #[arg(long, env = "KAFKA_FILTER")]
    filter: Option<String>,

    /// 覆盖配置中的 topic
    #[arg(short, long)]
    topic: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let position: StartPosition = cli.from.parse()?;

    let config = AppConfig::load(SERVICE_NAME).context("加载配置失败")?;
    let obs_config = config
        .observability
        .clone()
        .with_service_name(SERVICE_NAME);
    let _guard = observability::init_logging(&obs_config)?;

    let topic = cli.topic.unwrap_or_else(|| config.kafka.topic.clone());
    let mut reader = EventStreamReader::new(ReaderOptions {
        diagnostics: Diagnostics::new(true, cli.filter),
        ..Default::default()
    });

    let mut records = reader
        .start_kafka(&config.kafka, &topic, position)
        .await
        .with_context(|| format!("订阅 {topic} 失败"))?;

    let mut seen: u64 = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("收到退出信号");
                break;
            }
            record = records.recv() => match record {
                Some(_) => seen += 1,
                None => break,
            },
        }
    }

    reader.stop().await;
    info!(topic = %topic, records = seen, "事件流查看结束");
    Ok(())
}
