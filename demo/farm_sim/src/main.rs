mod config;
use config::FarmSimConfig;

use agrimind_core::consumer::{ConsumerConfig, EnrichmentConsumer};
use agrimind_core::query::{QueryConfig, QueryServer};
use agrimind_core::reasoning::ReasoningClient;
use agrimind_core::record::SensorRecord;
use agrimind_core::store::{InsightStore, MemoryInsightStore, RocksInsightStore};
use agrimind_core::stream::{ChannelSource, StreamEvent, StreamRecord};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,agrimind_core=info,farm_sim=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        target: "farm_sim",
        "Starting farm simulator demo: Producer → Stream → Enrichment → Store → Query API"
    );

    let cfg = FarmSimConfig::load();

    // Insight store: durable when a path is configured, in-memory otherwise
    let store: Arc<dyn InsightStore> = match &cfg.store_path {
        Some(path) => Arc::new(RocksInsightStore::open(path)?),
        None => Arc::new(MemoryInsightStore::new()),
    };
    let reasoning = Arc::new(ReasoningClient::from_env()?);

    let (source, handle) = ChannelSource::with_capacity(64);

    // 1) Synthetic producer → stream (nested envelope, like the real transport)
    let producer_cfg = cfg.clone();
    let producer = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(producer_cfg.send_interval_secs));
        loop {
            ticker.tick().await;
            let reading = synth_reading(producer_cfg.farm_count);
            info!(target: "farm_sim", farm = %reading.entity_id(), "sending reading");
            let record = match StreamRecord::wrap(&reading) {
                Ok(record) => record,
                Err(e) => {
                    error!(target: "farm_sim", error = %e, "failed to wrap reading");
                    continue;
                }
            };
            if handle
                .send(StreamEvent {
                    records: vec![record],
                })
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // 2) Stream → enrichment consumer → insight store
    let consumer = EnrichmentConsumer::new(
        Arc::clone(&reasoning),
        Arc::clone(&store),
        ConsumerConfig::default(),
    );
    let consumer_task = tokio::spawn(async move {
        if let Err(e) = consumer.run(source).await {
            error!(target: "farm_sim", error = %e, "consumer loop failed");
        }
    });

    // 3) Query API over the store + agent
    let server = QueryServer::new(
        QueryConfig::default(),
        Arc::clone(&store),
        Arc::clone(&reasoning),
    );
    let server_task = tokio::spawn(async move {
        if let Err(e) = server.serve().await {
            error!(target: "farm_sim", error = %e, "query server failed");
        }
    });

    signal::ctrl_c().await?;
    info!(target: "farm_sim", "shutting down");
    producer.abort();
    consumer_task.abort();
    server_task.abort();
    Ok(())
}

/// One synthetic reading in the producer's value ranges.
fn synth_reading(farm_count: u32) -> SensorRecord {
    let mut rng = rand::thread_rng();
    let farm = rng.gen_range(1..=farm_count);
    SensorRecord {
        farm_id: Some(format!("FARM_{farm}")),
        timestamp: Some(chrono::Utc::now().to_rfc3339()),
        soil_moisture: Some(round2(rng.gen_range(10.0..60.0))),
        soil_temperature: Some(round2(rng.gen_range(15.0..35.0))),
        air_temperature: Some(round2(rng.gen_range(20.0..38.0))),
        humidity: Some(round2(rng.gen_range(30.0..90.0))),
        rain_mm: Some(round2(rng.gen_range(0.0..20.0))),
        ph: Some(round2(rng.gen_range(5.5..7.5))),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
