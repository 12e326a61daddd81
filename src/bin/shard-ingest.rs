use std::{process, sync::Arc, time::Duration};

use clap::Parser;
use shard_ingest::{
    bus::{BroadcastBus, InvalidationMessage},
    cache::{store::CacheStore, Cache},
    config::{PipelineArgs, PipelineConfiguration},
    gateway::http::HttpGatewayClient,
    metrics::PipelineMetrics,
    notifier::BroadcastNotifier,
    owners::IndexedOwnerCache,
    queue::{ChannelQueue, ProcessNftJob},
    scheduler::{Collaborators, IngestionScheduler},
};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

const SUMMARY_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let config = PipelineConfiguration::from_args(PipelineArgs::parse())?;

    tokio::fs::create_dir_all(&config.log_dir).await?;
    let mut log_number = 0;
    let mut log_fname = format!("{}/shard-ingest-0.log", config.log_dir.display());
    while tokio::fs::metadata(&log_fname).await.is_ok() {
        log_number += 1;
        log_fname = format!("{}/shard-ingest-{log_number}.log", config.log_dir.display());
    }
    let log_file = std::fs::File::create(&log_fname)?;
    let file_layer = tracing_subscriber::fmt::layer().with_writer(log_file);
    let stdout_layer = tracing_subscriber::fmt::layer();
    tracing_subscriber::registry()
        .with(stdout_layer.with_filter(config.log_level_stdout))
        .with(file_layer.with_filter(config.log_level))
        .init();

    info!("starting shard-ingest against {}", config.gateway_url);

    let cache: Arc<dyn Cache> = Arc::new(CacheStore::new(&config.database_dir)?);
    let gateway = Arc::new(HttpGatewayClient::new(config.gateway_url.clone())?);
    let metrics = Arc::new(PipelineMetrics::new());

    let (bus, mut invalidations) = BroadcastBus::new(1024);
    tokio::spawn(async move {
        while let Ok(payload) = invalidations.recv().await {
            match serde_json::from_str::<InvalidationMessage>(&payload) {
                Ok(message) => info!(
                    "invalidated {} cache keys on '{}'",
                    message.keys.len(),
                    message.topic
                ),
                Err(error) => warn!("undecodable invalidation message: {error}"),
            }
        }
    });

    let (notifier, mut balance_events) = BroadcastNotifier::new(1024);
    tokio::spawn(async move {
        // Stands in for the websocket layer until one is attached
        while let Ok(address) = balance_events.recv().await {
            info!("balance may have changed for {address}");
        }
    });

    let (queue, mut jobs) = ChannelQueue::new(256);
    tokio::spawn(async move {
        while let Some(payload) = jobs.recv().await {
            match serde_json::from_str::<ProcessNftJob>(&payload) {
                Ok(job) => info!("nft job {} ready for worker: {}", job.id, job.identifier),
                Err(error) => warn!("undecodable nft job: {error}"),
            }
        }
    });

    let scheduler = Arc::new(IngestionScheduler::new(
        config.scheduler_config(),
        Collaborators {
            gateway: gateway.clone(),
            cache: cache.clone(),
            bus: Arc::new(bus),
            notifier: Arc::new(notifier),
            queue: Arc::new(queue),
            owners: Arc::new(IndexedOwnerCache::new(cache.clone())),
            nft_lookup: gateway,
        },
        metrics.clone(),
    ));
    tokio::spawn(scheduler.run());

    tokio::spawn(async move {
        let mut timer = tokio::time::interval(SUMMARY_INTERVAL);
        timer.tick().await;
        loop {
            timer.tick().await;
            info!("\n{}", metrics.summary());
        }
    });

    wait_for_signal().await;
    Ok(())
}

async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate()).expect("failed to register signal handler");
    let mut int = signal(SignalKind::interrupt()).expect("failed to register signal handler");
    tokio::select! {
        _ = term.recv() => {
            info!("Received SIGTERM");
            process::exit(100);
        },
        _ = int.recv() => {
            warn!("Received SIGINT");
            process::exit(101);
        },
    }
}
