use std::{path::PathBuf, time::Duration};

use anyhow::bail;
use clap::Parser;
use tracing::level_filters::LevelFilter;

use crate::{
    cursor::StartPolicy, scheduler::SchedulerConfig, DEFAULT_MAX_LOOK_BEHIND,
    DEFAULT_TICK_INTERVAL_MS, METACHAIN_SHARD_ID, NFT_SETTLE_DELAY_MS,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct PipelineArgs {
    /// Gateway base URL, e.g. https://gateway.example.com
    #[arg(short, long)]
    pub gateway_url: Option<String>,
    /// Shard ids to follow
    #[arg(long, value_delimiter = ',', default_values_t = [0, 1, 2, METACHAIN_SHARD_ID])]
    pub shards: Vec<u32>,
    /// Scheduler tick interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_TICK_INTERVAL_MS)]
    pub tick_interval_ms: u64,
    /// Maximum nonces to catch up per shard; older backlog is skipped
    #[arg(long, default_value_t = DEFAULT_MAX_LOOK_BEHIND)]
    pub max_look_behind: u64,
    /// Without a cursor, start this many nonces behind the chain tip
    /// instead of at the tip
    #[arg(long)]
    pub start_look_back: Option<u64>,
    /// Process detected NFT creates through the worker queue
    #[arg(long, default_value_t = false)]
    pub process_nfts: bool,
    /// Settling delay before NFT lookup, in milliseconds
    #[arg(long, default_value_t = NFT_SETTLE_DELAY_MS)]
    pub settle_delay_ms: u64,
    /// Path to directory for the cache database
    #[arg(short, long, default_value = concat!(env!("HOME"), "/.shard-ingest/cache"))]
    pub database_dir: PathBuf,
    /// Path to directory for logs
    #[arg(short, long, default_value = concat!(env!("HOME"), "/.shard-ingest/logs"))]
    pub log_dir: PathBuf,
    /// Max file log level
    #[arg(long, default_value_t = LevelFilter::DEBUG)]
    pub log_level: LevelFilter,
    /// Max stdout log level
    #[arg(long, default_value_t = LevelFilter::INFO)]
    pub log_level_stdout: LevelFilter,
}

#[derive(Debug, Clone)]
pub struct PipelineConfiguration {
    pub gateway_url: String,
    pub shard_ids: Vec<u32>,
    pub tick_interval: Duration,
    pub max_look_behind: u64,
    pub start_policy: StartPolicy,
    pub process_nfts: bool,
    pub settle_delay: Duration,
    pub database_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: LevelFilter,
    pub log_level_stdout: LevelFilter,
}

impl PipelineConfiguration {
    /// Validates startup requirements; a missing gateway URL is fatal here
    /// rather than per-tick.
    pub fn from_args(args: PipelineArgs) -> anyhow::Result<Self> {
        let Some(gateway_url) = args.gateway_url else {
            bail!("no gateway URL configured; pass --gateway-url");
        };
        if args.shards.is_empty() {
            bail!("no shards configured");
        }

        let start_policy = match args.start_look_back {
            Some(behind) => StartPolicy::LookBack(behind),
            None => StartPolicy::FromCurrent,
        };

        Ok(Self {
            gateway_url,
            shard_ids: args.shards,
            tick_interval: Duration::from_millis(args.tick_interval_ms),
            max_look_behind: args.max_look_behind,
            start_policy,
            process_nfts: args.process_nfts,
            settle_delay: Duration::from_millis(args.settle_delay_ms),
            database_dir: args.database_dir,
            log_dir: args.log_dir,
            log_level: args.log_level,
            log_level_stdout: args.log_level_stdout,
        })
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            shard_ids: self.shard_ids.clone(),
            tick_interval: self.tick_interval,
            max_look_behind: self.max_look_behind,
            start_policy: self.start_policy,
            process_nfts: self.process_nfts,
            settle_delay: self.settle_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> PipelineArgs {
        PipelineArgs::parse_from([&["shard-ingest"], argv].concat())
    }

    #[test]
    fn missing_gateway_url_is_fatal() {
        assert!(PipelineConfiguration::from_args(args(&[])).is_err());
    }

    #[test]
    fn defaults_follow_all_shards_from_current() {
        let config =
            PipelineConfiguration::from_args(args(&["--gateway-url", "http://localhost:8080"]))
                .unwrap();
        assert_eq!(config.shard_ids, vec![0, 1, 2, METACHAIN_SHARD_ID]);
        assert_eq!(config.start_policy, StartPolicy::FromCurrent);
        assert_eq!(config.tick_interval, Duration::from_millis(1000));
        assert!(!config.process_nfts);
    }

    #[test]
    fn look_back_start_is_selectable() {
        let config = PipelineConfiguration::from_args(args(&[
            "--gateway-url",
            "http://localhost:8080",
            "--start-look-back",
            "250",
            "--shards",
            "0,1",
        ]))
        .unwrap();
        assert_eq!(config.start_policy, StartPolicy::LookBack(250));
        assert_eq!(config.shard_ids, vec![0, 1]);
    }
}
