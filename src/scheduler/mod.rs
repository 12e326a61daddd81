//! The ingestion orchestrator.
//!
//! A fixed-interval tick drives one single-flight run over every configured
//! shard: fetch the shard's new transactions, dispatch notifications and
//! offload jobs as transactions are seen, aggregate invalidation keys, and
//! only after the whole batch's side effects are out, advance the cursor.

use std::{
    collections::HashSet,
    sync::Arc,
    time::Duration,
};

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    bus::InvalidationBus,
    cache::{keys, Cache},
    cursor::{CursorStore, StartPolicy},
    fetcher::ShardFetcher,
    gateway::GatewayClient,
    metrics::PipelineMetrics,
    notifier::BalanceNotifier,
    owners::OwnerCache,
    queue::{JobQueue, NftLookup, ProcessNftJob},
    rules::{invalidation, notification, offload, InvalidationIntent},
    single_flight::{KeyedLock, SingleFlight},
    transaction::Transaction,
    INVALIDATION_TOPIC,
};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub shard_ids: Vec<u32>,
    pub tick_interval: Duration,
    pub max_look_behind: u64,
    pub start_policy: StartPolicy,
    /// When false, NFT offload detection is skipped entirely.
    pub process_nfts: bool,
    pub settle_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            shard_ids: crate::DEFAULT_SHARD_IDS.to_vec(),
            tick_interval: Duration::from_millis(crate::DEFAULT_TICK_INTERVAL_MS),
            max_look_behind: crate::DEFAULT_MAX_LOOK_BEHIND,
            start_policy: StartPolicy::FromCurrent,
            process_nfts: false,
            settle_delay: Duration::from_millis(crate::NFT_SETTLE_DELAY_MS),
        }
    }
}

/// Downstream systems the scheduler fans out to.
pub struct Collaborators {
    pub gateway: Arc<dyn GatewayClient>,
    pub cache: Arc<dyn Cache>,
    pub bus: Arc<dyn InvalidationBus>,
    pub notifier: Arc<dyn BalanceNotifier>,
    pub queue: Arc<dyn JobQueue>,
    pub owners: Arc<dyn OwnerCache>,
    pub nft_lookup: Arc<dyn NftLookup>,
}

pub struct IngestionScheduler {
    config: SchedulerConfig,
    fetcher: ShardFetcher,
    cursors: CursorStore,
    cache: Arc<dyn Cache>,
    bus: Arc<dyn InvalidationBus>,
    notifier: Arc<dyn BalanceNotifier>,
    queue: Arc<dyn JobQueue>,
    owners: Arc<dyn OwnerCache>,
    nft_lookup: Arc<dyn NftLookup>,
    metrics: Arc<PipelineMetrics>,
    guard: SingleFlight,
    offload_locks: Arc<KeyedLock>,
}

impl IngestionScheduler {
    pub fn new(
        config: SchedulerConfig,
        collaborators: Collaborators,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            config,
            fetcher: ShardFetcher::new(collaborators.gateway),
            cursors: CursorStore::new(collaborators.cache.clone()),
            cache: collaborators.cache,
            bus: collaborators.bus,
            notifier: collaborators.notifier,
            queue: collaborators.queue,
            owners: collaborators.owners,
            nft_lookup: collaborators.nft_lookup,
            metrics,
            guard: SingleFlight::new(),
            offload_locks: Arc::new(KeyedLock::new()),
        }
    }

    /// Runs until the owning task is dropped. Aborting mid-run abandons the
    /// in-flight batch; if that ever leaves the permit held, a process
    /// restart is required.
    pub async fn run(self: Arc<Self>) {
        info!(
            "starting ingestion scheduler for shards {:?} (tick {:?})",
            self.config.shard_ids, self.config.tick_interval
        );
        let mut timer = interval(self.config.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            timer.tick().await;
            self.tick().await;
        }
    }

    /// One scheduler pass. No-ops when a previous pass is still running.
    pub async fn tick(&self) {
        let Some(_permit) = self.guard.try_acquire() else {
            debug!("previous run still active, skipping tick");
            return;
        };

        // One shard's failure never reaches the others; the permit drops on
        // every path out of this scope.
        for &shard_id in &self.config.shard_ids {
            if let Err(e) = self.process_shard(shard_id).await {
                warn!("shard {shard_id} not processed this tick: {e:#}");
            }
        }
    }

    #[instrument(skip(self))]
    async fn process_shard(&self, shard_id: u32) -> anyhow::Result<()> {
        let cursor = self.cursors.get(shard_id).await?;
        let from_nonce = match cursor.last_processed_nonce {
            Some(nonce) => nonce + 1,
            None => {
                let latest = self.fetcher.latest_nonce(shard_id).await?;
                let start = self.config.start_policy.starting_nonce(latest);
                info!("no cursor for shard {shard_id}, starting at nonce {start}");
                start
            }
        };

        let batch = self
            .fetcher
            .fetch(shard_id, from_nonce, self.config.max_look_behind)
            .await?;
        if batch.skipped_nonces > 0 {
            self.metrics
                .record_skipped_nonces(shard_id, batch.skipped_nonces);
        }
        if batch.last_nonce < from_nonce {
            return Ok(());
        }

        if !batch.transactions.is_empty() {
            info!(
                "new transactions: {} for shard {shard_id} through nonce {}",
                batch.transactions.len(),
                batch.last_nonce
            );
            self.dispatch_batch(shard_id, &batch.transactions).await?;
        }

        // Commit only after every side effect of the batch is out; a failed
        // set leaves the cursor behind and the next tick replays the batch,
        // which is safe because all dispatch paths are idempotent.
        self.metrics
            .set_last_processed_nonce(shard_id, batch.last_nonce);
        self.cursors.set(shard_id, batch.last_nonce).await?;
        Ok(())
    }

    async fn dispatch_batch(
        &self,
        shard_id: u32,
        transactions: &[Transaction],
    ) -> anyhow::Result<()> {
        let mut all_keys = vec![];
        for tx in transactions {
            // Notifications and offloads go out per transaction, not at
            // end of batch, so a mid-batch crash loses nothing already sent
            for address in notification::balance_changed_addresses(tx) {
                self.notifier.account_balance_changed(address).await;
            }
            self.maybe_offload(tx);

            let intents = self.invalidation_intents(tx).await;
            all_keys.extend(intents.into_iter().map(|intent| intent.cache_key));
        }

        let unique_keys = dedup(all_keys);
        if !unique_keys.is_empty() {
            self.cache.delete_many(&unique_keys).await?;
            self.bus.publish(INVALIDATION_TOPIC, &unique_keys).await;
        }

        let count_keys = dedup(
            transactions
                .iter()
                .flat_map(|tx| [tx.sender.as_str(), tx.receiver.as_str()])
                .map(keys::tx_count)
                .collect(),
        );
        self.cache.delete_many(&count_keys).await?;

        self.metrics
            .record_batch(shard_id, transactions.len() as u64, unique_keys.len() as u64);
        Ok(())
    }

    async fn invalidation_intents(&self, tx: &Transaction) -> Vec<InvalidationIntent> {
        let mut intents = invalidation::token_properties(tx);
        intents.extend(invalidation::account_token_list(tx));
        intents.extend(invalidation::account_token_balance(tx));
        intents.extend(invalidation::owner_mapping(tx, self.owners.as_ref()).await);
        intents.extend(invalidation::collection_properties(tx));
        intents
    }

    /// Spawns the settling wait and lookup off the tick path. The keyed
    /// lock keeps a transaction's offload from being dispatched twice while
    /// an earlier attempt is still settling.
    fn maybe_offload(&self, tx: &Transaction) {
        if !self.config.process_nfts {
            return;
        }
        let Some(job) = offload::detect(tx, self.config.settle_delay) else {
            return;
        };
        if let Some(metadata) = offload::create_metadata(tx) {
            info!(
                "detected NFT create for collection '{}' ({} attribute bytes)",
                metadata.collection,
                metadata.attributes.len()
            );
        }

        let tx_hash = tx.hash.clone();
        let queue = self.queue.clone();
        let lookup = self.nft_lookup.clone();
        let locks = self.offload_locks.clone();
        tokio::spawn(async move {
            let Some(_permit) = locks.try_acquire(&tx_hash) else {
                debug!("offload for transaction {tx_hash} already settling");
                return;
            };
            tokio::time::sleep(job.settle_delay).await;

            match lookup.nft_identifier(&tx_hash).await {
                Ok(Some(identifier)) => {
                    if let Err(e) = queue.enqueue(ProcessNftJob::new(identifier)).await {
                        error!("unable to enqueue nft job for transaction {tx_hash}: {e}");
                    }
                }
                Ok(None) => debug!("no nft indexed yet for transaction {tx_hash}, skipping"),
                Err(e) => warn!("nft lookup failed for transaction {tx_hash}: {e:#}"),
            }
        });
    }
}

/// First-seen order, duplicates removed.
fn dedup(keys: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.into_iter().filter(|key| seen.insert(key.clone())).collect()
}
