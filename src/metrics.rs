use std::{collections::HashMap, fmt, sync::Mutex};

use serde_derive::Serialize;

/// In-process progress counters, one row per shard.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    shards: Mutex<HashMap<u32, ShardProgress>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShardProgress {
    pub last_processed_nonce: u64,
    pub transactions_processed: u64,
    pub keys_invalidated: u64,
    pub nonces_skipped: u64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_last_processed_nonce(&self, shard_id: u32, nonce: u64) {
        let mut shards = self.shards.lock().expect("metrics mutex poisoned");
        shards.entry(shard_id).or_default().last_processed_nonce = nonce;
    }

    pub fn record_batch(&self, shard_id: u32, transactions: u64, keys: u64) {
        let mut shards = self.shards.lock().expect("metrics mutex poisoned");
        let progress = shards.entry(shard_id).or_default();
        progress.transactions_processed += transactions;
        progress.keys_invalidated += keys;
    }

    pub fn record_skipped_nonces(&self, shard_id: u32, skipped: u64) {
        let mut shards = self.shards.lock().expect("metrics mutex poisoned");
        shards.entry(shard_id).or_default().nonces_skipped += skipped;
    }

    pub fn shard_progress(&self, shard_id: u32) -> ShardProgress {
        let shards = self.shards.lock().expect("metrics mutex poisoned");
        shards.get(&shard_id).copied().unwrap_or_default()
    }

    pub fn summary(&self) -> Summary {
        let shards = self.shards.lock().expect("metrics mutex poisoned");
        let mut rows: Vec<(u32, ShardProgress)> =
            shards.iter().map(|(id, progress)| (*id, *progress)).collect();
        rows.sort_by_key(|(id, _)| *id);
        Summary { shards: rows }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub shards: Vec<(u32, ShardProgress)>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===== Ingestion progress =====")?;
        for (shard_id, progress) in &self.shards {
            writeln!(
                f,
                "shard {shard_id}: nonce {}, {} txs, {} keys invalidated, {} nonces skipped",
                progress.last_processed_nonce,
                progress.transactions_processed,
                progress.keys_invalidated,
                progress.nonces_skipped
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_accumulates_per_shard() {
        let metrics = PipelineMetrics::new();
        metrics.set_last_processed_nonce(0, 100);
        metrics.record_batch(0, 5, 3);
        metrics.record_batch(0, 2, 0);
        metrics.record_skipped_nonces(1, 42);

        let shard0 = metrics.shard_progress(0);
        assert_eq!(shard0.last_processed_nonce, 100);
        assert_eq!(shard0.transactions_processed, 7);
        assert_eq!(shard0.keys_invalidated, 3);

        assert_eq!(metrics.shard_progress(1).nonces_skipped, 42);
        assert_eq!(metrics.summary().shards.len(), 2);
    }
}
