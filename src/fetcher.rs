use std::sync::Arc;

use tracing::{instrument, warn};

use crate::{
    gateway::{GatewayClient, GatewayResult},
    transaction::Transaction,
};

/// One shard's newly finalized transactions, strictly ascending by block
/// nonce.
#[derive(Debug, Clone, Default)]
pub struct ShardBatch {
    pub transactions: Vec<Transaction>,
    /// Nonce through which the shard has been read; the cursor target.
    pub last_nonce: u64,
    /// Nonces dropped in front of the look-behind window.
    pub skipped_nonces: u64,
}

/// Walks a shard's blocks from a starting nonce up to the gateway's latest,
/// bounded by a look-behind window.
pub struct ShardFetcher {
    gateway: Arc<dyn GatewayClient>,
}

impl ShardFetcher {
    pub fn new(gateway: Arc<dyn GatewayClient>) -> Self {
        Self { gateway }
    }

    pub async fn latest_nonce(&self, shard_id: u32) -> GatewayResult<u64> {
        self.gateway.latest_nonce(shard_id).await
    }

    /// Fetches blocks `from_nonce..=latest` in order. When the backlog
    /// exceeds `max_look_behind`, the window start is clamped forward and
    /// the older nonces are permanently skipped; `skipped_nonces` makes the
    /// drop observable.
    #[instrument(skip(self))]
    pub async fn fetch(
        &self,
        shard_id: u32,
        from_nonce: u64,
        max_look_behind: u64,
    ) -> GatewayResult<ShardBatch> {
        let latest = self.gateway.latest_nonce(shard_id).await?;
        if from_nonce > latest {
            // Nothing new; report the nonce already processed
            return Ok(ShardBatch {
                last_nonce: from_nonce.saturating_sub(1),
                ..Default::default()
            });
        }

        let window_start = from_nonce.max((latest + 1).saturating_sub(max_look_behind));
        let skipped_nonces = window_start - from_nonce;
        if skipped_nonces > 0 {
            warn!(
                "shard {shard_id} is {} nonces behind, skipping {skipped_nonces} ahead to nonce {window_start}",
                latest - from_nonce
            );
        }

        let mut transactions = vec![];
        for nonce in window_start..=latest {
            transactions.extend(self.gateway.transactions_in_block(shard_id, nonce).await?);
        }
        Ok(ShardBatch {
            transactions,
            last_nonce: latest,
            skipped_nonces,
        })
    }
}
