use std::sync::Arc;

use serde_derive::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::{keys, Cache, CacheResult};

/// Per-shard ingestion progress. `last_processed_nonce` is absent on first
/// start and after the backing entry expired; either way the scheduler
/// re-derives a starting point from [`StartPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardCursor {
    pub shard_id: u32,
    pub last_processed_nonce: Option<u64>,
}

/// Starting-nonce strategy when a shard has no cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPolicy {
    /// Start at the gateway's latest nonce, ignoring history.
    FromCurrent,
    /// Start the given number of nonces behind the latest.
    LookBack(u64),
}

impl StartPolicy {
    pub fn starting_nonce(&self, latest: u64) -> u64 {
        match self {
            Self::FromCurrent => latest,
            Self::LookBack(behind) => latest.saturating_sub(*behind),
        }
    }
}

/// Cursor persistence over the shared cache. The entry is a decimal string
/// so other processes can inspect it without this crate's types.
pub struct CursorStore {
    cache: Arc<dyn Cache>,
}

impl CursorStore {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    pub async fn get(&self, shard_id: u32) -> CacheResult<ShardCursor> {
        let last_processed_nonce = match self.cache.get(&keys::shard_nonce(shard_id)).await? {
            None => None,
            Some(bytes) => match std::str::from_utf8(&bytes).ok().and_then(|s| s.parse().ok()) {
                Some(nonce) => Some(nonce),
                None => {
                    // Treat a corrupt entry like an expired one
                    warn!("unreadable cursor entry for shard {shard_id}, re-deriving start");
                    None
                }
            },
        };
        Ok(ShardCursor {
            shard_id,
            last_processed_nonce,
        })
    }

    pub async fn set(&self, shard_id: u32, nonce: u64) -> CacheResult<()> {
        self.cache
            .set(
                &keys::shard_nonce(shard_id),
                nonce.to_string().into_bytes(),
                keys::SHARD_NONCE_TTL,
            )
            .await
    }
}
