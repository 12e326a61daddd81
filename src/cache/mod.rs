use std::time::Duration;

use thiserror::Error;

pub mod memory;
pub mod store;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("malformed cache entry for key '{0}'")]
    Malformed(String),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Shared cache used for cursor persistence and fact invalidation.
///
/// Concrete backends must make `delete_many` a no-op for absent keys so a
/// replayed batch is harmless.
#[async_trait::async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;
    async fn delete_many(&self, keys: &[String]) -> CacheResult<()>;
}

/// Cache key catalogue. Key layouts are shared with the API processes that
/// populate these entries, so the formats here are load-bearing.
pub mod keys {
    use std::time::Duration;

    pub const SHARD_NONCE_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

    pub fn shard_nonce(shard_id: u32) -> String {
        format!("shardNonce:{shard_id}")
    }

    pub fn token_properties(identifier: &str) -> String {
        format!("tokenProperties:{identifier}")
    }

    pub fn account_tokens(address: &str) -> String {
        format!("tokens:{address}")
    }

    pub fn token_balance(address: &str, identifier: &str) -> String {
        format!("tokenBalance:{address}:{identifier}")
    }

    pub fn collection_properties(identifier: &str) -> String {
        format!("esdt:{identifier}")
    }

    pub fn tx_count(address: &str) -> String {
        format!("txCount:{address}")
    }
}
