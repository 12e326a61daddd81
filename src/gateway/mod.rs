use thiserror::Error;

use crate::transaction::Transaction;

pub mod http;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transient: the shard's cursor must not advance this tick.
    #[error("gateway unreachable: {0}")]
    Unreachable(String),
    #[error("unexpected gateway response for shard {shard}: {reason}")]
    BadResponse { shard: u32, reason: String },
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Read-only view of one shard's chain state. Assumed idempotent and
/// side-effect-free.
#[async_trait::async_trait]
pub trait GatewayClient: Send + Sync {
    /// Latest finalized block nonce of the shard.
    async fn latest_nonce(&self, shard_id: u32) -> GatewayResult<u64>;

    /// All transactions finalized in the shard's block at `nonce`, in the
    /// order the block records them.
    async fn transactions_in_block(&self, shard_id: u32, nonce: u64)
        -> GatewayResult<Vec<Transaction>>;
}
