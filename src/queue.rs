use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::rules::offload::JobKind;

/// Payload handed to the NFT worker. The consumer is idempotent, so
/// at-least-once enqueueing is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessNftJob {
    pub id: Uuid,
    pub identifier: String,
    pub kind: JobKind,
    pub enqueued_at: DateTime<Utc>,
}

impl ProcessNftJob {
    pub fn new(identifier: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier,
            kind: JobKind::ProcessNft,
            enqueued_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job queue closed")]
    Closed,
    #[error("job encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Asynchronous worker queue. Ownership of the job transfers on enqueue.
#[async_trait::async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: ProcessNftJob) -> Result<(), QueueError>;
}

/// Resolves the NFT identifier minted by a create transaction, once the
/// downstream index has caught up.
#[async_trait::async_trait]
pub trait NftLookup: Send + Sync {
    async fn nft_identifier(&self, tx_hash: &str) -> anyhow::Result<Option<String>>;
}

/// In-process queue over a bounded tokio channel. Jobs cross it
/// JSON-encoded, the payload shape an external queue would carry.
pub struct ChannelQueue {
    sender: mpsc::Sender<String>,
}

impl ChannelQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait::async_trait]
impl JobQueue for ChannelQueue {
    async fn enqueue(&self, job: ProcessNftJob) -> Result<(), QueueError> {
        let payload = serde_json::to_string(&job)?;
        self.sender
            .send(payload)
            .await
            .map_err(|_| QueueError::Closed)
    }
}
