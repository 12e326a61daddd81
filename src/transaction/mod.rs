use serde_derive::{Deserialize, Serialize};

pub mod payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Pending,
    Failed,
    Invalid,
}

impl TransactionStatus {
    /// Status strings as reported by the gateway. Unknown values map to
    /// `Pending` so a new gateway status never aborts a batch.
    pub fn from_gateway(status: &str) -> Self {
        match status {
            "success" | "executed" => Self::Success,
            "fail" | "failed" | "unsuccessful" => Self::Failed,
            "invalid" => Self::Invalid,
            _ => Self::Pending,
        }
    }
}

/// A finalized transaction as observed on a shard. Immutable once observed;
/// the pipeline only derives facts from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub sender: String,
    pub receiver: String,
    pub sender_shard: u32,
    pub receiver_shard: u32,
    pub nonce: u64,
    pub status: TransactionStatus,
    /// Raw payload bytes, already base64-decoded from the gateway encoding
    pub data: Option<Vec<u8>>,
}

impl Transaction {
    pub fn function_name(&self) -> Option<&str> {
        payload::function_name(self.data.as_deref()?)
    }
}
