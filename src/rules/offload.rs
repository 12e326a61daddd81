//! Detection of transactions needing deferred, heavier processing.

use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use crate::{
    transaction::{payload, Transaction, TransactionStatus},
    NFT_CREATE_FUNCTION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    ProcessNft,
}

/// The NFT minted by a create transaction. Identifier resolution happens
/// after the settling delay, once the downstream index has the operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NftReference {
    PendingLookup { tx_hash: String },
    Resolved(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffloadJob {
    pub nft: NftReference,
    pub settle_delay: Duration,
    pub kind: JobKind,
}

/// An NFT-create is a successful self-send whose payload starts with the
/// `ESDTNFTCreate@` marker.
pub fn detect(tx: &Transaction, settle_delay: Duration) -> Option<OffloadJob> {
    if tx.sender != tx.receiver || tx.status != TransactionStatus::Success {
        return None;
    }
    let data = tx.data.as_deref()?;
    let text = std::str::from_utf8(data).ok()?;
    if !text.starts_with(&format!("{NFT_CREATE_FUNCTION}@")) {
        return None;
    }

    Some(OffloadJob {
        nft: NftReference::PendingLookup {
            tx_hash: tx.hash.clone(),
        },
        settle_delay,
        kind: JobKind::ProcessNft,
    })
}

/// Collection and raw attributes of the create payload, for logging at
/// detection time.
pub fn create_metadata(tx: &Transaction) -> Option<payload::NftCreateMetadata> {
    payload::nft_create_metadata(tx.data.as_deref()?)
}
