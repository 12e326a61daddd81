use std::time::Duration;

use data_encoding::{BASE64, HEXLOWER};
use serde_derive::Deserialize;
use tracing::{debug, instrument};

use super::{GatewayClient, GatewayError, GatewayResult};
use crate::{
    queue::NftLookup,
    transaction::{payload, Transaction, TransactionStatus},
    NFT_CREATE_FUNCTION,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON client for the gateway's REST surface.
pub struct HttpGatewayClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGatewayClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?
            .json()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    error: String,
}

impl<T> Envelope<T> {
    fn into_data(self, shard: u32) -> GatewayResult<T> {
        self.data.ok_or(GatewayError::BadResponse {
            shard,
            reason: self.error,
        })
    }
}

#[derive(Debug, Deserialize)]
struct NetworkStatusData {
    status: NetworkStatus,
}

#[derive(Debug, Deserialize)]
struct NetworkStatus {
    #[serde(rename = "erd_nonce")]
    nonce: u64,
}

#[derive(Debug, Deserialize)]
struct BlockData {
    block: BlockDto,
}

#[derive(Debug, Deserialize)]
struct BlockDto {
    #[serde(default, rename = "miniBlocks")]
    mini_blocks: Vec<MiniBlockDto>,
}

#[derive(Debug, Deserialize)]
struct MiniBlockDto {
    #[serde(rename = "sourceShard")]
    source_shard: u32,
    #[serde(rename = "destinationShard")]
    destination_shard: u32,
    #[serde(default)]
    transactions: Vec<TransactionDto>,
}

#[derive(Debug, Deserialize)]
struct TransactionDto {
    hash: String,
    nonce: u64,
    sender: String,
    receiver: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    data: Option<String>,
}

impl TransactionDto {
    fn into_transaction(self, block_nonce: u64, mini_block: &MiniBlockDto) -> Transaction {
        Transaction {
            hash: self.hash,
            sender: self.sender,
            receiver: self.receiver,
            sender_shard: mini_block.source_shard,
            receiver_shard: mini_block.destination_shard,
            nonce: block_nonce,
            status: TransactionStatus::from_gateway(&self.status),
            data: self.data.as_deref().and_then(payload::decode_base64),
        }
    }
}

#[async_trait::async_trait]
impl GatewayClient for HttpGatewayClient {
    #[instrument(skip(self))]
    async fn latest_nonce(&self, shard_id: u32) -> GatewayResult<u64> {
        let envelope: Envelope<NetworkStatusData> =
            self.get_json(&format!("network/status/{shard_id}")).await?;
        Ok(envelope.into_data(shard_id)?.status.nonce)
    }

    #[instrument(skip(self))]
    async fn transactions_in_block(
        &self,
        shard_id: u32,
        nonce: u64,
    ) -> GatewayResult<Vec<Transaction>> {
        let envelope: Envelope<BlockData> = self
            .get_json(&format!("block/{shard_id}/by-nonce/{nonce}?withTxs=true"))
            .await?;
        let block = envelope.into_data(shard_id)?.block;

        let mut transactions = vec![];
        for mut mini_block in block.mini_blocks {
            for tx in std::mem::take(&mut mini_block.transactions) {
                transactions.push(tx.into_transaction(nonce, &mini_block));
            }
        }
        Ok(transactions)
    }
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    transaction: TransactionDetails,
}

#[derive(Debug, Deserialize)]
struct TransactionDetails {
    #[serde(default)]
    logs: Option<TransactionLogs>,
}

#[derive(Debug, Deserialize)]
struct TransactionLogs {
    #[serde(default)]
    events: Vec<LogEvent>,
}

#[derive(Debug, Deserialize)]
struct LogEvent {
    identifier: String,
    #[serde(default)]
    topics: Vec<String>,
}

/// Resolves the minted NFT identifier from the create-transaction's log
/// events once the gateway has them: `{collection}-{hex nonce}` from the
/// first two `ESDTNFTCreate` event topics.
#[async_trait::async_trait]
impl NftLookup for HttpGatewayClient {
    async fn nft_identifier(&self, tx_hash: &str) -> anyhow::Result<Option<String>> {
        let envelope: Envelope<TransactionData> = self
            .get_json(&format!("transaction/{tx_hash}?withResults=true"))
            .await?;
        let details = match envelope.data {
            Some(data) => data.transaction,
            None => return Ok(None),
        };

        let events = details.logs.map(|logs| logs.events).unwrap_or_default();
        for event in events {
            if event.identifier != NFT_CREATE_FUNCTION || event.topics.len() < 2 {
                continue;
            }
            let collection = BASE64
                .decode(event.topics[0].as_bytes())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok());
            let nft_nonce = BASE64.decode(event.topics[1].as_bytes()).ok();
            if let (Some(collection), Some(nft_nonce)) = (collection, nft_nonce) {
                let identifier = format!("{collection}-{}", HEXLOWER.encode(&nft_nonce));
                debug!("resolved nft {identifier} from transaction {tx_hash}");
                return Ok(Some(identifier));
            }
        }
        Ok(None)
    }
}
