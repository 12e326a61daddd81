//! In-memory collaborator fakes for pipeline tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use tokio::sync::Notify;

use shard_ingest::{
    bus::{InvalidationBus, InvalidationMessage},
    cache::{memory::MemoryCache, Cache, CacheError, CacheResult},
    gateway::{GatewayClient, GatewayError, GatewayResult},
    notifier::BalanceNotifier,
    owners::OwnerCache,
    queue::{JobQueue, NftLookup, ProcessNftJob, QueueError},
    transaction::{Transaction, TransactionStatus},
};

pub fn hex(value: &str) -> String {
    data_encoding::HEXLOWER.encode(value.as_bytes())
}

pub fn tx(hash: &str, sender: &str, receiver: &str, data: Option<String>) -> Transaction {
    Transaction {
        hash: hash.to_string(),
        sender: sender.to_string(),
        receiver: receiver.to_string(),
        sender_shard: 0,
        receiver_shard: 0,
        nonce: 0,
        status: TransactionStatus::Success,
        data: data.map(String::into_bytes),
    }
}

#[derive(Default)]
pub struct FakeGateway {
    latest: Mutex<HashMap<u32, u64>>,
    blocks: Mutex<HashMap<(u32, u64), Vec<Transaction>>>,
    unreachable: Mutex<HashSet<u32>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_latest(&self, shard_id: u32, nonce: u64) {
        self.latest.lock().unwrap().insert(shard_id, nonce);
    }

    pub fn put_block(&self, shard_id: u32, nonce: u64, transactions: Vec<Transaction>) {
        self.blocks
            .lock()
            .unwrap()
            .insert((shard_id, nonce), transactions);
    }

    pub fn set_unreachable(&self, shard_id: u32, unreachable: bool) {
        let mut shards = self.unreachable.lock().unwrap();
        if unreachable {
            shards.insert(shard_id);
        } else {
            shards.remove(&shard_id);
        }
    }
}

#[async_trait::async_trait]
impl GatewayClient for FakeGateway {
    async fn latest_nonce(&self, shard_id: u32) -> GatewayResult<u64> {
        if self.unreachable.lock().unwrap().contains(&shard_id) {
            return Err(GatewayError::Unreachable(format!(
                "shard {shard_id} down"
            )));
        }
        Ok(*self.latest.lock().unwrap().get(&shard_id).unwrap_or(&0))
    }

    async fn transactions_in_block(
        &self,
        shard_id: u32,
        nonce: u64,
    ) -> GatewayResult<Vec<Transaction>> {
        if self.unreachable.lock().unwrap().contains(&shard_id) {
            return Err(GatewayError::Unreachable(format!(
                "shard {shard_id} down"
            )));
        }
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .get(&(shard_id, nonce))
            .cloned()
            .unwrap_or_default())
    }
}

/// Gateway whose first poll parks until released, to hold one pass in
/// flight while another one is attempted.
pub struct GatedGateway {
    inner: Arc<FakeGateway>,
    gate: Notify,
    armed: AtomicBool,
}

impl GatedGateway {
    pub fn new(inner: Arc<FakeGateway>) -> Self {
        Self {
            inner,
            gate: Notify::new(),
            armed: AtomicBool::new(true),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait::async_trait]
impl GatewayClient for GatedGateway {
    async fn latest_nonce(&self, shard_id: u32) -> GatewayResult<u64> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.gate.notified().await;
        }
        self.inner.latest_nonce(shard_id).await
    }

    async fn transactions_in_block(
        &self,
        shard_id: u32,
        nonce: u64,
    ) -> GatewayResult<Vec<Transaction>> {
        self.inner.transactions_in_block(shard_id, nonce).await
    }
}

#[derive(Default)]
pub struct RecordingBus {
    pub messages: Mutex<Vec<InvalidationMessage>>,
}

#[async_trait::async_trait]
impl InvalidationBus for RecordingBus {
    async fn publish(&self, topic: &str, keys: &[String]) {
        self.messages.lock().unwrap().push(InvalidationMessage {
            topic: topic.to_string(),
            keys: keys.to_vec(),
        });
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub addresses: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl BalanceNotifier for RecordingNotifier {
    async fn account_balance_changed(&self, address: &str) {
        self.addresses.lock().unwrap().push(address.to_string());
    }
}

#[derive(Default)]
pub struct RecordingQueue {
    pub jobs: Mutex<Vec<ProcessNftJob>>,
}

#[async_trait::async_trait]
impl JobQueue for RecordingQueue {
    async fn enqueue(&self, job: ProcessNftJob) -> Result<(), QueueError> {
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

pub struct FixedLookup(pub Option<String>);

#[async_trait::async_trait]
impl NftLookup for FixedLookup {
    async fn nft_identifier(&self, _tx_hash: &str) -> anyhow::Result<Option<String>> {
        Ok(self.0.clone())
    }
}

pub struct FixedOwners(pub Vec<String>);

#[async_trait::async_trait]
impl OwnerCache for FixedOwners {
    async fn delete_owners_for_address(&self, _address: &str) -> CacheResult<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Memory cache whose next `set` can be made to fail, to exercise aborted
/// cursor advancement.
pub struct FlakyCache {
    pub inner: MemoryCache,
    fail_next_set: AtomicBool,
}

impl FlakyCache {
    pub fn new() -> Self {
        Self {
            inner: MemoryCache::new(),
            fail_next_set: AtomicBool::new(false),
        }
    }

    pub fn fail_next_set(&self) {
        self.fail_next_set.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Cache for FlakyCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        if self.fail_next_set.swap(false, Ordering::SeqCst) {
            return Err(CacheError::Unavailable("injected failure".to_string()));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete_many(&self, keys: &[String]) -> CacheResult<()> {
        self.inner.delete_many(keys).await
    }
}

/// A scheduler wired to recording fakes, with handles kept for assertions.
pub struct Harness {
    pub gateway: Arc<FakeGateway>,
    pub cache: Arc<FlakyCache>,
    pub bus: Arc<RecordingBus>,
    pub notifier: Arc<RecordingNotifier>,
    pub queue: Arc<RecordingQueue>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            gateway: Arc::new(FakeGateway::new()),
            cache: Arc::new(FlakyCache::new()),
            bus: Arc::new(RecordingBus::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            queue: Arc::new(RecordingQueue::default()),
        }
    }

    pub fn published_keys(&self) -> Vec<String> {
        self.bus
            .messages
            .lock()
            .unwrap()
            .iter()
            .flat_map(|message| message.keys.clone())
            .collect()
    }

    pub async fn cursor(&self, shard_id: u32) -> Option<u64> {
        let key = format!("shardNonce:{shard_id}");
        let bytes = self.cache.get(&key).await.unwrap()?;
        String::from_utf8(bytes).ok()?.parse().ok()
    }
}
