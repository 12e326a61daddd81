use serde_derive::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// One invalidation fan-out: every subscribing process drops the keys from
/// its local cache tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationMessage {
    pub topic: String,
    pub keys: Vec<String>,
}

/// Cross-process invalidation bus. Fire-and-forget; subscribers assume
/// at-least-once delivery.
#[async_trait::async_trait]
pub trait InvalidationBus: Send + Sync {
    async fn publish(&self, topic: &str, keys: &[String]);
}

/// In-process bus over a tokio broadcast channel. Messages cross it in
/// their JSON wire form, the same shape an external pub/sub transport
/// would carry; lagging or absent subscribers are not an error.
pub struct BroadcastBus {
    sender: broadcast::Sender<String>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<String>) {
        let (sender, receiver) = broadcast::channel(capacity);
        (Self { sender }, receiver)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }
}

#[async_trait::async_trait]
impl InvalidationBus for BroadcastBus {
    async fn publish(&self, topic: &str, keys: &[String]) {
        let message = InvalidationMessage {
            topic: topic.to_string(),
            keys: keys.to_vec(),
        };
        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(error) => {
                warn!("dropping invalidation message: {error}");
                return;
            }
        };
        debug!("publishing {} keys to '{topic}'", message.keys.len());
        let _ = self.sender.send(payload);
    }
}
