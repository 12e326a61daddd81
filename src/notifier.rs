use tokio::sync::broadcast;

/// Real-time notifier for balance changes. Fire-and-forget; the event
/// carries only the address, never a balance.
#[async_trait::async_trait]
pub trait BalanceNotifier: Send + Sync {
    async fn account_balance_changed(&self, address: &str);
}

/// In-process notifier feeding the websocket layer (or tests) through a
/// broadcast channel.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<String>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<String>) {
        let (sender, receiver) = broadcast::channel(capacity);
        (Self { sender }, receiver)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }
}

#[async_trait::async_trait]
impl BalanceNotifier for BroadcastNotifier {
    async fn account_balance_changed(&self, address: &str) {
        let _ = self.sender.send(address.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_subscribers() {
        let (notifier, mut receiver) = BroadcastNotifier::new(8);
        notifier.account_balance_changed("erd1alice").await;
        assert_eq!(receiver.recv().await.unwrap(), "erd1alice");
    }
}
