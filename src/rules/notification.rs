//! Balance-change notification rule.
//!
//! Best-effort, at-least-once: the event carries no balance, consumers
//! re-fetch authoritative state.

use crate::{address, transaction::Transaction};

/// Addresses owed a "balance may have changed" event for this transaction:
/// sender then receiver, excluding contract addresses. No deduplication;
/// a self-transfer notifies the address twice, which is harmless.
pub fn balance_changed_addresses(tx: &Transaction) -> Vec<&str> {
    let mut addresses = vec![];
    if !address::is_smart_contract(&tx.sender) {
        addresses.push(tx.sender.as_str());
    }
    if !address::is_smart_contract(&tx.receiver) {
        addresses.push(tx.receiver.as_str());
    }
    addresses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionStatus;

    const CONTRACT: &str = "erd1qqqqqqqqqqqqqqqpqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqylllslmq6y6";

    fn tx(sender: &str, receiver: &str) -> Transaction {
        Transaction {
            hash: "hash".to_string(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            sender_shard: 0,
            receiver_shard: 0,
            nonce: 1,
            status: TransactionStatus::Success,
            data: None,
        }
    }

    #[test]
    fn both_sides_notified_for_plain_transfer() {
        let tx = tx("erd1alice", "erd1bob");
        assert_eq!(balance_changed_addresses(&tx), vec!["erd1alice", "erd1bob"]);
    }

    #[test]
    fn contract_receiver_notifies_sender_only() {
        let tx = tx("erd1alice", CONTRACT);
        assert_eq!(balance_changed_addresses(&tx), vec!["erd1alice"]);
    }

    #[test]
    fn contract_to_contract_notifies_nobody() {
        let tx = tx(CONTRACT, CONTRACT);
        assert!(balance_changed_addresses(&tx).is_empty());
    }
}
