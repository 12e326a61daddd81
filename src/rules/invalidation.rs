//! Cache-invalidation rules, one per fact type.
//!
//! Each rule inspects a single transaction and emits zero or more intents;
//! unknown payloads emit nothing. All rules are pure except the
//! owner-mapping rule, whose contract is to report the keys the injected
//! collaborator actually removed.

use tracing::{info, warn};

use super::{FactKind, InvalidationIntent};
use crate::{
    address,
    cache::keys,
    owners::OwnerCache,
    transaction::{payload, Transaction},
    DELEGATION_MERGE_FUNCTION,
};

/// Token-control operations: pause/freeze/role/supply changes.
const TOKEN_CONTROL_FUNCTIONS: [&str; 13] = [
    "pause",
    "unPause",
    "freeze",
    "unFreeze",
    "wipe",
    "mint",
    "burn",
    "ESDTLocalMint",
    "ESDTLocalBurn",
    "setSpecialRole",
    "unSetSpecialRole",
    "transferOwnership",
    "controlChanges",
];

const TRANSFER_FUNCTIONS: [&str; 3] = ["ESDTTransfer", "ESDTNFTTransfer", "MultiESDTNFTTransfer"];

fn token_identifier(tx: &Transaction) -> Option<String> {
    payload::argument_utf8(tx.data.as_deref()?, 0)
}

fn matches_any(tx: &Transaction, functions: &[&str]) -> bool {
    tx.function_name()
        .map(|name| functions.contains(&name))
        .unwrap_or(false)
}

pub fn token_properties(tx: &Transaction) -> Vec<InvalidationIntent> {
    if !matches_any(tx, &TOKEN_CONTROL_FUNCTIONS) {
        return vec![];
    }
    match token_identifier(tx) {
        Some(identifier) => vec![InvalidationIntent::new(
            keys::token_properties(&identifier),
            FactKind::TokenProperties,
        )],
        None => vec![],
    }
}

/// Both sides of a transfer see their token list change, unless the side is
/// a contract (contract token state is not cached per account).
pub fn account_token_list(tx: &Transaction) -> Vec<InvalidationIntent> {
    if !matches_any(tx, &TRANSFER_FUNCTIONS) {
        return vec![];
    }
    non_contract_sides(tx)
        .into_iter()
        .map(|address| {
            InvalidationIntent::new(keys::account_tokens(address), FactKind::AccountTokenList)
        })
        .collect()
}

pub fn account_token_balance(tx: &Transaction) -> Vec<InvalidationIntent> {
    if !matches_any(tx, &TRANSFER_FUNCTIONS) {
        return vec![];
    }
    let Some(identifier) = token_identifier(tx) else {
        return vec![];
    };
    non_contract_sides(tx)
        .into_iter()
        .map(|address| {
            InvalidationIntent::new(
                keys::token_balance(address, &identifier),
                FactKind::AccountTokenBalance,
            )
        })
        .collect()
}

/// Whitelisted delegation merge only. Deletion is delegated to the owner
/// collaborator; its removed keys flow into the batch total. A collaborator
/// error degrades to "no intents" like any other rule error.
pub async fn owner_mapping(tx: &Transaction, owners: &dyn OwnerCache) -> Vec<InvalidationIntent> {
    if tx.function_name() != Some(DELEGATION_MERGE_FUNCTION) {
        return vec![];
    }
    match owners.delete_owners_for_address(&tx.sender).await {
        Ok(deleted) => deleted
            .into_iter()
            .map(|key| InvalidationIntent::new(key, FactKind::OwnerMapping))
            .collect(),
        Err(e) => {
            warn!(
                "unable to invalidate owners for {} (transaction {}): {e}",
                tx.sender, tx.hash
            );
            vec![]
        }
    }
}

pub fn collection_properties(tx: &Transaction) -> Vec<InvalidationIntent> {
    let Some(data) = tx.data.as_deref() else {
        return vec![];
    };
    let Some(collection) = payload::sft_to_meta_collection(data) else {
        return vec![];
    };
    info!("change SFT to meta-ESDT detected for collection '{collection}'");
    vec![InvalidationIntent::new(
        keys::collection_properties(&collection),
        FactKind::CollectionProperties,
    )]
}

fn non_contract_sides(tx: &Transaction) -> Vec<&str> {
    let mut sides = vec![];
    if !address::is_smart_contract(&tx.sender) {
        sides.push(tx.sender.as_str());
    }
    if !address::is_smart_contract(&tx.receiver) {
        sides.push(tx.receiver.as_str());
    }
    sides
}
