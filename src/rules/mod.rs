use std::fmt;

pub mod invalidation;
pub mod notification;
pub mod offload;

/// Fact types whose cached derivations a transaction can make stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactKind {
    TokenProperties,
    AccountTokenList,
    AccountTokenBalance,
    OwnerMapping,
    CollectionProperties,
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenProperties => write!(f, "token-properties"),
            Self::AccountTokenList => write!(f, "account-token-list"),
            Self::AccountTokenBalance => write!(f, "account-token-balance"),
            Self::OwnerMapping => write!(f, "owner-mapping"),
            Self::CollectionProperties => write!(f, "collection-properties"),
        }
    }
}

/// One cached fact to purge. Multiple intents may share a key; the
/// scheduler dispatches the deduplicated key set per batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationIntent {
    pub cache_key: String,
    pub reason: FactKind,
}

impl InvalidationIntent {
    pub fn new(cache_key: String, reason: FactKind) -> Self {
        Self { cache_key, reason }
    }
}
