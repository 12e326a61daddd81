pub mod address;
pub mod bus;
pub mod cache;
pub mod config;
pub mod cursor;
pub mod fetcher;
pub mod gateway;
pub mod metrics;
pub mod notifier;
pub mod owners;
pub mod queue;
pub mod rules;
pub mod scheduler;
pub mod single_flight;
pub mod transaction;

pub const METACHAIN_SHARD_ID: u32 = 4294967295;
pub const DEFAULT_SHARD_IDS: [u32; 4] = [0, 1, 2, METACHAIN_SHARD_ID];
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_MAX_LOOK_BEHIND: u64 = 100;
pub const NFT_CREATE_FUNCTION: &str = "ESDTNFTCreate";
pub const NFT_SETTLE_DELAY_MS: u64 = 5000;
pub const SFT_TO_META_FUNCTION: &str = "changeSFTToMetaESDT";
pub const DELEGATION_MERGE_FUNCTION: &str = "mergeValidatorToDelegationWithWhitelist";
pub const INVALIDATION_TOPIC: &str = "deleteCacheKeys";
