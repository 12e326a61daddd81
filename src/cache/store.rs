use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use rocksdb::{ColumnFamilyDescriptor, DB};
use tracing::trace;

use super::{Cache, CacheError, CacheResult};

/// RocksDB-backed cache so cursors survive process restarts.
///
/// Each value is stored behind an 8-byte big-endian absolute expiry (unix
/// seconds); expired entries read as absent, the TTL is a safety net rather
/// than a correctness mechanism.
#[derive(Debug)]
pub struct CacheStore {
    pub db_path: PathBuf,
    database: DB,
}

impl CacheStore {
    pub fn new(path: &Path) -> anyhow::Result<Self> {
        let mut cf_opts = rocksdb::Options::default();
        cf_opts.set_max_write_buffer_number(16);
        let entries = ColumnFamilyDescriptor::new("entries", cf_opts);

        let mut database_opts = rocksdb::Options::default();
        database_opts.create_missing_column_families(true);
        database_opts.create_if_missing(true);
        let database =
            rocksdb::DBWithThreadMode::open_cf_descriptors(&database_opts, path, vec![entries])?;
        Ok(Self {
            db_path: PathBuf::from(path),
            database,
        })
    }

    fn entries_cf(&self) -> &rocksdb::ColumnFamily {
        self.database
            .cf_handle("entries")
            .expect("entries column family exists")
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs()
    }
}

fn encode(value: &[u8], expires_at: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + value.len());
    bytes.extend_from_slice(&expires_at.to_be_bytes());
    bytes.extend_from_slice(value);
    bytes
}

fn decode(key: &str, bytes: &[u8]) -> CacheResult<(u64, Vec<u8>)> {
    if bytes.len() < 8 {
        return Err(CacheError::Malformed(key.to_string()));
    }
    let expires_at = u64::from_be_bytes(bytes[..8].try_into().expect("8-byte prefix"));
    Ok((expires_at, bytes[8..].to_vec()))
}

#[async_trait::async_trait]
impl Cache for CacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        trace!("getting cache entry {key}");
        let bytes = self
            .database
            .get_pinned_cf(self.entries_cf(), key.as_bytes())
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        match bytes {
            None => Ok(None),
            Some(bytes) => {
                let (expires_at, value) = decode(key, &bytes)?;
                if expires_at <= Self::now_secs() {
                    return Ok(None);
                }
                Ok(Some(value))
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        trace!("setting cache entry {key}");
        let expires_at = Self::now_secs().saturating_add(ttl.as_secs().max(1));
        self.database
            .put_cf(self.entries_cf(), key.as_bytes(), encode(&value, expires_at))
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    async fn delete_many(&self, keys: &[String]) -> CacheResult<()> {
        trace!("deleting {} cache entries", keys.len());
        for key in keys {
            self.database
                .delete_cf(self.entries_cf(), key.as_bytes())
                .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        }
        Ok(())
    }
}
