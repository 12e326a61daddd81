use std::sync::Arc;

use data_encoding::BASE64;

use crate::cache::{Cache, CacheResult};

/// Node-ownership collaborator: removes every cached owner entry derived
/// from the given address and reports which keys it removed so they count
/// toward the batch total.
#[async_trait::async_trait]
pub trait OwnerCache: Send + Sync {
    async fn delete_owners_for_address(&self, address: &str) -> CacheResult<Vec<String>>;
}

const OWNER_INDEX_TTL: std::time::Duration = std::time::Duration::from_secs(24 * 3600);

/// Owner invalidation over the shared cache. An index entry per address
/// lists the owner keys written for it, so deletion does not need a key
/// scan.
pub struct IndexedOwnerCache {
    cache: Arc<dyn Cache>,
}

impl IndexedOwnerCache {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    fn index_key(address: &str) -> String {
        format!("ownerKeys:{address}")
    }

    /// Registers an owner key under the address, for later invalidation.
    pub async fn track(&self, address: &str, owner_key: &str) -> CacheResult<()> {
        let index_key = Self::index_key(address);
        let mut keys = self.tracked(address).await?;
        if !keys.iter().any(|k| k == owner_key) {
            keys.push(owner_key.to_string());
        }
        let encoded = keys
            .iter()
            .map(|k| BASE64.encode(k.as_bytes()))
            .collect::<Vec<_>>()
            .join(",");
        self.cache
            .set(&index_key, encoded.into_bytes(), OWNER_INDEX_TTL)
            .await
    }

    async fn tracked(&self, address: &str) -> CacheResult<Vec<String>> {
        let bytes = match self.cache.get(&Self::index_key(address)).await? {
            Some(bytes) => bytes,
            None => return Ok(vec![]),
        };
        let text = String::from_utf8_lossy(&bytes).to_string();
        Ok(text
            .split(',')
            .filter_map(|part| BASE64.decode(part.as_bytes()).ok())
            .filter_map(|bytes| String::from_utf8(bytes).ok())
            .collect())
    }
}

#[async_trait::async_trait]
impl OwnerCache for IndexedOwnerCache {
    async fn delete_owners_for_address(&self, address: &str) -> CacheResult<Vec<String>> {
        let keys = self.tracked(address).await?;
        if keys.is_empty() {
            return Ok(vec![]);
        }

        let mut to_delete = keys.clone();
        to_delete.push(Self::index_key(address));
        self.cache.delete_many(&to_delete).await?;
        Ok(keys)
    }
}
