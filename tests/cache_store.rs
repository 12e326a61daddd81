use std::{sync::Arc, time::Duration};

use shard_ingest::{
    cache::{store::CacheStore, Cache},
    cursor::CursorStore,
};

/// Sets up a new temp dir, deleted when it goes out of scope
fn setup_new_db_dir(prefix: &str) -> anyhow::Result<tempfile::TempDir> {
    let store_dir = tempfile::TempDir::with_prefix(prefix)?;
    if store_dir.path().exists() {
        std::fs::remove_dir_all(store_dir.path())?;
    }
    Ok(store_dir)
}

#[tokio::test]
async fn entries_survive_reopen() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("cache-store-reopen")?;

    {
        let store = CacheStore::new(store_dir.path())?;
        store
            .set("shardNonce:0", b"1234".to_vec(), Duration::from_secs(3600))
            .await?;
    }

    let store = CacheStore::new(store_dir.path())?;
    assert_eq!(
        store.get("shardNonce:0").await?,
        Some(b"1234".to_vec())
    );
    Ok(())
}

#[tokio::test]
async fn deleted_and_missing_keys_read_as_absent() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("cache-store-delete")?;
    let store = CacheStore::new(store_dir.path())?;

    store
        .set("a", b"1".to_vec(), Duration::from_secs(3600))
        .await?;
    store
        .delete_many(&["a".to_string(), "never-set".to_string()])
        .await?;
    assert_eq!(store.get("a").await?, None);
    assert_eq!(store.get("never-set").await?, None);
    Ok(())
}

#[tokio::test]
async fn cursors_persist_across_restarts() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("cache-store-cursor")?;

    {
        let cache = Arc::new(CacheStore::new(store_dir.path())?);
        let cursors = CursorStore::new(cache);
        cursors.set(2, 999).await?;
    }

    let cache = Arc::new(CacheStore::new(store_dir.path())?);
    let cursors = CursorStore::new(cache);
    assert_eq!(cursors.get(2).await?.last_processed_nonce, Some(999));
    Ok(())
}
