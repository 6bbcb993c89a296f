/// Folder Listing Cache
///
/// Maps a folder id to its last known listing plus the time it was stored.
/// Entries older than the TTL are treated as absent and purged when read.
/// Every fault (storage unavailable, corrupt row) degrades to a cache miss:
/// it is logged and never propagated to the navigation engine.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::providers::FileRecord;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One cached listing
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub folder_id: String,
    pub items: Vec<FileRecord>,
    /// Unix time in milliseconds when the entry was written
    pub timestamp: i64,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) > ttl.as_millis() as i64
    }
}

/// Local cache consumed by the navigation engine
#[async_trait]
pub trait FolderCache: Send + Sync {
    /// Fresh listing for `folder_id`, or `None` if missing or expired
    async fn get(&self, folder_id: &str) -> Option<Vec<FileRecord>>;

    async fn set(&self, folder_id: &str, items: &[FileRecord]);

    async fn invalidate(&self, folder_id: &str);
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// SQLite backend
// ---------------------------------------------------------------------------

/// Persistent cache stored in a single SQLite table (WAL mode)
pub struct SqliteFolderCache {
    conn: Mutex<Connection>,
    ttl: Duration,
}

/// Initialize schema on an already-opened connection
fn init_schema(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA cache_size = -2000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| format!("Pragma error: {e}"))?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS folders (
            id TEXT PRIMARY KEY,
            items TEXT NOT NULL,
            timestamp INTEGER NOT NULL
        );",
    )
    .map_err(|e| format!("Schema error: {e}"))?;

    Ok(())
}

impl SqliteFolderCache {
    pub fn open(path: &Path, ttl: Duration) -> Result<Self, String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Cannot create cache dir: {e}"))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700));
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| format!("Failed to open folder cache: {e}"))?;
        init_schema(&conn)?;
        debug!("Folder cache opened at {:?}", path);
        Ok(Self { conn: Mutex::new(conn), ttl })
    }

    /// Non-persistent fallback used when the cache file cannot be opened
    pub fn open_in_memory(ttl: Duration) -> Result<Self, String> {
        let conn = Connection::open_in_memory()
            .map_err(|e| format!("Failed to open in-memory cache: {e}"))?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn), ttl })
    }

    /// Acquire DB lock with poison recovery
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| {
            warn!("Folder cache mutex was poisoned, recovering: {e}");
            e.into_inner()
        })
    }

    /// Number of stored rows, expired or not
    pub fn entry_count(&self) -> usize {
        self.lock()
            .query_row("SELECT COUNT(*) FROM folders", [], |r| r.get::<_, i64>(0))
            .map(|n| n as usize)
            .unwrap_or(0)
    }

    fn delete_row(conn: &Connection, folder_id: &str) {
        if let Err(e) = conn.execute("DELETE FROM folders WHERE id = ?1", params![folder_id]) {
            warn!("Folder cache delete failed for {}: {e}", folder_id);
        }
    }

    fn read_entry(&self, folder_id: &str) -> Option<CacheEntry> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT items, timestamp FROM folders WHERE id = ?1",
                params![folder_id],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)),
            )
            .optional();

        let (json, timestamp) = match row {
            Ok(Some(row)) => row,
            Ok(None) => return None,
            Err(e) => {
                warn!("Folder cache read failed for {}: {e}", folder_id);
                return None;
            }
        };

        match serde_json::from_str::<Vec<FileRecord>>(&json) {
            Ok(items) => Some(CacheEntry { folder_id: folder_id.to_string(), items, timestamp }),
            Err(e) => {
                warn!("Dropping corrupt cache row for {}: {e}", folder_id);
                Self::delete_row(&conn, folder_id);
                None
            }
        }
    }
}

#[async_trait]
impl FolderCache for SqliteFolderCache {
    async fn get(&self, folder_id: &str) -> Option<Vec<FileRecord>> {
        let entry = self.read_entry(folder_id)?;
        if entry.is_expired(self.ttl, now_ms()) {
            debug!("Cache entry for {} expired", folder_id);
            Self::delete_row(&self.lock(), folder_id);
            return None;
        }
        Some(entry.items)
    }

    async fn set(&self, folder_id: &str, items: &[FileRecord]) {
        let json = match serde_json::to_string(items) {
            Ok(json) => json,
            Err(e) => {
                warn!("Folder cache serialize failed for {}: {e}", folder_id);
                return;
            }
        };
        let result = self.lock().execute(
            "INSERT INTO folders (id, items, timestamp) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET items = excluded.items, timestamp = excluded.timestamp",
            params![folder_id, json, now_ms()],
        );
        if let Err(e) = result {
            warn!("Folder cache write failed for {}: {e}", folder_id);
        }
    }

    async fn invalidate(&self, folder_id: &str) {
        Self::delete_row(&self.lock(), folder_id);
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Process-local cache, used when no cache file is wanted
pub struct MemoryFolderCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl MemoryFolderCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), ttl }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| {
            warn!("Memory cache mutex was poisoned, recovering: {e}");
            e.into_inner()
        })
    }

    pub fn contains(&self, folder_id: &str) -> bool {
        self.lock().contains_key(folder_id)
    }

    pub fn entry_count(&self) -> usize {
        self.lock().len()
    }
}

#[async_trait]
impl FolderCache for MemoryFolderCache {
    async fn get(&self, folder_id: &str) -> Option<Vec<FileRecord>> {
        let mut entries = self.lock();
        let expired = entries.get(folder_id)?.is_expired(self.ttl, now_ms());
        if expired {
            entries.remove(folder_id);
            return None;
        }
        entries.get(folder_id).map(|entry| entry.items.clone())
    }

    async fn set(&self, folder_id: &str, items: &[FileRecord]) {
        self.lock().insert(
            folder_id.to_string(),
            CacheEntry {
                folder_id: folder_id.to_string(),
                items: items.to_vec(),
                timestamp: now_ms(),
            },
        );
    }

    async fn invalidate(&self, folder_id: &str) {
        self.lock().remove(folder_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Vec<FileRecord> {
        vec![
            FileRecord::folder("folderA", "folderA").with_parent("root"),
            FileRecord::new("doc1", "doc1", "text/plain").with_parent("root").with_size(Some(12)),
        ]
    }

    #[tokio::test]
    async fn test_sqlite_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SqliteFolderCache::open(&dir.path().join("cache.db"), Duration::from_secs(300)).unwrap();
        cache.set("root", &listing()).await;
        assert_eq!(cache.get("root").await, Some(listing()));
        assert_eq!(cache.get("other").await, None);
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        {
            let cache = SqliteFolderCache::open(&path, Duration::from_secs(300)).unwrap();
            cache.set("root", &listing()).await;
        }
        let cache = SqliteFolderCache::open(&path, Duration::from_secs(300)).unwrap();
        assert_eq!(cache.get("root").await.map(|items| items.len()), Some(2));
        assert!(cache.get("root").await.unwrap()[0].is_folder());
    }

    #[tokio::test]
    async fn test_sqlite_expired_entry_is_purged() {
        let cache = SqliteFolderCache::open_in_memory(Duration::from_millis(20)).unwrap();
        cache.set("root", &listing()).await;
        assert_eq!(cache.entry_count(), 1);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get("root").await, None);
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_sqlite_corrupt_row_is_a_miss() {
        let cache = SqliteFolderCache::open_in_memory(Duration::from_secs(300)).unwrap();
        cache
            .lock()
            .execute(
                "INSERT INTO folders (id, items, timestamp) VALUES ('root', 'not json', ?1)",
                params![now_ms()],
            )
            .unwrap();
        assert_eq!(cache.get("root").await, None);
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_sqlite_invalidate_and_overwrite() {
        let cache = SqliteFolderCache::open_in_memory(Duration::from_secs(300)).unwrap();
        cache.set("root", &listing()).await;
        cache.set("root", &listing()[..1]).await;
        assert_eq!(cache.get("root").await.map(|items| items.len()), Some(1));
        cache.invalidate("root").await;
        assert_eq!(cache.get("root").await, None);
    }

    #[tokio::test]
    async fn test_memory_cache_ttl() {
        let cache = MemoryFolderCache::new(Duration::from_millis(20));
        cache.set("root", &listing()).await;
        assert_eq!(cache.get("root").await, Some(listing()));
        assert_eq!(cache.entry_count(), 1);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get("root").await, None);
        assert!(!cache.contains("root"));
        assert_eq!(cache.entry_count(), 0);
    }
}
