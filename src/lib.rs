// FinderDrive - Column-view navigator core for cloud drives
// Column stack, stale-while-revalidate loading and reconciled mutations

use std::sync::Arc;
use tracing::warn;

pub mod auth;
pub mod column_store;
pub mod config;
pub mod folder_cache;
pub mod mutations;
pub mod navigation;
pub mod ordering;
pub mod preview;
pub mod providers;
pub mod uploads;

#[cfg(test)]
mod test_support;

pub use column_store::{Column, ColumnError, ColumnId, ColumnStack, ColumnState, ColumnStore};
pub use config::EngineConfig;
pub use folder_cache::{FolderCache, MemoryFolderCache, SqliteFolderCache};
pub use mutations::MutationCoordinator;
pub use navigation::{NavKey, NavigationEngine, SessionPhase};
pub use providers::{FileRecord, ProviderError, RemoteStore};
pub use uploads::{UploadItem, UploadQueue, UploadSource, UploadStatus, UploadSummary};

/// Install a stderr `tracing` subscriber filtered by `FINDERDRIVE_LOG`
/// (falling back to `default_filter`). Safe to call more than once.
pub fn init_logging(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_env("FINDERDRIVE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Name and locked version of a core dependency
#[derive(Debug, Clone)]
pub struct DependencyInfo {
    pub name: &'static str,
    pub version: &'static str,
}

/// Versions resolved at build time from Cargo.lock
pub fn dependencies() -> Vec<DependencyInfo> {
    vec![
        DependencyInfo { name: "tokio", version: env!("DEP_VERSION_TOKIO") },
        DependencyInfo { name: "serde", version: env!("DEP_VERSION_SERDE") },
        DependencyInfo { name: "serde_json", version: env!("DEP_VERSION_SERDE_JSON") },
        DependencyInfo { name: "thiserror", version: env!("DEP_VERSION_THISERROR") },
        DependencyInfo { name: "tracing", version: env!("DEP_VERSION_TRACING") },
        DependencyInfo { name: "chrono", version: env!("DEP_VERSION_CHRONO") },
        DependencyInfo { name: "reqwest", version: env!("DEP_VERSION_REQWEST") },
        DependencyInfo { name: "rusqlite", version: env!("DEP_VERSION_RUSQLITE") },
        DependencyInfo { name: "secrecy", version: env!("DEP_VERSION_SECRECY") },
        DependencyInfo { name: "clap", version: env!("DEP_VERSION_CLAP") },
    ]
}

pub fn rustc_version() -> &'static str {
    env!("RUSTC_VERSION")
}

/// Open the persistent folder cache, degrading to an in-memory one when the
/// cache file cannot be opened.
pub fn open_folder_cache(config: &EngineConfig) -> Arc<dyn FolderCache> {
    let path = config.resolved_cache_path();
    match SqliteFolderCache::open(&path, config.cache_ttl()) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            warn!("Folder cache unavailable at {:?} ({}), using memory", path, e);
            Arc::new(MemoryFolderCache::new(config.cache_ttl()))
        }
    }
}

/// Navigator plus mutation coordinator sharing one column store
#[derive(Clone)]
pub struct FinderDrive {
    pub navigator: NavigationEngine,
    pub mutations: MutationCoordinator,
}

impl FinderDrive {
    pub fn new(remote: Arc<dyn RemoteStore>, cache: Arc<dyn FolderCache>, config: &EngineConfig) -> Self {
        let navigator = NavigationEngine::new(ColumnStore::new(), remote, cache, config);
        let mutations = MutationCoordinator::new(navigator.clone());
        Self { navigator, mutations }
    }

    pub fn store(&self) -> &ColumnStore {
        self.navigator.store()
    }

    pub fn uploads(&self) -> &UploadQueue {
        self.mutations.uploads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRemote;
    use std::time::Duration;

    #[tokio::test]
    async fn test_facade_shares_one_store() {
        let remote = ScriptedRemote::fixture();
        let cache = Arc::new(MemoryFolderCache::new(Duration::from_secs(300)));
        let drive = FinderDrive::new(remote, cache, &EngineConfig::default());

        drive.navigator.init_root().await;
        drive.mutations.rename_file("doc1", "report.txt").await.unwrap();

        let root = drive.store().column_at(0).unwrap();
        assert!(root.items.iter().any(|r| r.name == "report.txt"));
    }

    #[tokio::test]
    async fn test_open_folder_cache_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let config = EngineConfig {
            cache_db_path: Some(blocker.join("folders.db")),
            ..EngineConfig::default()
        };

        // Opening under a regular file fails; the engine still gets a cache
        let cache = open_folder_cache(&config);
        let listing = vec![FileRecord::folder("folderA", "folderA"), FileRecord::new("doc1", "doc1", "text/plain")];
        cache.set("root", &listing).await;
        assert_eq!(cache.get("root").await, Some(listing));
        cache.invalidate("root").await;
        assert_eq!(cache.get("root").await, None);
    }
}
