//! Navigation Engine
//!
//! Opens and closes columns, keeps each one in sync with the remote drive
//! through the folder cache, expands a file's ancestor path into columns and
//! handles keyboard traversal.
//!
//! Loading a column is a two-phase operation:
//!
//! 1. `hydrate_from_cache`: a fresh cached listing is shown right away.
//! 2. `refresh_column`: the authoritative listing always replaces it.
//!
//! Both phases address the column by id, so a load that settles after its
//! column was truncated away changes nothing.

use futures_util::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::column_store::{Column, ColumnError, ColumnId, ColumnStore};
use crate::config::EngineConfig;
use crate::folder_cache::FolderCache;
use crate::providers::{FileRecord, ProviderError, RemoteStore};

/// Root initialisation state for the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Ready,
}

/// Keyboard input understood by the navigator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Up,
    Down,
    Left,
    Right,
}

struct EngineInner {
    store: ColumnStore,
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn FolderCache>,
    root_folder_id: String,
    root_folder_name: String,
    max_path_depth: usize,
    phase: Mutex<SessionPhase>,
    text_input_focused: AtomicBool,
}

#[derive(Clone)]
pub struct NavigationEngine {
    inner: Arc<EngineInner>,
}

impl NavigationEngine {
    pub fn new(
        store: ColumnStore,
        remote: Arc<dyn RemoteStore>,
        cache: Arc<dyn FolderCache>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                remote,
                cache,
                root_folder_id: config.root_folder_id.clone(),
                root_folder_name: config.root_folder_name.clone(),
                max_path_depth: config.max_path_depth,
                phase: Mutex::new(SessionPhase::Uninitialized),
                text_input_focused: AtomicBool::new(false),
            }),
        }
    }

    pub fn store(&self) -> &ColumnStore {
        &self.inner.store
    }

    pub fn remote(&self) -> Arc<dyn RemoteStore> {
        self.inner.remote.clone()
    }

    pub fn cache(&self) -> Arc<dyn FolderCache> {
        self.inner.cache.clone()
    }

    pub fn root_folder_id(&self) -> &str {
        &self.inner.root_folder_id
    }

    fn phase(&self) -> MutexGuard<'_, SessionPhase> {
        self.inner.phase.lock().unwrap_or_else(|e| {
            warn!("Session phase mutex was poisoned, recovering: {e}");
            e.into_inner()
        })
    }

    pub fn session_phase(&self) -> SessionPhase {
        *self.phase()
    }

    // -----------------------------------------------------------------------
    // Opening columns
    // -----------------------------------------------------------------------

    /// Insert a loading placeholder for `folder_id` after column `keep_through`
    /// (or as the only column when `None`). Returns the new column's id and index.
    pub fn begin_open(
        &self,
        folder_id: &str,
        folder_name: &str,
        keep_through: Option<usize>,
    ) -> (ColumnId, usize) {
        let column = Column::loading(folder_id, folder_name);
        let column_id = column.id.clone();
        let index = self.inner.store.push_after(keep_through, column);
        debug!("Opened column {} for folder {} at index {}", column_id, folder_id, index);
        (column_id, index)
    }

    /// Run both load phases for an already inserted column
    pub async fn load_column(&self, column_id: &str, folder_id: &str) {
        self.hydrate_from_cache(column_id, folder_id).await;
        self.refresh_column(column_id, folder_id).await;
    }

    /// Phase 1: show a fresh cached listing, if there is one
    pub async fn hydrate_from_cache(&self, column_id: &str, folder_id: &str) -> bool {
        let Some(items) = self.inner.cache.get(folder_id).await else {
            return false;
        };
        debug!("Cache hit for {} ({} items)", folder_id, items.len());
        self.inner.store.update_column(column_id, |column| column.apply_cached(items))
    }

    /// Phase 2: fetch the authoritative listing and store it in the column and cache.
    ///
    /// The cache is written even if the column is gone by the time the fetch
    /// settles; only the column update is skipped.
    pub async fn refresh_column(&self, column_id: &str, folder_id: &str) {
        let started = Instant::now();
        let result = self.inner.remote.list(folder_id).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(items) => {
                self.inner.cache.set(folder_id, &items).await;
                let applied = self
                    .inner
                    .store
                    .update_column(column_id, |column| column.apply_fetched(items, elapsed_ms));
                if !applied {
                    debug!("Column {} closed before {} finished loading", column_id, folder_id);
                }
            }
            Err(e) => {
                warn!("Failed to list folder {}: {}", folder_id, e);
                let error = ColumnError::from(&e);
                self.inner
                    .store
                    .update_column(column_id, |column| column.apply_failure(error, elapsed_ms));
            }
        }
    }

    /// Keep columns `[0, at_column_index]`, append a column for `folder_id`
    /// and load it. Returns once the refresh has settled.
    pub async fn open_folder(&self, folder_id: &str, folder_name: &str, at_column_index: usize) -> ColumnId {
        let (column_id, _) = self.begin_open(folder_id, folder_name, Some(at_column_index));
        self.load_column(&column_id, folder_id).await;
        column_id
    }

    /// Like `open_folder`, but the placeholder is inserted before returning and
    /// the load runs on a background task.
    pub fn spawn_open_folder(
        &self,
        folder_id: &str,
        folder_name: &str,
        at_column_index: usize,
    ) -> (ColumnId, JoinHandle<()>) {
        let (column_id, _) = self.begin_open(folder_id, folder_name, Some(at_column_index));
        let engine = self.clone();
        let id = column_id.clone();
        let folder_id = folder_id.to_string();
        let handle = tokio::spawn(async move { engine.load_column(&id, &folder_id).await });
        (column_id, handle)
    }

    /// Replace the whole stack with the root column
    pub async fn open_root(&self) -> ColumnId {
        let root_id = self.inner.root_folder_id.clone();
        let (column_id, _) = self.begin_open(&root_id, &self.inner.root_folder_name, None);
        self.inner.store.set_active_index(0);
        self.load_column(&column_id, &root_id).await;
        column_id
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Load the root column at most once per session.
    ///
    /// Returns true if this call performed the load. A stack that already
    /// holds columns (from an earlier run of the same session) is adopted
    /// as-is; more than one root column is treated as corrupt and rebuilt.
    pub async fn init_root(&self) -> bool {
        let root_id = &self.inner.root_folder_id;
        {
            let mut phase = self.phase();
            if self.inner.store.root_column_count(root_id) > 1 {
                warn!("Found duplicate root columns, resetting the navigator");
                self.inner.store.clear();
                *phase = SessionPhase::Initializing;
            } else {
                match *phase {
                    SessionPhase::Initializing | SessionPhase::Ready => return false,
                    SessionPhase::Uninitialized if !self.inner.store.is_empty() => {
                        *phase = SessionPhase::Ready;
                        return false;
                    }
                    SessionPhase::Uninitialized => *phase = SessionPhase::Initializing,
                }
            }
        }

        info!("Loading root folder {}", root_id);
        self.open_root().await;

        let mut phase = self.phase();
        if *phase == SessionPhase::Initializing {
            *phase = SessionPhase::Ready;
        }
        true
    }

    /// Drop every column and start a new session (logout)
    pub fn reset_session(&self) {
        let mut phase = self.phase();
        self.inner.store.clear();
        *phase = SessionPhase::Uninitialized;
        info!("Navigator session reset");
    }

    // -----------------------------------------------------------------------
    // Path expansion
    // -----------------------------------------------------------------------

    /// Walk parents upward from `target`, returning `(id, name)` pairs from the
    /// topmost resolvable ancestor down to the immediate parent.
    async fn resolve_ancestors(&self, target: &FileRecord) -> Vec<(String, String)> {
        let mut chain = Vec::new();
        let mut next = target.primary_parent().map(str::to_string);

        while let Some(parent_id) = next.take() {
            if chain.len() >= self.inner.max_path_depth {
                warn!("Path of {} exceeds {} levels, stopping", target.id, self.inner.max_path_depth);
                break;
            }
            match self.inner.remote.get(&parent_id).await {
                Ok(parent) => {
                    next = parent.primary_parent().map(str::to_string);
                    if next.is_none() {
                        // A parentless folder is the drive root
                        chain.push((self.inner.root_folder_id.clone(), self.inner.root_folder_name.clone()));
                    } else {
                        chain.push((parent.id, parent.name));
                    }
                }
                Err(e) => {
                    warn!("Could not resolve ancestor {} of {}: {}", parent_id, target.id, e);
                    break;
                }
            }
        }

        chain.reverse();
        chain
    }

    /// Replace the stack with one column per folder on the path to `target`.
    ///
    /// A folder target gets its own column; a file target is selected in the
    /// last column once that column's listing contains it.
    pub async fn open_path(&self, target: &FileRecord) -> Vec<ColumnId> {
        let mut folders = self.resolve_ancestors(target).await;
        if target.is_folder() {
            folders.push((target.id.clone(), target.name.clone()));
        }
        if folders.is_empty() {
            warn!("No resolvable folder on the path to {}", target.id);
            return Vec::new();
        }

        let mut opened = Vec::with_capacity(folders.len());
        for (folder_id, folder_name) in &folders {
            let keep_through = opened.len().checked_sub(1);
            let (column_id, _) = self.begin_open(folder_id, folder_name, keep_through);
            opened.push(column_id);
        }

        if let Some(last) = opened.last() {
            if !target.is_folder() {
                self.inner.store.defer_selection(last, &target.id);
            }
        }
        self.inner.store.set_active_index(opened.len() - 1);
        info!("Revealing {} through {} columns", target.id, opened.len());

        join_all(
            opened
                .iter()
                .zip(&folders)
                .map(|(column_id, (folder_id, _))| self.load_column(column_id, folder_id)),
        )
        .await;

        opened
    }

    // -----------------------------------------------------------------------
    // Pointer and breadcrumb navigation
    // -----------------------------------------------------------------------

    /// Select `record` in the column at `column_index`; folders are opened to
    /// the right unless the next column already shows them.
    pub async fn click_item(&self, column_index: usize, record: &FileRecord) {
        let Some(column) = self.inner.store.column_at(column_index) else {
            return;
        };
        self.inner.store.select_file(&record.id, false);
        self.inner.store.select_item(&column.id, Some(record.id.as_str()));
        self.inner.store.set_active_index(column_index);

        if record.is_folder() && !self.next_column_shows(column_index, &record.id) {
            self.open_folder(&record.id, &record.name, column_index).await;
        }
    }

    /// Breadcrumb jump: keep columns `[0, index]` and focus `index`
    pub fn navigate_to_column(&self, index: usize) {
        self.inner.store.truncate_after(index);
        self.inner.store.set_active_index(index);
    }

    fn next_column_shows(&self, column_index: usize, folder_id: &str) -> bool {
        self.inner
            .store
            .column_at(column_index + 1)
            .is_some_and(|next| next.folder_id == folder_id)
    }

    // -----------------------------------------------------------------------
    // Keyboard
    // -----------------------------------------------------------------------

    pub fn set_text_input_focused(&self, focused: bool) {
        self.inner.text_input_focused.store(focused, Ordering::Relaxed);
    }

    /// Handle a key press. Returns false if the key was ignored.
    pub async fn handle_key(&self, key: NavKey) -> bool {
        if self.inner.text_input_focused.load(Ordering::Relaxed) {
            return false;
        }
        match key {
            NavKey::Down => self.select_next(),
            NavKey::Up => self.select_previous(),
            NavKey::Right => self.descend().await,
            NavKey::Left => self.ascend(),
        }
    }

    /// Move the selection in the active column by one, clamped at the ends
    fn step_selection(&self, forward: bool) -> bool {
        let store = &self.inner.store;
        let Some(column) = store.column_at(store.active_index()) else {
            return false;
        };
        if column.items.is_empty() {
            return false;
        }
        let last = column.items.len() - 1;
        let target = match column.selected_item_id.as_deref().and_then(|id| column.position_of(id)) {
            Some(pos) if forward => (pos + 1).min(last),
            Some(pos) => pos.saturating_sub(1),
            None if forward => 0,
            None => last,
        };
        store.select_item(&column.id, Some(column.items[target].id.as_str()))
    }

    pub fn select_next(&self) -> bool {
        self.step_selection(true)
    }

    pub fn select_previous(&self) -> bool {
        self.step_selection(false)
    }

    /// Open the selected folder of the active column to the right
    pub async fn descend(&self) -> bool {
        let store = &self.inner.store;
        let active = store.active_index();
        let Some(folder) = store
            .column_at(active)
            .and_then(|column| column.selected_item().cloned())
            .filter(FileRecord::is_folder)
        else {
            return false;
        };

        if self.next_column_shows(active, &folder.id) {
            store.set_active_index(active + 1);
            return true;
        }

        let (column_id, index) = self.begin_open(&folder.id, &folder.name, Some(active));
        store.set_active_index(index);
        self.load_column(&column_id, &folder.id).await;
        true
    }

    /// Move focus one column to the left
    pub fn ascend(&self) -> bool {
        let active = self.inner.store.active_index();
        if active == 0 {
            return false;
        }
        self.inner.store.set_active_index(active - 1);
        true
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Search the drive by name. Blank queries return nothing without a remote call.
    pub async fn search_drive(&self, query: &str) -> Result<Vec<FileRecord>, ProviderError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.inner.remote.search(query).await.map_err(|e| {
            warn!("Search for {:?} failed: {}", query, e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_store::ColumnState;
    use crate::folder_cache::MemoryFolderCache;
    use crate::test_support::ScriptedRemote;
    use std::time::Duration;

    fn engine_with(remote: Arc<ScriptedRemote>, config: &EngineConfig) -> (NavigationEngine, Arc<MemoryFolderCache>) {
        let cache = Arc::new(MemoryFolderCache::new(Duration::from_secs(300)));
        let engine = NavigationEngine::new(ColumnStore::new(), remote, cache.clone(), config);
        (engine, cache)
    }

    fn engine(remote: Arc<ScriptedRemote>) -> (NavigationEngine, Arc<MemoryFolderCache>) {
        engine_with(remote, &EngineConfig::default())
    }

    fn ids(items: &[FileRecord]) -> Vec<&str> {
        items.iter().map(|r| r.id.as_str()).collect()
    }

    fn folders(engine: &NavigationEngine) -> Vec<String> {
        engine.store().snapshot().columns.into_iter().map(|c| c.folder_id).collect()
    }

    #[tokio::test]
    async fn test_root_listing_is_folders_first() {
        let remote = ScriptedRemote::fixture();
        let (engine, cache) = engine(remote.clone());
        let column_id = engine.open_root().await;

        let column = engine.store().column(&column_id).unwrap();
        assert_eq!(ids(&column.items), vec!["folderA", "doc1", "doc2"]);
        assert_eq!(column.state(), ColumnState::Loaded);
        assert!(column.last_load_duration_ms.is_some());
        assert_eq!(cache.get("root").await.map(|items| items.len()), Some(3));
        assert_eq!(remote.calls("list:root"), 1);
    }

    #[tokio::test]
    async fn test_stale_while_revalidate() {
        let remote = ScriptedRemote::fixture();
        let (engine, cache) = engine(remote.clone());
        engine.open_root().await;

        let stale = vec![FileRecord::new("old", "old.txt", "text/plain")];
        cache.set("folderA", &stale).await;
        let gate = remote.gate_list("folderA");

        let (column_id, handle) = engine.spawn_open_folder("folderA", "folderA", 0);
        let mut rx = engine.store().subscribe();
        rx.wait_for(|stack| {
            stack.columns.iter().any(|c| c.id == column_id && c.state() == ColumnState::LoadedStale)
        })
        .await
        .unwrap();

        let column = engine.store().column(&column_id).unwrap();
        assert!(!column.is_loading);
        assert_eq!(column.items, stale);

        gate.notify_one();
        handle.await.unwrap();
        let column = engine.store().column(&column_id).unwrap();
        assert_eq!(column.state(), ColumnState::Loaded);
        assert_eq!(ids(&column.items), vec!["folderB"]);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cached_items() {
        let remote = ScriptedRemote::fixture();
        let (engine, cache) = engine(remote.clone());
        cache.set("root", &[FileRecord::new("old", "old.txt", "text/plain")]).await;
        remote.fail("list:root", 503);

        let column_id = engine.open_root().await;
        let column = engine.store().column(&column_id).unwrap();
        assert_eq!(column.state(), ColumnState::Errored);
        assert_eq!(column.error.as_ref().and_then(|e| e.status), Some(503));
        assert_eq!(ids(&column.items), vec!["old"]);
        assert_eq!(engine.store().len(), 1);
    }

    #[tokio::test]
    async fn test_late_resolution_does_not_touch_replacement() {
        let remote = ScriptedRemote::fixture();
        let (engine, cache) = engine(remote.clone());
        engine.open_root().await;

        let gate = remote.gate_list("folderA");
        let (stale_id, handle) = engine.spawn_open_folder("folderA", "folderA", 0);
        let fresh_id = engine.open_folder("folderB", "folderB", 0).await;

        gate.notify_one();
        handle.await.unwrap();

        assert!(engine.store().column(&stale_id).is_none());
        let stack = engine.store().snapshot();
        assert_eq!(stack.columns.len(), 2);
        assert_eq!(stack.columns[1].id, fresh_id);
        assert_eq!(stack.columns[1].folder_id, "folderB");
        assert_eq!(ids(&stack.columns[1].items), vec!["file"]);
        assert!(cache.get("folderA").await.is_some());
    }

    #[tokio::test]
    async fn test_repeated_open_keeps_one_column() {
        let remote = ScriptedRemote::fixture();
        let (engine, _) = engine(remote.clone());
        engine.open_root().await;
        engine.open_folder("folderA", "folderA", 0).await;
        engine.open_folder("folderA", "folderA", 0).await;
        assert_eq!(folders(&engine), vec!["root", "folderA"]);
    }

    #[tokio::test]
    async fn test_open_path_three_levels_deep() {
        let remote = ScriptedRemote::fixture();
        let (engine, _) = engine(remote.clone());
        engine.open_root().await;
        engine.open_folder("folderA", "folderA", 0).await;
        engine.open_folder("folderB", "folderB", 1).await;
        engine.navigate_to_column(0);

        let target = remote.get("file").await.unwrap();
        let opened = engine.open_path(&target).await;

        assert_eq!(opened.len(), 3);
        assert_eq!(folders(&engine), vec!["root", "folderA", "folderB"]);
        let stack = engine.store().snapshot();
        assert_eq!(stack.active_index, 2);
        assert_eq!(stack.columns[2].selected_item_id.as_deref(), Some("file"));
        assert_eq!(stack.columns[0].folder_name, "My Drive");
    }

    #[tokio::test]
    async fn test_open_path_stops_at_failed_ancestor() {
        let remote = ScriptedRemote::fixture();
        remote.fail("get:folderA", 403);
        let (engine, _) = engine(remote.clone());

        let target = remote.inner.get("file").await.unwrap();
        engine.open_path(&target).await;

        assert_eq!(folders(&engine), vec!["folderB"]);
        let column = engine.store().column_at(0).unwrap();
        assert_eq!(column.selected_item_id.as_deref(), Some("file"));
    }

    #[tokio::test]
    async fn test_open_path_depth_bound() {
        let remote = ScriptedRemote::fixture();
        let config = EngineConfig { max_path_depth: 1, ..EngineConfig::default() };
        let (engine, _) = engine_with(remote.clone(), &config);

        let target = remote.inner.get("file").await.unwrap();
        engine.open_path(&target).await;

        assert_eq!(folders(&engine), vec!["folderB"]);
        assert_eq!(remote.calls("get:folderA"), 0);
    }

    #[tokio::test]
    async fn test_open_path_folder_target_gets_own_column() {
        let remote = ScriptedRemote::fixture();
        let (engine, _) = engine(remote.clone());
        let target = remote.inner.get("folderB").await.unwrap();
        engine.open_path(&target).await;
        assert_eq!(folders(&engine), vec!["root", "folderA", "folderB"]);
        assert!(engine.store().snapshot().columns.iter().all(|c| c.selected_item_id.is_none()));
    }

    #[tokio::test]
    async fn test_init_root_runs_once() {
        let remote = ScriptedRemote::fixture();
        let (engine, _) = engine(remote.clone());

        let (first, second) = tokio::join!(engine.init_root(), engine.init_root());
        assert!(first ^ second);
        assert!(!engine.init_root().await);
        assert_eq!(remote.calls("list:root"), 1);
        assert_eq!(engine.store().root_column_count("root"), 1);
        assert_eq!(engine.session_phase(), SessionPhase::Ready);
    }

    #[tokio::test]
    async fn test_init_root_adopts_existing_stack() {
        let remote = ScriptedRemote::fixture();
        let (engine, _) = engine(remote.clone());
        engine.begin_open("root", "My Drive", None);

        assert!(!engine.init_root().await);
        assert_eq!(remote.calls("list:root"), 0);
        assert_eq!(engine.session_phase(), SessionPhase::Ready);
    }

    #[tokio::test]
    async fn test_init_root_heals_duplicate_roots() {
        let remote = ScriptedRemote::fixture();
        let (engine, _) = engine(remote.clone());
        engine.store().push_after(None, Column::loading("root", "My Drive"));
        engine.store().push_after(Some(0), Column::loading("root", "My Drive"));

        assert!(engine.init_root().await);
        assert_eq!(engine.store().len(), 1);
        assert_eq!(engine.store().root_column_count("root"), 1);
    }

    #[tokio::test]
    async fn test_reset_session() {
        let remote = ScriptedRemote::fixture();
        let (engine, _) = engine(remote.clone());
        engine.init_root().await;
        engine.reset_session();
        assert!(engine.store().is_empty());
        assert_eq!(engine.session_phase(), SessionPhase::Uninitialized);
        assert!(engine.init_root().await);
    }

    #[tokio::test]
    async fn test_keyboard_traversal() {
        let remote = ScriptedRemote::fixture();
        let (engine, _) = engine(remote.clone());
        engine.init_root().await;

        assert!(engine.handle_key(NavKey::Up).await);
        assert_eq!(engine.store().column_at(0).unwrap().selected_item_id.as_deref(), Some("doc2"));
        engine.handle_key(NavKey::Down).await;
        assert_eq!(engine.store().column_at(0).unwrap().selected_item_id.as_deref(), Some("doc2"));
        engine.handle_key(NavKey::Up).await;
        engine.handle_key(NavKey::Up).await;
        engine.handle_key(NavKey::Up).await;
        assert_eq!(engine.store().column_at(0).unwrap().selected_item_id.as_deref(), Some("folderA"));

        assert!(engine.handle_key(NavKey::Right).await);
        assert_eq!(folders(&engine), vec!["root", "folderA"]);
        assert_eq!(engine.store().active_index(), 1);
        assert!(!engine.handle_key(NavKey::Right).await, "nothing selected in folderA");

        assert!(engine.handle_key(NavKey::Left).await);
        assert!(!engine.handle_key(NavKey::Left).await);
        assert!(engine.handle_key(NavKey::Right).await);
        assert_eq!(engine.store().active_index(), 1);
        assert_eq!(remote.calls("list:folderA"), 1, "existing column is reused");
    }

    #[tokio::test]
    async fn test_keyboard_suppressed_while_typing() {
        let remote = ScriptedRemote::fixture();
        let (engine, _) = engine(remote.clone());
        engine.init_root().await;
        engine.set_text_input_focused(true);
        assert!(!engine.handle_key(NavKey::Down).await);
        assert_eq!(engine.store().column_at(0).unwrap().selected_item_id, None);
        engine.set_text_input_focused(false);
        assert!(engine.handle_key(NavKey::Down).await);
    }

    #[tokio::test]
    async fn test_click_folder_opens_once() {
        let remote = ScriptedRemote::fixture();
        let (engine, _) = engine(remote.clone());
        engine.init_root().await;
        let folder = remote.inner.get("folderA").await.unwrap();

        engine.click_item(0, &folder).await;
        engine.click_item(0, &folder).await;

        assert_eq!(folders(&engine), vec!["root", "folderA"]);
        assert_eq!(remote.calls("list:folderA"), 1);
        assert!(engine.store().selected_file_ids().contains("folderA"));
    }

    #[tokio::test]
    async fn test_navigate_to_column_truncates() {
        let remote = ScriptedRemote::fixture();
        let (engine, _) = engine(remote.clone());
        engine.open_root().await;
        engine.open_folder("folderA", "folderA", 0).await;
        engine.open_folder("folderB", "folderB", 1).await;
        engine.store().set_active_index(2);

        engine.navigate_to_column(0);
        assert_eq!(folders(&engine), vec!["root"]);
        assert_eq!(engine.store().active_index(), 0);
    }

    #[tokio::test]
    async fn test_search() {
        let remote = ScriptedRemote::fixture();
        let (engine, _) = engine(remote.clone());
        assert!(engine.search_drive("   ").await.unwrap().is_empty());
        assert_eq!(remote.calls("search"), 0);

        let results = engine.search_drive(" FILE ").await.unwrap();
        assert_eq!(ids(&results), vec!["file"]);
    }
}
