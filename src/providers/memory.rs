//! In-memory Remote Store
//!
//! A drive that lives entirely in process memory. It follows the same
//! contract as the Drive backend (soft delete, multi-parent records,
//! folders-first listings) and is used for offline sessions and tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

use super::{FileRecord, ProgressCallback, ProviderError, RemoteStore};
use crate::ordering::sort_listing;

/// Id of the root folder of every in-memory drive
pub const MEMORY_ROOT_ID: &str = "root";

/// Number of progress ticks reported per upload
const UPLOAD_PROGRESS_STEPS: usize = 4;

#[derive(Debug, Clone)]
struct StoredNode {
    record: FileRecord,
    trashed: bool,
}

pub struct MemoryProvider {
    nodes: RwLock<HashMap<String, StoredNode>>,
    search_limit: usize,
}

impl MemoryProvider {
    /// Create an empty drive whose root folder is called `root_name`
    pub fn new(root_name: &str) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            MEMORY_ROOT_ID.to_string(),
            StoredNode {
                record: FileRecord::folder(MEMORY_ROOT_ID, root_name),
                trashed: false,
            },
        );
        Self {
            nodes: RwLock::new(nodes),
            search_limit: 20,
        }
    }

    /// Small sample drive used by the offline CLI mode
    pub fn demo() -> Self {
        Self::new("My Drive")
            .with_record(FileRecord::folder("projects", "Projects").with_parent(MEMORY_ROOT_ID))
            .with_record(FileRecord::folder("photos", "Photos").with_parent(MEMORY_ROOT_ID))
            .with_record(FileRecord::new("todo", "todo.txt", "text/plain").with_parent(MEMORY_ROOT_ID).with_size(Some(312)))
            .with_record(FileRecord::folder("finder", "finderdrive").with_parent("projects"))
            .with_record(FileRecord::new("design", "design.pdf", "application/pdf").with_parent("finder").with_size(Some(88_120)))
            .with_record(FileRecord::new("readme", "README.md", "text/markdown").with_parent("finder").with_size(Some(2_048)))
            .with_record(FileRecord::new("beach", "beach.jpg", "image/jpeg").with_parent("photos").with_size(Some(1_820_443)))
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Add (or replace) a record
    pub fn with_record(self, record: FileRecord) -> Self {
        self.insert(record);
        self
    }

    pub fn insert(&self, record: FileRecord) {
        self.write().insert(record.id.clone(), StoredNode { record, trashed: false });
    }

    /// Whether a record exists and sits in the trash
    pub fn is_trashed(&self, file_id: &str) -> bool {
        self.read().get(file_id).is_some_and(|node| node.trashed)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StoredNode>> {
        self.nodes.read().unwrap_or_else(|e| {
            tracing::warn!("Memory drive lock was poisoned, recovering: {e}");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StoredNode>> {
        self.nodes.write().unwrap_or_else(|e| {
            tracing::warn!("Memory drive lock was poisoned, recovering: {e}");
            e.into_inner()
        })
    }

    fn live_record(nodes: &HashMap<String, StoredNode>, id: &str) -> Result<FileRecord, ProviderError> {
        nodes
            .get(id)
            .filter(|node| !node.trashed)
            .map(|node| node.record.clone())
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }

    fn live_folder(nodes: &HashMap<String, StoredNode>, id: &str) -> Result<FileRecord, ProviderError> {
        let record = Self::live_record(nodes, id)?;
        if !record.is_folder() {
            return Err(ProviderError::InvalidPath(format!("{} is not a folder", id)));
        }
        Ok(record)
    }

    /// True if `ancestor` appears on any parent chain of `id`
    fn is_descendant(nodes: &HashMap<String, StoredNode>, id: &str, ancestor: &str) -> bool {
        let mut stack = vec![id.to_string()];
        let mut seen = std::collections::HashSet::new();
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(node) = nodes.get(&current) {
                stack.extend(node.record.parent_ids.iter().cloned());
            }
        }
        false
    }

    fn new_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new("My Drive")
    }
}

#[async_trait]
impl RemoteStore for MemoryProvider {
    fn display_name(&self) -> String {
        "In-memory drive".to_string()
    }

    async fn list(&self, folder_id: &str) -> Result<Vec<FileRecord>, ProviderError> {
        let nodes = self.read();
        Self::live_folder(&nodes, folder_id)?;
        let mut items: Vec<FileRecord> = nodes
            .values()
            .filter(|node| !node.trashed && node.record.parent_ids.iter().any(|p| p == folder_id))
            .map(|node| node.record.clone())
            .collect();
        sort_listing(&mut items);
        Ok(items)
    }

    async fn search(&self, query: &str) -> Result<Vec<FileRecord>, ProviderError> {
        let needle = query.to_lowercase();
        let nodes = self.read();
        let mut items: Vec<FileRecord> = nodes
            .values()
            .filter(|node| {
                !node.trashed
                    && node.record.id != MEMORY_ROOT_ID
                    && node.record.name.to_lowercase().contains(&needle)
            })
            .map(|node| node.record.clone())
            .collect();
        sort_listing(&mut items);
        items.truncate(self.search_limit);
        Ok(items)
    }

    async fn get(&self, file_id: &str) -> Result<FileRecord, ProviderError> {
        Self::live_record(&self.read(), file_id)
    }

    async fn rename(&self, file_id: &str, name: &str) -> Result<(), ProviderError> {
        let mut nodes = self.write();
        let record = Self::live_record(&nodes, file_id)?;
        let renamed = record.with_name(name).with_modified_time(Some(Utc::now()));
        nodes.insert(file_id.to_string(), StoredNode { record: renamed, trashed: false });
        Ok(())
    }

    async fn delete(&self, file_id: &str) -> Result<(), ProviderError> {
        let mut nodes = self.write();
        Self::live_record(&nodes, file_id)?;
        if let Some(node) = nodes.get_mut(file_id) {
            node.trashed = true;
        }
        info!("Trashed {}", file_id);
        Ok(())
    }

    async fn move_file(
        &self,
        file_id: &str,
        new_parent_id: &str,
        old_parent_id: Option<&str>,
    ) -> Result<(), ProviderError> {
        let mut nodes = self.write();
        let record = Self::live_record(&nodes, file_id)?;
        Self::live_folder(&nodes, new_parent_id)?;
        if Self::is_descendant(&nodes, new_parent_id, file_id) {
            return Err(ProviderError::InvalidPath(format!(
                "cannot move {} into its own subtree",
                file_id
            )));
        }

        let mut parents = record.parent_ids.clone();
        if let Some(old) = old_parent_id {
            parents.retain(|p| p != old);
        }
        if !parents.iter().any(|p| p == new_parent_id) {
            parents.push(new_parent_id.to_string());
        }
        nodes.insert(file_id.to_string(), StoredNode { record: record.with_parents(parents), trashed: false });
        Ok(())
    }

    async fn copy(
        &self,
        file_id: &str,
        parent_id: &str,
        name: Option<&str>,
    ) -> Result<FileRecord, ProviderError> {
        let mut nodes = self.write();
        let source = Self::live_record(&nodes, file_id)?;
        Self::live_folder(&nodes, parent_id)?;
        if source.is_folder() {
            return Err(ProviderError::Http {
                status: 403,
                message: "folders cannot be copied".to_string(),
            });
        }

        let name = name.map(str::to_string).unwrap_or_else(|| format!("Copy of {}", source.name));
        let copy = FileRecord::new(Self::new_id(), name, source.mime_kind.clone())
            .with_size(source.size)
            .with_modified_time(Some(Utc::now()))
            .with_parent(parent_id);
        nodes.insert(copy.id.clone(), StoredNode { record: copy.clone(), trashed: false });
        Ok(copy)
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<FileRecord, ProviderError> {
        let mut nodes = self.write();
        Self::live_folder(&nodes, parent_id)?;
        let folder = FileRecord::folder(Self::new_id(), name)
            .with_modified_time(Some(Utc::now()))
            .with_parent(parent_id);
        nodes.insert(folder.id.clone(), StoredNode { record: folder.clone(), trashed: false });
        Ok(folder)
    }

    async fn upload(
        &self,
        content: Vec<u8>,
        name: &str,
        mime_kind: &str,
        parent_id: &str,
        on_progress: ProgressCallback,
    ) -> Result<FileRecord, ProviderError> {
        Self::live_folder(&self.read(), parent_id)?;

        on_progress(0.0);
        for step in 1..=UPLOAD_PROGRESS_STEPS {
            tokio::task::yield_now().await;
            on_progress(step as f64 / UPLOAD_PROGRESS_STEPS as f64 * 100.0);
        }

        let record = FileRecord::new(Self::new_id(), name, mime_kind)
            .with_size(Some(content.len() as u64))
            .with_modified_time(Some(Utc::now()))
            .with_parent(parent_id);
        self.insert(record.clone());
        Ok(record)
    }
}
