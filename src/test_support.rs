//! Scripted remote store for engine tests
//!
//! Wraps `MemoryProvider` with per-call counters, injected failures and
//! listing gates that hold a `list` call until the test releases it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::providers::{FileRecord, MemoryProvider, ProgressCallback, ProviderError, RemoteStore};

/// Drive used across engine tests:
///
/// ```text
/// root/
///   folderA/
///     folderB/
///       file.txt
///   doc1
///   doc2
/// ```
pub fn fixture_drive() -> MemoryProvider {
    MemoryProvider::new("My Drive")
        .with_record(FileRecord::new("doc1", "doc1", "text/plain").with_parent("root"))
        .with_record(FileRecord::folder("folderA", "folderA").with_parent("root"))
        .with_record(FileRecord::new("doc2", "doc2", "text/plain").with_parent("root"))
        .with_record(FileRecord::folder("folderB", "folderB").with_parent("folderA"))
        .with_record(FileRecord::new("file", "file.txt", "text/plain").with_parent("folderB"))
}

pub struct ScriptedRemote {
    pub inner: MemoryProvider,
    calls: Mutex<HashMap<String, usize>>,
    failures: Mutex<HashMap<String, u16>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ScriptedRemote {
    pub fn new(inner: MemoryProvider) -> Self {
        Self {
            inner,
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn fixture() -> Arc<Self> {
        Arc::new(Self::new(fixture_drive()))
    }

    /// Number of calls recorded under `key` (`"list:<folder>"`, `"get:<id>"`,
    /// `"search"`, `"rename"`, `"delete"`, `"move"`, `"copy"`,
    /// `"create_folder"`, `"upload:<name>"`)
    pub fn calls(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    /// Total `list` calls across all folders
    pub fn list_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with("list:"))
            .map(|(_, count)| count)
            .sum()
    }

    /// Make every call under `key` fail with `status` until cleared
    pub fn fail(&self, key: &str, status: u16) {
        self.failures.lock().unwrap().insert(key.to_string(), status);
    }

    pub fn clear_failure(&self, key: &str) {
        self.failures.lock().unwrap().remove(key);
    }

    /// Hold `list(folder_id)` calls until the returned gate is notified
    pub fn gate_list(&self, folder_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(format!("list:{folder_id}"), gate.clone());
        gate
    }

    fn enter(&self, key: &str) -> Result<(), ProviderError> {
        *self.calls.lock().unwrap().entry(key.to_string()).or_default() += 1;
        match self.failures.lock().unwrap().get(key) {
            Some(status) => Err(ProviderError::from_status(*status, format!("scripted failure: {key}"))),
            None => Ok(()),
        }
    }

    async fn pass_gate(&self, key: &str) {
        let gate = self.gates.lock().unwrap().get(key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    fn display_name(&self) -> String {
        "Scripted drive".to_string()
    }

    async fn list(&self, folder_id: &str) -> Result<Vec<FileRecord>, ProviderError> {
        let key = format!("list:{folder_id}");
        self.enter(&key)?;
        self.pass_gate(&key).await;
        self.inner.list(folder_id).await
    }

    async fn search(&self, query: &str) -> Result<Vec<FileRecord>, ProviderError> {
        self.enter("search")?;
        self.inner.search(query).await
    }

    async fn get(&self, file_id: &str) -> Result<FileRecord, ProviderError> {
        self.enter(&format!("get:{file_id}"))?;
        self.inner.get(file_id).await
    }

    async fn rename(&self, file_id: &str, name: &str) -> Result<(), ProviderError> {
        self.enter("rename")?;
        self.inner.rename(file_id, name).await
    }

    async fn delete(&self, file_id: &str) -> Result<(), ProviderError> {
        self.enter("delete")?;
        self.inner.delete(file_id).await
    }

    async fn move_file(
        &self,
        file_id: &str,
        new_parent_id: &str,
        old_parent_id: Option<&str>,
    ) -> Result<(), ProviderError> {
        self.enter("move")?;
        self.inner.move_file(file_id, new_parent_id, old_parent_id).await
    }

    async fn copy(
        &self,
        file_id: &str,
        parent_id: &str,
        name: Option<&str>,
    ) -> Result<FileRecord, ProviderError> {
        self.enter("copy")?;
        self.inner.copy(file_id, parent_id, name).await
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<FileRecord, ProviderError> {
        self.enter("create_folder")?;
        self.inner.create_folder(name, parent_id).await
    }

    async fn upload(
        &self,
        content: Vec<u8>,
        name: &str,
        mime_kind: &str,
        parent_id: &str,
        on_progress: ProgressCallback,
    ) -> Result<FileRecord, ProviderError> {
        self.enter(&format!("upload:{name}"))?;
        self.inner.upload(content, name, mime_kind, parent_id, on_progress).await
    }
}
