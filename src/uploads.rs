// Upload queue
// Tracks per-file upload state and publishes it through a watch channel

use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

/// Upload lifecycle: pending -> uploading -> (completed | error)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Error,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Error)
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadItem {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub status: UploadStatus,
    /// 0.0..=100.0, never decreases
    pub progress_percent: f64,
    pub error: Option<String>,
}

/// File content handed to `upload_files`
#[derive(Debug, Clone)]
pub struct UploadSource {
    pub name: String,
    /// MIME kind; guessed from the name when absent
    pub mime_kind: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_kind: None,
            bytes,
        }
    }

    pub fn with_mime_kind(self, mime_kind: impl Into<String>) -> Self {
        Self {
            mime_kind: Some(mime_kind.into()),
            ..self
        }
    }

    /// Read a local file into memory
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn mime_kind(&self) -> String {
        self.mime_kind.clone().unwrap_or_else(|| {
            mime_guess::from_path(&self.name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
    }
}

/// Aggregate view of the queue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadSummary {
    /// Pending or uploading items
    pub active: usize,
    /// Mean progress of the active items (0 when none are active)
    pub total_progress: f64,
    pub is_finished: bool,
}

#[derive(Clone)]
pub struct UploadQueue {
    tx: Arc<watch::Sender<Vec<UploadItem>>>,
}

impl Default for UploadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadQueue {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<UploadItem>> {
        self.tx.subscribe()
    }

    pub fn items(&self) -> Vec<UploadItem> {
        self.tx.borrow().clone()
    }

    pub fn get(&self, id: &str) -> Option<UploadItem> {
        self.tx.borrow().iter().find(|item| item.id == id).cloned()
    }

    /// Add a pending item, returning its id
    pub fn enqueue(&self, name: &str, size: u64) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let item = UploadItem {
            id: id.clone(),
            name: name.to_string(),
            size,
            status: UploadStatus::Pending,
            progress_percent: 0.0,
            error: None,
        };
        self.tx.send_modify(|items| items.push(item));
        id
    }

    fn update(&self, id: &str, update: impl FnOnce(&mut UploadItem) -> bool) {
        self.tx.send_if_modified(|items| match items.iter_mut().find(|item| item.id == id) {
            Some(item) => update(item),
            None => false,
        });
    }

    pub fn mark_uploading(&self, id: &str) {
        self.update(id, |item| {
            if item.status != UploadStatus::Pending {
                return false;
            }
            item.status = UploadStatus::Uploading;
            true
        });
    }

    /// Record a progress tick; values are clamped and never move backwards
    pub fn set_progress(&self, id: &str, percent: f64) {
        let percent = if percent.is_finite() { percent.clamp(0.0, 100.0) } else { 0.0 };
        self.update(id, |item| {
            if item.status.is_terminal() || percent <= item.progress_percent {
                return false;
            }
            item.status = UploadStatus::Uploading;
            item.progress_percent = percent;
            true
        });
    }

    pub fn complete(&self, id: &str) {
        self.update(id, |item| {
            item.status = UploadStatus::Completed;
            item.progress_percent = 100.0;
            true
        });
    }

    pub fn fail(&self, id: &str, error: impl Into<String>) {
        let error = error.into();
        self.update(id, |item| {
            item.status = UploadStatus::Error;
            item.error = Some(error);
            true
        });
    }

    /// Remove a finished item. Pending or running items are kept.
    pub fn remove(&self, id: &str) -> bool {
        let mut removed = false;
        self.tx.send_if_modified(|items| {
            let before = items.len();
            items.retain(|item| item.id != id || item.status.is_active());
            removed = items.len() != before;
            removed
        });
        removed
    }

    pub fn clear_finished(&self) {
        self.tx.send_if_modified(|items| {
            let before = items.len();
            items.retain(|item| item.status.is_active());
            items.len() != before
        });
    }

    pub fn summary(&self) -> UploadSummary {
        let items = self.tx.borrow();
        let active: Vec<&UploadItem> = items.iter().filter(|item| item.status.is_active()).collect();
        let total_progress = if active.is_empty() {
            0.0
        } else {
            active.iter().map(|item| item.progress_percent).sum::<f64>() / active.len() as f64
        };
        UploadSummary {
            active: active.len(),
            total_progress,
            is_finished: active.is_empty(),
        }
    }
}
