//! Shared types for remote drive providers
//!
//! This module contains the normalized file record every provider returns,
//! the preview links attached to it, and the error type shared by all
//! remote calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// MIME kind Google Drive (and the in-memory drive) use for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Icon, thumbnail and viewer links for a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewLinks {
    /// Small type icon served by the drive
    pub icon: Option<String>,
    /// Sized thumbnail (Drive appends `=s<N>` to choose the size)
    pub thumbnail: Option<String>,
    /// Link that opens the record in the drive's web viewer
    pub web_view: Option<String>,
}

/// One remote file or folder.
///
/// Records are immutable values: every change produces a new record through
/// one of the `with_*` methods. `is_folder` is derived from `mime_kind` when
/// the record is built and is never set on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct FileRecord {
    /// Opaque id, stable across renames and moves
    pub id: String,
    pub name: String,
    pub mime_kind: String,
    pub modified_time: Option<DateTime<Utc>>,
    /// Size in bytes (absent for folders and native documents)
    pub size: Option<u64>,
    /// Parent folder ids; the first entry is the primary parent
    pub parent_ids: Vec<String>,
    pub preview_links: PreviewLinks,
    is_folder: bool,
}

/// Serialized shape of a record: everything except the derived folder flag
#[derive(Deserialize)]
struct StoredRecord {
    id: String,
    name: String,
    mime_kind: String,
    #[serde(default)]
    modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    parent_ids: Vec<String>,
    #[serde(default)]
    preview_links: PreviewLinks,
}

impl From<StoredRecord> for FileRecord {
    fn from(stored: StoredRecord) -> Self {
        FileRecord::new(stored.id, stored.name, stored.mime_kind)
            .with_modified_time(stored.modified_time)
            .with_size(stored.size)
            .with_parents(stored.parent_ids)
            .with_preview_links(stored.preview_links)
    }
}

impl FileRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mime_kind: impl Into<String>) -> Self {
        let mime_kind = mime_kind.into();
        Self {
            id: id.into(),
            name: name.into(),
            is_folder: mime_kind == FOLDER_MIME_TYPE,
            mime_kind,
            modified_time: None,
            size: None,
            parent_ids: Vec::new(),
            preview_links: PreviewLinks::default(),
        }
    }

    /// Create a folder record
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, FOLDER_MIME_TYPE)
    }

    pub fn is_folder(&self) -> bool {
        self.is_folder
    }

    /// Primary parent id, if the record has any parent
    pub fn primary_parent(&self) -> Option<&str> {
        self.parent_ids.first().map(String::as_str)
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn with_modified_time(self, modified_time: Option<DateTime<Utc>>) -> Self {
        Self { modified_time, ..self }
    }

    pub fn with_size(self, size: Option<u64>) -> Self {
        Self { size, ..self }
    }

    pub fn with_parents(self, parent_ids: Vec<String>) -> Self {
        Self { parent_ids, ..self }
    }

    pub fn with_parent(self, parent_id: impl Into<String>) -> Self {
        self.with_parents(vec![parent_id.into()])
    }

    pub fn with_preview_links(self, preview_links: PreviewLinks) -> Self {
        Self { preview_links, ..self }
    }
}

/// Upload progress callback, called with a percentage in `0.0..=100.0`
pub type ProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

/// Error type for remote drive operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Map a non-success HTTP status to the closest variant
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => ProviderError::AuthenticationFailed(message),
            403 => ProviderError::PermissionDenied(message),
            404 => ProviderError::NotFound(message),
            _ => ProviderError::Http { status, message },
        }
    }

    /// HTTP-like status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::AuthenticationFailed(_) => Some(401),
            ProviderError::PermissionDenied(_) => Some(403),
            ProviderError::NotFound(_) => Some(404),
            ProviderError::Timeout => Some(408),
            ProviderError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            ProviderError::Timeout | ProviderError::ConnectionFailed(_) => true,
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
