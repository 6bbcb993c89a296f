//! Remote Drive Providers
//!
//! This module provides the abstraction the navigation engine talks to when it
//! needs the authoritative state of the drive. Every backend implements the
//! `RemoteStore` trait and returns normalized `FileRecord`s.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              RemoteStore Trait              │
//! │  list, search, get, mutate, upload          │
//! └─────────────────────────────────────────────┘
//!                      │
//!           ┌──────────┴──────────┐
//!           ▼                     ▼
//!     ┌───────────┐        ┌────────────┐
//!     │  GDrive   │        │  In-memory │
//!     └───────────┘        └────────────┘
//! ```

pub mod types;
pub mod http_retry;
pub mod google_drive;
pub mod memory;

pub use types::*;
pub use google_drive::{GoogleDriveConfig, GoogleDriveProvider};
pub use memory::MemoryProvider;

use async_trait::async_trait;

/// Unified remote store trait
///
/// Listings are returned folders-first, then by name. Every call that the
/// backend rejects fails with a `ProviderError` carrying the HTTP-like status
/// where one exists.
///
/// Methods take `&self` so one store can serve several in-flight column
/// loads at once.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Get display name for this store
    fn display_name(&self) -> String;

    /// List the non-trashed children of a folder
    async fn list(&self, folder_id: &str) -> Result<Vec<FileRecord>, ProviderError>;

    /// Search records by name (bounded result count)
    async fn search(&self, query: &str) -> Result<Vec<FileRecord>, ProviderError>;

    /// Fetch a single record by id
    async fn get(&self, file_id: &str) -> Result<FileRecord, ProviderError>;

    /// Rename a record
    async fn rename(&self, file_id: &str, name: &str) -> Result<(), ProviderError>;

    /// Move a record to the trash
    async fn delete(&self, file_id: &str) -> Result<(), ProviderError>;

    /// Add `new_parent_id` to the record's parents, removing `old_parent_id` if given
    async fn move_file(
        &self,
        file_id: &str,
        new_parent_id: &str,
        old_parent_id: Option<&str>,
    ) -> Result<(), ProviderError>;

    /// Copy a record into `parent_id`, optionally under a new name
    async fn copy(
        &self,
        file_id: &str,
        parent_id: &str,
        name: Option<&str>,
    ) -> Result<FileRecord, ProviderError>;

    /// Create a folder under `parent_id`
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<FileRecord, ProviderError>;

    /// Upload file content into `parent_id`, reporting progress as a percentage
    async fn upload(
        &self,
        content: Vec<u8>,
        name: &str,
        mime_kind: &str,
        parent_id: &str,
        on_progress: ProgressCallback,
    ) -> Result<FileRecord, ProviderError>;
}
