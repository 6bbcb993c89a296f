//! Mutation Coordinator
//!
//! Runs rename/delete/move/copy/create/upload against the remote store and,
//! only after the remote call succeeds, reconciles the open columns and the
//! folder cache. A failed call is logged once, returned to the caller and
//! leaves local state exactly as it was.
//!
//! Reconciliation depends on how much of the new state is known locally:
//! rename, delete and upload patch the affected column and write the patched
//! listing back to the cache; move, copy and create purge the cache and
//! re-fetch any open destination column.

use futures_util::future::join_all;
use tracing::{error, info};

use crate::column_store::{ColumnStore, ItemsSource};
use crate::navigation::NavigationEngine;
use crate::ordering::{insert_sorted, upsert_sorted};
use crate::providers::{FileRecord, ProgressCallback, ProviderError};
use crate::uploads::{UploadQueue, UploadSource};

/// Log a failed remote call once and hand the result back
fn report<T>(operation: &str, result: Result<T, ProviderError>) -> Result<T, ProviderError> {
    if let Err(e) = &result {
        error!("{} failed: {}", operation, e);
    }
    result
}

fn validate_name(name: &str) -> Result<&str, ProviderError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProviderError::InvalidName("name cannot be empty".to_string()));
    }
    Ok(name)
}

#[derive(Clone)]
pub struct MutationCoordinator {
    engine: NavigationEngine,
    uploads: UploadQueue,
}

impl MutationCoordinator {
    pub fn new(engine: NavigationEngine) -> Self {
        Self {
            engine,
            uploads: UploadQueue::new(),
        }
    }

    pub fn uploads(&self) -> &UploadQueue {
        &self.uploads
    }

    fn store(&self) -> &ColumnStore {
        self.engine.store()
    }

    /// Re-fetch every open column showing `folder_id`
    async fn refresh_open(&self, folder_id: &str) {
        let open: Vec<String> = self
            .store()
            .snapshot()
            .columns
            .into_iter()
            .filter(|c| c.folder_id == folder_id)
            .map(|c| c.id)
            .collect();
        for column_id in open {
            self.engine.refresh_column(&column_id, folder_id).await;
        }
    }

    /// Patch the first column containing `file_id`, then cache its listing
    async fn patch_containing_column(&self, file_id: &str, patch: impl FnOnce(&mut Vec<FileRecord>)) {
        let Some((_, column)) = self.store().find_column_containing(file_id) else {
            return;
        };
        let mut patched = None;
        self.store().update_column(&column.id, |column| {
            column.edit_items(patch);
            patched = Some(column.items.clone());
        });
        if let Some(items) = patched {
            self.engine.cache().set(&column.folder_id, &items).await;
        }
    }

    pub async fn rename_file(&self, file_id: &str, new_name: &str) -> Result<(), ProviderError> {
        let name = validate_name(new_name)?;
        report("Rename", self.engine.remote().rename(file_id, name).await)?;

        self.patch_containing_column(file_id, |items| {
            if let Some(record) = items.iter().find(|item| item.id == file_id) {
                let renamed = record.with_name(name);
                upsert_sorted(items, renamed);
            }
        })
        .await;

        self.store().update_folder(file_id, |column| column.folder_name = name.to_string());
        info!("Renamed {} to {}", file_id, name);
        Ok(())
    }

    /// Move a record to the trash and drop it from view
    pub async fn delete_file(&self, file_id: &str) -> Result<(), ProviderError> {
        report("Delete", self.engine.remote().delete(file_id).await)?;

        self.patch_containing_column(file_id, |items| items.retain(|item| item.id != file_id))
            .await;

        if let Some((index, _)) = self.store().find_column_by_folder(file_id) {
            self.store().truncate_before(index);
            self.engine.cache().invalidate(file_id).await;
        }
        self.store().deselect_file(file_id);
        info!("Trashed {}", file_id);
        Ok(())
    }

    pub async fn move_file(
        &self,
        file_id: &str,
        target_folder_id: &str,
        source_folder_id: &str,
    ) -> Result<(), ProviderError> {
        if file_id == target_folder_id {
            return Err(ProviderError::InvalidPath("cannot move a folder into itself".to_string()));
        }
        if source_folder_id == target_folder_id {
            return Ok(());
        }

        report(
            "Move",
            self.engine
                .remote()
                .move_file(file_id, target_folder_id, Some(source_folder_id))
                .await,
        )?;

        let cache = self.engine.cache();
        cache.invalidate(source_folder_id).await;
        cache.invalidate(target_folder_id).await;

        self.store().update_folder(source_folder_id, |column| {
            column.edit_items(|items| items.retain(|item| item.id != file_id));
        });
        self.refresh_open(target_folder_id).await;

        info!("Moved {} from {} to {}", file_id, source_folder_id, target_folder_id);
        Ok(())
    }

    pub async fn copy_file(
        &self,
        file_id: &str,
        parent_id: &str,
        new_name: Option<&str>,
    ) -> Result<FileRecord, ProviderError> {
        let new_name = new_name.map(validate_name).transpose()?;
        let copy = report("Copy", self.engine.remote().copy(file_id, parent_id, new_name).await)?;

        self.engine.cache().invalidate(parent_id).await;
        self.refresh_open(parent_id).await;
        info!("Copied {} to {} as {}", file_id, parent_id, copy.id);
        Ok(copy)
    }

    pub async fn create_folder(&self, name: &str, parent_id: &str) -> Result<FileRecord, ProviderError> {
        let name = validate_name(name)?;
        let folder = report(
            "Create folder",
            self.engine.remote().create_folder(name, parent_id).await,
        )?;

        self.engine.cache().invalidate(parent_id).await;
        self.refresh_open(parent_id).await;
        info!("Created folder {} in {}", folder.id, parent_id);
        Ok(folder)
    }

    /// Upload every file independently. Results are returned in input order;
    /// one failure does not affect the others.
    pub async fn upload_files(
        &self,
        files: Vec<UploadSource>,
        target_folder_id: &str,
    ) -> Vec<Result<FileRecord, ProviderError>> {
        let queued: Vec<(String, UploadSource)> = files
            .into_iter()
            .map(|file| (self.uploads.enqueue(&file.name, file.bytes.len() as u64), file))
            .collect();

        join_all(
            queued
                .into_iter()
                .map(|(upload_id, file)| self.upload_one(upload_id, file, target_folder_id)),
        )
        .await
    }

    async fn upload_one(
        &self,
        upload_id: String,
        file: UploadSource,
        target_folder_id: &str,
    ) -> Result<FileRecord, ProviderError> {
        self.uploads.mark_uploading(&upload_id);

        let queue = self.uploads.clone();
        let progress_id = upload_id.clone();
        let on_progress: ProgressCallback = Box::new(move |percent| queue.set_progress(&progress_id, percent));

        let mime_kind = file.mime_kind();
        let result = self
            .engine
            .remote()
            .upload(file.bytes, &file.name, &mime_kind, target_folder_id, on_progress)
            .await;

        match result {
            Ok(record) => {
                self.uploads.complete(&upload_id);
                self.insert_uploaded(target_folder_id, &record).await;
                info!("Uploaded {} into {}", record.name, target_folder_id);
                Ok(record)
            }
            Err(e) => {
                error!("Upload of {} failed: {}", file.name, e);
                self.uploads.fail(&upload_id, e.to_string());
                Err(e)
            }
        }
    }

    /// Place a freshly uploaded record into the open target column and cache
    /// that listing. Only columns holding a settled listing are patched; a
    /// folder whose column is still loading, failed, or is not open just
    /// loses its cache entry.
    async fn insert_uploaded(&self, folder_id: &str, record: &FileRecord) {
        let mut listing = None;
        self.store().update_folder(folder_id, |column| {
            if column.items_source == ItemsSource::None || column.error.is_some() {
                return;
            }
            if !column.contains(&record.id) {
                column.edit_items(|items| insert_sorted(items, record.clone()));
            }
            listing.get_or_insert_with(|| column.items.clone());
        });

        let cache = self.engine.cache();
        match listing {
            Some(items) => cache.set(folder_id, &items).await,
            None => cache.invalidate(folder_id).await,
        }
    }
}
