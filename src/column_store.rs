//! Column State Store
//!
//! The ordered stack of open columns, one per folder depth, plus the active
//! (keyboard focus) index and the multi-selection set. The stack lives in a
//! `tokio::sync::watch` channel: renderers subscribe to it, and every writer
//! goes through the store handle so each update acts on the stack as it is
//! at that moment.
//!
//! Columns are addressed by their generated id, never by position. An update
//! aimed at a column that has since been truncated away does nothing.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;

use crate::providers::{FileRecord, ProviderError};

pub type ColumnId = String;

/// Listing failure kept on a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnError {
    pub status: Option<u16>,
    pub message: String,
}

impl From<&ProviderError> for ColumnError {
    fn from(err: &ProviderError) -> Self {
        Self {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

/// Where the currently shown items came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemsSource {
    #[default]
    None,
    Cache,
    Remote,
}

/// Lifecycle of a single column as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnState {
    Empty,
    /// Waiting for the first data, spinner shown
    Loading,
    Loaded,
    /// Cache data shown while the refresh is in flight
    LoadedStale,
    Errored,
}

/// One level of the navigation stack
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub id: ColumnId,
    pub folder_id: String,
    pub folder_name: String,
    pub items: Vec<FileRecord>,
    pub selected_item_id: Option<String>,
    pub is_loading: bool,
    pub last_load_duration_ms: Option<u64>,
    pub error: Option<ColumnError>,
    pub items_source: ItemsSource,
    /// A remote refresh has been issued and has not settled yet
    pub refresh_pending: bool,
    /// Item to select once it shows up in `items`
    pub pending_selection: Option<String>,
}

impl Column {
    /// Empty column for `folder_id`, not yet loading
    pub fn new(folder_id: impl Into<String>, folder_name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            folder_id: folder_id.into(),
            folder_name: folder_name.into(),
            items: Vec::new(),
            selected_item_id: None,
            is_loading: false,
            last_load_duration_ms: None,
            error: None,
            items_source: ItemsSource::None,
            refresh_pending: false,
            pending_selection: None,
        }
    }

    /// Placeholder inserted synchronously when a folder is opened
    pub fn loading(folder_id: impl Into<String>, folder_name: impl Into<String>) -> Self {
        Self {
            is_loading: true,
            refresh_pending: true,
            ..Self::new(folder_id, folder_name)
        }
    }

    pub fn state(&self) -> ColumnState {
        if self.error.is_some() {
            ColumnState::Errored
        } else if self.is_loading {
            ColumnState::Loading
        } else if self.refresh_pending && self.items_source == ItemsSource::Cache {
            ColumnState::LoadedStale
        } else if self.items_source == ItemsSource::Remote {
            ColumnState::Loaded
        } else {
            ColumnState::Empty
        }
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.items.iter().any(|item| item.id == item_id)
    }

    pub fn position_of(&self, item_id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == item_id)
    }

    pub fn selected_item(&self) -> Option<&FileRecord> {
        let id = self.selected_item_id.as_deref()?;
        self.items.iter().find(|item| item.id == id)
    }

    /// Show a cached listing. Ignored once authoritative data has arrived.
    pub fn apply_cached(&mut self, items: Vec<FileRecord>) {
        if !self.refresh_pending || self.items_source == ItemsSource::Remote {
            return;
        }
        self.replace_items(items, ItemsSource::Cache);
        self.is_loading = false;
    }

    /// Settle the refresh with the authoritative listing
    pub fn apply_fetched(&mut self, items: Vec<FileRecord>, duration_ms: u64) {
        self.replace_items(items, ItemsSource::Remote);
        self.is_loading = false;
        self.refresh_pending = false;
        self.error = None;
        self.last_load_duration_ms = Some(duration_ms);
        self.pending_selection = None;
    }

    /// Settle the refresh with a failure; whatever is shown stays shown
    pub fn apply_failure(&mut self, error: ColumnError, duration_ms: u64) {
        self.is_loading = false;
        self.refresh_pending = false;
        self.error = Some(error);
        self.last_load_duration_ms = Some(duration_ms);
        self.pending_selection = None;
    }

    /// Replace the whole listing, keeping the selection only if still valid
    pub fn replace_items(&mut self, items: Vec<FileRecord>, source: ItemsSource) {
        self.items = items;
        self.items_source = source;
        self.reconcile_selection();
    }

    /// Patch the listing in place (local reconciliation after a mutation)
    pub fn edit_items(&mut self, edit: impl FnOnce(&mut Vec<FileRecord>)) {
        edit(&mut self.items);
        self.reconcile_selection();
    }

    /// Drop a selection that no longer points into `items`, then apply a
    /// pending selection if its item has shown up
    pub fn reconcile_selection(&mut self) {
        if let Some(selected) = self.selected_item_id.as_deref() {
            if !self.contains(selected) {
                self.selected_item_id = None;
            }
        }
        if let Some(pending) = self.pending_selection.as_deref() {
            if self.contains(pending) {
                self.selected_item_id = Some(pending.to_string());
            }
        }
    }
}

/// The whole navigator state published to subscribers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStack {
    pub columns: Vec<Column>,
    /// Keyboard focus; always a valid index while `columns` is non-empty
    pub active_index: usize,
    /// Multi-selection across columns
    pub selected_file_ids: BTreeSet<String>,
}

impl ColumnStack {
    fn clamp_active(&mut self) {
        self.active_index = self.active_index.min(self.columns.len().saturating_sub(1));
    }

    fn truncate(&mut self, len: usize) {
        self.columns.truncate(len);
        self.clamp_active();
    }

    fn position(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column_id)
    }

    pub fn active_column(&self) -> Option<&Column> {
        self.columns.get(self.active_index)
    }
}

/// Shared handle over the column stack
#[derive(Clone)]
pub struct ColumnStore {
    tx: Arc<watch::Sender<ColumnStack>>,
}

impl Default for ColumnStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ColumnStack::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<ColumnStack> {
        self.tx.subscribe()
    }

    /// Copy of the current stack
    pub fn snapshot(&self) -> ColumnStack {
        self.tx.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column(&self, column_id: &str) -> Option<Column> {
        self.tx.borrow().columns.iter().find(|c| c.id == column_id).cloned()
    }

    pub fn column_at(&self, index: usize) -> Option<Column> {
        self.tx.borrow().columns.get(index).cloned()
    }

    pub fn index_of(&self, column_id: &str) -> Option<usize> {
        self.tx.borrow().position(column_id)
    }

    pub fn active_index(&self) -> usize {
        self.tx.borrow().active_index
    }

    /// Keep columns `[0, keep_through]` (none if `None`), then append `column`.
    /// Returns the new column's index.
    pub fn push_after(&self, keep_through: Option<usize>, column: Column) -> usize {
        let mut index = 0;
        self.tx.send_modify(|stack| {
            let keep = keep_through.map_or(0, |k| k.saturating_add(1));
            stack.columns.truncate(keep);
            stack.columns.push(column);
            index = stack.columns.len() - 1;
            stack.clamp_active();
        });
        index
    }

    /// Keep columns `[0, index]`
    pub fn truncate_after(&self, index: usize) {
        self.tx.send_if_modified(|stack| {
            let keep = index.saturating_add(1);
            if stack.columns.len() <= keep {
                return false;
            }
            stack.truncate(keep);
            true
        });
    }

    /// Keep columns `[0, index)`
    pub fn truncate_before(&self, index: usize) {
        self.tx.send_if_modified(|stack| {
            if stack.columns.len() <= index {
                return false;
            }
            stack.truncate(index);
            true
        });
    }

    /// Apply `update` to the column with `column_id`. Returns false (and does
    /// nothing) if that column is no longer in the stack.
    pub fn update_column(&self, column_id: &str, update: impl FnOnce(&mut Column)) -> bool {
        self.tx.send_if_modified(|stack| match stack.columns.iter_mut().find(|c| c.id == column_id) {
            Some(column) => {
                update(column);
                true
            }
            None => false,
        })
    }

    /// Apply `update` to every column showing `folder_id`. Returns how many matched.
    pub fn update_folder(&self, folder_id: &str, mut update: impl FnMut(&mut Column)) -> usize {
        let mut count = 0;
        self.tx.send_if_modified(|stack| {
            for column in stack.columns.iter_mut().filter(|c| c.folder_id == folder_id) {
                update(column);
                count += 1;
            }
            count > 0
        });
        count
    }

    /// First column showing `folder_id`
    pub fn find_column_by_folder(&self, folder_id: &str) -> Option<(usize, Column)> {
        let stack = self.tx.borrow();
        stack
            .columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.folder_id == folder_id)
            .map(|(i, c)| (i, c.clone()))
    }

    /// First column whose items contain `file_id`
    pub fn find_column_containing(&self, file_id: &str) -> Option<(usize, Column)> {
        let stack = self.tx.borrow();
        stack
            .columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.contains(file_id))
            .map(|(i, c)| (i, c.clone()))
    }

    /// Number of columns showing the root folder
    pub fn root_column_count(&self, root_id: &str) -> usize {
        self.tx.borrow().columns.iter().filter(|c| c.folder_id == root_id).count()
    }

    /// Move keyboard focus, clamped into the stack
    pub fn set_active_index(&self, index: usize) {
        self.tx.send_if_modified(|stack| {
            let previous = stack.active_index;
            stack.active_index = index;
            stack.clamp_active();
            stack.active_index != previous
        });
    }

    /// Select `item_id` in a column, or clear with `None`.
    /// Ids that are not in the column's items are refused.
    pub fn select_item(&self, column_id: &str, item_id: Option<&str>) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|stack| {
            let Some(column) = stack.columns.iter_mut().find(|c| c.id == column_id) else {
                return false;
            };
            match item_id {
                Some(id) if !column.contains(id) => false,
                _ => {
                    column.selected_item_id = item_id.map(str::to_string);
                    applied = true;
                    true
                }
            }
        });
        applied
    }

    /// Select `item_id` as soon as it appears in the column's items
    pub fn defer_selection(&self, column_id: &str, item_id: &str) -> bool {
        self.update_column(column_id, |column| {
            column.pending_selection = Some(item_id.to_string());
            column.reconcile_selection();
        })
    }

    /// Multi-selection: with `multi` toggle `file_id`, otherwise select only it
    pub fn select_file(&self, file_id: &str, multi: bool) {
        self.tx.send_modify(|stack| {
            if multi {
                if !stack.selected_file_ids.remove(file_id) {
                    stack.selected_file_ids.insert(file_id.to_string());
                }
            } else {
                stack.selected_file_ids.clear();
                stack.selected_file_ids.insert(file_id.to_string());
            }
        });
    }

    pub fn deselect_file(&self, file_id: &str) {
        self.tx.send_if_modified(|stack| stack.selected_file_ids.remove(file_id));
    }

    pub fn deselect_all(&self) {
        self.tx.send_if_modified(|stack| {
            let changed = !stack.selected_file_ids.is_empty();
            stack.selected_file_ids.clear();
            changed
        });
    }

    pub fn selected_file_ids(&self) -> BTreeSet<String> {
        self.tx.borrow().selected_file_ids.clone()
    }

    /// Drop every column and selection
    pub fn clear(&self) {
        self.tx.send_modify(|stack| *stack = ColumnStack::default());
    }
}
