//! Listing order: folders first, then by name.
//!
//! Remote listings arrive in this order; every local patch of a column must
//! keep it, so new or renamed records are placed by comparison rather than
//! appended.

use std::cmp::Ordering;

use crate::providers::FileRecord;

/// Compare two records in listing order
pub fn compare_records(a: &FileRecord, b: &FileRecord) -> Ordering {
    b.is_folder()
        .cmp(&a.is_folder())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Sort a listing in place
pub fn sort_listing(items: &mut [FileRecord]) {
    items.sort_by(compare_records);
}

/// Insert `record` before the first item that sorts after it.
///
/// Equal names keep insertion order (the new record lands after them).
pub fn insert_sorted(items: &mut Vec<FileRecord>, record: FileRecord) {
    let position = items
        .iter()
        .position(|item| compare_records(&record, item) == Ordering::Less)
        .unwrap_or(items.len());
    items.insert(position, record);
}

/// Replace the record with the same id (or add it), re-deriving its position
pub fn upsert_sorted(items: &mut Vec<FileRecord>, record: FileRecord) {
    items.retain(|item| item.id != record.id);
    insert_sorted(items, record);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str, name: &str) -> FileRecord {
        FileRecord::new(id, name, "text/plain")
    }

    fn names(items: &[FileRecord]) -> Vec<&str> {
        items.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_folders_come_first() {
        let mut items = vec![
            file("1", "doc1"),
            FileRecord::folder("2", "folderA"),
            file("3", "doc2"),
        ];
        sort_listing(&mut items);
        assert_eq!(names(&items), vec!["folderA", "doc1", "doc2"]);
    }

    #[test]
    fn test_name_order_ignores_case() {
        let mut items = vec![file("1", "beta"), file("2", "Alpha"), file("3", "gamma")];
        sort_listing(&mut items);
        assert_eq!(names(&items), vec!["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_insert_sorted_places_by_order() {
        let mut items = vec![FileRecord::folder("f", "folderA"), file("1", "alpha"), file("2", "zulu")];
        insert_sorted(&mut items, file("3", "mike"));
        insert_sorted(&mut items, FileRecord::folder("g", "folderB"));
        assert_eq!(names(&items), vec!["folderA", "folderB", "alpha", "mike", "zulu"]);
    }

    #[test]
    fn test_upsert_moves_renamed_record() {
        let mut items = vec![file("1", "doc1"), file("2", "doc2"), file("3", "doc3")];
        upsert_sorted(&mut items, file("1", "report.txt"));
        assert_eq!(names(&items), vec!["doc2", "doc3", "report.txt"]);
        assert_eq!(items.len(), 3);
    }
}
