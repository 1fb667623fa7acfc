//! AnnotationStore - Explicit per-file annotation state
//!
//! The store is handed into the pipeline and handed back out; nothing in
//! the engine keeps ambient per-file state. The host persists the lists
//! verbatim (ids and timestamps included) and feeds them back on the
//! next session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::scanner::syntax::AnnotationKind;

// ==================== TYPE DEFINITIONS ====================

/// The durable annotation record.
///
/// Offsets are byte offsets into the UTF-8 document and always reflect
/// the current scan; only `id`, `created_at`, and a user-assigned
/// `color` survive across scans through reconciliation carry-over.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Annotation {
    /// Opaque stable identifier, unique within a file's set
    pub id: String,
    /// Captured content, delimiters excluded
    pub text: String,
    pub kind: AnnotationKind,
    pub start: usize,
    pub end: usize,
    /// Zero-based line number derived from `start`
    pub line: usize,
    /// Footnote contents in originating-marker document order
    pub footnote_contents: Vec<String>,
    pub footnote_count: usize,
    /// From markup for html annotations, user-assigned otherwise
    pub color: Option<String>,
    /// Epoch milliseconds; new annotations derive this from file mtime
    pub created_at: i64,
}

impl Annotation {
    pub fn is_comment(&self) -> bool {
        self.kind.is_comment()
    }

    /// RFC 3339 rendering of the creation timestamp, for host-side
    /// tooltips and scan summaries.
    pub fn created_at_rfc3339(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.created_at)
            .map(|dt: chrono::DateTime<chrono::Utc>| dt.to_rfc3339())
            .unwrap_or_else(|| self.created_at.to_string())
    }
}

// ==================== MAIN IMPLEMENTATION ====================

/// AnnotationStore - file path to annotation list
///
/// Content hashes are a session-local skip optimization and are not
/// part of the persisted shape.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AnnotationStore {
    files: HashMap<String, Vec<Annotation>>,
    #[serde(skip)]
    hashes: HashMap<String, u64>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The prior annotation list for a path, empty when unknown.
    pub fn annotations(&self, path: &str) -> &[Annotation] {
        self.files.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace a file's list with a fresh scan result.
    pub fn replace(&mut self, path: &str, annotations: Vec<Annotation>, content_hash: u64) {
        self.files.insert(path.to_string(), annotations);
        self.hashes.insert(path.to_string(), content_hash);
    }

    pub fn content_hash(&self, path: &str) -> Option<u64> {
        self.hashes.get(path).copied()
    }

    /// Drop all content hashes so every file re-scans next time. Used
    /// when configuration changes under an unchanged document.
    pub fn clear_hashes(&mut self) {
        self.hashes.clear();
    }

    /// Relabel a file path without regenerating any ids.
    pub fn rename_file(&mut self, old_path: &str, new_path: &str) -> bool {
        match self.files.remove(old_path) {
            Some(annotations) => {
                self.files.insert(new_path.to_string(), annotations);
                if let Some(hash) = self.hashes.remove(old_path) {
                    self.hashes.insert(new_path.to_string(), hash);
                }
                true
            }
            None => false,
        }
    }

    /// Deleting a file deletes all of its annotations.
    pub fn remove_file(&mut self, path: &str) -> bool {
        self.hashes.remove(path);
        self.files.remove(path).is_some()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn annotation_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.hashes.clear();
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(id: &str, text: &str) -> Annotation {
        Annotation {
            id: id.to_string(),
            text: text.to_string(),
            kind: AnnotationKind::Highlight,
            start: 0,
            end: text.len() + 4,
            line: 0,
            footnote_contents: vec![],
            footnote_count: 0,
            color: None,
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_unknown_path_is_empty() {
        let store = AnnotationStore::new();
        assert!(store.annotations("notes/a.md").is_empty());
    }

    #[test]
    fn test_replace_and_lookup() {
        let mut store = AnnotationStore::new();
        store.replace("notes/a.md", vec![annotation("id1", "foo")], 42);

        assert_eq!(store.annotations("notes/a.md").len(), 1);
        assert_eq!(store.content_hash("notes/a.md"), Some(42));
        assert_eq!(store.file_count(), 1);
        assert_eq!(store.annotation_count(), 1);
    }

    #[test]
    fn test_rename_preserves_ids() {
        let mut store = AnnotationStore::new();
        store.replace("old.md", vec![annotation("keep-me", "foo")], 7);

        assert!(store.rename_file("old.md", "new.md"));
        assert!(store.annotations("old.md").is_empty());
        assert_eq!(store.annotations("new.md")[0].id, "keep-me");
        assert_eq!(store.content_hash("new.md"), Some(7));
    }

    #[test]
    fn test_rename_unknown_path() {
        let mut store = AnnotationStore::new();
        assert!(!store.rename_file("ghost.md", "still-ghost.md"));
    }

    #[test]
    fn test_remove_file_drops_everything() {
        let mut store = AnnotationStore::new();
        store.replace("a.md", vec![annotation("x", "foo")], 1);

        assert!(store.remove_file("a.md"));
        assert!(!store.remove_file("a.md"));
        assert_eq!(store.annotation_count(), 0);
    }

    #[test]
    fn test_serde_round_trip_skips_hashes() {
        let mut store = AnnotationStore::new();
        store.replace("a.md", vec![annotation("x", "foo")], 99);

        let json = serde_json::to_string(&store).unwrap();
        let restored: AnnotationStore = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.annotations("a.md")[0].id, "x");
        // Hashes are session-local; a restored store re-scans everything
        assert_eq!(restored.content_hash("a.md"), None);
    }

    #[test]
    fn test_created_at_rfc3339() {
        let a = annotation("x", "foo");
        assert!(a.created_at_rfc3339().starts_with("2023-11-14T"));
    }
}
