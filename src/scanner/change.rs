//! ChangeDetector: Scan delta classification
//!
//! Compares the prior and new annotation lists for a file and decides
//! what the host has to do about it: nothing, patch specific items, or
//! rebuild the whole list. Comparison uses a reduced key that excludes
//! timestamps, which are carried over on purpose.
//!
//! Also provides the content hash used to skip scanning byte-identical
//! text. DefaultHasher for speed.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::scanner::store::Annotation;

// =============================================================================
// Types
// =============================================================================

/// Outcome of comparing two annotation lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChangeKind {
    /// Nothing changed; persistence and refresh are both suppressed
    None,
    /// Same id set, listed annotations changed; item-level re-render
    Content { ids: Vec<String> },
    /// Id set differs (insertion or deletion); full list re-render
    Structural,
}

impl ChangeKind {
    pub fn requires_persist(&self) -> bool {
        !matches!(self, ChangeKind::None)
    }

    pub fn requires_full_refresh(&self) -> bool {
        matches!(self, ChangeKind::Structural)
    }
}

// =============================================================================
// ChangeDetector
// =============================================================================

/// Annotation-list delta classifier
pub struct ChangeDetector;

impl ChangeDetector {
    /// Classify the delta between a prior and a fresh list.
    pub fn classify(prior: &[Annotation], new: &[Annotation]) -> ChangeKind {
        let prior_ids: HashSet<&str> = prior.iter().map(|a| a.id.as_str()).collect();
        let new_ids: HashSet<&str> = new.iter().map(|a| a.id.as_str()).collect();

        if prior_ids != new_ids {
            return ChangeKind::Structural;
        }

        let mut changed: Vec<String> = Vec::new();
        for fresh in new {
            let Some(old) = prior.iter().find(|p| p.id == fresh.id) else {
                continue;
            };
            if !Self::reduced_eq(old, fresh) {
                changed.push(fresh.id.clone());
            }
        }

        if changed.is_empty() {
            ChangeKind::None
        } else {
            ChangeKind::Content { ids: changed }
        }
    }

    /// The reduced comparison key: boundaries, text, footnotes, color,
    /// comment flag. Never `created_at`.
    fn reduced_eq(a: &Annotation, b: &Annotation) -> bool {
        a.start == b.start
            && a.end == b.end
            && a.text == b.text
            && a.footnote_count == b.footnote_count
            && a.footnote_contents == b.footnote_contents
            && a.color == b.color
            && a.is_comment() == b.is_comment()
    }
}

/// Hash of document content, for the unchanged-text skip path.
pub fn content_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

// =============================================================================
// Tests
// =============================================================================
