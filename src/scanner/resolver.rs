//! IdentityResolver - Stable identity across re-scans
//!
//! Matches each freshly scanned candidate against the prior annotation
//! set for the file so identities survive edits and repeated scans.
//!
//! # Matching tiers (tried in order, per candidate)
//! 1. Exact: same text, same offsets, same comment flag
//! 2. Fuzzy position: same text and flag, start drifted at most 50 chars
//! 3. Unique text: same text and flag, and that text occurs exactly once
//!    among *all* prior records for the file
//!
//! Assignment is one-to-one: a prior record matched once is never reused
//! for a second candidate. A candidate that falls through all tiers
//! becomes a new annotation with a fresh id - including the ambiguous
//! duplicate-text case, where fabricating a new identity is the accepted
//! fallback.

use uuid::Uuid;

use crate::scanner::store::Annotation;
use crate::scanner::syntax::AnnotationKind;

// ==================== CONSTANTS ====================

/// Maximum start-offset drift tier 2 tolerates
pub const MAX_FUZZY_DRIFT: usize = 50;

// ==================== TYPE DEFINITIONS ====================

/// A fully scanned candidate, footnotes resolved, ready for identity
/// assignment.
#[derive(Clone, Debug)]
pub struct CandidateRecord {
    pub kind: AnnotationKind,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub text: String,
    pub color: Option<String>,
    pub footnote_contents: Vec<String>,
}

// ==================== MAIN IMPLEMENTATION ====================

/// IdentityResolver - three-tier reconciliation
pub struct IdentityResolver {
    max_drift: usize,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self {
            max_drift: MAX_FUZZY_DRIFT,
        }
    }

    /// Reconcile a scan's candidates against the prior set, carrying
    /// over `id`, `created_at`, and (except for html markup) `color`.
    /// Everything positional is taken from the fresh scan.
    pub fn reconcile(
        &self,
        candidates: &[CandidateRecord],
        prior: &[Annotation],
        mtime_ms: i64,
    ) -> Vec<Annotation> {
        let mut used = vec![false; prior.len()];
        let mut out = Vec::with_capacity(candidates.len());

        for (index, candidate) in candidates.iter().enumerate() {
            let annotation = match self.find_match(candidate, prior, &used) {
                Some(pi) => {
                    used[pi] = true;
                    self.carry_over(candidate, &prior[pi])
                }
                None => self.fresh(candidate, index, mtime_ms),
            };
            out.push(annotation);
        }

        out
    }

    fn find_match(
        &self,
        candidate: &CandidateRecord,
        prior: &[Annotation],
        used: &[bool],
    ) -> Option<usize> {
        let flag = candidate.kind.is_comment();

        // Tier 1: exact
        for (i, p) in prior.iter().enumerate() {
            if !used[i]
                && p.text == candidate.text
                && p.start == candidate.start
                && p.end == candidate.end
                && p.is_comment() == flag
            {
                return Some(i);
            }
        }

        // Tier 2: fuzzy position
        for (i, p) in prior.iter().enumerate() {
            if !used[i]
                && p.text == candidate.text
                && p.is_comment() == flag
                && p.start.abs_diff(candidate.start) <= self.max_drift
            {
                return Some(i);
            }
        }

        // Tier 3: unique text - counted over ALL prior records, used or
        // not, so duplicate text elsewhere blocks the reassignment
        let same_text: Vec<usize> = prior
            .iter()
            .enumerate()
            .filter(|(_, p)| p.text == candidate.text && p.is_comment() == flag)
            .map(|(i, _)| i)
            .collect();
        if let [only] = same_text.as_slice() {
            if !used[*only] {
                return Some(*only);
            }
        }

        None
    }

    fn carry_over(&self, candidate: &CandidateRecord, prior: &Annotation) -> Annotation {
        let color = if candidate.kind == AnnotationKind::Html {
            // Html color always comes fresh from the markup
            candidate.color.clone()
        } else {
            prior.color.clone()
        };

        Annotation {
            id: prior.id.clone(),
            text: candidate.text.clone(),
            kind: candidate.kind,
            start: candidate.start,
            end: candidate.end,
            line: candidate.line,
            footnote_count: candidate.footnote_contents.len(),
            footnote_contents: candidate.footnote_contents.clone(),
            color,
            created_at: prior.created_at,
        }
    }

    fn fresh(&self, candidate: &CandidateRecord, index: usize, mtime_ms: i64) -> Annotation {
        Annotation {
            id: Uuid::new_v4().simple().to_string(),
            text: candidate.text.clone(),
            kind: candidate.kind,
            start: candidate.start,
            end: candidate.end,
            line: candidate.line,
            footnote_count: candidate.footnote_contents.len(),
            footnote_contents: candidate.footnote_contents.clone(),
            color: candidate.color.clone(),
            // Per-scan uniqueness without an external clock
            created_at: mtime_ms + (index as i64 % 1000),
        }
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== TESTS ====================
