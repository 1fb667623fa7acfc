//! FootnoteCortex - Footnote resolution and comment adjacency folding
//!
//! Three sources feed a highlight's footnote list, each tagged with the
//! byte offset of its originating marker and sorted by that offset:
//! 1. Inline notes `^[...]` between the highlight and the next highlight
//! 2. Standard references `[^key]` reachable from the highlight's end
//!    through an unbroken chain of footnote markers (definitions
//!    `[^key]: ...` never count as references)
//! 3. A trailing comment folded in by adjacency merging
//!
//! Adjacency folding removes a comment candidate that immediately
//! follows a highlight - immediately meaning across footnote markers
//! and whitespace only, with no blank line - and queues its text as
//! footnote content instead. The rule is uniform over comment sub-types.
//!
//! A bare comment's footnote list is exactly its own captured text.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::scanner::syntax::Candidate;

// ==================== TYPE DEFINITIONS ====================

/// A comment folded into the preceding highlight, keeping its original
/// document offset for sort placement.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FoldedComment {
    pub offset: usize,
    pub text: String,
}

/// A candidate paired with whatever adjacency merging folded into it
pub type MergedCandidate = (Candidate, Vec<FoldedComment>);

/// One parsed footnote marker
#[derive(Debug, Clone, PartialEq)]
enum Marker {
    /// `[^key]` reference (never a definition)
    Standard { key: String, start: usize, end: usize },
    /// `^[content]` inline note; content is collected by the region
    /// scan, the marker only continues the chain
    Inline { end: usize },
}

impl Marker {
    fn end(&self) -> usize {
        match self {
            Marker::Standard { end, .. } | Marker::Inline { end } => *end,
        }
    }
}

// ==================== MAIN IMPLEMENTATION ====================

/// FootnoteCortex - footnote table, adjacency merge, content assembly
pub struct FootnoteCortex {
    // [^key]: content, one per line, anchored at line start
    definition_re: Regex,
    // Anchored marker parsers, run against a slice at the probe position
    standard_ref_re: Regex,
    inline_head_re: Regex,
    // Unanchored inline-note scan for the region after a highlight
    inline_any_re: Regex,
    // Two newlines separated by nothing but spaces/tabs
    blank_line_re: Regex,
}

impl FootnoteCortex {
    pub fn new() -> Self {
        Self {
            definition_re: Regex::new(r"(?m)^\[\^([^\]]+)\]:[ \t]*(.*)$").unwrap(),
            standard_ref_re: Regex::new(r"^\[\^([^\]]+)\]").unwrap(),
            inline_head_re: Regex::new(r"^\^\[([^\]]*)\]").unwrap(),
            inline_any_re: Regex::new(r"\^\[([^\]]*)\]").unwrap(),
            blank_line_re: Regex::new(r"\n[ \t\r]*\n").unwrap(),
        }
    }

    /// Build the document-wide definition table. Content is trimmed and
    /// empty definitions are dropped; the first definition of a key wins.
    pub fn build_table(&self, text: &str) -> HashMap<String, String> {
        let mut table = HashMap::new();
        for cap in self.definition_re.captures_iter(text) {
            let key = cap.get(1).unwrap().as_str();
            let content = cap.get(2).unwrap().as_str().trim();
            if content.is_empty() {
                continue;
            }
            table
                .entry(key.to_string())
                .or_insert_with(|| content.to_string());
        }
        table
    }

    /// Fold comments that immediately trail a highlight into that
    /// highlight's footnote queue. Input must be sorted by start offset.
    pub fn merge_adjacent(&self, candidates: Vec<Candidate>, text: &str) -> Vec<MergedCandidate> {
        let mut merged: Vec<MergedCandidate> = Vec::with_capacity(candidates.len());
        let mut folded_away = vec![false; candidates.len()];

        for i in 0..candidates.len() {
            if folded_away[i] {
                continue;
            }
            let mut folded = Vec::new();
            if !candidates[i].kind.is_comment() {
                if let Some(next) = candidates.get(i + 1) {
                    // Overlapping candidates (a comment inside an html
                    // span) never fold
                    if next.kind.is_comment()
                        && next.start >= candidates[i].end
                        && self.gap_is_adjacent(&text[candidates[i].end..next.start])
                    {
                        folded.push(FoldedComment {
                            offset: next.start,
                            text: next.text.clone(),
                        });
                        folded_away[i + 1] = true;
                    }
                }
            }
            merged.push((candidates[i].clone(), folded));
        }

        merged
    }

    /// Pass-through used when adjacency merging is disabled.
    pub fn merge_none(&self, candidates: Vec<Candidate>) -> Vec<MergedCandidate> {
        candidates.into_iter().map(|c| (c, Vec::new())).collect()
    }

    /// Assemble footnote contents for every merged candidate, in marker
    /// document order. Comments carry their own text as their single
    /// footnote.
    pub fn resolve(
        &self,
        text: &str,
        table: &HashMap<String, String>,
        merged: &[MergedCandidate],
    ) -> Vec<(Candidate, Vec<String>)> {
        let mut out = Vec::with_capacity(merged.len());

        for (i, (candidate, folded)) in merged.iter().enumerate() {
            if candidate.kind.is_comment() {
                out.push((candidate.clone(), vec![candidate.text.clone()]));
                continue;
            }

            // Empty region when the next highlight overlaps this one
            let region_end = merged[i + 1..]
                .iter()
                .find(|(c, _)| !c.kind.is_comment())
                .map(|(c, _)| c.start)
                .unwrap_or(text.len())
                .max(candidate.end);

            let mut sources: Vec<(usize, String)> = Vec::new();

            // 1. Inline notes anywhere before the next highlight
            let region = &text[candidate.end..region_end];
            for cap in self.inline_any_re.captures_iter(region) {
                let m = cap.get(0).unwrap();
                sources.push((
                    candidate.end + m.start(),
                    cap.get(1).unwrap().as_str().to_string(),
                ));
            }

            // 2. Standard references through the unbroken marker chain
            let mut pos = candidate.end;
            while let Some(marker) = self.marker_at(text, pos) {
                if let Marker::Standard { ref key, start, .. } = marker {
                    if let Some(content) = table.get(key) {
                        sources.push((start, content.clone()));
                    }
                }
                pos = marker.end();
            }

            // 3. Adjacency-folded comments
            for f in folded {
                sources.push((f.offset, f.text.clone()));
            }

            sources.sort_by_key(|(offset, _)| *offset);
            let contents = sources.into_iter().map(|(_, s)| s).collect();
            out.push((candidate.clone(), contents));
        }

        out
    }

    /// True when the text between a highlight and a trailing comment is,
    /// after stripping the leading run of footnote markers, whitespace
    /// only with no blank line.
    fn gap_is_adjacent(&self, gap: &str) -> bool {
        let mut pos = 0;
        while let Some(marker) = self.marker_at(gap, pos) {
            pos = marker.end();
        }
        let remainder = &gap[pos..];
        remainder.chars().all(char::is_whitespace) && !self.blank_line_re.is_match(remainder)
    }

    /// Parse one footnote marker starting exactly at `pos`. A standard
    /// reference directly followed by ':' is a definition, not a marker.
    fn marker_at(&self, text: &str, pos: usize) -> Option<Marker> {
        let tail = &text[pos..];
        if let Some(cap) = self.standard_ref_re.captures(tail) {
            let m = cap.get(0).unwrap();
            if text.as_bytes().get(pos + m.end()).copied() == Some(b':') {
                return None;
            }
            return Some(Marker::Standard {
                key: cap.get(1).unwrap().as_str().to_string(),
                start: pos,
                end: pos + m.end(),
            });
        }
        if let Some(m) = self.inline_head_re.find(tail) {
            return Some(Marker::Inline { end: pos + m.end() });
        }
        None
    }
}

impl Default for FootnoteCortex {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== TESTS ====================
