//! ExclusionCortex - Ranges that must never contain an annotation match
//!
//! Computes byte-offset ranges for:
//! - Fenced code blocks (``` or ~~~, tracked by an explicit state machine)
//! - Inline code spans (single-line backtick pairs)
//! - Markdown link spans `[label](target)` - the whole span, so delimiter
//!   characters inside a URL never register as annotation boundaries
//!
//! A candidate is excluded when it overlaps a range at all, not only when
//! fully contained.

use regex::Regex;
use serde::{Deserialize, Serialize};

// ==================== TYPE DEFINITIONS ====================

/// Half-open byte interval [start, end)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExcludedRange {
    pub start: usize,
    pub end: usize,
}

impl ExcludedRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Partial-overlap test: a span straddling a range boundary counts.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        start < self.end && end > self.start
    }
}

/// Check a span against a whole range set.
pub fn is_excluded(ranges: &[ExcludedRange], start: usize, end: usize) -> bool {
    ranges.iter().any(|r| r.overlaps(start, end))
}

/// Fence tracking state. Opening requires no block to be open; a fence
/// line only closes a block of its own character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    None,
    Backtick,
    Tilde,
}

// ==================== MAIN IMPLEMENTATION ====================

/// ExclusionCortex - excluded-range computation
pub struct ExclusionCortex {
    // `code` spans that do not cross a newline
    inline_code_re: Regex,
    // [label](target) on one line, label and target both excluded
    link_re: Regex,
}

impl ExclusionCortex {
    pub fn new() -> Self {
        let inline_code_re = Regex::new(r"`[^`\n]+`").unwrap();
        let link_re = Regex::new(r"\[[^\]\n]*\]\([^)\n]*\)").unwrap();

        Self {
            inline_code_re,
            link_re,
        }
    }

    /// Compute all excluded ranges for a document.
    pub fn compute(&self, text: &str) -> Vec<ExcludedRange> {
        let mut ranges = self.fenced_blocks(text);

        for m in self.inline_code_re.find_iter(text) {
            ranges.push(ExcludedRange::new(m.start(), m.end()));
        }
        for m in self.link_re.find_iter(text) {
            ranges.push(ExcludedRange::new(m.start(), m.end()));
        }

        ranges
    }

    /// Line-scanning fence state machine. An unterminated open block
    /// extends to the end of the document.
    fn fenced_blocks(&self, text: &str) -> Vec<ExcludedRange> {
        let mut ranges = Vec::new();
        let mut state = FenceState::None;
        let mut block_start = 0usize;
        let mut offset = 0usize;

        for line in text.split_inclusive('\n') {
            let fence = if line.starts_with("```") {
                Some(FenceState::Backtick)
            } else if line.starts_with("~~~") {
                Some(FenceState::Tilde)
            } else {
                None
            };

            match (state, fence) {
                (FenceState::None, Some(opened)) => {
                    state = opened;
                    block_start = offset;
                }
                (open, Some(closed)) if open == closed => {
                    ranges.push(ExcludedRange::new(block_start, offset + line.len()));
                    state = FenceState::None;
                }
                // A fence line of the other character inside an open block
                // is content, as is any non-fence line.
                _ => {}
            }

            offset += line.len();
        }

        if state != FenceState::None {
            ranges.push(ExcludedRange::new(block_start, text.len()));
        }

        ranges
    }
}

impl Default for ExclusionCortex {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== TESTS ====================
