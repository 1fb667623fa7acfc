//! SyntaxCortex - Built-in annotation delimiter grammars
//!
//! Detects the delimiter-based annotation syntaxes in a document:
//! - Highlights: ==text==
//! - Native comments: %%text%%
//! - HTML comments: <!-- text --> (config-gated)
//!
//! Highlights and native comments share a boundary rule: a match whose
//! delimiter pair touches one extra occurrence of its own delimiter
//! character is not a match at all (`===text===` produces nothing).
//! All patterns use compiled regex.

use regex::Regex;
use serde::{Deserialize, Serialize};

// ==================== TYPE DEFINITIONS ====================

/// Kind of annotation a candidate normalizes to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Highlight,
    Comment,
    Html,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Highlight => "highlight",
            AnnotationKind::Comment => "comment",
            AnnotationKind::Html => "html",
        }
    }

    /// Comment-ness is the flag identity reconciliation keys on:
    /// highlights and html spans compare equal here.
    pub fn is_comment(&self) -> bool {
        matches!(self, AnnotationKind::Comment)
    }
}

/// A raw pattern match before footnote resolution and reconciliation
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Candidate {
    pub kind: AnnotationKind,
    /// Byte offset of the full match start (delimiters included)
    pub start: usize,
    /// Byte offset one past the full match end
    pub end: usize,
    /// Captured content, delimiters excluded; comment captures are trimmed
    pub text: String,
    /// Color extracted from markup, html-kind candidates only
    pub color: Option<String>,
}

impl Candidate {
    pub fn new(kind: AnnotationKind, start: usize, end: usize, text: String) -> Self {
        Self {
            kind,
            start,
            end,
            text,
            color: None,
        }
    }
}

// ==================== MAIN IMPLEMENTATION ====================

/// SyntaxCortex - built-in delimiter grammar scanner
///
/// Patterns are compiled once at construction and reused per scan.
pub struct SyntaxCortex {
    // ==(...)== - capture may span lines but may not start or end with '='
    highlight_re: Regex,
    // %%(...)%% - same shape with '%' as the guard character
    native_comment_re: Regex,
    // <!--(...)--> - multi-character delimiter, no guard needed
    html_comment_re: Regex,
}

impl SyntaxCortex {
    pub fn new() -> Self {
        // The inner [^X] guards keep the capture from starting or ending on
        // the delimiter character; the outer-neighbor guard is checked per
        // match in scan() since the regex crate has no lookaround.
        let highlight_re = Regex::new(r"(?s)==([^=](?:.*?[^=])?)==").unwrap();
        let native_comment_re = Regex::new(r"(?s)%%([^%](?:.*?[^%])?)%%").unwrap();
        let html_comment_re = Regex::new(r"(?s)<!--(.*?)-->").unwrap();

        Self {
            highlight_re,
            native_comment_re,
            html_comment_re,
        }
    }

    /// Scan text for all built-in delimiter grammars.
    ///
    /// Candidates come back in discovery order; the pipeline sorts the
    /// combined stream by start offset afterwards.
    pub fn scan(&self, text: &str, detect_html_comments: bool) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        self.scan_guarded(
            text,
            &self.highlight_re,
            b'=',
            AnnotationKind::Highlight,
            &mut candidates,
        );
        self.scan_guarded(
            text,
            &self.native_comment_re,
            b'%',
            AnnotationKind::Comment,
            &mut candidates,
        );

        if detect_html_comments {
            for cap in self.html_comment_re.captures_iter(text) {
                let full = cap.get(0).unwrap();
                let inner = cap.get(1).unwrap();
                candidates.push(Candidate::new(
                    AnnotationKind::Comment,
                    full.start(),
                    full.end(),
                    inner.as_str().trim().to_string(),
                ));
            }
        }

        candidates
    }

    /// Run one guarded delimiter grammar, rejecting matches whose outer
    /// neighbor repeats the delimiter character.
    fn scan_guarded(
        &self,
        text: &str,
        re: &Regex,
        guard: u8,
        kind: AnnotationKind,
        out: &mut Vec<Candidate>,
    ) {
        let bytes = text.as_bytes();
        for cap in re.captures_iter(text) {
            let full = cap.get(0).unwrap();
            let before = full.start() > 0 && bytes[full.start() - 1] == guard;
            let after = bytes.get(full.end()).copied() == Some(guard);
            if before || after {
                continue;
            }
            let inner = cap.get(1).unwrap().as_str();
            let content = if kind.is_comment() {
                inner.trim().to_string()
            } else {
                inner.to_string()
            };
            out.push(Candidate::new(kind, full.start(), full.end(), content));
        }
    }
}

impl Default for SyntaxCortex {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_simple() {
        let cortex = SyntaxCortex::new();
        let candidates = cortex.scan("see ==this== here", true);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, AnnotationKind::Highlight);
        assert_eq!(candidates[0].text, "this");
        assert_eq!(candidates[0].start, 4);
        assert_eq!(candidates[0].end, 12);
    }

    #[test]
    fn test_highlight_spans_lines() {
        let cortex = SyntaxCortex::new();
        let candidates = cortex.scan("==first\nsecond==", true);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "first\nsecond");
    }

    #[test]
    fn test_highlight_triple_delimiter_rejected() {
        let cortex = SyntaxCortex::new();
        assert!(cortex.scan("===text===", true).is_empty());
        assert!(cortex.scan("a===text==", true).is_empty());
        assert!(cortex.scan("==text===", true).is_empty());
    }

    #[test]
    fn test_highlight_empty_rejected() {
        let cortex = SyntaxCortex::new();
        assert!(cortex.scan("====", true).is_empty());
    }

    #[test]
    fn test_native_comment() {
        let cortex = SyntaxCortex::new();
        let candidates = cortex.scan("%% note to self %%", true);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, AnnotationKind::Comment);
        assert_eq!(candidates[0].text, "note to self");
    }

    #[test]
    fn test_native_comment_triple_rejected() {
        let cortex = SyntaxCortex::new();
        assert!(cortex.scan("%%%text%%%", true).is_empty());
    }

    #[test]
    fn test_html_comment_gated_by_config() {
        let cortex = SyntaxCortex::new();

        let on = cortex.scan("<!-- c -->", true);
        assert_eq!(on.len(), 1);
        assert_eq!(on[0].kind, AnnotationKind::Comment);
        assert_eq!(on[0].text, "c");

        let off = cortex.scan("<!-- c -->", false);
        assert!(off.is_empty());
    }

    #[test]
    fn test_comment_capture_trimmed() {
        let cortex = SyntaxCortex::new();
        let candidates = cortex.scan("%%  padded  %%", true);
        assert_eq!(candidates[0].text, "padded");

        // Highlight captures keep their whitespace
        let candidates = cortex.scan("== padded ==", true);
        assert_eq!(candidates[0].text, " padded ");
    }

    #[test]
    fn test_mixed_grammars_discovered() {
        let cortex = SyntaxCortex::new();
        let candidates = cortex.scan("==h== and %%c%% and <!-- d -->", true);

        assert_eq!(candidates.len(), 3);
        let kinds: Vec<_> = candidates.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&AnnotationKind::Highlight));
        assert_eq!(kinds.iter().filter(|k| k.is_comment()).count(), 2);
    }

    #[test]
    fn test_adjacent_highlights_both_rejected_on_shared_run() {
        // ==a====b== fuses the delimiters into a four-run; both sides
        // touch an extra '=' and neither survives.
        let cortex = SyntaxCortex::new();
        assert!(cortex.scan("==a====b==", true).is_empty());
    }

    #[test]
    fn test_separated_highlights_both_match() {
        let cortex = SyntaxCortex::new();
        let candidates = cortex.scan("==a== ==b==", true);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].text, "a");
        assert_eq!(candidates[1].text, "b");
    }

    #[test]
    fn test_inner_equals_allowed() {
        let cortex = SyntaxCortex::new();
        let candidates = cortex.scan("==a=b==", true);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "a=b");
    }
}
