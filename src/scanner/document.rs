//! AnnotationCortex: Unified annotation scan pipeline
//!
//! Single scan() call runs the whole pipeline over one document:
//! 1. Excluded-range computation (ExclusionCortex)
//! 2. Built-in delimiter grammars (SyntaxCortex)
//! 3. HTML tag highlights (HtmlCortex)
//! 4. Custom user patterns, bounded (CustomCortex)
//! 5. Exclusion filter + canonical sort by start offset
//! 6. Comment adjacency folding + footnote assembly (FootnoteCortex)
//! 7. Identity reconciliation against the prior set (IdentityResolver)
//! 8. Delta classification (ChangeDetector)
//!
//! The scan is a pure function of (text, prior, config, mtime): no
//! ambient state, no clock, no store. Callers own persistence.

use serde::{Deserialize, Serialize};

use crate::scanner::change::{ChangeDetector, ChangeKind};
use crate::scanner::custom::{CustomCortex, CustomPatternDef};
use crate::scanner::exclusion::{is_excluded, ExclusionCortex};
use crate::scanner::footnote::FootnoteCortex;
use crate::scanner::html::HtmlCortex;
use crate::scanner::resolver::{CandidateRecord, IdentityResolver};
use crate::scanner::store::Annotation;
use crate::scanner::syntax::SyntaxCortex;

// =============================================================================
// Configuration
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    1000
}

/// Scanner configuration as hydrated from the host settings store
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScannerConfig {
    /// Scan <!-- ... --> comments at all
    #[serde(default = "default_true")]
    pub detect_html_comments: bool,
    /// Fold a comment trailing a highlight into its footnotes, uniformly
    /// for native, HTML, and custom comments
    #[serde(default = "default_true")]
    pub merge_adjacent_comments: bool,
    /// User-defined grammars; validated at hydration time
    #[serde(default)]
    pub custom_patterns: Vec<CustomPatternDef>,
    /// Display filter only - never a detection-time exclusion
    #[serde(default)]
    pub min_display_chars: usize,
    /// Trailing-debounce quiescence for editor-driven re-scans
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            detect_html_comments: true,
            merge_adjacent_comments: true,
            custom_patterns: Vec::new(),
            min_display_chars: 0,
            debounce_ms: 1000,
        }
    }
}

// =============================================================================
// Types
// =============================================================================

/// Timing statistics for each scan phase
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanTimings {
    pub total_us: u64,
    pub exclusion_us: u64,
    pub pattern_us: u64,
    pub footnote_us: u64,
    pub reconcile_us: u64,
}

/// Aggregate statistics
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanStats {
    pub timings: ScanTimings,
    pub text_length: usize,
    pub candidates_found: usize,
    pub excluded_dropped: usize,
    pub annotations_found: usize,
}

/// Error during a scan phase (non-fatal)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanError {
    pub phase: String,
    pub message: String,
}

/// Unified scan result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub annotations: Vec<Annotation>,
    pub change: ChangeKind,
    pub stats: ScanStats,
    pub errors: Vec<ScanError>,
}

// =============================================================================
// AnnotationCortex
// =============================================================================

/// Unified document annotation scanner
pub struct AnnotationCortex {
    exclusion: ExclusionCortex,
    syntax: SyntaxCortex,
    html: HtmlCortex,
    custom: CustomCortex,
    footnote: FootnoteCortex,
    resolver: IdentityResolver,
}

impl Default for AnnotationCortex {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationCortex {
    pub fn new() -> Self {
        Self {
            exclusion: ExclusionCortex::new(),
            syntax: SyntaxCortex::new(),
            html: HtmlCortex::new(),
            custom: CustomCortex::new(),
            footnote: FootnoteCortex::new(),
            resolver: IdentityResolver::new(),
        }
    }

    /// Compile and install the custom pattern set. Invalid definitions
    /// reject the whole call and leave the previous set in place.
    pub fn hydrate_patterns(&mut self, defs: &[CustomPatternDef]) -> Result<(), String> {
        self.custom.hydrate(defs)
    }

    pub fn custom_pattern_count(&self) -> usize {
        self.custom.pattern_count()
    }

    /// Run the full pipeline over one document snapshot.
    ///
    /// `mtime_ms` is the file's modification time; new annotations derive
    /// their creation timestamps from it.
    pub fn scan(
        &self,
        text: &str,
        prior: &[Annotation],
        config: &ScannerConfig,
        mtime_ms: i64,
    ) -> ScanOutcome {
        let overall_start = instant::Instant::now();
        let mut errors = Vec::new();

        // Phase 1: excluded ranges
        let exclusion_start = instant::Instant::now();
        let excluded = self.exclusion.compute(text);
        let exclusion_us = exclusion_start.elapsed().as_micros() as u64;

        // Phase 2: pattern scanning across all grammars
        let pattern_start = instant::Instant::now();
        let mut candidates = self.syntax.scan(text, config.detect_html_comments);
        candidates.extend(self.html.scan(text));
        let (custom_candidates, failures) = self.custom.scan(text);
        candidates.extend(custom_candidates);
        for failure in failures {
            errors.push(ScanError {
                phase: "custom".to_string(),
                message: format!("{}: {}", failure.name, failure.message),
            });
        }

        let candidates_found = candidates.len();
        candidates.retain(|c| !is_excluded(&excluded, c.start, c.end));
        let excluded_dropped = candidates_found - candidates.len();

        // Canonical document order for everything downstream
        candidates.sort_by_key(|c| c.start);
        let pattern_us = pattern_start.elapsed().as_micros() as u64;

        // Phase 3: adjacency folding + footnote assembly
        let footnote_start = instant::Instant::now();
        let table = self.footnote.build_table(text);
        let merged = if config.merge_adjacent_comments {
            self.footnote.merge_adjacent(candidates, text)
        } else {
            self.footnote.merge_none(candidates)
        };
        let resolved = self.footnote.resolve(text, &table, &merged);
        let records: Vec<CandidateRecord> = resolved
            .into_iter()
            .map(|(candidate, footnote_contents)| CandidateRecord {
                kind: candidate.kind,
                start: candidate.start,
                end: candidate.end,
                line: line_of(text, candidate.start),
                text: candidate.text,
                color: candidate.color,
                footnote_contents,
            })
            .collect();
        let footnote_us = footnote_start.elapsed().as_micros() as u64;

        // Phase 4: identity reconciliation + delta classification
        let reconcile_start = instant::Instant::now();
        let annotations = self.resolver.reconcile(&records, prior, mtime_ms);
        let change = ChangeDetector::classify(prior, &annotations);
        let reconcile_us = reconcile_start.elapsed().as_micros() as u64;

        let stats = ScanStats {
            timings: ScanTimings {
                total_us: overall_start.elapsed().as_micros() as u64,
                exclusion_us,
                pattern_us,
                footnote_us,
                reconcile_us,
            },
            text_length: text.len(),
            candidates_found,
            excluded_dropped,
            annotations_found: annotations.len(),
        };

        ScanOutcome {
            annotations,
            change,
            stats,
            errors,
        }
    }
}

/// Zero-based line number of a byte offset.
fn line_of(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::custom::CustomKind;
    use crate::scanner::syntax::AnnotationKind;

    fn scan(text: &str) -> ScanOutcome {
        AnnotationCortex::new().scan(text, &[], &ScannerConfig::default(), 10_000)
    }

    // -------------------------------------------------------------------------
    // Requirement 1: Scanning twice preserves ids and timestamps
    // -------------------------------------------------------------------------
    #[test]
    fn test_idempotent_rescan() {
        let cortex = AnnotationCortex::new();
        let config = ScannerConfig::default();
        let text = "==h== and %%c%% end";

        let first = cortex.scan(text, &[], &config, 10_000);
        let second = cortex.scan(text, &first.annotations, &config, 99_999);

        assert_eq!(first.annotations.len(), second.annotations.len());
        for (a, b) in first.annotations.iter().zip(second.annotations.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.created_at, b.created_at);
        }
        assert_eq!(second.change, ChangeKind::None);
    }

    // -------------------------------------------------------------------------
    // Requirement 2: No annotation overlaps an excluded range
    // -------------------------------------------------------------------------
    #[test]
    fn test_exclusion_correctness() {
        let text = "==keep==\n```\n==code==\n```\n`==inline==` [x](http://a/==u==)";
        let outcome = scan(text);

        assert_eq!(outcome.annotations.len(), 1);
        assert_eq!(outcome.annotations[0].text, "keep");
    }

    // -------------------------------------------------------------------------
    // Requirement 3: Boundary-guarded delimiters reject tripled runs
    // -------------------------------------------------------------------------
    #[test]
    fn test_boundary_rejection() {
        assert!(scan("===text===").annotations.is_empty());
        assert!(scan("%%%text%%%").annotations.is_empty());
        assert_eq!(scan("==text==").annotations.len(), 1);
        assert_eq!(scan("%%text%%").annotations.len(), 1);
    }

    // -------------------------------------------------------------------------
    // Requirement 4: Adjacency folds a trailing comment into footnotes
    // -------------------------------------------------------------------------
    #[test]
    fn test_adjacency_enabled() {
        let outcome = scan("==h==<!-- c -->");

        assert_eq!(outcome.annotations.len(), 1);
        let a = &outcome.annotations[0];
        assert_eq!(a.kind, AnnotationKind::Highlight);
        assert_eq!(a.footnote_contents, vec!["c".to_string()]);
        assert_eq!(a.footnote_count, 1);
    }

    #[test]
    fn test_adjacency_disabled() {
        let config = ScannerConfig {
            merge_adjacent_comments: false,
            ..Default::default()
        };
        let outcome = AnnotationCortex::new().scan("==h==<!-- c -->", &[], &config, 10_000);

        assert_eq!(outcome.annotations.len(), 2);
        assert_eq!(outcome.annotations[0].kind, AnnotationKind::Highlight);
        assert!(outcome.annotations[0].footnote_contents.is_empty());
        assert_eq!(outcome.annotations[1].kind, AnnotationKind::Comment);
        assert_eq!(
            outcome.annotations[1].footnote_contents,
            vec!["c".to_string()]
        );
    }

    // -------------------------------------------------------------------------
    // Requirement 5: A blank line always breaks adjacency
    // -------------------------------------------------------------------------
    #[test]
    fn test_blank_line_breaks_fold() {
        let outcome = scan("==h==\n\n<!-- c -->");
        assert_eq!(outcome.annotations.len(), 2);

        let config = ScannerConfig {
            merge_adjacent_comments: false,
            ..Default::default()
        };
        let outcome =
            AnnotationCortex::new().scan("==h==\n\n<!-- c -->", &[], &config, 10_000);
        assert_eq!(outcome.annotations.len(), 2);
    }

    // -------------------------------------------------------------------------
    // Requirement 6: Footnote contents come in marker document order
    // -------------------------------------------------------------------------
    #[test]
    fn test_footnote_ordering() {
        let outcome = scan("==h==[^1]^[note]\n\n[^1]: first");

        assert_eq!(outcome.annotations.len(), 1);
        assert_eq!(
            outcome.annotations[0].footnote_contents,
            vec!["first".to_string(), "note".to_string()]
        );
    }

    // -------------------------------------------------------------------------
    // Requirement 7: A pathological custom pattern terminates with zero
    // annotations and one diagnostic
    // -------------------------------------------------------------------------
    #[test]
    fn test_custom_pattern_cap() {
        let mut cortex = AnnotationCortex::new();
        cortex
            .hydrate_patterns(&[CustomPatternDef {
                name: "each".to_string(),
                pattern: r"(\w)".to_string(),
                kind: CustomKind::Comment,
            }])
            .unwrap();

        let text = "word ".repeat(500);
        let outcome = cortex.scan(&text, &[], &ScannerConfig::default(), 10_000);

        assert!(outcome.annotations.is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].phase, "custom");
    }

    // -------------------------------------------------------------------------
    // Requirement 8: Custom comment patterns normalize to comment kind
    // -------------------------------------------------------------------------
    #[test]
    fn test_custom_pattern_candidates() {
        let mut cortex = AnnotationCortex::new();
        cortex
            .hydrate_patterns(&[CustomPatternDef {
                name: "bang".to_string(),
                pattern: r"!!(.+?)!!".to_string(),
                kind: CustomKind::Comment,
            }])
            .unwrap();

        let outcome = cortex.scan("!!aside!!", &[], &ScannerConfig::default(), 10_000);

        assert_eq!(outcome.annotations.len(), 1);
        assert_eq!(outcome.annotations[0].kind, AnnotationKind::Comment);
        // A comment's text is its own footnote
        assert_eq!(
            outcome.annotations[0].footnote_contents,
            vec!["aside".to_string()]
        );
    }

    // -------------------------------------------------------------------------
    // Requirement 9: Fuzzy identity survives a 30-char shift
    // -------------------------------------------------------------------------
    #[test]
    fn test_fuzzy_identity_stability() {
        let cortex = AnnotationCortex::new();
        let config = ScannerConfig::default();

        let before = "x".repeat(96) + "==foo==";
        let first = cortex.scan(&before, &[], &config, 10_000);
        let id = first.annotations[0].id.clone();

        let after = "x".repeat(126) + "==foo==";
        let second = cortex.scan(&after, &first.annotations, &config, 20_000);

        assert_eq!(second.annotations[0].id, id);
        assert!(matches!(second.change, ChangeKind::Content { .. }));
    }

    // -------------------------------------------------------------------------
    // Requirement 10: New and deleted annotations classify as structural
    // -------------------------------------------------------------------------
    #[test]
    fn test_structural_change() {
        let cortex = AnnotationCortex::new();
        let config = ScannerConfig::default();

        let first = cortex.scan("==a==", &[], &config, 10_000);
        assert_eq!(first.change, ChangeKind::Structural);

        let second = cortex.scan("==a== ==b==", &first.annotations, &config, 20_000);
        assert_eq!(second.change, ChangeKind::Structural);

        let third = cortex.scan("plain", &second.annotations, &config, 30_000);
        assert!(third.annotations.is_empty());
        assert_eq!(third.change, ChangeKind::Structural);
    }

    // -------------------------------------------------------------------------
    // Requirement 11: Line numbers derive from offsets
    // -------------------------------------------------------------------------
    #[test]
    fn test_line_numbers() {
        let outcome = scan("first\nsecond ==h==\nthird %%c%%");

        assert_eq!(outcome.annotations[0].line, 1);
        assert_eq!(outcome.annotations[1].line, 2);
    }

    // -------------------------------------------------------------------------
    // Requirement 12: Stats are populated
    // -------------------------------------------------------------------------
    #[test]
    fn test_stats_populated() {
        let outcome = scan("==a== `==b==`");

        assert_eq!(outcome.stats.text_length, 13);
        assert_eq!(outcome.stats.candidates_found, 2);
        assert_eq!(outcome.stats.excluded_dropped, 1);
        assert_eq!(outcome.stats.annotations_found, 1);
    }

    #[test]
    fn test_html_annotation_end_to_end() {
        let outcome = scan(r#"<span style="background: #ff0">warm</span>"#);

        assert_eq!(outcome.annotations.len(), 1);
        assert_eq!(outcome.annotations[0].kind, AnnotationKind::Html);
        assert_eq!(outcome.annotations[0].color.as_deref(), Some("#ff0"));
    }
}
