//! CustomCortex - User-defined annotation grammars
//!
//! Users supply regular expressions with exactly one capturing group and
//! tag each as highlight- or comment-kind. Validation happens at
//! hydration time; a definition that fails never reaches the scanner.
//!
//! Scan-time execution is bounded: a hard cap on matches per pattern per
//! document (the pattern is aborted and reported once exceeded) and a
//! zero-length-match guard that advances the scan position by one
//! character so a pathological pattern cannot loop forever. The host has
//! no way to interrupt a synchronous computation, so these bounds are
//! the only backstop.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::scanner::syntax::{AnnotationKind, Candidate};

// ==================== CONSTANTS ====================

/// Hard cap on matches per pattern per document
pub const MATCH_CAP: usize = 1000;

// ==================== TYPE DEFINITIONS ====================

/// User-facing kind tag for a custom pattern
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CustomKind {
    Highlight,
    Comment,
}

impl CustomKind {
    fn annotation_kind(self) -> AnnotationKind {
        match self {
            CustomKind::Highlight => AnnotationKind::Highlight,
            CustomKind::Comment => AnnotationKind::Comment,
        }
    }
}

/// A custom pattern as configured by the user
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CustomPatternDef {
    pub name: String,
    pub pattern: String,
    pub kind: CustomKind,
}

/// A validated, compiled custom pattern
pub struct CompiledPattern {
    pub name: String,
    pub kind: CustomKind,
    regex: Regex,
}

impl CompiledPattern {
    /// Compile and validate a definition. Rejects malformed regex syntax
    /// and patterns without exactly one capturing group.
    pub fn compile(def: &CustomPatternDef) -> Result<Self, String> {
        let regex = Regex::new(&def.pattern)
            .map_err(|e| format!("pattern '{}': invalid regex: {}", def.name, e))?;

        // captures_len counts the implicit whole-match group 0
        let group_count = regex.captures_len() - 1;
        if group_count != 1 {
            return Err(format!(
                "pattern '{}': expected exactly 1 capturing group, found {}",
                def.name, group_count
            ));
        }

        Ok(Self {
            name: def.name.clone(),
            kind: def.kind,
            regex,
        })
    }
}

/// Non-fatal scan failure for one pattern
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PatternFailure {
    pub name: String,
    pub message: String,
}

// ==================== MAIN IMPLEMENTATION ====================

/// CustomCortex - bounded executor for user patterns
#[derive(Default)]
pub struct CustomCortex {
    patterns: Vec<CompiledPattern>,
}

impl CustomCortex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pattern set. All-or-nothing: one invalid definition
    /// rejects the whole hydration so the scanner never runs a partial
    /// configuration the user did not ask for.
    pub fn hydrate(&mut self, defs: &[CustomPatternDef]) -> Result<(), String> {
        let compiled = defs
            .iter()
            .map(CompiledPattern::compile)
            .collect::<Result<Vec<_>, _>>()?;
        self.patterns = compiled;
        Ok(())
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Scan with every hydrated pattern. A pattern that exceeds the
    /// match cap contributes zero candidates and one failure; the other
    /// patterns are unaffected.
    pub fn scan(&self, text: &str) -> (Vec<Candidate>, Vec<PatternFailure>) {
        let mut candidates = Vec::new();
        let mut failures = Vec::new();

        for pattern in &self.patterns {
            match Self::scan_bounded(pattern, text) {
                Ok(found) => candidates.extend(found),
                Err(message) => failures.push(PatternFailure {
                    name: pattern.name.clone(),
                    message,
                }),
            }
        }

        (candidates, failures)
    }

    fn scan_bounded(pattern: &CompiledPattern, text: &str) -> Result<Vec<Candidate>, String> {
        let mut found = Vec::new();
        let mut pos = 0usize;

        while pos <= text.len() {
            let Some(caps) = pattern.regex.captures_at(text, pos) else {
                break;
            };
            let full = caps.get(0).unwrap();

            if found.len() >= MATCH_CAP {
                return Err(format!(
                    "pattern '{}' exceeded {} matches and was aborted",
                    pattern.name, MATCH_CAP
                ));
            }

            let kind = pattern.kind.annotation_kind();
            let captured = caps.get(1).map(|g| g.as_str()).unwrap_or("");
            let text_out = if kind.is_comment() {
                captured.trim().to_string()
            } else {
                captured.to_string()
            };
            found.push(Candidate::new(kind, full.start(), full.end(), text_out));

            // Zero-length matches must not stall the scan
            pos = if full.end() > full.start() {
                full.end()
            } else {
                next_char_boundary(text, full.end())
            };
        }

        Ok(found)
    }
}

/// One char past `pos`, saturating at text end.
fn next_char_boundary(text: &str, pos: usize) -> usize {
    match text[pos..].chars().next() {
        Some(c) => pos + c.len_utf8(),
        None => text.len() + 1,
    }
}

// ==================== TESTS ====================
