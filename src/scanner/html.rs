//! HtmlCortex - HTML-tag highlight detection
//!
//! Dedicated sub-scanner for the tag-based highlight markup:
//! - `<mark>text</mark>` (color optional)
//! - `<span style="background: ...">text</span>` (background required)
//! - `<font color="...">text</font>` (color attribute required)
//!
//! Color values are hex or named, matched case-insensitively and
//! normalized to lowercase. A background color wins over a font color
//! when markup carries both.

use regex::Regex;

use crate::scanner::syntax::{AnnotationKind, Candidate};

// ==================== MAIN IMPLEMENTATION ====================

/// HtmlCortex - tag highlight scanner
pub struct HtmlCortex {
    // Group 1: optional attribute blob, group 2: text content
    mark_re: Regex,
    span_re: Regex,
    font_re: Regex,
    // Attribute helpers
    style_background_re: Regex,
    color_attr_re: Regex,
}

impl HtmlCortex {
    pub fn new() -> Self {
        let mark_re = Regex::new(r"(?is)<mark(\s+[^>]*)?>(.*?)</mark>").unwrap();
        let span_re = Regex::new(r"(?is)<span\s+([^>]*)>(.*?)</span>").unwrap();
        let font_re = Regex::new(r"(?is)<font\s+([^>]*)>(.*?)</font>").unwrap();

        let style_background_re =
            Regex::new(r#"(?i)background(?:-color)?\s*:\s*([^;"']+)"#).unwrap();
        let color_attr_re = Regex::new(r#"(?i)color\s*=\s*["']?([#\w]+)["']?"#).unwrap();

        Self {
            mark_re,
            span_re,
            font_re,
            style_background_re,
            color_attr_re,
        }
    }

    /// Scan text for tag highlights. Every candidate is `html`-kind.
    pub fn scan(&self, text: &str) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for cap in self.mark_re.captures_iter(text) {
            let full = cap.get(0).unwrap();
            let attrs = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let inner = cap.get(2).unwrap().as_str();
            if inner.is_empty() {
                continue;
            }
            let mut candidate = Candidate::new(
                AnnotationKind::Html,
                full.start(),
                full.end(),
                inner.to_string(),
            );
            candidate.color = self.extract_color(attrs);
            candidates.push(candidate);
        }

        for cap in self.span_re.captures_iter(text) {
            let full = cap.get(0).unwrap();
            let attrs = cap.get(1).unwrap().as_str();
            let inner = cap.get(2).unwrap().as_str();
            // A span is only a highlight when it paints a background
            let Some(color) = self.background_color(attrs) else {
                continue;
            };
            if inner.is_empty() {
                continue;
            }
            let mut candidate = Candidate::new(
                AnnotationKind::Html,
                full.start(),
                full.end(),
                inner.to_string(),
            );
            candidate.color = Some(color);
            candidates.push(candidate);
        }

        for cap in self.font_re.captures_iter(text) {
            let full = cap.get(0).unwrap();
            let attrs = cap.get(1).unwrap().as_str();
            let inner = cap.get(2).unwrap().as_str();
            let Some(color) = self.extract_color(attrs) else {
                continue;
            };
            if inner.is_empty() {
                continue;
            }
            let mut candidate = Candidate::new(
                AnnotationKind::Html,
                full.start(),
                full.end(),
                inner.to_string(),
            );
            candidate.color = Some(color);
            candidates.push(candidate);
        }

        candidates
    }

    /// Background from a style attribute, falling back to a color
    /// attribute. Background wins when both are present.
    fn extract_color(&self, attrs: &str) -> Option<String> {
        self.background_color(attrs).or_else(|| {
            self.color_attr_re
                .captures(attrs)
                .and_then(|cap| normalize_color(cap.get(1).unwrap().as_str()))
        })
    }

    fn background_color(&self, attrs: &str) -> Option<String> {
        self.style_background_re
            .captures(attrs)
            .and_then(|cap| normalize_color(cap.get(1).unwrap().as_str()))
    }
}

impl Default for HtmlCortex {
    fn default() -> Self {
        Self::new()
    }
}

/// Accept hex (#rgb, #rgba, #rrggbb, #rrggbbaa) and named colors,
/// case-insensitively; anything else (var(), gradients) is no color.
fn normalize_color(raw: &str) -> Option<String> {
    let value = raw.trim();
    if let Some(hex) = value.strip_prefix('#') {
        let valid_len = matches!(hex.len(), 3 | 4 | 6 | 8);
        if valid_len && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Some(value.to_lowercase());
        }
        return None;
    }
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(value.to_lowercase());
    }
    None
}

// ==================== TESTS ====================
