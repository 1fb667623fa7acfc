//! ScanConductor: Unified coordinator for annotation scanning
//!
//! # Design Principles
//! 1. State machine: Uninitialized → Initialized → Ready
//! 2. One conductor owns the store, the config, and the scan pipeline;
//!    results are keyed by file path so a newer scan supersedes a stale
//!    one by construction
//! 3. Editor-driven re-scans coalesce behind a trailing debounce gate;
//!    the host drives the clock tick, the conductor keeps the timers
//!
//! # Usage
//! ```rust
//! use annocore::scanner::{ScanConductor, ScannerConfig};
//!
//! let mut conductor = ScanConductor::new();
//! conductor.hydrate_config(ScannerConfig::default()).unwrap();
//! let report = conductor.scan_document("notes/a.md", "==hello==", 1_000);
//! assert!(report.is_some());
//! ```

use std::collections::HashMap;

use instant::Instant;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::scanner::change::{content_hash, ChangeKind};
use crate::scanner::document::{AnnotationCortex, ScanError, ScanStats, ScannerConfig};
use crate::scanner::store::{Annotation, AnnotationStore};

// =============================================================================
// State Machine
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Fresh instance, nothing initialized
    Uninitialized,
    /// Cortex ready, but no configuration hydrated
    Initialized,
    /// Fully ready - cortex initialized AND config hydrated
    Ready,
}

// =============================================================================
// Types
// =============================================================================

/// One file's snapshot for a vault pass, resolved by the host. A file
/// that vanished mid-pass simply never appears here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultDocument {
    pub path: String,
    pub text: String,
    pub mtime_ms: i64,
}

/// Scan result for one document, plus what the host should do about it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub path: String,
    pub change: ChangeKind,
    pub annotations: Vec<Annotation>,
    pub stats: ScanStats,
    pub errors: Vec<ScanError>,
    /// True when byte-identical content skipped the pipeline
    pub was_skipped: bool,
}

/// Aggregate result of a whole-vault pass: persistence and refresh
/// happen once, driven by the single changed flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultReport {
    pub files_scanned: usize,
    pub changed: bool,
    pub errors: Vec<ScanError>,
}

// =============================================================================
// ScanConductor
// =============================================================================

/// Single coordinator for all annotation scanning operations.
///
/// Ensures configuration is validated and installed before any scan
/// runs, and funnels every mutation of the per-file annotation lists
/// through one place.
#[wasm_bindgen]
pub struct ScanConductor {
    cortex: AnnotationCortex,
    store: AnnotationStore,
    config: ScannerConfig,
    state: State,
    pending_edits: HashMap<String, Instant>,
}

impl Default for ScanConductor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanConductor {
    /// Create a new uninitialized conductor
    pub fn new() -> Self {
        Self {
            cortex: AnnotationCortex::default(),
            store: AnnotationStore::new(),
            config: ScannerConfig::default(),
            state: State::Uninitialized,
            pending_edits: HashMap::new(),
        }
    }

    /// Initialize the scan pipeline. Idempotent - safe to call twice.
    pub fn init(&mut self) {
        if self.state == State::Uninitialized {
            self.cortex = AnnotationCortex::new();
            self.state = State::Initialized;
        }
    }

    /// Validate and install configuration. Auto-initializes if needed and
    /// marks the conductor Ready. Clears stored content hashes so the
    /// next scan of every file re-processes under the new configuration.
    pub fn hydrate_config(&mut self, config: ScannerConfig) -> Result<(), String> {
        if self.state == State::Uninitialized {
            self.init();
        }
        self.cortex.hydrate_patterns(&config.custom_patterns)?;
        self.config = config;
        self.store.clear_hashes();
        self.state = State::Ready;
        Ok(())
    }

    /// Install a persisted store (prior annotation lists keyed by path).
    pub fn hydrate_store(&mut self, store: AnnotationStore) {
        self.store = store;
    }

    /// The store to persist, carried-over ids and timestamps included.
    pub fn export_store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Ready
    }

    /// Current state name (for debugging)
    pub fn state_name(&self) -> &'static str {
        match self.state {
            State::Uninitialized => "uninitialized",
            State::Initialized => "initialized",
            State::Ready => "ready",
        }
    }

    /// Scan one document snapshot. Returns None until configuration is
    /// hydrated. Byte-identical content short-circuits to a no-change
    /// report with the stored list returned verbatim.
    pub fn scan_document(
        &mut self,
        path: &str,
        text: &str,
        mtime_ms: i64,
    ) -> Option<DocumentReport> {
        if self.state != State::Ready {
            return None;
        }

        let hash = content_hash(text);
        if self.store.content_hash(path) == Some(hash) {
            let mut stats = ScanStats::default();
            stats.text_length = text.len();
            return Some(DocumentReport {
                path: path.to_string(),
                change: ChangeKind::None,
                annotations: self.store.annotations(path).to_vec(),
                stats,
                errors: Vec::new(),
                was_skipped: true,
            });
        }

        let outcome = self
            .cortex
            .scan(text, self.store.annotations(path), &self.config, mtime_ms);
        self.store.replace(path, outcome.annotations.clone(), hash);

        Some(DocumentReport {
            path: path.to_string(),
            change: outcome.change,
            annotations: outcome.annotations,
            stats: outcome.stats,
            errors: outcome.errors,
            was_skipped: false,
        })
    }

    /// Whole-vault pass: files scan sequentially and one accumulated
    /// flag decides whether the host persists and refreshes at the end.
    pub fn scan_vault(&mut self, documents: Vec<VaultDocument>) -> Option<VaultReport> {
        if self.state != State::Ready {
            return None;
        }

        let mut changed = false;
        let mut errors = Vec::new();
        let mut files_scanned = 0usize;

        for doc in documents {
            if let Some(report) = self.scan_document(&doc.path, &doc.text, doc.mtime_ms) {
                changed |= report.change.requires_persist();
                errors.extend(report.errors);
                files_scanned += 1;
            }
        }

        Some(VaultReport {
            files_scanned,
            changed,
            errors,
        })
    }

    /// Relabel a file path on rename; ids are never regenerated.
    pub fn rename_file(&mut self, old_path: &str, new_path: &str) -> bool {
        self.store.rename_file(old_path, new_path)
    }

    /// Drop a deleted file's annotations.
    pub fn remove_file(&mut self, path: &str) -> bool {
        self.pending_edits.remove(path);
        self.store.remove_file(path)
    }

    /// A file's annotations with the minimum-character display filter
    /// applied. Detection is never filtered - only what the host shows.
    pub fn visible_annotations(&self, path: &str) -> Vec<Annotation> {
        self.store
            .annotations(path)
            .iter()
            .filter(|a| a.text.chars().count() >= self.config.min_display_chars)
            .cloned()
            .collect()
    }

    // -- Debounce gate ---------------------------------------------------------

    /// Record an editor keystroke for a path. Each call restarts that
    /// path's quiescence window (trailing debounce).
    pub fn note_edit(&mut self, path: &str) {
        self.pending_edits.insert(path.to_string(), Instant::now());
    }

    /// Paths whose quiescence window has elapsed, removed from the
    /// pending set. The host calls this on its timer tick and re-scans
    /// whatever comes back.
    pub fn take_due(&mut self) -> Vec<String> {
        let delay = self.config.debounce_ms as u128;
        let due: Vec<String> = self
            .pending_edits
            .iter()
            .filter(|(_, since)| since.elapsed().as_millis() >= delay)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &due {
            self.pending_edits.remove(path);
        }
        due
    }

    /// Reset to initialized state: clears the store and pending edits.
    pub fn reset(&mut self) {
        self.store.clear();
        self.pending_edits.clear();
        if self.state == State::Ready {
            self.state = State::Initialized;
        }
    }
}

// =============================================================================
// WASM Bindings
// =============================================================================

#[wasm_bindgen]
impl ScanConductor {
    /// Create new conductor (JS binding)
    #[wasm_bindgen(constructor)]
    pub fn js_new() -> Self {
        Self::new()
    }

    /// Initialize pipeline (JS binding)
    #[wasm_bindgen(js_name = "init")]
    pub fn js_init(&mut self) {
        self.init();
    }

    /// Hydrate configuration (JS binding)
    /// Expects { detect_html_comments?, merge_adjacent_comments?,
    /// custom_patterns?, min_display_chars?, debounce_ms? }
    #[wasm_bindgen(js_name = "hydrateConfig")]
    pub fn js_hydrate_config(&mut self, config: JsValue) -> Result<(), JsValue> {
        let config: ScannerConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse config: {}", e)))?;
        self.hydrate_config(config).map_err(|e| JsValue::from_str(&e))
    }

    /// Hydrate persisted annotation lists (JS binding)
    #[wasm_bindgen(js_name = "hydrateStore")]
    pub fn js_hydrate_store(&mut self, store: JsValue) -> Result<(), JsValue> {
        let store: AnnotationStore = serde_wasm_bindgen::from_value(store)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse store: {}", e)))?;
        self.hydrate_store(store);
        Ok(())
    }

    /// Export the store for persistence (JS binding)
    #[wasm_bindgen(js_name = "exportStore")]
    pub fn js_export_store(&self) -> JsValue {
        match serde_wasm_bindgen::to_value(self.export_store()) {
            Ok(v) => v,
            Err(e) => {
                web_sys::console::error_1(
                    &format!("[ScanConductor] Store serialization failed: {:?}", e).into(),
                );
                JsValue::NULL
            }
        }
    }

    /// Check if ready (JS binding)
    #[wasm_bindgen(js_name = "isReady")]
    pub fn js_is_ready(&self) -> bool {
        self.is_ready()
    }

    /// Get state name (JS binding)
    #[wasm_bindgen(js_name = "stateName")]
    pub fn js_state_name(&self) -> String {
        self.state_name().to_string()
    }

    /// Scan one document (JS binding). Returns null if not ready.
    #[wasm_bindgen(js_name = "scanDocument")]
    pub fn js_scan_document(&mut self, path: &str, text: &str, mtime_ms: f64) -> JsValue {
        match self.scan_document(path, text, mtime_ms as i64) {
            Some(report) => serde_wasm_bindgen::to_value(&report).unwrap_or(JsValue::NULL),
            None => JsValue::NULL,
        }
    }

    /// Scan a whole vault (JS binding). Expects an array of
    /// { path, text, mtime_ms }. Returns null if not ready.
    #[wasm_bindgen(js_name = "scanVault")]
    pub fn js_scan_vault(&mut self, documents: JsValue) -> JsValue {
        let documents: Vec<VaultDocument> =
            match serde_wasm_bindgen::from_value(documents) {
                Ok(docs) => docs,
                Err(e) => {
                    web_sys::console::error_1(
                        &format!("[ScanConductor] Failed to parse documents: {}", e).into(),
                    );
                    return JsValue::NULL;
                }
            };
        match self.scan_vault(documents) {
            Some(report) => serde_wasm_bindgen::to_value(&report).unwrap_or(JsValue::NULL),
            None => JsValue::NULL,
        }
    }

    /// Rename a file (JS binding)
    #[wasm_bindgen(js_name = "renameFile")]
    pub fn js_rename_file(&mut self, old_path: &str, new_path: &str) -> bool {
        self.rename_file(old_path, new_path)
    }

    /// Remove a deleted file (JS binding)
    #[wasm_bindgen(js_name = "removeFile")]
    pub fn js_remove_file(&mut self, path: &str) -> bool {
        self.remove_file(path)
    }

    /// Display-filtered annotations for a path (JS binding)
    #[wasm_bindgen(js_name = "visibleAnnotations")]
    pub fn js_visible_annotations(&self, path: &str) -> JsValue {
        serde_wasm_bindgen::to_value(&self.visible_annotations(path)).unwrap_or(JsValue::NULL)
    }

    /// Record an edit for debouncing (JS binding)
    #[wasm_bindgen(js_name = "noteEdit")]
    pub fn js_note_edit(&mut self, path: &str) {
        self.note_edit(path);
    }

    /// Drain paths whose debounce window elapsed (JS binding)
    #[wasm_bindgen(js_name = "takeDue")]
    pub fn js_take_due(&mut self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.take_due()).unwrap_or(JsValue::NULL)
    }

    /// Total stored annotations (JS binding)
    #[wasm_bindgen(js_name = "annotationCount")]
    pub fn js_annotation_count(&self) -> usize {
        self.store.annotation_count()
    }

    /// Tracked file count (JS binding)
    #[wasm_bindgen(js_name = "fileCount")]
    pub fn js_file_count(&self) -> usize {
        self.store.file_count()
    }

    /// Hydrated custom pattern count (JS binding)
    #[wasm_bindgen(js_name = "customPatternCount")]
    pub fn js_custom_pattern_count(&self) -> usize {
        self.cortex.custom_pattern_count()
    }

    /// Get conductor status (JS binding)
    #[wasm_bindgen(js_name = "getStatus")]
    pub fn js_get_status(&self) -> JsValue {
        let status = serde_json::json!({
            "state": self.state_name(),
            "file_count": self.store.file_count(),
            "annotation_count": self.store.annotation_count(),
            "custom_pattern_count": self.cortex.custom_pattern_count(),
            "pending_edits": self.pending_edits.len(),
            "config": {
                "detect_html_comments": self.config.detect_html_comments,
                "merge_adjacent_comments": self.config.merge_adjacent_comments,
                "min_display_chars": self.config.min_display_chars,
                "debounce_ms": self.config.debounce_ms,
            }
        });

        JsValue::from_str(&status.to_string())
    }

    /// Reset conductor (JS binding)
    #[wasm_bindgen(js_name = "reset")]
    pub fn js_reset(&mut self) {
        self.reset();
    }
}

// =============================================================================
// Tests
// =============================================================================
