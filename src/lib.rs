//! Annocore: Annotation Scanner + Reconciliation Engine
//!
//! A Rust/WASM implementation of the annotation detection pipeline for a
//! note-editor host: highlights, inline and HTML comments, HTML-tag
//! highlights, and user-defined patterns, with stable identities across
//! re-scans.
//!
//! # Architecture
//!
//! ## Scanner Components
//! - `exclusion.rs` - ExclusionCortex: code-fence/inline-code/link ranges
//! - `syntax.rs` - SyntaxCortex: ==highlight==, %%comment%%, <!-- html -->
//! - `html.rs` - HtmlCortex: <mark>/<span>/<font> highlights with colors
//! - `custom.rs` - CustomCortex: user regex grammars, bounded execution
//! - `footnote.rs` - FootnoteCortex: adjacency folding + footnote assembly
//! - `resolver.rs` - IdentityResolver: three-tier identity reconciliation
//! - `change.rs` - ChangeDetector: none/content/structural delta reports
//! - `document.rs` - AnnotationCortex: **unified pipeline** - one scan()
//! - `store.rs` - AnnotationStore: explicit per-file annotation state
//! - `conductor.rs` - ScanConductor: state gating, vault passes, debounce
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { ScanConductor } from 'annocore';
//!
//! await init();
//!
//! const conductor = new ScanConductor();
//! conductor.hydrateConfig({ detect_html_comments: true });
//! conductor.hydrateStore(persisted);
//!
//! // One call per document snapshot
//! const report = conductor.scanDocument('notes/a.md', text, mtimeMs);
//!
//! // report.change drives the UI: none | content | structural
//! console.log(report.change);
//! console.log(report.annotations);
//!
//! // Persist verbatim, ids and timestamps included
//! const store = conductor.exportStore();
//! ```

pub mod scanner;

pub use scanner::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("annocore v{}", env!("CARGO_PKG_VERSION"))
}
