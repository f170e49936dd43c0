//! Core engine for a synchronized PDF + per-page notes view.
//!
//! The crate keeps one markdown notes document per source PDF, maps 1-based
//! page numbers onto sections of that document, persists rectangular text
//! highlights inside an embedded block of the same document, and coalesces
//! rapid edits into debounced writes. Rendering and file storage are
//! collaborator seams ([`pdf::PdfSource`], [`store::VaultStore`]) implemented
//! by the hosting application.

pub mod autosave;
pub mod config;
pub mod document;
pub mod error;
pub mod highlight;
pub mod pdf;
pub mod store;
pub mod view;

use std::path::Path;

use once_cell::sync::Lazy;
use uuid::Uuid;

pub use autosave::{AutosaveScheduler, DEFAULT_FLUSH_DELAY};
pub use config::ViewerSettings;
pub use document::{
    extract_section, initial_notes_document, list_pages, notes_path_for, upsert_section,
    PAGE_MARKER_PREFIX,
};
pub use error::NotesError;
pub use highlight::{
    embed_highlights, split_highlights, HighlightMap, HighlightRecord, HighlightRect,
    DEFAULT_HIGHLIGHT_COLOR, HIGHLIGHTS_BEGIN, HIGHLIGHTS_END,
};
pub use pdf::{PageSize, PdfDocument, PdfError, PdfPage, PdfSource, RenderTarget};
pub use store::{MemoryVault, VaultError, VaultStore};
pub use view::{LayoutOrientation, NoteView, PanelVisibility, ViewEvent, ViewerState};

pub type DocumentId = Uuid;

static DOCUMENT_NAMESPACE: Lazy<Uuid> = Lazy::new(|| {
    Uuid::parse_str("9f1b6d48-3c2e-4b7a-8d5f-2a91c0e47d66").expect("valid namespace UUID")
});

/// Stable identifier for a source PDF, derived from its vault path.
///
/// The same path always yields the same id, so view events and any per-document
/// caches survive reopening the document.
pub fn document_id_for_path(path: &Path) -> DocumentId {
    let rendered = path.to_string_lossy();
    Uuid::new_v5(&DOCUMENT_NAMESPACE, rendered.as_bytes())
}
