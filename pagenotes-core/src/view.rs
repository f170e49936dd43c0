//! The note view: one open PDF plus its notes document, orchestrating the
//! mapper, the highlight store, and the autosave scheduler against the vault.
//!
//! The view exclusively owns its notes document while open; external edits
//! made between reads are overwritten on the next flush (single-writer
//! limitation, accepted by design).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::autosave::AutosaveScheduler;
use crate::config::ViewerSettings;
use crate::document;
use crate::error::NotesError;
use crate::highlight::{self, HighlightMap, HighlightRecord, HighlightRect};
use crate::pdf::{PdfDocument, PdfSource};
use crate::store::{VaultError, VaultStore};
use crate::{document_id_for_path, DocumentId};

/// Where the notes panel sits relative to the PDF panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutOrientation {
    Top,
    Bottom,
    Left,
    Right,
}

impl LayoutOrientation {
    pub fn is_horizontal(self) -> bool {
        match self {
            LayoutOrientation::Left | LayoutOrientation::Right => true,
            LayoutOrientation::Top | LayoutOrientation::Bottom => false,
        }
    }

    /// Whether the notes panel comes before the PDF in layout order.
    pub fn notes_first(self) -> bool {
        match self {
            LayoutOrientation::Top | LayoutOrientation::Left => true,
            LayoutOrientation::Bottom | LayoutOrientation::Right => false,
        }
    }
}

impl Default for LayoutOrientation {
    fn default() -> Self {
        LayoutOrientation::Right
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelVisibility {
    pub pdf: bool,
    pub notes: bool,
}

/// Transient per-view state. Reset each time a view opens; seeded from
/// [`ViewerSettings`], never persisted by this crate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerState {
    /// 1-based current page.
    pub current_page: u32,
    pub scale: f32,
    pub orientation: LayoutOrientation,
    pub panels: PanelVisibility,
}

impl ViewerState {
    fn from_settings(settings: &ViewerSettings) -> Self {
        Self {
            current_page: 1,
            scale: settings.scale,
            orientation: settings.orientation,
            panels: PanelVisibility {
                pdf: settings.show_pdf,
                notes: settings.show_notes,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub enum ViewEvent {
    NotesLoaded(DocumentId),
    NotesCreated(DocumentId),
    PdfOpened(DocumentId),
    PdfFailed { id: DocumentId, message: String },
    PageChanged { id: DocumentId, page: u32 },
    NotesFlushed(DocumentId),
    FlushFailed { id: DocumentId, message: String },
    HighlightAdded { id: DocumentId, highlight: String },
    HighlightRemoved { id: DocumentId, highlight: String },
}

pub struct NoteView {
    vault: Arc<dyn VaultStore>,
    pdf_path: PathBuf,
    notes_path: PathBuf,
    id: DocumentId,
    /// Notes text with the embedded highlight block stripped; the block is
    /// re-embedded on every flush.
    notes: String,
    highlights: HighlightMap,
    scheduler: AutosaveScheduler,
    pdf: Option<Arc<dyn PdfDocument>>,
    pub state: ViewerState,
    events: Arc<Mutex<Vec<ViewEvent>>>,
}

impl NoteView {
    /// Opens the view for a PDF: derives the notes path, reads the notes
    /// document (creating it with a header when absent), and splits out any
    /// embedded highlight blob.
    #[instrument(skip(vault, settings))]
    pub async fn open(
        vault: Arc<dyn VaultStore>,
        pdf_path: PathBuf,
        settings: &ViewerSettings,
    ) -> Result<Self, NotesError> {
        let notes_path = document::notes_path_for(&pdf_path);
        let id = document_id_for_path(&pdf_path);
        let events = Arc::new(Mutex::new(Vec::new()));

        let composed = match vault.read(&notes_path).await? {
            Some(text) => {
                events.lock().push(ViewEvent::NotesLoaded(id));
                text
            }
            None => {
                let initial = document::initial_notes_document(&pdf_path);
                match vault.create(&notes_path, &initial).await {
                    Ok(()) => events.lock().push(ViewEvent::NotesCreated(id)),
                    // Created out from under us between read and create; our
                    // copy still wins on the next flush.
                    Err(VaultError::AlreadyExists(_)) => {}
                    Err(err) => return Err(err.into()),
                }
                initial
            }
        };

        let (notes, blob) = highlight::split_highlights(&composed);
        let highlights = HighlightMap::from_blob(blob.as_deref());

        Ok(Self {
            vault,
            pdf_path,
            notes_path,
            id,
            notes,
            highlights,
            scheduler: AutosaveScheduler::new(settings.autosave_delay()),
            pdf: None,
            state: ViewerState::from_settings(settings),
            events,
        })
    }

    /// Opens the source PDF through the renderer seam. A corrupt or
    /// unsupported document leaves the view in a placeholder state (no PDF,
    /// notes still editable) and surfaces the error.
    #[instrument(skip(self, source))]
    pub async fn open_pdf(&mut self, source: &dyn PdfSource) -> Result<(), NotesError> {
        let bytes = self.vault.read_binary(&self.pdf_path).await?;
        match source.open(&bytes).await {
            Ok(doc) => {
                let count = doc.page_count() as u32;
                if count > 0 && self.state.current_page > count {
                    self.state.current_page = count;
                }
                self.pdf = Some(doc);
                self.events.lock().push(ViewEvent::PdfOpened(self.id));
                Ok(())
            }
            Err(err) => {
                warn!(%err, path = %self.pdf_path.display(), "failed to open pdf");
                self.pdf = None;
                self.events.lock().push(ViewEvent::PdfFailed {
                    id: self.id,
                    message: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn notes_path(&self) -> &Path {
        &self.notes_path
    }

    pub fn notes_text(&self) -> &str {
        &self.notes
    }

    pub fn highlights(&self) -> &HighlightMap {
        &self.highlights
    }

    pub fn pdf(&self) -> Option<&Arc<dyn PdfDocument>> {
        self.pdf.as_ref()
    }

    pub fn page_count(&self) -> Option<usize> {
        self.pdf.as_ref().map(|doc| doc.page_count())
    }

    pub fn events(&self) -> Arc<Mutex<Vec<ViewEvent>>> {
        Arc::clone(&self.events)
    }

    pub fn take_events(&self) -> Vec<ViewEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Deadline of the armed autosave, for the host to schedule a timer.
    pub fn flush_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.scheduler.has_pending_work()
    }

    pub fn note_for_page(&self, page: u32) -> Result<Option<String>, NotesError> {
        document::extract_section(&self.notes, page)
    }

    pub fn annotated_pages(&self) -> Vec<u32> {
        document::list_pages(&self.notes)
    }

    /// Replaces the note body for a page and arms the autosave. Edits that
    /// leave the document unchanged do not schedule a write.
    pub fn edit_note(&mut self, page: u32, body: &str, now: Instant) -> Result<(), NotesError> {
        let updated = document::upsert_section(&self.notes, page, body)?;
        if updated != self.notes {
            self.notes = updated;
            self.scheduler.record_mutation(now);
            debug!(page, "note edited");
        }
        Ok(())
    }

    pub fn add_highlight(
        &mut self,
        page: u32,
        rect: HighlightRect,
        color: impl Into<String>,
        text: Option<String>,
        now: Instant,
    ) -> Result<HighlightRecord, NotesError> {
        let record = self.highlights.add(page, rect, color, text)?;
        self.scheduler.record_mutation(now);
        self.events.lock().push(ViewEvent::HighlightAdded {
            id: self.id,
            highlight: record.id.clone(),
        });
        Ok(record)
    }

    pub fn remove_highlight(&mut self, highlight_id: &str, now: Instant) -> bool {
        let removed = self.highlights.remove(highlight_id);
        if removed {
            self.scheduler.record_mutation(now);
            self.events.lock().push(ViewEvent::HighlightRemoved {
                id: self.id,
                highlight: highlight_id.to_owned(),
            });
        }
        removed
    }

    /// Background autosave driver: flushes when the debounce deadline has
    /// passed. Write failures become a [`ViewEvent::FlushFailed`]
    /// notification; the next mutation retries naturally.
    pub async fn tick(&mut self, now: Instant) {
        if !self.scheduler.begin_flush_if_due(now) {
            return;
        }
        match self.write_notes().await {
            Ok(()) => self.events.lock().push(ViewEvent::NotesFlushed(self.id)),
            Err(err) => {
                warn!(%err, path = %self.notes_path.display(), "autosave flush failed");
                self.events.lock().push(ViewEvent::FlushFailed {
                    id: self.id,
                    message: err.to_string(),
                });
            }
        }
        self.scheduler.finish_flush(Instant::now());
    }

    /// Flushes any pending mutation immediately, bypassing the debounce
    /// delay. Unlike [`NoteView::tick`], a failure here is returned to the
    /// caller: a close-time save that failed must not be silent.
    #[instrument(skip(self))]
    pub async fn force_flush(&mut self) -> Result<(), NotesError> {
        if !self.scheduler.begin_force_flush() {
            return Ok(());
        }
        let result = self.write_notes().await;
        self.scheduler.finish_flush(Instant::now());
        match result {
            Ok(()) => {
                self.events.lock().push(ViewEvent::NotesFlushed(self.id));
                Ok(())
            }
            Err(err) => {
                self.events.lock().push(ViewEvent::FlushFailed {
                    id: self.id,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Closes the view, persisting any pending state first.
    pub async fn close(&mut self) -> Result<(), NotesError> {
        self.force_flush().await
    }

    /// Changes the current page, force-flushing pending note state for the
    /// page being left before the switch. The target is clamped to the open
    /// PDF's page count.
    pub async fn go_to_page(&mut self, page: u32) -> Result<(), NotesError> {
        if page == 0 {
            return Err(NotesError::InvalidPageNumber(page));
        }
        self.force_flush().await?;
        let target = match self.page_count() {
            Some(count) if count > 0 => page.min(count as u32),
            _ => page,
        };
        if target != self.state.current_page {
            self.state.current_page = target;
            self.events.lock().push(ViewEvent::PageChanged {
                id: self.id,
                page: target,
            });
        }
        Ok(())
    }

    /// Duplicates the source PDF to another vault path ("save a copy").
    pub async fn save_copy(&self, dest: &Path) -> Result<(), NotesError> {
        let bytes = self.vault.read_binary(&self.pdf_path).await?;
        self.vault.write_binary(dest, &bytes).await?;
        Ok(())
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.state.scale = scale.clamp(0.25, 4.0);
    }

    pub fn set_orientation(&mut self, orientation: LayoutOrientation) {
        self.state.orientation = orientation;
    }

    pub fn toggle_pdf_panel(&mut self) {
        self.state.panels.pdf = !self.state.panels.pdf;
    }

    pub fn toggle_notes_panel(&mut self) {
        self.state.panels.notes = !self.state.panels.notes;
    }

    async fn write_notes(&self) -> Result<(), NotesError> {
        let composed = highlight::embed_highlights(&self.notes, &self.highlights)?;
        self.vault.write(&self.notes_path, &composed).await?;
        Ok(())
    }
}
