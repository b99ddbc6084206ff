//! Document editing session
//!
//! Owns everything scoped to one loaded document: the original bytes, the
//! current page and zoom, the runs extracted for that page, the edit ledger,
//! the overlay store and the selection.
//!
//! Page loads are split into [`DocumentSession::begin_page_request`] and
//! [`DocumentSession::complete_page_request`] so results can arrive out of
//! order. Every request gets a fresh token and only the most recent one is
//! applied; anything older is reported as [`RequestOutcome::Superseded`].

use crate::config::EditorConfig;
use crate::coords::{Viewport, ViewportPoint};
use crate::error::{DocumentLoadError, ExtractionError, PatchError, PdfEditError};
use crate::extract::{extract_runs, fetch_page, PageFetch, RunId, TextRun};
use crate::ledger::{EditLedger, LedgerChange, LedgerEntry};
use crate::lopdf_model::LopdfDocument;
use crate::model::DocumentModel;
use crate::overlay::{Overlay, OverlayId, OverlayStore, OverlayUpdate};
use crate::patch::{patch, PatchOptions};
use crate::rasterizer::{Rasterizer, RenderedPage};
use crate::selection::{InteractionEvent, Selection, SelectionTarget};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
struct LoadedDocument {
    name: String,
    bytes: Arc<[u8]>,
    page_count: u32,
}

/// Ticket for one page render/extraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRequest {
    token: u64,
    pub page: u32,
    pub zoom: f64,
}

impl PageRequest {
    pub fn token(&self) -> u64 {
        self.token
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Applied,
    /// A newer request was issued; the result was discarded
    Superseded,
}

/// Everything the patcher needs, detached from the session
pub struct SaveJob<M: DocumentModel = LopdfDocument> {
    bytes: Arc<[u8]>,
    entries: Vec<LedgerEntry>,
    overlays: Vec<Overlay>,
    zoom: f64,
    options: PatchOptions,
    _model: PhantomData<fn() -> M>,
}

impl<M: DocumentModel> SaveJob<M> {
    pub fn run(self) -> Result<Vec<u8>, PatchError> {
        patch::<M>(
            &self.bytes,
            &self.entries,
            &self.overlays,
            self.zoom,
            &self.options,
        )
    }
}

pub struct DocumentSession<M: DocumentModel = LopdfDocument> {
    config: EditorConfig,
    document: Option<LoadedDocument>,
    zoom: f64,
    current_page: u32,
    runs: Vec<TextRun>,
    rendered: Option<RenderedPage>,
    ledger: EditLedger,
    overlays: OverlayStore,
    selection: Selection,
    latest_request: u64,
    _model: PhantomData<fn() -> M>,
}

impl Default for DocumentSession<LopdfDocument> {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl<M: DocumentModel> DocumentSession<M> {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            zoom: config.viewer.initial_zoom,
            overlays: OverlayStore::with_defaults(config.overlay.clone()),
            config,
            document: None,
            current_page: 1,
            runs: Vec::new(),
            rendered: None,
            ledger: EditLedger::new(),
            selection: Selection::Idle,
            latest_request: 0,
            _model: PhantomData,
        }
    }

    /// Drop the document and every piece of state scoped to it.
    ///
    /// Outstanding page requests become stale.
    pub fn reset(&mut self) {
        self.document = None;
        self.zoom = self.config.viewer.initial_zoom;
        self.current_page = 1;
        self.runs.clear();
        self.rendered = None;
        self.ledger.clear();
        self.overlays = OverlayStore::with_defaults(self.config.overlay.clone());
        self.selection.clear();
        self.latest_request += 1;
    }

    /// Open a new document, replacing the current one.
    ///
    /// The session is reset first, so on failure no document is loaded.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn load(&mut self, name: &str, bytes: Vec<u8>) -> Result<u32, DocumentLoadError> {
        self.reset();
        let page_count = match M::load(&bytes) {
            Ok(doc) => doc.page_count(),
            Err(e) => {
                warn!(error = %e, "failed to load document");
                return Err(e);
            }
        };
        if page_count == 0 {
            return Err(DocumentLoadError::NoPages);
        }

        self.document = Some(LoadedDocument {
            name: name.to_string(),
            bytes: Arc::from(bytes),
            page_count,
        });
        info!(page_count, "document loaded");
        Ok(page_count)
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.name.as_str())
    }

    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map_or(0, |d| d.page_count)
    }

    /// Shared handle to the original bytes; they are never modified
    pub fn original_bytes(&self) -> Option<Arc<[u8]>> {
        self.document.as_ref().map(|d| Arc::clone(&d.bytes))
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn rendered_page(&self) -> Option<&RenderedPage> {
        self.rendered.as_ref()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.rendered.as_ref().map(|r| r.viewport)
    }

    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    pub fn run(&self, id: RunId) -> Option<&TextRun> {
        self.runs.iter().find(|r| r.id == id)
    }

    pub fn ledger(&self) -> &EditLedger {
        &self.ledger
    }

    pub fn overlays(&self) -> &OverlayStore {
        &self.overlays
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Issue a token for rendering `page` at `zoom`. Any older request is
    /// superseded from this point on.
    pub fn begin_page_request(&mut self, page: u32, zoom: f64) -> Result<PageRequest, ExtractionError> {
        let page_count = self
            .document
            .as_ref()
            .ok_or(ExtractionError::NoDocument)?
            .page_count;
        if page == 0 || page > page_count {
            return Err(ExtractionError::PageOutOfRange { page, page_count });
        }
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(ExtractionError::InvalidZoom(zoom));
        }

        self.latest_request += 1;
        Ok(PageRequest {
            token: self.latest_request,
            page,
            zoom,
        })
    }

    /// Apply the result of a page request if it is still the latest one.
    ///
    /// Before runs are re-extracted, an in-progress run edit is committed so
    /// its text survives through the ledger. Moving to another page clears the
    /// selection. Errors from stale requests are discarded too.
    pub fn complete_page_request(
        &mut self,
        request: PageRequest,
        result: Result<PageFetch, ExtractionError>,
    ) -> Result<RequestOutcome, ExtractionError> {
        if request.token != self.latest_request {
            debug!(
                page = request.page,
                zoom = request.zoom,
                token = request.token,
                latest = self.latest_request,
                "discarding superseded page result"
            );
            return Ok(RequestOutcome::Superseded);
        }
        let fetch = result?;

        if let Some(SelectionTarget::Run(id)) = self.selection.editing() {
            self.commit_run(id);
        }
        if request.page != self.current_page {
            self.selection.clear();
        }

        let viewport = fetch.rendered.viewport;
        self.runs = extract_runs(request.page, &fetch.items, &viewport, &self.ledger);
        self.current_page = request.page;
        self.zoom = request.zoom;
        self.rendered = Some(fetch.rendered);
        debug!(page = request.page, runs = self.runs.len(), "page applied");
        Ok(RequestOutcome::Applied)
    }

    /// Render and extract `page` at `zoom` through `rasterizer`
    pub async fn show_page<R: Rasterizer + ?Sized>(
        &mut self,
        rasterizer: &R,
        page: u32,
        zoom: f64,
    ) -> Result<RequestOutcome, ExtractionError> {
        let request = self.begin_page_request(page, zoom)?;
        let result = fetch_page(rasterizer, page, zoom).await;
        self.complete_page_request(request, result)
    }

    pub async fn go_to_page<R: Rasterizer + ?Sized>(
        &mut self,
        rasterizer: &R,
        page: u32,
    ) -> Result<RequestOutcome, ExtractionError> {
        let zoom = self.zoom;
        self.show_page(rasterizer, page, zoom).await
    }

    pub async fn set_zoom<R: Rasterizer + ?Sized>(
        &mut self,
        rasterizer: &R,
        zoom: f64,
    ) -> Result<RequestOutcome, ExtractionError> {
        let page = self.current_page;
        self.show_page(rasterizer, page, zoom).await
    }

    fn run_mut(&mut self, id: RunId) -> Result<&mut TextRun, PdfEditError> {
        self.runs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PdfEditError::UnknownRun(id.to_string()))
    }

    fn commit_run(&mut self, id: RunId) -> Option<LedgerChange> {
        let run = self.runs.iter_mut().find(|r| r.id == id)?;
        Some(self.ledger.commit_edit(run))
    }

    fn finish_edit(&mut self, ended: Option<SelectionTarget>) {
        if let Some(SelectionTarget::Run(id)) = ended {
            if let Some(change) = self.commit_run(id) {
                debug!(run = %id, ?change, "edit committed");
            }
        }
    }

    /// Start editing a run on the current page
    pub fn begin_edit(&mut self, id: RunId) -> Result<(), PdfEditError> {
        self.run_mut(id)?;
        let ended = self.selection.begin_edit(SelectionTarget::Run(id));
        self.finish_edit(ended);
        Ok(())
    }

    /// Change a run's displayed text. The ledger is updated on commit.
    pub fn set_run_text(&mut self, id: RunId, text: &str) -> Result<(), PdfEditError> {
        self.run_mut(id)?.current_text = text.to_string();
        Ok(())
    }

    pub fn commit_edit(&mut self, id: RunId) -> Result<LedgerChange, PdfEditError> {
        self.run_mut(id)?;
        self.commit_run(id)
            .ok_or_else(|| PdfEditError::UnknownRun(id.to_string()))
    }

    /// Restore a run's original text. Works for runs on other pages too.
    pub fn revert(&mut self, id: RunId) -> bool {
        match self.runs.iter_mut().find(|r| r.id == id) {
            Some(run) => self.ledger.revert(run),
            None => self.ledger.remove(&id).is_some(),
        }
    }

    /// Feed a pointer/keyboard event to the selection; a run whose editing
    /// ends is committed
    pub fn handle_event(&mut self, event: InteractionEvent) -> Option<SelectionTarget> {
        let ended = self.selection.handle(event);
        self.finish_edit(ended);
        ended
    }

    /// Topmost overlay under `point` on the current page, else the first run
    pub fn hit_test(&self, point: ViewportPoint) -> Option<SelectionTarget> {
        let overlay = self
            .overlays
            .list_for_page(self.current_page)
            .into_iter()
            .rev()
            .find(|o| o.contains(point, &self.config.patch.substitute_font))
            .map(|o| SelectionTarget::Overlay(o.id));

        overlay.or_else(|| {
            self.runs
                .iter()
                .find(|r| r.contains(point))
                .map(|r| SelectionTarget::Run(r.id))
        })
    }

    /// Place a new overlay on the current page and select it
    pub fn add_overlay(&mut self, screen_position: ViewportPoint) -> Result<OverlayId, PdfEditError> {
        if self.document.is_none() {
            return Err(PdfEditError::NoDocument);
        }
        let id = self.overlays.create(screen_position, self.current_page).id;
        self.handle_event(InteractionEvent::Click(Some(SelectionTarget::Overlay(id))));
        Ok(id)
    }

    pub fn update_overlay(&mut self, id: OverlayId, update: OverlayUpdate) -> Result<(), PdfEditError> {
        if self.overlays.update(id, update) {
            Ok(())
        } else {
            Err(PdfEditError::UnknownOverlay(id.0))
        }
    }

    pub fn delete_overlay(&mut self, id: OverlayId) -> Result<(), PdfEditError> {
        if !self.overlays.delete(id) {
            return Err(PdfEditError::UnknownOverlay(id.0));
        }
        if self.selection.target() == Some(SelectionTarget::Overlay(id)) {
            self.selection.clear();
        }
        Ok(())
    }

    pub fn edit_count(&self) -> usize {
        self.ledger.count()
    }

    pub fn has_changes(&self) -> bool {
        !self.ledger.is_empty() || !self.overlays.is_empty()
    }

    /// Snapshot what a save needs.
    ///
    /// A run still being edited is included with its current text, but the
    /// session's ledger is not modified; the edit is committed when editing
    /// ends.
    pub fn prepare_save(&self) -> Result<SaveJob<M>, PatchError> {
        let bytes = self
            .document
            .as_ref()
            .map(|d| Arc::clone(&d.bytes))
            .ok_or(PatchError::NoDocument)?;

        let mut ledger = self.ledger.clone();
        if let Some(SelectionTarget::Run(id)) = self.selection.editing() {
            if let Some(run) = self.runs.iter().find(|r| r.id == id) {
                ledger.commit_edit(&mut run.clone());
            }
        }

        Ok(SaveJob {
            bytes,
            entries: ledger.snapshot(),
            overlays: self.overlays.overlays().to_vec(),
            zoom: self.zoom,
            options: PatchOptions::from(&self.config.patch),
            _model: PhantomData,
        })
    }

    /// Produce the patched document on the calling thread. Session state is
    /// left as it was whether or not the patch succeeds.
    pub fn export(&self) -> Result<Vec<u8>, PatchError> {
        self.prepare_save()?.run()
    }
}

impl<M: DocumentModel + 'static> DocumentSession<M> {
    /// Produce the patched document on a blocking worker.
    ///
    /// The ledger, overlays and selection are only read, so a failed save
    /// leaves them as they were.
    #[instrument(skip(self))]
    pub async fn save(&self) -> Result<Vec<u8>, PatchError> {
        let job = self.prepare_save()?;
        let result = tokio::task::spawn_blocking(move || job.run())
            .await
            .map_err(|e| PatchError::Aborted(e.to_string()))?;

        match &result {
            Ok(bytes) => info!(size = bytes.len(), edits = self.edit_count(), "document saved"),
            Err(e) => warn!(error = %e, "save failed"),
        }
        result
    }
}
