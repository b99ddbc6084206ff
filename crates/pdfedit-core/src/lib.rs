//! Visual PDF text editing
//!
//! This crate reconciles three coordinate systems (PDF user space, the
//! rendered viewport, and the screen the user clicks on) so that existing page
//! text can be located and rewritten, new text labels can be placed, and the
//! result can be written back into the document using lopdf.
//!
//! - [`extract`] turns a page's text layer into editable [`TextRun`]s with
//!   stable identities.
//! - [`ledger`] remembers rewritten runs across navigation and zoom.
//! - [`overlay`] holds newly added labels.
//! - [`patch`] replays both against a fresh copy of the original bytes.
//! - [`session`] ties them together with last-request-wins page loading.
//!
//! Page rasterization is supplied by the caller through [`Rasterizer`].
//! Documents are modified through [`DocumentModel`], implemented for lopdf by
//! [`LopdfDocument`].

pub mod color;
pub mod config;
pub mod coords;
pub mod error;
pub mod extract;
pub mod fonts;
pub mod ledger;
pub mod lopdf_model;
pub mod model;
pub mod overlay;
pub mod patch;
pub mod rasterizer;
pub mod selection;
pub mod session;
pub mod text_content;
pub mod winansi;

#[cfg(test)]
mod test_fixtures;

pub use config::EditorConfig;
pub use coords::{PdfPoint, PdfRect, Size, Viewport, ViewportPoint, ViewportRect};
pub use error::{DocumentLoadError, ExtractionError, PatchError, PdfEditError};
pub use extract::{extract_runs, PageFetch, RunId, TextRun};
pub use fonts::{FontMetrics, StandardFont};
pub use ledger::{EditLedger, LedgerChange, LedgerEntry};
pub use lopdf_model::LopdfDocument;
pub use model::DocumentModel;
pub use overlay::{Overlay, OverlayId, OverlayStore, OverlayUpdate};
pub use patch::{patch, PatchOptions};
pub use rasterizer::{PixelBuffer, Rasterizer, RenderedPage, TextItem};
pub use selection::{InteractionEvent, Selection, SelectionTarget};
pub use session::{DocumentSession, PageRequest, RequestOutcome, SaveJob};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, DocumentLoadError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| DocumentLoadError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}
