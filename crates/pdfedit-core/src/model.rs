//! Document model collaborator
//!
//! The patcher never touches PDF objects directly. It loads a fresh document,
//! asks for page sizes, paints rectangles and text, and serializes the result
//! through this trait. [`crate::lopdf_model::LopdfDocument`] is the bundled
//! implementation.

use crate::color::Rgb;
use crate::coords::{PdfPoint, PdfRect, Size};
use crate::error::{DocumentLoadError, PatchError};
use crate::fonts::{FontMetrics, StandardFont};

pub trait DocumentModel: Sized {
    /// Handle to a font embedded with [`DocumentModel::embed_standard_font`]
    type Font: FontMetrics + Clone;

    fn load(bytes: &[u8]) -> Result<Self, DocumentLoadError>;

    fn page_count(&self) -> u32;

    /// Page size in PDF units. Pages are numbered from 1.
    fn page_size(&self, page: u32) -> Result<Size, PatchError>;

    fn embed_standard_font(&mut self, font: StandardFont) -> Result<Self::Font, PatchError>;

    /// Paint a filled rectangle with no border
    fn draw_rectangle(&mut self, page: u32, rect: &PdfRect, fill: Rgb) -> Result<(), PatchError>;

    /// Draw `text` with its baseline origin at `position`
    fn draw_text(
        &mut self,
        page: u32,
        text: &str,
        position: PdfPoint,
        size: f64,
        font: &Self::Font,
        color: Rgb,
    ) -> Result<(), PatchError>;

    fn serialize(self) -> Result<Vec<u8>, PatchError>;

    /// Fail with [`PatchError::PageOutOfRange`] unless `page` is in `[1, page_count]`
    fn check_page(&self, page: u32) -> Result<(), PatchError> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(PatchError::PageOutOfRange { page, page_count });
        }
        Ok(())
    }
}
