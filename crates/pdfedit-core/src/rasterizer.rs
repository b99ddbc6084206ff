//! Rasterizer collaborator
//!
//! Page rendering is done outside this crate (pdfium, PDF.js, ...). The engine
//! only needs the viewport a page was rendered with and the page's text layer.

use crate::coords::Viewport;
use crate::error::ExtractionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One positioned span reported by a page's text layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    pub text: String,
    /// Glyph-space to PDF-space transform `[a b c d e f]`
    pub transform: [f64; 6],
    /// Advance width in PDF units
    pub width: f64,
    /// Nominal glyph-box height in PDF units
    pub height: f64,
    pub font_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    /// RGBA, row-major
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// An opaque white buffer of the given size
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![255; width as usize * height as usize * 4],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub page_number: u32,
    pub viewport: Viewport,
    pub pixels: PixelBuffer,
}

#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn render_page(
        &self,
        page_number: u32,
        zoom: f64,
    ) -> Result<RenderedPage, ExtractionError>;

    /// Text items of a page in content-stream order.
    ///
    /// Implementations must return the same order on every call for the same
    /// loaded document; run identity depends on it.
    async fn text_content(&self, page_number: u32) -> Result<Vec<TextItem>, ExtractionError>;
}
