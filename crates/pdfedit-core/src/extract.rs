//! Text run extraction
//!
//! Turns a page's text items into positioned, editable runs. A run's identity
//! is `(page, source index)` where the index counts every item the text layer
//! reported, including blank ones that are filtered out here. That keeps ids
//! stable across zoom changes and repeated visits to the same page.

use crate::coords::{
    font_size_from_transform, length_to_viewport, origin_from_transform, PdfPoint, Size,
    Viewport, ViewportPoint, ViewportRect,
};
use crate::error::ExtractionError;
use crate::ledger::EditLedger;
use crate::rasterizer::{Rasterizer, RenderedPage, TextItem};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Stable identity of a text run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId {
    pub page: u32,
    pub index: usize,
}

impl RunId {
    pub fn new(page: u32, index: usize) -> Self {
        Self { page, index }
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.page, self.index)
    }
}

impl FromStr for RunId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (page, index) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid run id: {s}"))?;
        let page = page
            .parse()
            .map_err(|_| format!("invalid page in run id: {s}"))?;
        let index = index
            .parse()
            .map_err(|_| format!("invalid index in run id: {s}"))?;
        Ok(RunId { page, index })
    }
}

/// A positioned piece of pre-existing page text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub id: RunId,
    pub original_text: String,
    pub current_text: String,
    pub font_name: String,
    /// Baseline origin
    pub pdf_position: PdfPoint,
    pub pdf_font_size: f64,
    pub pdf_width: f64,
    pub pdf_height: f64,
    /// Baseline origin in viewport space
    pub viewport_position: ViewportPoint,
    pub viewport_size: Size,
    pub is_edited: bool,
}

impl TextRun {
    fn from_item(id: RunId, item: &TextItem, viewport: &Viewport) -> Self {
        let mut run = Self {
            id,
            original_text: item.text.clone(),
            current_text: item.text.clone(),
            font_name: item.font_name.clone(),
            pdf_position: origin_from_transform(&item.transform),
            pdf_font_size: font_size_from_transform(&item.transform),
            pdf_width: item.width,
            pdf_height: item.height,
            viewport_position: ViewportPoint::default(),
            viewport_size: Size::default(),
            is_edited: false,
        };
        run.project(viewport);
        run
    }

    /// Recompute the viewport-space fields for `viewport`
    pub fn project(&mut self, viewport: &Viewport) {
        self.viewport_position = viewport.to_viewport(self.pdf_position);
        self.viewport_size = Size::new(
            length_to_viewport(self.pdf_width, viewport.zoom),
            length_to_viewport(self.pdf_height.max(self.pdf_font_size), viewport.zoom),
        );
    }

    pub fn page(&self) -> u32 {
        self.id.page
    }

    /// Displayed box: spans up from the baseline by the displayed height
    pub fn viewport_bounds(&self) -> ViewportRect {
        ViewportRect {
            x: self.viewport_position.x,
            y: self.viewport_position.y - self.viewport_size.height,
            width: self.viewport_size.width,
            height: self.viewport_size.height,
        }
    }

    pub fn contains(&self, point: ViewportPoint) -> bool {
        self.viewport_bounds().contains(point)
    }
}

/// Build the runs of `page` from its text items, in source order.
///
/// Blank items produce no run but still consume an index. Runs with a ledger
/// entry show the ledger's text.
pub fn extract_runs(
    page: u32,
    items: &[TextItem],
    viewport: &Viewport,
    ledger: &EditLedger,
) -> Vec<TextRun> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.text.trim().is_empty())
        .map(|(index, item)| {
            let mut run = TextRun::from_item(RunId::new(page, index), item, viewport);
            if let Some(entry) = ledger.get(&run.id) {
                run.current_text = entry.new_text.clone();
                run.is_edited = true;
            }
            run
        })
        .collect()
}

/// Everything the rasterizer produced for one page request
#[derive(Debug, Clone, PartialEq)]
pub struct PageFetch {
    pub rendered: RenderedPage,
    pub items: Vec<TextItem>,
}

/// Render a page and read its text layer
#[instrument(skip(rasterizer))]
pub async fn fetch_page<R: Rasterizer + ?Sized>(
    rasterizer: &R,
    page: u32,
    zoom: f64,
) -> Result<PageFetch, ExtractionError> {
    let rendered = rasterizer.render_page(page, zoom).await?;
    let items = rasterizer.text_content(page).await?;
    debug!(page, items = items.len(), "page fetched");
    Ok(PageFetch { rendered, items })
}


#[cfg(test)]
mod proptests {
    use super::tests::item;
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn identity_is_stable_across_zoom(
            texts in prop::collection::vec(prop_oneof!["[a-z]{1,8}", " {0,3}"], 0..12),
            zoom_a in 0.25f64..4.0,
            zoom_b in 0.25f64..4.0,
        ) {
            let items: Vec<TextItem> = texts
                .iter()
                .enumerate()
                .map(|(i, t)| item(t, 40.0, 700.0 - i as f64 * 14.0, 11.0))
                .collect();
            let ledger = EditLedger::new();
            let a = extract_runs(2, &items, &Viewport::new(zoom_a, 612.0, 792.0), &ledger);
            let b = extract_runs(2, &items, &Viewport::new(zoom_b, 612.0, 792.0), &ledger);

            prop_assert_eq!(a.len(), b.len());
            for (ra, rb) in a.iter().zip(b.iter()) {
                prop_assert_eq!(ra.id, rb.id);
                prop_assert_eq!(&ra.original_text, &rb.original_text);
                prop_assert_eq!(ra.pdf_position, rb.pdf_position);
                prop_assert!(!ra.original_text.trim().is_empty());
            }
        }
    }
}
