//! Save-time document patcher
//!
//! Replays the edit ledger and the overlay store against a freshly parsed copy
//! of the original bytes. Edited runs are erased with an opaque white cover and
//! redrawn in the substitute font; overlays are converted from viewport space
//! with the zoom in effect at save time.

use crate::color::Rgb;
use crate::config::PatchConfig;
use crate::coords::{glyph_metrics, length_to_pdf, to_pdf, PdfPoint, PdfRect};
use crate::error::PatchError;
use crate::fonts::{FontMetrics, StandardFont};
use crate::ledger::LedgerEntry;
use crate::model::DocumentModel;
use crate::overlay::Overlay;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct PatchOptions {
    /// Margin around each cover rectangle, in PDF units
    pub cover_padding: f64,
    pub substitute_font: StandardFont,
}

impl Default for PatchOptions {
    fn default() -> Self {
        (&PatchConfig::default()).into()
    }
}

impl From<&PatchConfig> for PatchOptions {
    fn from(config: &PatchConfig) -> Self {
        Self {
            cover_padding: config.cover_padding,
            substitute_font: config.substitute_font,
        }
    }
}

/// Rectangle that hides an edited run's original glyphs
pub fn cover_rect<F: FontMetrics + ?Sized>(entry: &LedgerEntry, font: &F, padding: f64) -> PdfRect {
    let metrics = glyph_metrics(entry.pdf_height, entry.pdf_font_size, font);
    PdfRect {
        x: entry.pdf_position.x - padding,
        y: entry.pdf_position.y - metrics.descent - padding,
        width: entry.pdf_width + 2.0 * padding,
        height: metrics.ascent + metrics.descent + 2.0 * padding,
    }
}

/// Where an overlay lands in PDF space
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlacement {
    pub baseline: PdfPoint,
    pub font_size: f64,
    pub background: Option<PdfRect>,
}

/// Convert an overlay from viewport space with the save-time zoom.
///
/// The overlay's screen position is the top-left of its label, so the baseline
/// sits one font size below it. The background's top edge is level with the
/// label's top.
pub fn overlay_placement(overlay: &Overlay, page_height: f64, zoom: f64) -> OverlayPlacement {
    let top_left = to_pdf(overlay.screen_position, zoom, page_height);
    let font_size = length_to_pdf(overlay.font_size, zoom);
    let baseline = PdfPoint::new(top_left.x, top_left.y - font_size);

    let background = overlay.background_enabled.then(|| {
        let height = length_to_pdf(overlay.background_size.height, zoom);
        PdfRect {
            x: baseline.x,
            y: baseline.y + font_size - height,
            width: length_to_pdf(overlay.background_size.width, zoom),
            height,
        }
    });

    OverlayPlacement {
        baseline,
        font_size,
        background,
    }
}

fn check_zoom(zoom: f64) -> Result<(), PatchError> {
    if zoom.is_finite() && zoom > 0.0 {
        Ok(())
    } else {
        Err(PatchError::InvalidZoom(zoom))
    }
}

/// Apply ledger entries and overlays to a fresh copy of `original`.
///
/// Every referenced page is validated before anything is drawn, so a bad page
/// number fails without partial work. Within a page, ledger entries are drawn
/// before overlays. With nothing to apply the original bytes are returned
/// after they have been parsed successfully.
#[instrument(skip_all, fields(entries = entries.len(), overlays = overlays.len(), zoom = zoom))]
pub fn patch<M: DocumentModel>(
    original: &[u8],
    entries: &[LedgerEntry],
    overlays: &[Overlay],
    zoom: f64,
    options: &PatchOptions,
) -> Result<Vec<u8>, PatchError> {
    check_zoom(zoom)?;
    let mut doc = M::load(original)?;

    let pages: BTreeSet<u32> = entries
        .iter()
        .map(|e| e.page)
        .chain(overlays.iter().map(|o| o.page))
        .collect();
    for page in &pages {
        doc.check_page(*page)?;
    }

    if pages.is_empty() {
        debug!("nothing to apply, returning original bytes");
        return Ok(original.to_vec());
    }

    let font = doc.embed_standard_font(options.substitute_font)?;

    for page in pages {
        for entry in entries.iter().filter(|e| e.page == page) {
            let cover = cover_rect(entry, &font, options.cover_padding);
            doc.draw_rectangle(page, &cover, Rgb::WHITE)?;
            if !entry.new_text.is_empty() {
                doc.draw_text(
                    page,
                    &entry.new_text,
                    entry.pdf_position,
                    entry.pdf_font_size,
                    &font,
                    Rgb::BLACK,
                )?;
            }
        }

        let page_overlays: Vec<&Overlay> = overlays.iter().filter(|o| o.page == page).collect();
        if page_overlays.is_empty() {
            continue;
        }
        let page_height = doc.page_size(page)?.height;
        for overlay in page_overlays {
            let placement = overlay_placement(overlay, page_height, zoom);
            if let Some(background) = &placement.background {
                doc.draw_rectangle(page, background, Rgb::from_hex(&overlay.background_color))?;
            }
            if !overlay.text.is_empty() {
                doc.draw_text(
                    page,
                    &overlay.text,
                    placement.baseline,
                    placement.font_size,
                    &font,
                    Rgb::from_hex(&overlay.text_color),
                )?;
            }
        }
    }

    let bytes = doc.serialize()?;
    debug!(size = bytes.len(), "patched document serialized");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{Size, ViewportPoint};
    use crate::error::DocumentLoadError;
    use crate::extract::RunId;
    use crate::lopdf_model::LopdfDocument;
    use crate::overlay::OverlayStore;
    use crate::test_fixtures::{pdf_with_runs, FixtureRun};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    enum Drawn {
        Rect(u32, PdfRect, Rgb),
        Text(u32, String, PdfPoint, f64, Rgb),
    }

    /// Records drawing calls instead of producing a PDF
    struct Recorder {
        pages: u32,
        drawn: Vec<Drawn>,
    }

    thread_local! {
        static LAST: std::cell::RefCell<Vec<Drawn>> = const { std::cell::RefCell::new(Vec::new()) };
    }

    impl DocumentModel for Recorder {
        type Font = StandardFont;

        fn load(bytes: &[u8]) -> Result<Self, DocumentLoadError> {
            match bytes.first() {
                Some(pages) if *pages > 0 => Ok(Recorder {
                    pages: *pages as u32,
                    drawn: Vec::new(),
                }),
                _ => Err(DocumentLoadError::ParseError("empty".to_string())),
            }
        }

        fn page_count(&self) -> u32 {
            self.pages
        }

        fn page_size(&self, page: u32) -> Result<Size, PatchError> {
            self.check_page(page)?;
            Ok(Size::new(612.0, 792.0))
        }

        fn embed_standard_font(&mut self, font: StandardFont) -> Result<StandardFont, PatchError> {
            Ok(font)
        }

        fn draw_rectangle(&mut self, page: u32, rect: &PdfRect, fill: Rgb) -> Result<(), PatchError> {
            self.check_page(page)?;
            self.drawn.push(Drawn::Rect(page, *rect, fill));
            Ok(())
        }

        fn draw_text(
            &mut self,
            page: u32,
            text: &str,
            position: PdfPoint,
            size: f64,
            _font: &StandardFont,
            color: Rgb,
        ) -> Result<(), PatchError> {
            self.check_page(page)?;
            self.drawn
                .push(Drawn::Text(page, text.to_string(), position, size, color));
            Ok(())
        }

        fn serialize(self) -> Result<Vec<u8>, PatchError> {
            LAST.with(|last| *last.borrow_mut() = self.drawn);
            Ok(b"patched".to_vec())
        }
    }

    fn recorded() -> Vec<Drawn> {
        LAST.with(|last| last.borrow().clone())
    }

    fn entry(page: u32, index: usize, text: &str, x: f64, y: f64) -> LedgerEntry {
        LedgerEntry {
            run_id: RunId::new(page, index),
            page,
            new_text: text.to_string(),
            original_text: "original".to_string(),
            pdf_position: PdfPoint::new(x, y),
            pdf_font_size: 12.0,
            pdf_width: 70.0,
            pdf_height: 12.0,
        }
    }

    #[test]
    fn test_cover_rect_geometry() {
        let e = entry(1, 0, "Invoice #002", 50.0, 700.0);
        let rect = cover_rect(&e, &StandardFont::Helvetica, 1.0);
        let descent = 0.207 * 12.0;
        assert!((rect.x - 49.0).abs() < 1e-9);
        assert!((rect.y - (700.0 - descent - 1.0)).abs() < 1e-9);
        assert!((rect.width - 72.0).abs() < 1e-9);
        assert!((rect.height - (12.0 + descent + 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_overlay_placement_at_zoom() {
        let mut store = OverlayStore::new();
        let overlay = store.create(ViewportPoint::new(100.0, 200.0), 1).clone();
        let placement = overlay_placement(&overlay, 792.0, 1.5);
        assert!((placement.baseline.x - 66.6667).abs() < 1e-3);
        assert!((placement.baseline.y - 648.0).abs() < 1e-9);
        assert!((placement.font_size - 10.6667).abs() < 1e-3);

        let bg = placement.background.unwrap();
        assert!((bg.top() - (placement.baseline.y + placement.font_size)).abs() < 1e-9);
        assert!((bg.width - 80.0).abs() < 1e-9);
        assert!((bg.height - 22.0 / 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_entries_drawn_before_overlays() {
        let mut store = OverlayStore::new();
        store.create(ViewportPoint::new(10.0, 10.0), 1);
        let entries = vec![entry(1, 0, "A", 50.0, 700.0)];

        patch::<Recorder>(&[2], &entries, store.overlays(), 1.0, &PatchOptions::default()).unwrap();
        let drawn = recorded();
        assert_eq!(drawn.len(), 4);
        assert!(matches!(&drawn[0], Drawn::Rect(1, _, c) if *c == Rgb::WHITE));
        assert!(matches!(&drawn[1], Drawn::Text(1, t, _, _, c) if t == "A" && *c == Rgb::BLACK));
        assert!(matches!(&drawn[2], Drawn::Rect(1, _, _)));
        assert!(matches!(&drawn[3], Drawn::Text(1, t, _, _, _) if t == "New text"));
    }

    #[test]
    fn test_pages_are_processed_in_order() {
        let entries = vec![entry(2, 0, "second", 10.0, 10.0), entry(1, 4, "first", 10.0, 10.0)];
        patch::<Recorder>(&[2], &entries, &[], 1.0, &PatchOptions::default()).unwrap();
        let pages: Vec<u32> = recorded()
            .iter()
            .map(|d| match d {
                Drawn::Rect(p, ..) | Drawn::Text(p, ..) => *p,
            })
            .collect();
        assert_eq!(pages, vec![1, 1, 2, 2]);
    }

    #[test]
    fn test_empty_replacement_only_covers() {
        let entries = vec![entry(1, 0, "", 10.0, 10.0)];
        patch::<Recorder>(&[1], &entries, &[], 1.0, &PatchOptions::default()).unwrap();
        let drawn = recorded();
        assert_eq!(drawn.len(), 1);
        assert!(matches!(drawn[0], Drawn::Rect(..)));
    }

    #[test]
    fn test_overlay_without_background() {
        let mut store = OverlayStore::new();
        let id = store.create(ViewportPoint::new(10.0, 10.0), 1).id;
        store.update(
            id,
            crate::overlay::OverlayUpdate {
                background_enabled: Some(false),
                text_color: Some("#FF0000".to_string()),
                ..Default::default()
            },
        );
        patch::<Recorder>(&[1], &[], store.overlays(), 1.0, &PatchOptions::default()).unwrap();
        let drawn = recorded();
        assert_eq!(drawn.len(), 1);
        assert!(matches!(&drawn[0], Drawn::Text(_, _, _, _, c) if *c == Rgb::from_hex("#FF0000")));
    }

    #[test]
    fn test_page_out_of_range_fails_fast() {
        let entries = vec![entry(1, 0, "ok", 10.0, 10.0), entry(3, 0, "bad", 10.0, 10.0)];
        let err = patch::<Recorder>(&[2], &entries, &[], 1.0, &PatchOptions::default()).unwrap_err();
        assert_eq!(
            err,
            PatchError::PageOutOfRange {
                page: 3,
                page_count: 2
            }
        );
    }

    #[test]
    fn test_invalid_zoom() {
        for zoom in [0.0, -1.0, f64::NAN] {
            let err = patch::<Recorder>(&[1], &[], &[], zoom, &PatchOptions::default()).unwrap_err();
            assert!(matches!(err, PatchError::InvalidZoom(_)));
        }
    }

    #[test]
    fn test_nothing_to_apply_returns_original() {
        let pdf = pdf_with_runs(&[FixtureRun::new("Same", 10.0, 10.0, 10.0)]);
        let out = patch::<LopdfDocument>(&pdf, &[], &[], 1.0, &PatchOptions::default()).unwrap();
        assert_eq!(out, pdf);
    }

    #[test]
    fn test_malformed_bytes_fail_at_parse() {
        let err = patch::<LopdfDocument>(
            b"%PDF-garbage",
            &[entry(1, 0, "x", 0.0, 0.0)],
            &[],
            1.0,
            &PatchOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PatchError::Load(DocumentLoadError::ParseError(_))));

        // still parsed when there is nothing to apply
        assert!(patch::<LopdfDocument>(b"junk", &[], &[], 1.0, &PatchOptions::default()).is_err());
    }

    #[test]
    fn test_courier_substitute_changes_descent() {
        let e = entry(1, 0, "x", 0.0, 100.0);
        let options = PatchOptions::from(&PatchConfig {
            cover_padding: 0.0,
            substitute_font: StandardFont::Courier,
        });
        let rect = cover_rect(&e, &options.substitute_font, options.cover_padding);
        assert!((rect.y - (100.0 - 0.157 * 12.0)).abs() < 1e-9);
    }
}
