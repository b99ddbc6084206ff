//! Coordinate transformation between PDF space and viewport space
//!
//! PDF space has its origin at the bottom-left of the page, y grows upward and
//! lengths are in points. Viewport space has its origin at the top-left, y grows
//! downward and every length is multiplied by the zoom factor.

use crate::fonts::FontMetrics;
use serde::{Deserialize, Serialize};

/// A point in PDF user space (points, bottom-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PdfPoint {
    pub x: f64,
    pub y: f64,
}

impl PdfPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point in viewport space (pixels at the current zoom, top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportPoint {
    pub x: f64,
    pub y: f64,
}

impl ViewportPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in PDF space, anchored at its bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PdfRect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    pub fn intersects(&self, other: &PdfRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }
}

/// Axis-aligned rectangle in viewport space, anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewportRect {
    pub fn contains(&self, point: ViewportPoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// Convert a PDF-space point to viewport space
pub fn to_viewport(point: PdfPoint, zoom: f64, page_height: f64) -> ViewportPoint {
    ViewportPoint {
        x: point.x * zoom,
        y: (page_height - point.y) * zoom,
    }
}

/// Convert a viewport-space point back to PDF space.
/// Exact inverse of [`to_viewport`] for the same zoom and page height.
pub fn to_pdf(point: ViewportPoint, zoom: f64, page_height: f64) -> PdfPoint {
    PdfPoint {
        x: point.x / zoom,
        y: page_height - point.y / zoom,
    }
}

pub fn length_to_viewport(length: f64, zoom: f64) -> f64 {
    length * zoom
}

pub fn length_to_pdf(length: f64, zoom: f64) -> f64 {
    length / zoom
}

/// Font size encoded in a glyph transform `[a b c d e f]`.
///
/// Only the magnitude of the first column is used; rotation and shear are
/// discarded, so boxes derived for rotated runs are axis-aligned approximations.
pub fn font_size_from_transform(transform: &[f64; 6]) -> f64 {
    transform[0].hypot(transform[1])
}

/// Baseline origin encoded in a glyph transform
pub fn origin_from_transform(transform: &[f64; 6]) -> PdfPoint {
    PdfPoint::new(transform[4], transform[5])
}

/// Vertical extent of a run around its baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    pub ascent: f64,
    pub descent: f64,
}

/// Estimate ascent and descent without the run's embedded font.
///
/// The ascent is the glyph-box height reported by the extractor. The descent
/// comes from the substitute font at the same nominal size.
pub fn glyph_metrics<F: FontMetrics + ?Sized>(
    reported_height: f64,
    font_size: f64,
    substitute: &F,
) -> GlyphMetrics {
    GlyphMetrics {
        ascent: reported_height,
        descent: substitute.total_height(font_size) - substitute.ascent_height(font_size),
    }
}

/// Geometry of one rendered page: its size in PDF units and the zoom it was
/// rasterized at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f64,
    pub page_width: f64,
    pub page_height: f64,
}

impl Viewport {
    pub fn new(zoom: f64, page_width: f64, page_height: f64) -> Self {
        Self {
            zoom,
            page_width,
            page_height,
        }
    }

    pub fn to_viewport(&self, point: PdfPoint) -> ViewportPoint {
        to_viewport(point, self.zoom, self.page_height)
    }

    pub fn to_pdf(&self, point: ViewportPoint) -> PdfPoint {
        to_pdf(point, self.zoom, self.page_height)
    }

    /// The affine transform `[a b c d e f]` mapping PDF space to viewport space
    pub fn transform(&self) -> [f64; 6] {
        [
            self.zoom,
            0.0,
            0.0,
            -self.zoom,
            0.0,
            self.page_height * self.zoom,
        ]
    }

    /// Raster dimensions in whole pixels
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.page_width * self.zoom).ceil().max(0.0) as u32,
            (self.page_height * self.zoom).ceil().max(0.0) as u32,
        )
    }
}
