//! Overlay store for newly added text labels
//!
//! Overlays live in viewport space (pixels at the zoom they were placed at)
//! until save, when the patcher converts them with the save-time zoom.

use crate::config::OverlayDefaults;
use crate::coords::{Size, ViewportPoint, ViewportRect};
use crate::fonts::FontMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayId(pub u64);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub id: OverlayId,
    pub page: u32,
    /// Top-left corner of the label in viewport space
    pub screen_position: ViewportPoint,
    pub text: String,
    /// Viewport pixels
    pub font_size: f64,
    pub text_color: String,
    pub background_enabled: bool,
    pub background_color: String,
    /// Viewport pixels
    pub background_size: Size,
}

impl Overlay {
    /// Clickable area. Without a background the label's width is measured in
    /// `font`, the font it will be drawn with.
    pub fn bounds(&self, font: &impl FontMetrics) -> ViewportRect {
        let (width, height) = if self.background_enabled {
            (
                self.background_size.width,
                self.background_size.height.max(self.font_size),
            )
        } else {
            (font.width_of_text(&self.text, self.font_size), self.font_size)
        };
        ViewportRect {
            x: self.screen_position.x,
            y: self.screen_position.y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: ViewportPoint, font: &impl FontMetrics) -> bool {
        self.bounds(font).contains(point)
    }
}

/// Partial update for [`OverlayStore::update`]; `None` leaves a field alone
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayUpdate {
    pub screen_position: Option<ViewportPoint>,
    pub text: Option<String>,
    pub font_size: Option<f64>,
    pub text_color: Option<String>,
    pub background_enabled: Option<bool>,
    pub background_color: Option<String>,
    pub background_size: Option<Size>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayStore {
    next_id: u64,
    overlays: Vec<Overlay>,
    #[serde(skip)]
    defaults: OverlayDefaults,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: OverlayDefaults) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    /// Add an overlay with the store's default styling
    pub fn create(&mut self, screen_position: ViewportPoint, page: u32) -> &Overlay {
        let id = OverlayId(self.next_id);
        self.next_id += 1;

        let d = &self.defaults;
        self.overlays.push(Overlay {
            id,
            page,
            screen_position,
            text: d.text.clone(),
            font_size: d.font_size,
            text_color: d.text_color.clone(),
            background_enabled: d.background_enabled,
            background_color: d.background_color.clone(),
            background_size: Size::new(d.background_width, d.background_height),
        });
        &self.overlays[self.overlays.len() - 1]
    }

    /// Apply the fields present in `update`. Returns false for an unknown id.
    pub fn update(&mut self, id: OverlayId, update: OverlayUpdate) -> bool {
        let Some(overlay) = self.overlays.iter_mut().find(|o| o.id == id) else {
            return false;
        };
        if let Some(position) = update.screen_position {
            overlay.screen_position = position;
        }
        if let Some(text) = update.text {
            overlay.text = text;
        }
        if let Some(size) = update.font_size {
            overlay.font_size = size;
        }
        if let Some(color) = update.text_color {
            overlay.text_color = color;
        }
        if let Some(enabled) = update.background_enabled {
            overlay.background_enabled = enabled;
        }
        if let Some(color) = update.background_color {
            overlay.background_color = color;
        }
        if let Some(size) = update.background_size {
            overlay.background_size = size;
        }
        true
    }

    pub fn delete(&mut self, id: OverlayId) -> bool {
        if let Some(pos) = self.overlays.iter().position(|o| o.id == id) {
            self.overlays.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id == id)
    }

    /// Overlays on `page` in creation order
    pub fn list_for_page(&self, page: u32) -> Vec<&Overlay> {
        self.overlays.iter().filter(|o| o.page == page).collect()
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Drop every overlay. Ids keep increasing.
    pub fn clear(&mut self) {
        self.overlays.clear();
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
