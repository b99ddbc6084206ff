//! Editor configuration
//!
//! TOML-based configuration for the patcher, the defaults given to freshly
//! created overlays, and the viewer's initial zoom. Every section and field is
//! optional; missing values fall back to the built-in defaults.

use crate::fonts::StandardFont;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub patch: PatchConfig,
    #[serde(default)]
    pub overlay: OverlayDefaults,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

impl EditorConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed,
    /// or a value fails [`EditorConfig::validate`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pdfedit_core::config::EditorConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = EditorConfig::from_file("editor.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use pdfedit_core::config::EditorConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let toml = r#"
    ///     [patch]
    ///     cover_padding = 1.5
    ///     substitute_font = "courier"
    /// "#;
    /// let config = EditorConfig::from_str(toml)?;
    /// assert_eq!(config.patch.cover_padding, 1.5);
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: EditorConfig =
            toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.patch.cover_padding >= 0.0) {
            anyhow::bail!(
                "cover_padding must be >= 0 (got {})",
                self.patch.cover_padding
            );
        }
        if !(self.overlay.font_size > 0.0) {
            anyhow::bail!(
                "overlay font_size must be > 0 (got {})",
                self.overlay.font_size
            );
        }
        if self.overlay.background_width < 0.0 || self.overlay.background_height < 0.0 {
            anyhow::bail!("overlay background size must not be negative");
        }
        if !(self.viewer.initial_zoom > 0.0) {
            anyhow::bail!(
                "initial_zoom must be > 0 (got {})",
                self.viewer.initial_zoom
            );
        }
        Ok(())
    }
}

/// Save-time patching parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchConfig {
    /// Margin added around each erased run, in PDF units (default: 1.0)
    #[serde(default = "default_cover_padding")]
    pub cover_padding: f64,
    /// Font used to draw all edited and added text (default: helvetica)
    #[serde(default)]
    pub substitute_font: StandardFont,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            cover_padding: default_cover_padding(),
            substitute_font: StandardFont::default(),
        }
    }
}

fn default_cover_padding() -> f64 {
    1.0
}

/// Field values given to every newly created overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayDefaults {
    #[serde(default = "default_overlay_text")]
    pub text: String,
    /// Viewport pixels
    #[serde(default = "default_overlay_font_size")]
    pub font_size: f64,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default = "default_true")]
    pub background_enabled: bool,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default = "default_background_width")]
    pub background_width: f64,
    #[serde(default = "default_background_height")]
    pub background_height: f64,
}

impl Default for OverlayDefaults {
    fn default() -> Self {
        Self {
            text: default_overlay_text(),
            font_size: default_overlay_font_size(),
            text_color: default_text_color(),
            background_enabled: true,
            background_color: default_background_color(),
            background_width: default_background_width(),
            background_height: default_background_height(),
        }
    }
}

fn default_overlay_text() -> String {
    "New text".to_string()
}

fn default_overlay_font_size() -> f64 {
    16.0
}

fn default_text_color() -> String {
    "#000000".to_string()
}

fn default_true() -> bool {
    true
}

fn default_background_color() -> String {
    "#FFFFFF".to_string()
}

fn default_background_width() -> f64 {
    120.0
}

fn default_background_height() -> f64 {
    22.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Zoom applied when a document is first loaded (default: 1.0)
    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            initial_zoom: default_initial_zoom(),
        }
    }
}

fn default_initial_zoom() -> f64 {
    1.0
}
