//! Editor configuration
//!
//! Settings for zoom limits, hit-testing, replacement geometry and default
//! colors. Configuration can be loaded from a JSON file, environment
//! variables, or created programmatically.

use crate::text::Rgb;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Tunable parameters of the editing core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Smallest allowed zoom factor
    pub zoom_min: f32,
    /// Largest allowed zoom factor
    pub zoom_max: f32,
    /// Zoom increment for zoom in/out
    pub zoom_step: f32,
    /// Zoom applied when a document is opened
    pub zoom_default: f32,
    /// Half-size of the square probe used for word hit-testing, in points
    pub probe_radius: f32,
    /// Horizontal padding added to replacement rectangles
    pub padding_x: f32,
    /// Vertical padding added to replacement rectangles
    pub padding_y: f32,
    /// Replacement text longer than this goes into a free-text box
    pub long_text_threshold: usize,
    /// Average glyph width as a fraction of the font size
    pub char_width_ratio: f32,
    /// Line height as a multiple of the font size when none is known
    pub line_height_factor: f32,
    /// Font size for newly inserted text
    pub default_font_size: f32,
    /// Color of highlight annotations
    pub highlight_color: Rgb,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            zoom_min: 0.5,
            zoom_max: 3.0,
            zoom_step: 0.25,
            zoom_default: 1.0,
            probe_radius: 5.0,
            padding_x: 4.0,
            padding_y: 2.0,
            long_text_threshold: 50,
            char_width_ratio: 0.6,
            line_height_factor: 1.2,
            default_font_size: 12.0,
            highlight_color: Rgb::YELLOW,
        }
    }
}

impl EditorConfig {
    /// Sets the zoom range and step.
    pub fn with_zoom_range(mut self, min: f32, max: f32, step: f32) -> Self {
        self.zoom_min = min;
        self.zoom_max = max;
        self.zoom_step = step;
        self
    }

    /// Sets the initial zoom.
    pub fn with_default_zoom(mut self, zoom: f32) -> Self {
        self.zoom_default = zoom;
        self
    }

    /// Sets the word probe half-size.
    pub fn with_probe_radius(mut self, radius: f32) -> Self {
        self.probe_radius = radius;
        self
    }

    /// Sets the replacement rectangle padding.
    pub fn with_padding(mut self, x: f32, y: f32) -> Self {
        self.padding_x = x;
        self.padding_y = y;
        self
    }

    /// Sets the free-text threshold.
    pub fn with_long_text_threshold(mut self, chars: usize) -> Self {
        self.long_text_threshold = chars;
        self
    }

    /// Sets the highlight color.
    pub fn with_highlight_color(mut self, color: Rgb) -> Self {
        self.highlight_color = color;
        self
    }

    /// Clamp a zoom factor into the configured range
    ///
    /// An inverted range resolves to `zoom_min`.
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.min(self.zoom_max).max(self.zoom_min)
    }

    /// Returns the default configuration file location.
    ///
    /// `~/.pdf_retouch/config.json`, or `./config.json` when no home
    /// directory is available.
    pub fn default_config_path() -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            home.join(".pdf_retouch").join("config.json")
        } else {
            PathBuf::from("config.json")
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PDF_RETOUCH_ZOOM_MIN`, `PDF_RETOUCH_ZOOM_MAX`, `PDF_RETOUCH_ZOOM_STEP`
    /// - `PDF_RETOUCH_PROBE_RADIUS`: word probe half-size in points (default: 5)
    /// - `PDF_RETOUCH_LONG_TEXT`: free-text threshold in chars (default: 50)
    /// - `PDF_RETOUCH_HIGHLIGHT`: named highlight color (default: yellow)
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(val) = env_f32("PDF_RETOUCH_ZOOM_MIN")? {
            config.zoom_min = val;
        }
        if let Some(val) = env_f32("PDF_RETOUCH_ZOOM_MAX")? {
            config.zoom_max = val;
        }
        if let Some(val) = env_f32("PDF_RETOUCH_ZOOM_STEP")? {
            config.zoom_step = val;
        }
        if let Some(val) = env_f32("PDF_RETOUCH_PROBE_RADIUS")? {
            config.probe_radius = val;
        }

        if let Ok(val) = std::env::var("PDF_RETOUCH_LONG_TEXT") {
            config.long_text_threshold = val
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue("PDF_RETOUCH_LONG_TEXT".to_string()))?;
        }

        if let Ok(val) = std::env::var("PDF_RETOUCH_HIGHLIGHT") {
            config.highlight_color = Rgb::named(&val)
                .ok_or_else(|| ConfigError::InvalidValue("PDF_RETOUCH_HIGHLIGHT".to_string()))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a JSON file, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Checks that every value is usable.
    ///
    /// Called by `from_env` and `from_file`; builder chains should call it
    /// before handing the configuration to a session.
    ///
    /// # Errors
    /// Returns the name of the first invalid key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str| Err(ConfigError::InvalidValue(key.to_string()));

        if !(self.zoom_min > 0.0 && self.zoom_min <= self.zoom_max) {
            return invalid("zoom_min");
        }
        if !self.zoom_max.is_finite() {
            return invalid("zoom_max");
        }
        if !(self.zoom_step > 0.0) {
            return invalid("zoom_step");
        }
        if !(self.zoom_default >= self.zoom_min && self.zoom_default <= self.zoom_max) {
            return invalid("zoom_default");
        }
        if !(self.probe_radius >= 0.0) {
            return invalid("probe_radius");
        }
        if !(self.char_width_ratio > 0.0) {
            return invalid("char_width_ratio");
        }
        if !(self.line_height_factor > 0.0) {
            return invalid("line_height_factor");
        }
        if !(self.default_font_size > 0.0) {
            return invalid("default_font_size");
        }
        Ok(())
    }
}

fn env_f32(name: &str) -> Result<Option<f32>, ConfigError> {
    match std::env::var(name) {
        Ok(val) => val
            .parse::<f32>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(None),
    }
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}
