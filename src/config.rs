//! Settings for the painting shell, loaded from `dabble.toml`.
//!
//! Every section is optional; missing keys fall back to defaults and
//! `DABBLE_*` environment variables override whatever the file says.

use crate::error::Error;
use crate::pixels::Rgb;
use serde::Deserialize;
use std::path::Path;

/// Default config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "dabble.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PaintConfig {
    pub canvas: CanvasConfig,
    pub window: WindowConfig,
    pub brush: BrushConfig,
    pub logging: LoggingConfig,
}

/// Canvas size and the paper colour shown under transparent pixels
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: usize,
    pub height: usize,
    pub paper: Rgb,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
}

/// Brush selected at startup
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    /// Catalog preset name (case-insensitive)
    pub preset: String,
    pub color: Rgb,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Debug-level logs; `RUST_LOG` is honoured only when this is on
    pub debug: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self { width: 1024, height: 768, paper: Rgb::WHITE }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: "Dabble".to_string() }
    }
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self { preset: "Pencil".to_string(), color: Rgb::BLACK }
    }
}

impl PaintConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.as_ref().display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|e| Error::Config(format!("failed to parse config: {e}")))
    }

    /// Load `dabble.toml` from the current directory, or defaults if it is
    /// missing or unreadable.
    pub fn load_or_default() -> Self {
        Self::load_from_file(CONFIG_FILE).unwrap_or_default()
    }

    /// Environment variables take precedence over file values.
    pub fn merge_with_env(&mut self) {
        self.merge_from(|key| std::env::var(key).ok());
    }

    fn merge_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(w) = var("DABBLE_WIDTH").and_then(|v| v.parse().ok()) {
            self.canvas.width = w;
        }
        if let Some(h) = var("DABBLE_HEIGHT").and_then(|v| v.parse().ok()) {
            self.canvas.height = h;
        }
        if let Some(title) = var("DABBLE_TITLE") {
            self.window.title = title;
        }
        if let Some(preset) = var("DABBLE_BRUSH") {
            self.brush.preset = preset;
        }
        if let Some(val) = var("DABBLE_DEBUG") {
            self.logging.debug = val == "1" || val.eq_ignore_ascii_case("true");
        }
    }

    /// Canvas dimensions with zero sizes bumped to one pixel.
    pub fn canvas_size(&self) -> (usize, usize) {
        (self.canvas.width.max(1), self.canvas.height.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = PaintConfig::from_toml("").unwrap();
        assert_eq!(cfg, PaintConfig::default());
        assert_eq!(cfg.canvas_size(), (1024, 768));
        assert_eq!(cfg.brush.preset, "Pencil");
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let cfg = PaintConfig::from_toml(
            r#"
            [canvas]
            width = 300
            paper = { r = 250, g = 240, b = 230 }

            [brush]
            preset = "Marker"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.canvas.width, 300);
        assert_eq!(cfg.canvas.height, 768);
        assert_eq!(cfg.canvas.paper, Rgb::new(250, 240, 230));
        assert_eq!(cfg.brush.preset, "Marker");
        assert_eq!(cfg.brush.color, Rgb::BLACK);
        assert_eq!(cfg.window.title, "Dabble");
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = PaintConfig::from_toml("[canvas\nwidth = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = PaintConfig::load_from_file("definitely/not/here/dabble.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("DABBLE_WIDTH", "640"),
            ("DABBLE_HEIGHT", "not-a-number"),
            ("DABBLE_BRUSH", "Ink Pen"),
            ("DABBLE_DEBUG", "TRUE"),
        ]
        .into_iter()
        .collect();
        let mut cfg = PaintConfig::default();
        cfg.merge_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.canvas.width, 640);
        assert_eq!(cfg.canvas.height, 768);
        assert_eq!(cfg.brush.preset, "Ink Pen");
        assert!(cfg.logging.debug);
    }

    #[test]
    fn zero_canvas_size_is_bumped() {
        let mut cfg = PaintConfig::default();
        cfg.canvas.width = 0;
        assert_eq!(cfg.canvas_size(), (1, 768));
    }
}
