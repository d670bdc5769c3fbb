//! Engine configuration.
//!
//! Every tunable of the canvas engine lives here so hosts can adjust
//! thresholds without touching the gesture code. Defaults match the
//! values the interaction model was designed around.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Tunables for the canvas engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cell size of the spatial grid, in world units.
    pub grid_cell_size: f64,
    /// Minimum item width in world units.
    pub min_item_width: f64,
    /// Minimum item height in world units.
    pub min_item_height: f64,
    /// Width of items created by double-clicking the canvas.
    pub default_item_width: f64,
    /// Height of items created by double-clicking the canvas.
    pub default_item_height: f64,
    /// Minimum camera zoom.
    pub min_zoom: f64,
    /// Maximum camera zoom.
    pub max_zoom: f64,
    /// Padding added around the visible world rectangle.
    pub visible_padding: f64,
    /// Camera translation (screen px) that triggers a visible-bounds recompute.
    pub visible_pan_threshold: f64,
    /// Zoom change that triggers a visible-bounds recompute.
    pub visible_zoom_threshold: f64,
    /// Pointer travel (screen px) separating a click from a drag.
    pub drag_threshold: f64,
    /// Maximum gap between two clicks of a double-click, in milliseconds.
    pub double_click_ms: u64,
    /// Inactivity window before pending text is committed, in milliseconds.
    pub commit_debounce_ms: u64,
    /// Entries kept on each of the undo and redo stacks.
    pub history_capacity: usize,
    /// Handle hit radius in screen px.
    pub handle_tolerance: f64,
    /// Connection hit distance in screen px.
    pub connection_tolerance: f64,
    /// Font size of new items.
    pub default_font_size: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_cell_size: 500.0,
            min_item_width: 120.0,
            min_item_height: 80.0,
            default_item_width: 240.0,
            default_item_height: 140.0,
            min_zoom: 0.1,
            max_zoom: 3.0,
            visible_padding: 500.0,
            visible_pan_threshold: 1.0,
            visible_zoom_threshold: 0.001,
            drag_threshold: 4.0,
            double_click_ms: 300,
            commit_debounce_ms: 500,
            history_capacity: 50,
            handle_tolerance: 10.0,
            connection_tolerance: 6.0,
            default_font_size: 16.0,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values describe a usable engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("grid_cell_size", self.grid_cell_size),
            ("min_item_width", self.min_item_width),
            ("min_item_height", self.min_item_height),
            ("default_item_width", self.default_item_width),
            ("default_item_height", self.default_item_height),
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom),
            ("default_font_size", self.default_font_size),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if self.max_zoom < self.min_zoom {
            return Err(ConfigError::Invalid(format!(
                "max_zoom ({}) is below min_zoom ({})",
                self.max_zoom, self.min_zoom
            )));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("history_capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Minimum item size as a kurbo size.
    pub fn min_item_size(&self) -> kurbo::Size {
        kurbo::Size::new(self.min_item_width, self.min_item_height)
    }

    /// Default size of newly created items.
    pub fn default_item_size(&self) -> kurbo::Size {
        kurbo::Size::new(self.default_item_width, self.default_item_height)
    }

    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }

    pub fn commit_debounce(&self) -> Duration {
        Duration::from_millis(self.commit_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.double_click_window(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{ "drag_threshold": 8.0 }"#).unwrap();
        assert!((config.drag_threshold - 8.0).abs() < f64::EPSILON);
        assert!((config.grid_cell_size - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_inverted_zoom() {
        let result = EngineConfig::from_json(r#"{ "min_zoom": 2.0, "max_zoom": 1.0 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let result = EngineConfig::from_json(r#"{ "history_capacity": 0 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(EngineConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
