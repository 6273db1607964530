//! Editor configuration.
//!
//! Everything is optional in the JSON form; missing keys take the defaults
//! below.
//!
//! ```json
//! { "hit_tolerance": 2.0, "layout": { "port_radius": 6.0 } }
//! ```

use nv_core::LayoutConfig;
use nv_render::{HitTester, SceneStyle};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid editor configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be a finite, non-negative number (got {value})")]
    OutOfRange { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Half-size of the square pick area around the pointer, in scene units.
    pub hit_tolerance: f64,
    pub connection_stroke_width: f64,
    pub split_radius: f64,
    pub layout: LayoutConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            hit_tolerance: 1.0,
            connection_stroke_width: 2.0,
            split_radius: 4.0,
            layout: LayoutConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("hit_tolerance", self.hit_tolerance),
            ("connection_stroke_width", self.connection_stroke_width),
            ("split_radius", self.split_radius),
            ("layout.port_radius", self.layout.port_radius),
            ("layout.horizontal_margin", self.layout.horizontal_margin),
            ("layout.vertical_margin", self.layout.vertical_margin),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        Ok(())
    }

    pub fn hit_tester(&self) -> HitTester {
        HitTester {
            tolerance: self.hit_tolerance,
            stroke_width: self.connection_stroke_width,
            split_radius: self.split_radius,
        }
    }

    pub fn scene_style(&self) -> SceneStyle {
        SceneStyle {
            connection_stroke_width: self.connection_stroke_width,
            split_radius: self.split_radius,
        }
    }
}
