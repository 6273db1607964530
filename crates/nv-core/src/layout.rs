//! Block sizing and port placement.
//!
//! Blocks are centred on their position. Each added port grows the block to
//! fit its label and appends one text row; ports are then laid out top to
//! bottom in insertion order, outputs just outside the right edge and inputs
//! just outside the left edge.

use crate::model::Direction;
use kurbo::{Size, Vec2};
use serde::{Deserialize, Serialize};

/// Geometry constants for blocks and ports, in scene units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width of a block with no ports.
    pub default_block_width: f64,
    /// Height of a block with no ports.
    pub initial_block_height: f64,
    /// Space reserved beside the widest label.
    pub horizontal_margin: f64,
    /// Space above the first port row.
    pub vertical_margin: f64,
    /// Radius of a port's connection handle.
    pub port_radius: f64,
    /// Gap between a port handle and its label.
    pub label_margin: f64,
    pub corner_radius: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_block_width: 100.0,
            initial_block_height: 5.0,
            horizontal_margin: 20.0,
            vertical_margin: 5.0,
            port_radius: 5.0,
            label_margin: 2.0,
            corner_radius: 5.0,
        }
    }
}

impl LayoutConfig {
    /// Size of a freshly created block.
    pub fn empty_block_size(&self) -> Size {
        Size::new(self.default_block_width, self.initial_block_height)
    }
}

/// Font measurement, supplied by whoever draws the labels.
pub trait TextMetrics {
    /// Rendered width of `text` on one line.
    fn text_width(&self, text: &str) -> f64;
    /// Height of one text row.
    fn line_height(&self) -> f64;
}

/// Every character has the same advance. Good enough for tests and for
/// hosts that render labels in a monospace font.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPitchMetrics {
    pub char_width: f64,
    pub line_height: f64,
}

impl Default for FixedPitchMetrics {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            line_height: 16.0,
        }
    }
}

impl TextMetrics for FixedPitchMetrics {
    fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.char_width
    }

    fn line_height(&self) -> f64 {
        self.line_height
    }
}

/// Block size after appending a port whose label measures `label_width`.
///
/// Width only ever grows (to `label_width + horizontal_margin` when the label
/// does not fit); height grows by exactly one row.
pub fn grow_to_fit(size: Size, label_width: f64, row_height: f64, config: &LayoutConfig) -> Size {
    let width = if label_width > size.width - config.horizontal_margin {
        label_width + config.horizontal_margin
    } else {
        size.width
    };
    Size::new(width, size.height + row_height)
}

/// Offset of the port in `row` from its block's centre.
pub fn port_offset(
    size: Size,
    row: usize,
    direction: Direction,
    row_height: f64,
    config: &LayoutConfig,
) -> Vec2 {
    let top = -size.height / 2.0 + config.vertical_margin + config.port_radius;
    let y = top + row as f64 * row_height;
    let x = match direction {
        Direction::Output => size.width / 2.0 + config.port_radius,
        Direction::Input => -size.width / 2.0 - config.port_radius,
    };
    Vec2::new(x, y)
}
