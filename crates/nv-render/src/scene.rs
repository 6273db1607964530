//! Graph → display list.
//!
//! Emits every visible primitive in paint order (first = bottom):
//! connection curves, split markers, then each block followed by its port
//! handles and labels. The host walks the list and paints each item with
//! its own toolkit.

use kurbo::{BezPath, Circle, Point, RoundedRect};
use nv_core::{BlockKey, ConnectionKey, Direction, LabelStyle, NodeGraph, PortKey, SplitKey};

/// Stroke and marker sizes that are not part of the graph's layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneStyle {
    pub connection_stroke_width: f64,
    pub split_radius: f64,
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self {
            connection_stroke_width: 2.0,
            split_radius: 4.0,
        }
    }
}

/// One drawing primitive, in scene coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayItem {
    Connection {
        key: ConnectionKey,
        path: BezPath,
        stroke_width: f64,
        /// Still being drawn by the user.
        pending: bool,
    },
    SplitMarker {
        key: SplitKey,
        shape: Circle,
    },
    Block {
        key: BlockKey,
        shape: RoundedRect,
    },
    PortHandle {
        key: PortKey,
        shape: Circle,
    },
    Label {
        port: PortKey,
        text: String,
        /// Top-left corner of the text box.
        origin: Point,
        width: f64,
        style: LabelStyle,
    },
}

/// Build the paint-ordered display list for `graph`.
pub fn display_list(graph: &NodeGraph, style: &SceneStyle) -> Vec<DisplayItem> {
    let mut items = Vec::new();
    let mut markers = Vec::new();

    for (key, conn) in graph.connections() {
        let pending = !conn.is_complete();
        let via = graph.split_positions(key);
        // A pending connection tracks the pointer; its cached path may be stale
        let path = if pending {
            nv_core::path::connection_path(conn.start(), &via, conn.end())
        } else {
            conn.path().clone()
        };
        items.push(DisplayItem::Connection {
            key,
            path,
            stroke_width: style.connection_stroke_width,
            pending,
        });
        markers.extend(conn.splits().iter().zip(via).map(|(&split, at)| DisplayItem::SplitMarker {
            key: split,
            shape: Circle::new(at, style.split_radius),
        }));
    }
    items.append(&mut markers);

    let cfg = graph.config();
    let metrics = graph.metrics();
    let text_height = metrics.line_height();
    for (key, block) in graph.blocks() {
        items.push(DisplayItem::Block {
            key,
            shape: block.bounds().to_rounded_rect(cfg.corner_radius),
        });

        for (port_key, port) in graph.ports_of(key) {
            let Some(centre) = graph.port_scene_position(port_key) else {
                continue;
            };
            if !port.flags().is_label() {
                items.push(DisplayItem::PortHandle {
                    key: port_key,
                    shape: Circle::new(centre, cfg.port_radius),
                });
            }

            // Labels sit inside the block, beside the handle
            let width = metrics.text_width(port.name());
            let x = match port.direction() {
                Direction::Output => centre.x - cfg.port_radius - cfg.label_margin - width,
                Direction::Input => centre.x + cfg.port_radius + cfg.label_margin,
            };
            items.push(DisplayItem::Label {
                port: port_key,
                text: port.name().to_owned(),
                origin: Point::new(x, centre.y - text_height / 2.0),
                width,
                style: port.flags().label_style(),
            });
        }
    }

    log::trace!("display list: {} items", items.len());
    items
}
