//! Hit testing: find the topmost item under a scene point.
//!
//! Stacking order, topmost first:
//! 1. blocks, last added first; a block's connectable ports before its body
//!    (port handles stick out past the block edge)
//! 2. split markers
//! 3. connection curves
//!
//! Label-only ports have no handle and are never hit; a click on one lands
//! on the block body.

use kurbo::{Point, Rect};
use nv_core::path::nearest_on_path;
use nv_core::{BlockKey, ConnectionKey, NodeGraph, PortKey, SplitKey};

/// What a point landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Port(PortKey),
    Block(BlockKey),
    Split(SplitKey),
    Connection(ConnectionKey),
}

impl Hit {
    pub fn port(self) -> Option<PortKey> {
        match self {
            Hit::Port(p) => Some(p),
            _ => None,
        }
    }
}

/// Point query against a graph's geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTester {
    /// Slack around every shape, in scene units.
    pub tolerance: f64,
    /// Drawn width of connection curves.
    pub stroke_width: f64,
    /// Radius of a split marker.
    pub split_radius: f64,
}

impl Default for HitTester {
    fn default() -> Self {
        Self {
            tolerance: 1.0,
            stroke_width: 2.0,
            split_radius: 4.0,
        }
    }
}

impl HitTester {
    /// Topmost item at `p`, if any.
    pub fn query(&self, graph: &NodeGraph, p: Point) -> Option<Hit> {
        let hit = self
            .query_blocks(graph, p)
            .or_else(|| self.query_splits(graph, p))
            .or_else(|| self.query_connections(graph, p));
        log::trace!("hit test ({}, {}) -> {hit:?}", p.x, p.y);
        hit
    }

    /// Every connectable port under `p`, topmost first.
    pub fn ports_at(&self, graph: &NodeGraph, p: Point) -> Vec<PortKey> {
        graph
            .block_keys()
            .iter()
            .rev()
            .flat_map(|&b| graph.ports_of(b).collect::<Vec<_>>())
            .filter(|(key, port)| !port.flags().is_label() && self.port_contains(graph, *key, p))
            .map(|(key, _)| key)
            .collect()
    }

    fn query_blocks(&self, graph: &NodeGraph, p: Point) -> Option<Hit> {
        for &key in graph.block_keys().iter().rev() {
            // Later ports are stacked above earlier ones
            let ports: Vec<_> = graph.ports_of(key).collect();
            for (port_key, port) in ports.into_iter().rev() {
                if !port.flags().is_label() && self.port_contains(graph, port_key, p) {
                    return Some(Hit::Port(port_key));
                }
            }
            if let Some(block) = graph.block(key)
                && block.bounds().inflate(self.tolerance, self.tolerance).contains(p)
            {
                return Some(Hit::Block(key));
            }
        }
        None
    }

    fn query_splits(&self, graph: &NodeGraph, p: Point) -> Option<Hit> {
        for &conn in graph.connection_keys().iter().rev() {
            let Some(c) = graph.connection(conn) else {
                continue;
            };
            for &split in c.splits().iter().rev() {
                if graph
                    .split(split)
                    .is_some_and(|s| self.pick_area_touches(p, s.position(), self.split_radius))
                {
                    return Some(Hit::Split(split));
                }
            }
        }
        None
    }

    fn query_connections(&self, graph: &NodeGraph, p: Point) -> Option<Hit> {
        let reach = self.tolerance + self.stroke_width / 2.0;
        graph
            .connections()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .find(|(_, c)| nearest_on_path(c.path(), p).is_some_and(|h| h.distance <= reach))
            .map(|(key, _)| Hit::Connection(key))
    }

    fn port_contains(&self, graph: &NodeGraph, port: PortKey, p: Point) -> bool {
        let radius = graph.config().port_radius;
        graph
            .port_scene_position(port)
            .is_some_and(|centre| self.pick_area_touches(p, centre, radius))
    }

    /// Whether the square pick area around `p` overlaps the circle at `centre`.
    fn pick_area_touches(&self, p: Point, centre: Point, radius: f64) -> bool {
        let area = Rect::from_center_size(p, (2.0 * self.tolerance, 2.0 * self.tolerance));
        let nearest = Point::new(
            centre.x.clamp(area.x0, area.x1),
            centre.y.clamp(area.y0, area.y1),
        );
        nearest.distance(centre) <= radius
    }
}
