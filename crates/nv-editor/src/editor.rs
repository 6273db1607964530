//! Editor session: one graph plus the machinery that edits it.

use crate::config::EditorConfig;
use crate::controller::{EventResponse, GestureState, InteractionController};
use crate::input::PointerEvent;
use kurbo::Point;
use nv_core::codec::{self, Summary};
use nv_core::{BlockKey, CodecError, FixedPitchMetrics, GraphChange, NodeGraph, TextMetrics};
use nv_render::{DisplayItem, HitTester, display_list};
use std::io::{BufRead, Write};

/// Owns the graph and routes pointer input through the gesture controller.
///
/// All mutation funnels through `&mut self`, so a host that drives the
/// editor from its UI thread gets the required single point of
/// serialisation for free.
#[derive(Debug)]
pub struct NodeEditor {
    graph: NodeGraph,
    controller: InteractionController,
    hit: HitTester,
    config: EditorConfig,
}

impl Default for NodeEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl NodeEditor {
    /// Session with fixed-pitch label metrics.
    pub fn new(config: EditorConfig) -> Self {
        Self::with_metrics(config, FixedPitchMetrics::default())
    }

    /// Session measuring labels with the host's font metrics.
    pub fn with_metrics(config: EditorConfig, metrics: impl TextMetrics + 'static) -> Self {
        Self {
            graph: NodeGraph::with_layout(config.layout.clone(), metrics),
            controller: InteractionController::new(),
            hit: config.hit_tester(),
            config,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    /// Direct graph access for host-side edits (adding ports, moving blocks).
    pub fn graph_mut(&mut self) -> &mut NodeGraph {
        &mut self.graph
    }

    pub fn gesture(&self) -> GestureState {
        self.controller.state()
    }

    pub fn add_block(&mut self, position: Point) -> BlockKey {
        self.graph.add_block(position)
    }

    pub fn handle_event(&mut self, event: &PointerEvent) -> EventResponse {
        self.controller.handle(&mut self.graph, &self.hit, event)
    }

    /// Abandon the current gesture (focus loss, Escape).
    pub fn cancel_gesture(&mut self) {
        self.controller.cancel(&mut self.graph);
    }

    pub fn save<W: Write>(&self, writer: W) -> Result<Summary, CodecError> {
        codec::save(&self.graph, writer)
    }

    /// Replace the graph with the stream's contents. Any gesture in
    /// progress is cancelled first.
    pub fn load<R: BufRead>(&mut self, reader: R) -> Result<Summary, CodecError> {
        self.controller.cancel(&mut self.graph);
        codec::load(&mut self.graph, reader)
    }

    pub fn take_changes(&mut self) -> Vec<GraphChange> {
        self.graph.take_changes()
    }

    pub fn display_list(&self) -> Vec<DisplayItem> {
        display_list(&self.graph, &self.config.scene_style())
    }
}
