//! Core graph data model.
//!
//! A `NodeGraph` owns four arenas (blocks, ports, connections and splits)
//! keyed by slotmap keys. Ownership always flows downwards (graph → block →
//! port, graph → connection → split); the upward references (`Port::block`,
//! `Port::attachments`, `Split::connection`) are plain keys used only for
//! navigation. Every deletion runs an explicit cascade so that no connection
//! ever outlives one of its ports.

use crate::error::{GraphError, Rejection};
use crate::id::{BlockKey, ConnectionKey, PortId, PortIdAllocator, PortKey, SplitKey};
use crate::layout::{self, FixedPitchMetrics, LayoutConfig, TextMetrics};
use crate::path;
use bitflags::bitflags;
use kurbo::{BezPath, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::fmt;

// ─── Ports ───────────────────────────────────────────────────────────────

/// Which way data flows through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn from_is_output(is_output: bool) -> Self {
        if is_output {
            Direction::Output
        } else {
            Direction::Input
        }
    }

    pub fn is_output(self) -> bool {
        self == Direction::Output
    }
}

bitflags! {
    /// Display flags of a port. They only change how the label is drawn.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PortFlags: u8 {
        /// The label shows the block's name (drawn bold).
        const NAME = 1 << 0;
        /// The label shows the block's type (drawn italic).
        const TYPE = 1 << 1;
    }
}

/// Font variant used for a port label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    Regular,
    Bold,
    Italic,
}

impl PortFlags {
    /// Label-only ports are block headers: they have no connection handle.
    pub fn is_label(self) -> bool {
        self.intersects(PortFlags::NAME | PortFlags::TYPE)
    }

    pub fn label_style(self) -> LabelStyle {
        if self.contains(PortFlags::TYPE) {
            LabelStyle::Italic
        } else if self.contains(PortFlags::NAME) {
            LabelStyle::Bold
        } else {
            LabelStyle::Regular
        }
    }
}

/// A named, directional attachment point on a block.
#[derive(Debug, Clone)]
pub struct Port {
    id: PortId,
    name: String,
    direction: Direction,
    flags: PortFlags,
    block: BlockKey,
    /// Position relative to the owning block's centre.
    offset: Vec2,
    attachments: SmallVec<[ConnectionKey; 4]>,
}

impl Port {
    pub fn id(&self) -> PortId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_output(&self) -> bool {
        self.direction.is_output()
    }

    pub fn flags(&self) -> PortFlags {
        self.flags
    }

    /// The owning block.
    pub fn block(&self) -> BlockKey {
        self.block
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Connections that reference this port, in attachment order.
    pub fn attachments(&self) -> &[ConnectionKey] {
        &self.attachments
    }
}

// ─── Blocks ──────────────────────────────────────────────────────────────

/// A rectangular node centred on `position`, owning an ordered list of ports.
#[derive(Debug, Clone)]
pub struct Block {
    position: Point,
    size: Size,
    ports: Vec<PortKey>,
}

impl Block {
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    /// Ports in insertion order. This is also save order and row order.
    pub fn ports(&self) -> &[PortKey] {
        &self.ports
    }

    /// Scene-space body rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::from_center_size(self.position, self.size)
    }
}

// ─── Connections ─────────────────────────────────────────────────────────

/// An edge between an output port and an input port.
///
/// Built in two phases: the source is set when a drag starts, the
/// destination when it ends on a valid port. Until then `destination` is
/// `None` and `end` follows the pointer.
#[derive(Debug, Clone)]
pub struct Connection {
    source: Option<PortKey>,
    destination: Option<PortKey>,
    start: Point,
    end: Point,
    splits: Vec<SplitKey>,
    path: BezPath,
}

impl Connection {
    fn new() -> Self {
        Self {
            source: None,
            destination: None,
            start: Point::ORIGIN,
            end: Point::ORIGIN,
            splits: Vec::new(),
            path: BezPath::new(),
        }
    }

    pub fn source(&self) -> Option<PortKey> {
        self.source
    }

    pub fn destination(&self) -> Option<PortKey> {
        self.destination
    }

    /// Both endpoints are set.
    pub fn is_complete(&self) -> bool {
        self.source.is_some() && self.destination.is_some()
    }

    /// Cached start point (scene coordinates).
    pub fn start(&self) -> Point {
        self.start
    }

    /// Cached end point (scene coordinates).
    pub fn end(&self) -> Point {
        self.end
    }

    /// Owned split points, ordered from start to end.
    pub fn splits(&self) -> &[SplitKey] {
        &self.splits
    }

    /// The curve as of the last `recompute_path`.
    pub fn path(&self) -> &BezPath {
        &self.path
    }

    /// The endpoint across from `port`, if `port` is one of the endpoints.
    pub fn opposite(&self, port: PortKey) -> Option<PortKey> {
        if self.source == Some(port) {
            self.destination
        } else if self.destination == Some(port) {
            self.source
        } else {
            None
        }
    }
}

/// A draggable control point along a connection.
#[derive(Debug, Clone, Copy)]
pub struct Split {
    position: Point,
    connection: ConnectionKey,
}

impl Split {
    pub fn position(&self) -> Point {
        self.position
    }

    /// The owning connection.
    pub fn connection(&self) -> ConnectionKey {
        self.connection
    }
}

// ─── Change log ──────────────────────────────────────────────────────────

/// One host-visible effect of a mutation. Drained with [`NodeGraph::take_changes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphChange {
    BlockAdded(BlockKey),
    BlockMoved(BlockKey),
    BlockResized(BlockKey),
    BlockRemoved(BlockKey),
    PortAdded(PortKey),
    PortUpdated(PortKey),
    PortRemoved(PortKey),
    ConnectionAdded(ConnectionKey),
    ConnectionUpdated(ConnectionKey),
    ConnectionRemoved(ConnectionKey),
    SplitAdded(SplitKey),
    SplitMoved(SplitKey),
    SplitRemoved(SplitKey),
    Cleared,
}

// ─── Node Graph ──────────────────────────────────────────────────────────

/// The scene contents: every block and every connection.
pub struct NodeGraph {
    config: LayoutConfig,
    metrics: Box<dyn TextMetrics>,

    blocks: SlotMap<BlockKey, Block>,
    /// Enumeration and stacking order (last = topmost).
    block_order: Vec<BlockKey>,
    ports: SlotMap<PortKey, Port>,
    connections: SlotMap<ConnectionKey, Connection>,
    connection_order: Vec<ConnectionKey>,
    splits: SlotMap<SplitKey, Split>,

    port_ids: PortIdAllocator,
    /// Index from logical identity to arena key.
    id_index: HashMap<PortId, PortKey>,

    changes: Vec<GraphChange>,
}

impl fmt::Debug for NodeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeGraph")
            .field("blocks", &self.block_order.len())
            .field("ports", &self.ports.len())
            .field("connections", &self.connection_order.len())
            .field("splits", &self.splits.len())
            .finish_non_exhaustive()
    }
}

impl Default for NodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeGraph {
    /// Empty graph with default geometry and fixed-pitch label metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::with_layout(LayoutConfig::default(), FixedPitchMetrics::default())
    }

    #[must_use]
    pub fn with_layout(config: LayoutConfig, metrics: impl TextMetrics + 'static) -> Self {
        Self {
            config,
            metrics: Box::new(metrics),
            blocks: SlotMap::with_key(),
            block_order: Vec::new(),
            ports: SlotMap::with_key(),
            connections: SlotMap::with_key(),
            connection_order: Vec::new(),
            splits: SlotMap::with_key(),
            port_ids: PortIdAllocator::default(),
            id_index: HashMap::new(),
            changes: Vec::new(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn metrics(&self) -> &dyn TextMetrics {
        self.metrics.as_ref()
    }

    // ─── Lookup & enumeration ────────────────────────────────────────────

    pub fn block(&self, key: BlockKey) -> Option<&Block> {
        self.blocks.get(key)
    }

    pub fn port(&self, key: PortKey) -> Option<&Port> {
        self.ports.get(key)
    }

    pub fn connection(&self, key: ConnectionKey) -> Option<&Connection> {
        self.connections.get(key)
    }

    pub fn split(&self, key: SplitKey) -> Option<&Split> {
        self.splits.get(key)
    }

    /// Find a port by its logical identity.
    pub fn port_by_id(&self, id: PortId) -> Option<PortKey> {
        self.id_index.get(&id).copied()
    }

    /// Block keys in enumeration order (bottom to top).
    pub fn block_keys(&self) -> &[BlockKey] {
        &self.block_order
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockKey, &Block)> + '_ {
        self.block_order
            .iter()
            .filter_map(|&key| self.blocks.get(key).map(|b| (key, b)))
    }

    /// Ports of `block` in insertion order. Empty for an unknown block.
    pub fn ports_of(&self, block: BlockKey) -> impl Iterator<Item = (PortKey, &Port)> + '_ {
        self.blocks
            .get(block)
            .map(|b| b.ports.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|&key| self.ports.get(key).map(|p| (key, p)))
    }

    pub fn connection_keys(&self) -> &[ConnectionKey] {
        &self.connection_order
    }

    pub fn connections(&self) -> impl Iterator<Item = (ConnectionKey, &Connection)> + '_ {
        self.connection_order
            .iter()
            .filter_map(|&key| self.connections.get(key).map(|c| (key, c)))
    }

    pub fn block_count(&self) -> usize {
        self.block_order.len()
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connection_order.len()
    }

    pub fn split_count(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block_order.is_empty() && self.connection_order.is_empty()
    }

    /// Scene position of a port's handle.
    pub fn port_scene_position(&self, port: PortKey) -> Option<Point> {
        let p = self.ports.get(port)?;
        let b = self.blocks.get(p.block)?;
        Some(b.position + p.offset)
    }

    /// Scene positions of a connection's splits, in order.
    pub fn split_positions(&self, connection: ConnectionKey) -> Vec<Point> {
        self.connections
            .get(connection)
            .map(|c| {
                c.splits
                    .iter()
                    .filter_map(|&s| self.splits.get(s).map(|s| s.position))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drain the change log accumulated since the last call.
    pub fn take_changes(&mut self) -> Vec<GraphChange> {
        std::mem::take(&mut self.changes)
    }

    // ─── Blocks ──────────────────────────────────────────────────────────

    /// Add an empty block centred on `position`.
    pub fn add_block(&mut self, position: Point) -> BlockKey {
        let key = self.blocks.insert(Block {
            position,
            size: self.config.empty_block_size(),
            ports: Vec::new(),
        });
        self.block_order.push(key);
        self.changes.push(GraphChange::BlockAdded(key));
        log::debug!("added block {key:?} at ({}, {})", position.x, position.y);
        key
    }

    /// Move a block; every connection attached to its ports follows.
    pub fn move_block(&mut self, block: BlockKey, position: Point) -> Result<(), GraphError> {
        let b = self.blocks.get_mut(block).ok_or(GraphError::UnknownBlock)?;
        b.position = position;
        let attached: Vec<ConnectionKey> = b
            .ports
            .iter()
            .filter_map(|&p| self.ports.get(p))
            .flat_map(|p| p.attachments.iter().copied())
            .collect();
        self.changes.push(GraphChange::BlockMoved(block));
        for connection in attached {
            self.refresh_connection(connection);
        }
        Ok(())
    }

    /// Append a port to `block`.
    ///
    /// `identity` of [`PortId::UNASSIGNED`] allocates a fresh identity; any
    /// other value is used as is and must not collide with a live port.
    /// The block grows to fit the label and all ports are re-stacked.
    pub fn add_port(
        &mut self,
        block: BlockKey,
        name: impl Into<String>,
        direction: Direction,
        flags: PortFlags,
        identity: PortId,
    ) -> Result<PortKey, GraphError> {
        if !self.blocks.contains_key(block) {
            return Err(GraphError::UnknownBlock);
        }
        let id = if identity.is_assigned() {
            if self.id_index.contains_key(&identity) {
                return Err(GraphError::DuplicateIdentity(identity));
            }
            self.port_ids.reserve(identity);
            identity
        } else {
            self.port_ids.fresh()
        };

        let name = name.into();
        let label_width = self.metrics.text_width(&name);
        let row_height = self.metrics.line_height();

        log::debug!("adding {direction:?} port {id} '{name}' to block {block:?}");
        let key = self.ports.insert(Port {
            id,
            name,
            direction,
            flags,
            block,
            offset: Vec2::ZERO,
            attachments: SmallVec::new(),
        });
        self.id_index.insert(id, key);

        if let Some(b) = self.blocks.get_mut(block) {
            b.size = layout::grow_to_fit(b.size, label_width, row_height, &self.config);
            b.ports.push(key);
        }
        self.changes.push(GraphChange::PortAdded(key));
        self.changes.push(GraphChange::BlockResized(block));
        self.relayout_block(block);
        Ok(key)
    }

    pub fn add_input_port(
        &mut self,
        block: BlockKey,
        name: impl Into<String>,
    ) -> Result<PortKey, GraphError> {
        self.add_port(block, name, Direction::Input, PortFlags::empty(), PortId::UNASSIGNED)
    }

    pub fn add_output_port(
        &mut self,
        block: BlockKey,
        name: impl Into<String>,
    ) -> Result<PortKey, GraphError> {
        self.add_port(block, name, Direction::Output, PortFlags::empty(), PortId::UNASSIGNED)
    }

    pub fn add_input_ports<I, S>(&mut self, block: BlockKey, names: I) -> Result<Vec<PortKey>, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .map(|name| self.add_input_port(block, name))
            .collect()
    }

    pub fn add_output_ports<I, S>(&mut self, block: BlockKey, names: I) -> Result<Vec<PortKey>, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .map(|name| self.add_output_port(block, name))
            .collect()
    }

    /// Duplicate a block's ports (name, direction, flags, order) onto a new
    /// block at the same position. Connections are not cloned, and the new
    /// ports get fresh identities so saved identifiers stay unambiguous.
    pub fn clone_block(&mut self, block: BlockKey) -> Result<BlockKey, GraphError> {
        let source = self.blocks.get(block).ok_or(GraphError::UnknownBlock)?;
        let position = source.position;
        let templates: Vec<(String, Direction, PortFlags)> = source
            .ports
            .iter()
            .filter_map(|&p| self.ports.get(p))
            .map(|p| (p.name.clone(), p.direction, p.flags))
            .collect();

        let clone = self.add_block(position);
        for (name, direction, flags) in templates {
            self.add_port(clone, name, direction, flags, PortId::UNASSIGNED)?;
        }
        Ok(clone)
    }

    /// Delete a block. Connections on its ports go first, then the ports,
    /// then the block. Returns how many connections were removed.
    pub fn remove_block(&mut self, block: BlockKey) -> Result<usize, GraphError> {
        let ports = self
            .blocks
            .get(block)
            .ok_or(GraphError::UnknownBlock)?
            .ports
            .clone();

        let mut removed = 0;
        for port in ports {
            removed += self.destroy_port(port);
        }
        self.blocks.remove(block);
        self.block_order.retain(|&k| k != block);
        self.changes.push(GraphChange::BlockRemoved(block));
        log::debug!("removed block {block:?} ({removed} connections cascaded)");
        Ok(removed)
    }

    // ─── Ports ───────────────────────────────────────────────────────────

    /// Delete a single port and every connection that references it.
    /// The block keeps its size; the remaining ports are re-stacked.
    pub fn remove_port(&mut self, port: PortKey) -> Result<usize, GraphError> {
        let block = self.ports.get(port).ok_or(GraphError::UnknownPort)?.block;
        let removed = self.destroy_port(port);
        if let Some(b) = self.blocks.get_mut(block) {
            b.ports.retain(|&k| k != port);
        }
        self.relayout_block(block);
        Ok(removed)
    }

    /// Change a port's direction. Only allowed while nothing is attached,
    /// since an attached port's direction is part of its connections' validity.
    pub fn set_port_direction(&mut self, port: PortKey, direction: Direction) -> Result<(), GraphError> {
        let p = self.ports.get_mut(port).ok_or(GraphError::UnknownPort)?;
        if p.direction == direction {
            return Ok(());
        }
        if !p.attachments.is_empty() {
            return Err(GraphError::PortAttached(p.id));
        }
        p.direction = direction;
        let block = p.block;
        self.changes.push(GraphChange::PortUpdated(port));
        self.relayout_block(block);
        Ok(())
    }

    pub fn set_port_flags(&mut self, port: PortKey, flags: PortFlags) -> Result<(), GraphError> {
        let p = self.ports.get_mut(port).ok_or(GraphError::UnknownPort)?;
        p.flags = flags;
        self.changes.push(GraphChange::PortUpdated(port));
        Ok(())
    }

    /// Re-key a port's logical identity. `UNASSIGNED` allocates a fresh one.
    pub fn set_port_identity(&mut self, port: PortKey, identity: PortId) -> Result<PortId, GraphError> {
        let current = self.ports.get(port).ok_or(GraphError::UnknownPort)?.id;
        if identity == current {
            return Ok(current);
        }
        let id = if identity.is_assigned() {
            if self.id_index.contains_key(&identity) {
                return Err(GraphError::DuplicateIdentity(identity));
            }
            self.port_ids.reserve(identity);
            identity
        } else {
            self.port_ids.fresh()
        };

        self.id_index.remove(&current);
        self.id_index.insert(id, port);
        if let Some(p) = self.ports.get_mut(port) {
            p.id = id;
        }
        self.changes.push(GraphChange::PortUpdated(port));
        Ok(id)
    }

    /// True iff some connection joins `port` and `other`.
    pub fn is_connected(&self, port: PortKey, other: PortKey) -> bool {
        self.ports.get(port).is_some_and(|p| {
            p.attachments.iter().any(|&c| {
                self.connections
                    .get(c)
                    .is_some_and(|c| c.opposite(port) == Some(other))
            })
        })
    }

    /// Check whether `source` and `destination` may be joined.
    pub fn can_connect(&self, source: PortKey, destination: PortKey) -> Result<(), GraphError> {
        let a = self.ports.get(source).ok_or(GraphError::UnknownPort)?;
        let b = self.ports.get(destination).ok_or(GraphError::UnknownPort)?;
        if a.block == b.block {
            return Err(GraphError::Rejected(Rejection::SameBlock));
        }
        if a.direction == b.direction {
            return Err(GraphError::Rejected(Rejection::SameDirection));
        }
        if self.is_connected(source, destination) {
            return Err(GraphError::Rejected(Rejection::Duplicate));
        }
        Ok(())
    }

    // ─── Connections ─────────────────────────────────────────────────────

    /// Create a connection with no endpoints yet.
    pub fn create_connection(&mut self) -> ConnectionKey {
        let key = self.connections.insert(Connection::new());
        self.connection_order.push(key);
        self.changes.push(GraphChange::ConnectionAdded(key));
        log::debug!("created connection {key:?}");
        key
    }

    /// Phase 1: attach the source port and start drawing from it.
    pub fn set_source_port(&mut self, connection: ConnectionKey, port: PortKey) -> Result<(), GraphError> {
        let start = self.port_scene_position(port).ok_or(GraphError::UnknownPort)?;
        let c = self
            .connections
            .get_mut(connection)
            .ok_or(GraphError::UnknownConnection)?;
        if c.source.is_some() {
            return Err(GraphError::EndpointAlreadySet("source"));
        }
        c.source = Some(port);
        c.start = start;
        if let Some(p) = self.ports.get_mut(port) {
            p.attachments.push(connection);
        }
        self.changes.push(GraphChange::ConnectionUpdated(connection));
        Ok(())
    }

    /// Phase 2: attach the destination port. The pair must pass [`Self::can_connect`].
    pub fn set_destination_port(&mut self, connection: ConnectionKey, port: PortKey) -> Result<(), GraphError> {
        let c = self
            .connections
            .get(connection)
            .ok_or(GraphError::UnknownConnection)?;
        if c.destination.is_some() {
            return Err(GraphError::EndpointAlreadySet("destination"));
        }
        let source = c.source.ok_or(GraphError::MissingSource)?;
        self.can_connect(source, port)?;
        let end = self.port_scene_position(port).ok_or(GraphError::UnknownPort)?;

        if let Some(c) = self.connections.get_mut(connection) {
            c.destination = Some(port);
            c.end = end;
        }
        if let Some(p) = self.ports.get_mut(port) {
            p.attachments.push(connection);
        }
        self.changes.push(GraphChange::ConnectionUpdated(connection));
        log::debug!("connection {connection:?} completed");
        Ok(())
    }

    pub fn set_start_position(&mut self, connection: ConnectionKey, point: Point) -> Result<(), GraphError> {
        let c = self
            .connections
            .get_mut(connection)
            .ok_or(GraphError::UnknownConnection)?;
        c.start = point;
        Ok(())
    }

    /// Move the free end of a connection (pointer tracking while drawing).
    pub fn set_end_position(&mut self, connection: ConnectionKey, point: Point) -> Result<(), GraphError> {
        let c = self
            .connections
            .get_mut(connection)
            .ok_or(GraphError::UnknownConnection)?;
        c.end = point;
        log::trace!("connection {connection:?} end -> ({}, {})", point.x, point.y);
        Ok(())
    }

    /// Re-sample the cached endpoints from the ports' current positions.
    pub fn update_position(&mut self, connection: ConnectionKey) -> Result<(), GraphError> {
        let c = self
            .connections
            .get(connection)
            .ok_or(GraphError::UnknownConnection)?;
        let start = c.source.and_then(|p| self.port_scene_position(p));
        let end = c.destination.and_then(|p| self.port_scene_position(p));
        if let Some(c) = self.connections.get_mut(connection) {
            if let Some(start) = start {
                c.start = start;
            }
            if let Some(end) = end {
                c.end = end;
            }
        }
        Ok(())
    }

    /// Rebuild the curve from the cached endpoints and the splits.
    pub fn recompute_path(&mut self, connection: ConnectionKey) -> Result<(), GraphError> {
        let via = self.split_positions(connection);
        let c = self
            .connections
            .get_mut(connection)
            .ok_or(GraphError::UnknownConnection)?;
        c.path = path::connection_path(c.start, &via, c.end);
        self.changes.push(GraphChange::ConnectionUpdated(connection));
        log::trace!("recomputed path of {connection:?} through {} splits", via.len());
        Ok(())
    }

    /// Flag every split marker of `connection` for redraw.
    pub fn update_splits(&mut self, connection: ConnectionKey) -> Result<(), GraphError> {
        let c = self
            .connections
            .get(connection)
            .ok_or(GraphError::UnknownConnection)?;
        self.changes
            .extend(c.splits.iter().map(|&s| GraphChange::SplitMoved(s)));
        Ok(())
    }

    /// Join two ports in one step: validate, attach both ends, build the path.
    pub fn connect(&mut self, source: PortKey, destination: PortKey) -> Result<ConnectionKey, GraphError> {
        self.can_connect(source, destination)?;
        let connection = self.create_connection();
        self.set_source_port(connection, source)?;
        self.set_destination_port(connection, destination)?;
        self.update_position(connection)?;
        self.recompute_path(connection)?;
        Ok(connection)
    }

    /// Delete a connection: unregister from both ports, drop its splits.
    /// Also used to discard an abandoned half-drawn connection.
    pub fn remove_connection(&mut self, connection: ConnectionKey) -> Result<(), GraphError> {
        let c = self
            .connections
            .remove(connection)
            .ok_or(GraphError::UnknownConnection)?;
        for port in c.source.into_iter().chain(c.destination) {
            if let Some(p) = self.ports.get_mut(port) {
                p.attachments.retain(|k| *k != connection);
            }
        }
        for split in c.splits {
            self.splits.remove(split);
            self.changes.push(GraphChange::SplitRemoved(split));
        }
        self.connection_order.retain(|&k| k != connection);
        self.changes.push(GraphChange::ConnectionRemoved(connection));
        log::debug!("removed connection {connection:?}");
        Ok(())
    }

    // ─── Splits ──────────────────────────────────────────────────────────

    /// Insert a split on the segment nearest `point`, snapped onto the curve.
    pub fn insert_split(&mut self, connection: ConnectionKey, point: Point) -> Result<SplitKey, GraphError> {
        let c = self
            .connections
            .get(connection)
            .ok_or(GraphError::UnknownConnection)?;
        let (index, position) = match path::nearest_on_path(&c.path, point) {
            Some(hit) => (hit.segment, hit.point),
            None => (c.splits.len(), point),
        };

        let split = self.splits.insert(Split {
            position,
            connection,
        });
        if let Some(c) = self.connections.get_mut(connection) {
            let index = index.min(c.splits.len());
            c.splits.insert(index, split);
        }
        self.changes.push(GraphChange::SplitAdded(split));
        self.recompute_path(connection)?;
        Ok(split)
    }

    /// Append a split after the last one, exactly at `position`.
    /// The caller is expected to `recompute_path` afterwards.
    pub fn push_split(&mut self, connection: ConnectionKey, position: Point) -> Result<SplitKey, GraphError> {
        if !self.connections.contains_key(connection) {
            return Err(GraphError::UnknownConnection);
        }
        let split = self.splits.insert(Split {
            position,
            connection,
        });
        if let Some(c) = self.connections.get_mut(connection) {
            c.splits.push(split);
        }
        self.changes.push(GraphChange::SplitAdded(split));
        Ok(split)
    }

    /// Reposition a split; its connection's curve follows.
    pub fn move_split(&mut self, split: SplitKey, position: Point) -> Result<(), GraphError> {
        let s = self.splits.get_mut(split).ok_or(GraphError::UnknownSplit)?;
        s.position = position;
        let connection = s.connection;
        self.changes.push(GraphChange::SplitMoved(split));
        self.recompute_path(connection)
    }

    pub fn remove_split(&mut self, split: SplitKey) -> Result<(), GraphError> {
        let s = self.splits.remove(split).ok_or(GraphError::UnknownSplit)?;
        if let Some(c) = self.connections.get_mut(s.connection) {
            c.splits.retain(|&k| k != split);
        }
        self.changes.push(GraphChange::SplitRemoved(split));
        self.recompute_path(s.connection)
    }

    // ─── Whole graph ─────────────────────────────────────────────────────

    /// Remove everything. Identities already handed out are not reused.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.block_order.clear();
        self.ports.clear();
        self.connections.clear();
        self.connection_order.clear();
        self.splits.clear();
        self.id_index.clear();
        self.changes.push(GraphChange::Cleared);
        log::debug!("graph cleared");
    }

    /// Verify the structural invariants, reporting the first violation.
    pub fn check_invariants(&self) -> Result<(), GraphError> {
        let fail = |msg: String| Err(GraphError::Invariant(msg));

        if self.block_order.len() != self.blocks.len() {
            return fail("block order out of sync with block arena".into());
        }
        for (key, block) in self.blocks() {
            for &port in &block.ports {
                match self.ports.get(port) {
                    Some(p) if p.block == key => {}
                    Some(_) => return fail(format!("port {port:?} listed on foreign block {key:?}")),
                    None => return fail(format!("block {key:?} lists missing port {port:?}")),
                }
            }
        }

        for (key, port) in &self.ports {
            let owned = self
                .blocks
                .get(port.block)
                .is_some_and(|b| b.ports.contains(&key));
            if !owned {
                return fail(format!("port {} is orphaned", port.id));
            }
            if self.id_index.get(&port.id) != Some(&key) {
                return fail(format!("identity index is stale for {}", port.id));
            }
            for &c in &port.attachments {
                let refers = self
                    .connections
                    .get(c)
                    .is_some_and(|conn| conn.source == Some(key) || conn.destination == Some(key));
                if !refers {
                    return fail(format!("port {} holds dangling attachment {c:?}", port.id));
                }
            }
        }
        if self.id_index.len() != self.ports.len() {
            return fail("identity index size mismatch".into());
        }

        if self.connection_order.len() != self.connections.len() {
            return fail("connection order out of sync with connection arena".into());
        }
        let mut pairs = HashSet::new();
        for (key, conn) in self.connections() {
            for port in conn.source.into_iter().chain(conn.destination) {
                let attached = self
                    .ports
                    .get(port)
                    .map(|p| p.attachments.iter().filter(|&&c| c == key).count());
                if attached != Some(1) {
                    return fail(format!("connection {key:?} not registered once on {port:?}"));
                }
            }
            if let (Some(s), Some(d)) = (conn.source, conn.destination) {
                let (a, b) = (&self.ports[s], &self.ports[d]);
                if a.block == b.block || a.direction == b.direction {
                    return fail(format!("connection {key:?} joins incompatible ports"));
                }
                if !pairs.insert((s.min(d), s.max(d))) {
                    return fail(format!("connection {key:?} duplicates an existing edge"));
                }
            }
            for &split in &conn.splits {
                if self.splits.get(split).map(|s| s.connection) != Some(key) {
                    return fail(format!("connection {key:?} lists foreign split {split:?}"));
                }
            }
        }
        for (key, split) in &self.splits {
            let owned = self
                .connections
                .get(split.connection)
                .is_some_and(|c| c.splits.contains(&key));
            if !owned {
                return fail(format!("split {key:?} is orphaned"));
            }
        }
        Ok(())
    }

    // ─── Internals ───────────────────────────────────────────────────────

    /// Cascade for one port: connections first, then the port itself.
    /// Leaves the owning block's port list untouched.
    fn destroy_port(&mut self, port: PortKey) -> usize {
        let Some(attached) = self.ports.get(port).map(|p| p.attachments.clone()) else {
            return 0;
        };
        let mut removed = 0;
        for connection in attached {
            if self.remove_connection(connection).is_ok() {
                removed += 1;
            }
        }
        if let Some(p) = self.ports.remove(port) {
            self.id_index.remove(&p.id);
        }
        self.changes.push(GraphChange::PortRemoved(port));
        removed
    }

    /// Re-stack a block's ports and drag their connections along.
    fn relayout_block(&mut self, block: BlockKey) {
        let Some(b) = self.blocks.get(block) else {
            return;
        };
        let row_height = self.metrics.line_height();
        let mut moved = Vec::new();
        for (row, &key) in b.ports.iter().enumerate() {
            if let Some(port) = self.ports.get_mut(key) {
                let offset = layout::port_offset(b.size, row, port.direction, row_height, &self.config);
                if port.offset != offset {
                    port.offset = offset;
                    moved.extend(port.attachments.iter().copied());
                }
            }
        }
        for connection in moved {
            self.refresh_connection(connection);
        }
    }

    fn refresh_connection(&mut self, connection: ConnectionKey) {
        if let Err(err) = self
            .update_position(connection)
            .and_then(|()| self.recompute_path(connection))
        {
            log::trace!("skipped refresh of {connection:?}: {err}");
        }
    }
}
