//! Gesture state machine for drawing and deleting connections.
//!
//! | State | Event | Hit | Effect | Next |
//! |-------|-------|-----|--------|------|
//! | Idle | press left | port | start a connection from the port | Drawing |
//! | Idle | press left | split | grab the split | DraggingSplit |
//! | Idle | press right | block / connection / split | delete it | Idle |
//! | Drawing | move | | free end follows the pointer | Drawing |
//! | Drawing | release left | valid port | complete the connection | Idle |
//! | Drawing | release left | anything else | discard the connection | Idle |
//! | Drawing | press | | ignored | Drawing |
//! | DraggingSplit | move | | split follows the pointer | DraggingSplit |
//! | DraggingSplit | release left | | drop the split | Idle |
//!
//! Everything else is forwarded so the host can pan, select or drag blocks.

use crate::input::{PointerButton, PointerEvent};
use kurbo::Point;
use nv_core::{ConnectionKey, GraphError, NodeGraph, SplitKey};
use nv_render::{Hit, HitTester};

/// Whether the controller acted on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    /// Handled; the host must not act on it too.
    Consumed,
    /// Not handled; the host's default behaviour applies.
    Forwarded,
}

/// What the controller is in the middle of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    /// A connection with only its source set is following the pointer.
    Drawing { connection: ConnectionKey },
    DraggingSplit { split: SplitKey },
}

/// Point queries the controller needs from the scene.
pub trait SceneQuery {
    /// Topmost graph item at `p`.
    fn item_at(&self, graph: &NodeGraph, p: Point) -> Option<Hit>;
}

impl SceneQuery for HitTester {
    fn item_at(&self, graph: &NodeGraph, p: Point) -> Option<Hit> {
        self.query(graph, p)
    }
}

#[derive(Debug, Default)]
pub struct InteractionController {
    state: GestureState,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    /// Interpret one pointer event, mutating `graph` as the gesture requires.
    pub fn handle(&mut self, graph: &mut NodeGraph, scene: &dyn SceneQuery, event: &PointerEvent) -> EventResponse {
        let result = match self.state {
            GestureState::Idle => self.handle_idle(graph, scene, event),
            GestureState::Drawing { connection } => self.handle_drawing(graph, scene, event, connection),
            GestureState::DraggingSplit { split } => self.handle_dragging(graph, event, split),
        };
        match result {
            Ok(response) => response,
            Err(err) => {
                // The gesture's item was removed behind our back
                log::warn!("abandoning gesture {:?}: {err}", self.state);
                self.state = GestureState::Idle;
                EventResponse::Forwarded
            }
        }
    }

    /// Abandon whatever gesture is in progress. A half-drawn connection is
    /// removed from the graph before this returns.
    pub fn cancel(&mut self, graph: &mut NodeGraph) {
        if let GestureState::Drawing { connection } = self.state {
            // Already gone is fine; nothing is left registered either way
            let _ = graph.remove_connection(connection);
            log::debug!("Drawing -> Idle: cancelled");
        }
        self.state = GestureState::Idle;
    }

    fn handle_idle(
        &mut self,
        graph: &mut NodeGraph,
        scene: &dyn SceneQuery,
        event: &PointerEvent,
    ) -> Result<EventResponse, GraphError> {
        let PointerEvent::Press { button, position } = *event else {
            return Ok(EventResponse::Forwarded);
        };

        match (button, scene.item_at(graph, position)) {
            (PointerButton::Left, Some(Hit::Port(port))) => {
                let connection = graph.create_connection();
                if let Err(err) = graph.set_source_port(connection, port) {
                    graph.remove_connection(connection)?;
                    return Err(err);
                }
                graph.set_end_position(connection, position)?;
                graph.recompute_path(connection)?;
                self.state = GestureState::Drawing { connection };
                log::debug!("Idle -> Drawing from port {port:?}");
                Ok(EventResponse::Consumed)
            }
            (PointerButton::Left, Some(Hit::Split(split))) => {
                self.state = GestureState::DraggingSplit { split };
                log::debug!("Idle -> DraggingSplit {split:?}");
                Ok(EventResponse::Consumed)
            }
            (PointerButton::Right, Some(Hit::Block(block))) => {
                graph.remove_block(block)?;
                Ok(EventResponse::Consumed)
            }
            (PointerButton::Right, Some(Hit::Connection(connection))) => {
                graph.remove_connection(connection)?;
                Ok(EventResponse::Consumed)
            }
            (PointerButton::Right, Some(Hit::Split(split))) => {
                graph.remove_split(split)?;
                Ok(EventResponse::Consumed)
            }
            _ => Ok(EventResponse::Forwarded),
        }
    }

    fn handle_drawing(
        &mut self,
        graph: &mut NodeGraph,
        scene: &dyn SceneQuery,
        event: &PointerEvent,
        connection: ConnectionKey,
    ) -> Result<EventResponse, GraphError> {
        match *event {
            PointerEvent::Move { position } => {
                graph.set_end_position(connection, position)?;
                graph.recompute_path(connection)?;
                Ok(EventResponse::Consumed)
            }
            PointerEvent::Release {
                button: PointerButton::Left,
                position,
            } => {
                self.state = GestureState::Idle;
                let Some(port) = scene.item_at(graph, position).and_then(Hit::port) else {
                    graph.remove_connection(connection)?;
                    log::debug!("Drawing -> Idle: released away from any port");
                    return Ok(EventResponse::Consumed);
                };
                match graph.set_destination_port(connection, port) {
                    Ok(()) => {
                        graph.update_position(connection)?;
                        graph.recompute_path(connection)?;
                        log::debug!("Drawing -> Idle: connected {connection:?}");
                    }
                    Err(reason) => {
                        graph.remove_connection(connection)?;
                        log::debug!("Drawing -> Idle: rejected ({reason})");
                    }
                }
                Ok(EventResponse::Consumed)
            }
            PointerEvent::Press { .. } => Ok(EventResponse::Consumed),
            PointerEvent::Release { .. } => Ok(EventResponse::Forwarded),
        }
    }

    fn handle_dragging(
        &mut self,
        graph: &mut NodeGraph,
        event: &PointerEvent,
        split: SplitKey,
    ) -> Result<EventResponse, GraphError> {
        match *event {
            PointerEvent::Move { position } => {
                graph.move_split(split, position)?;
                Ok(EventResponse::Consumed)
            }
            PointerEvent::Release {
                button: PointerButton::Left,
                ..
            } => {
                self.state = GestureState::Idle;
                log::debug!("DraggingSplit -> Idle");
                Ok(EventResponse::Consumed)
            }
            PointerEvent::Press { .. } => Ok(EventResponse::Consumed),
            PointerEvent::Release { .. } => Ok(EventResponse::Forwarded),
        }
    }
}
