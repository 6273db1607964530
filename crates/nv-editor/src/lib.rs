//! NodeView editor: pointer gestures on top of the node graph.
//!
//! - [`input`]: pointer events in scene coordinates
//! - [`controller`]: the gesture state machine
//! - [`editor`]: a session bundling graph, controller and hit tester
//! - [`config`]: JSON-loadable editor settings

pub mod config;
pub mod controller;
pub mod editor;
pub mod input;

pub use config::{ConfigError, EditorConfig};
pub use controller::{EventResponse, GestureState, InteractionController, SceneQuery};
pub use editor::NodeEditor;
pub use input::{PointerButton, PointerEvent};
