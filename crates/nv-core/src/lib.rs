//! NodeView core: the node-graph data model and its persistence.
//!
//! - [`model`]: blocks, ports, connections and splits owned by a [`NodeGraph`]
//! - [`layout`]: block sizing and port placement
//! - [`path`]: connection curve geometry
//! - [`codec`]: tagged-record save/load

pub mod codec;
pub mod error;
pub mod id;
pub mod layout;
pub mod model;
pub mod path;

pub use codec::{Summary, load, save};
pub use error::{CodecError, GraphError, Rejection};
pub use id::{BlockKey, ConnectionKey, PortId, PortKey, SplitKey};
pub use layout::{FixedPitchMetrics, LayoutConfig, TextMetrics};
pub use model::*;

// Re-export kurbo geometry so downstream crates share one version
pub use kurbo::{BezPath, Point, Rect, Size, Vec2};
