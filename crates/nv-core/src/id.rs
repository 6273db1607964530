use serde::{Deserialize, Deserializer, Serialize, Serializer};
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Arena key of a [`Block`](crate::model::Block).
    pub struct BlockKey;
    /// Arena key of a [`Port`](crate::model::Port).
    pub struct PortKey;
    /// Arena key of a [`Connection`](crate::model::Connection).
    pub struct ConnectionKey;
    /// Arena key of a [`Split`](crate::model::Split).
    pub struct SplitKey;
}

/// Logical port identity: the value written to a save stream.
///
/// Arena keys are storage locations and mean nothing after a reload;
/// a `PortId` is assigned once when the port is created and travels with
/// it through save/load.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PortId(u64);

impl PortId {
    /// Placeholder passed to `add_port` to request a fresh identity.
    pub const UNASSIGNED: PortId = PortId(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Serialize for PortId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for PortId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(PortId)
    }
}

/// Hands out monotonically increasing port identities for one graph.
#[derive(Debug, Clone)]
pub struct PortIdAllocator {
    next: u64,
}

impl Default for PortIdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl PortIdAllocator {
    /// Next unused identity.
    pub fn fresh(&mut self) -> PortId {
        let id = PortId(self.next);
        self.next += 1;
        id
    }

    /// Make sure an externally supplied identity is never handed out again.
    pub fn reserve(&mut self, id: PortId) {
        if id.0 >= self.next {
            self.next = id.0 + 1;
        }
    }
}
