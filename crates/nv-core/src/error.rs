//! Error types for graph mutation and persistence.

use crate::id::PortId;
use thiserror::Error;

/// Why a port pair cannot be joined by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Both ports live on the same block.
    SameBlock,
    /// Both ports are inputs, or both are outputs.
    SameDirection,
    /// The pair is already connected.
    Duplicate,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Rejection::SameBlock => "ports belong to the same block",
            Rejection::SameDirection => "ports have the same direction",
            Rejection::Duplicate => "ports are already connected",
        })
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("block no longer exists")]
    UnknownBlock,
    #[error("port no longer exists")]
    UnknownPort,
    #[error("connection no longer exists")]
    UnknownConnection,
    #[error("split no longer exists")]
    UnknownSplit,
    #[error("connection has no source port")]
    MissingSource,
    #[error("connection already has a {0} port")]
    EndpointAlreadySet(&'static str),
    #[error("cannot connect: {0}")]
    Rejected(Rejection),
    #[error("port identity {0} is already in use")]
    DuplicateIdentity(PortId),
    #[error("port {0} has attached connections; its direction is fixed")]
    PortAttached(PortId),
    #[error("graph invariant violated: {0}")]
    Invariant(String),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("stream I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("truncated or garbled record: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("unknown record tag {0}")]
    UnknownTag(u8),
    #[error("connection references unknown port {0}")]
    UnresolvedPort(PortId),
    #[error("port identity {0} is repeated or unassigned in the stream")]
    DuplicatePort(PortId),
    #[error(transparent)]
    Graph(#[from] GraphError),
}
