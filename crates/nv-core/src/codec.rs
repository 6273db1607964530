//! Save/load of a `NodeGraph` as a flat stream of tagged records.
//!
//! Layout (MessagePack via `rmp-serde`, no overall header):
//!
//! ```text
//! record     := tag body
//! tag        := u8            1 = block, 2 = connection
//! block      := [x, y] [port*]          port := [id, name, is_output, flags]
//! connection := source_id destination_id [[x, y]*]   (split positions)
//! ```
//!
//! All blocks are written before any connection. Ports are identified by
//! their logical [`PortId`], which the loader restores verbatim, so a graph
//! saved, loaded and saved again produces identical bytes.

use crate::error::CodecError;
use crate::id::{PortId, PortKey};
use crate::model::{Direction, NodeGraph, PortFlags};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufRead, Write};

const TAG_BLOCK: u8 = 1;
const TAG_CONNECTION: u8 = 2;

#[derive(Debug, Serialize, Deserialize)]
struct PortRecord {
    id: PortId,
    name: String,
    is_output: bool,
    flags: u8,
}

#[derive(Debug, Serialize, Deserialize)]
struct BlockRecord {
    position: [f64; 2],
    ports: Vec<PortRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConnectionRecord {
    source: PortId,
    destination: PortId,
    splits: Vec<[f64; 2]>,
}

/// Counts of what a save or load touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub blocks: usize,
    pub ports: usize,
    pub connections: usize,
}

/// Write every block, then every complete connection.
///
/// A connection still being drawn has no destination and is skipped.
pub fn save<W: Write>(graph: &NodeGraph, mut writer: W) -> Result<Summary, CodecError> {
    let mut summary = Summary::default();

    for (key, block) in graph.blocks() {
        let ports: Vec<PortRecord> = graph
            .ports_of(key)
            .map(|(_, p)| PortRecord {
                id: p.id(),
                name: p.name().to_owned(),
                is_output: p.is_output(),
                flags: p.flags().bits(),
            })
            .collect();
        summary.ports += ports.len();
        let record = BlockRecord {
            position: [block.position().x, block.position().y],
            ports,
        };
        rmp_serde::encode::write(&mut writer, &TAG_BLOCK)?;
        rmp_serde::encode::write(&mut writer, &record)?;
        summary.blocks += 1;
    }

    for (key, connection) in graph.connections() {
        let (Some(source), Some(destination)) = (connection.source(), connection.destination())
        else {
            log::debug!("skipping incomplete connection {key:?} on save");
            continue;
        };
        let (Some(source), Some(destination)) = (graph.port(source), graph.port(destination))
        else {
            continue;
        };
        let record = ConnectionRecord {
            source: source.id(),
            destination: destination.id(),
            splits: graph
                .split_positions(key)
                .into_iter()
                .map(|p| [p.x, p.y])
                .collect(),
        };
        rmp_serde::encode::write(&mut writer, &TAG_CONNECTION)?;
        rmp_serde::encode::write(&mut writer, &record)?;
        summary.connections += 1;
    }

    writer.flush()?;
    log::debug!(
        "saved {} blocks, {} ports, {} connections",
        summary.blocks,
        summary.ports,
        summary.connections
    );
    Ok(summary)
}

/// Save into a fresh byte buffer.
pub fn save_to_vec(graph: &NodeGraph) -> Result<Vec<u8>, CodecError> {
    let mut bytes = Vec::new();
    save(graph, &mut bytes)?;
    Ok(bytes)
}

/// Replace the graph's contents with the records in `reader`.
///
/// The graph is cleared first. If the stream is malformed the graph is
/// cleared again, so it is never left half-populated.
pub fn load<R: BufRead>(graph: &mut NodeGraph, mut reader: R) -> Result<Summary, CodecError> {
    graph.clear();
    match read_records(graph, &mut reader) {
        Ok(summary) => {
            log::debug!(
                "loaded {} blocks, {} ports, {} connections",
                summary.blocks,
                summary.ports,
                summary.connections
            );
            Ok(summary)
        }
        Err(err) => {
            log::warn!("aborting load: {err}");
            graph.clear();
            Err(err)
        }
    }
}

/// Load from an in-memory buffer.
pub fn load_from_slice(graph: &mut NodeGraph, bytes: &[u8]) -> Result<Summary, CodecError> {
    load(graph, bytes)
}

fn read_records<R: BufRead>(graph: &mut NodeGraph, reader: &mut R) -> Result<Summary, CodecError> {
    // Load-scoped lookup from saved identity to the port recreated for it.
    let mut port_map: HashMap<PortId, PortKey> = HashMap::new();
    let mut summary = Summary::default();

    while !reader.fill_buf()?.is_empty() {
        let tag: u8 = rmp_serde::from_read(&mut *reader)?;
        match tag {
            TAG_BLOCK => {
                let record: BlockRecord = rmp_serde::from_read(&mut *reader)?;
                let [x, y] = record.position;
                let block = graph.add_block(Point::new(x, y));
                for port in record.ports {
                    if port_map.contains_key(&port.id) || !port.id.is_assigned() {
                        return Err(CodecError::DuplicatePort(port.id));
                    }
                    let key = graph.add_port(
                        block,
                        port.name,
                        Direction::from_is_output(port.is_output),
                        PortFlags::from_bits_truncate(port.flags),
                        port.id,
                    )?;
                    port_map.insert(port.id, key);
                    summary.ports += 1;
                }
                summary.blocks += 1;
            }
            TAG_CONNECTION => {
                let record: ConnectionRecord = rmp_serde::from_read(&mut *reader)?;
                let resolve = |id: PortId| port_map.get(&id).copied().ok_or(CodecError::UnresolvedPort(id));
                let source = resolve(record.source)?;
                let destination = resolve(record.destination)?;

                let connection = graph.create_connection();
                graph.set_source_port(connection, source)?;
                graph.set_destination_port(connection, destination)?;
                for [x, y] in record.splits {
                    graph.push_split(connection, Point::new(x, y))?;
                }
                graph.update_position(connection)?;
                graph.recompute_path(connection)?;
                summary.connections += 1;
            }
            other => return Err(CodecError::UnknownTag(other)),
        }
    }
    Ok(summary)
}
