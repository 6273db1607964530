//! Integration tests: save → load round-trip.
//!
//! Verifies that blocks, ports (order, name, direction, flags) and the set of
//! connections survive the trip into a fresh graph.

use nv_core::codec::{load_from_slice, save_to_vec};
use nv_core::{Direction, NodeGraph, Point, PortFlags, PortId, PortKey};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

// ─── Helpers ─────────────────────────────────────────────────────────────

/// Per-block `(name, direction, flags)` lists, in enumeration order.
fn port_signature(g: &NodeGraph) -> Vec<Vec<(String, Direction, PortFlags)>> {
    g.block_keys()
        .iter()
        .map(|&b| {
            g.ports_of(b)
                .map(|(_, p)| (p.name().to_owned(), p.direction(), p.flags()))
                .collect()
        })
        .collect()
}

/// Connections as unordered pairs of logical port identities.
fn edge_set(g: &NodeGraph) -> BTreeSet<(PortId, PortId)> {
    g.connections()
        .filter(|(_, c)| c.is_complete())
        .map(|(_, c)| {
            let a = g.port(c.source().unwrap()).unwrap().id();
            let b = g.port(c.destination().unwrap()).unwrap().id();
            (a.min(b), a.max(b))
        })
        .collect()
}

fn roundtrip(g: &NodeGraph) -> NodeGraph {
    let bytes = save_to_vec(g).expect("save failed");
    let mut fresh = NodeGraph::new();
    load_from_slice(&mut fresh, &bytes).expect("load failed");
    fresh.check_invariants().unwrap();
    fresh
}

/// The block layout the demo window starts with.
fn demo_block(g: &mut NodeGraph, position: Point, index: usize) -> Vec<PortKey> {
    let b = g.add_block(position);
    g.add_port(b, format!("myTest{index}"), Direction::Input, PortFlags::NAME, PortId::UNASSIGNED)
        .unwrap();
    g.add_port(b, "TestEntity", Direction::Input, PortFlags::TYPE, PortId::UNASSIGNED)
        .unwrap();
    let mut ports = g.add_input_ports(b, ["Input 1", "Input 2", "Input 3"]).unwrap();
    ports.extend(
        g.add_output_ports(b, ["Output 1", "Output 2", "Output 3", "Output 4"])
            .unwrap(),
    );
    ports
}

// ─── Tests ───────────────────────────────────────────────────────────────

#[test]
fn single_connection_scenario() {
    let mut g = NodeGraph::new();
    let a = g.add_block(Point::new(0.0, 0.0));
    let b = g.add_block(Point::new(150.0, 0.0));
    let out = g.add_output_port(a, "Out1").unwrap();
    let inp = g.add_input_port(b, "In1").unwrap();
    g.connect(out, inp).unwrap();

    let loaded = roundtrip(&g);
    assert_eq!(loaded.block_count(), 2);
    assert_eq!(loaded.connection_count(), 1);
    assert_eq!(port_signature(&loaded), port_signature(&g));
    assert_eq!(edge_set(&loaded), edge_set(&g));

    let (_, c) = loaded.connections().next().unwrap();
    let src = loaded.port(c.source().unwrap()).unwrap();
    let dst = loaded.port(c.destination().unwrap()).unwrap();
    assert_eq!((src.name(), src.is_output()), ("Out1", true));
    assert_eq!((dst.name(), dst.is_output()), ("In1", false));
}

#[test]
fn demo_graph_roundtrip() {
    let mut g = NodeGraph::new();
    let p0 = demo_block(&mut g, Point::new(0.0, 0.0), 1);
    let p1 = demo_block(&mut g, Point::new(150.0, 0.0), 2);
    let p2 = demo_block(&mut g, Point::new(150.0, 150.0), 3);
    // Output 1 of block 0 → Input 1 of blocks 1 and 2; Output 4 of block 2 → Input 3 of block 0.
    g.connect(p0[3], p1[0]).unwrap();
    g.connect(p0[3], p2[0]).unwrap();
    g.connect(p2[6], p0[2]).unwrap();

    let loaded = roundtrip(&g);
    assert_eq!(port_signature(&loaded), port_signature(&g));
    assert_eq!(edge_set(&loaded), edge_set(&g));

    // Geometry is recomputed identically from the same inputs.
    for (orig, copy) in g.block_keys().iter().zip(loaded.block_keys()) {
        assert_eq!(g.block(*orig).unwrap().size(), loaded.block(*copy).unwrap().size());
        assert_eq!(
            g.block(*orig).unwrap().position(),
            loaded.block(*copy).unwrap().position()
        );
    }
}

#[test]
fn splits_survive_roundtrip_in_order() {
    let mut g = NodeGraph::new();
    let a = g.add_block(Point::new(0.0, 0.0));
    let b = g.add_block(Point::new(300.0, 0.0));
    let out = g.add_output_port(a, "o").unwrap();
    let inp = g.add_input_port(b, "i").unwrap();
    let c = g.connect(out, inp).unwrap();
    let s1 = g.insert_split(c, Point::new(100.0, 0.0)).unwrap();
    let s2 = g.insert_split(c, Point::new(200.0, 0.0)).unwrap();
    g.move_split(s1, Point::new(100.0, 60.0)).unwrap();
    g.move_split(s2, Point::new(200.0, -60.0)).unwrap();

    let loaded = roundtrip(&g);
    let lc = loaded.connection_keys()[0];
    assert_eq!(
        loaded.split_positions(lc),
        vec![Point::new(100.0, 60.0), Point::new(200.0, -60.0)]
    );
    assert_eq!(
        loaded.connection(lc).unwrap().path().elements(),
        g.connection(c).unwrap().path().elements()
    );
}

#[test]
fn loading_replaces_existing_contents() {
    let mut g = NodeGraph::new();
    let a = g.add_block(Point::ORIGIN);
    g.add_input_port(a, "only").unwrap();
    let bytes = save_to_vec(&g).unwrap();

    let mut target = NodeGraph::new();
    for i in 0..3 {
        let b = target.add_block(Point::new(i as f64, 0.0));
        target.add_output_port(b, "junk").unwrap();
    }
    load_from_slice(&mut target, &bytes).unwrap();
    assert_eq!(target.block_count(), 1);
    assert_eq!(port_signature(&target), port_signature(&g));
}

#[test]
fn empty_names_and_flags_roundtrip() {
    let mut g = NodeGraph::new();
    let a = g.add_block(Point::ORIGIN);
    g.add_port(a, "", Direction::Output, PortFlags::NAME | PortFlags::TYPE, PortId::UNASSIGNED)
        .unwrap();
    let loaded = roundtrip(&g);
    assert_eq!(port_signature(&loaded), port_signature(&g));
}
