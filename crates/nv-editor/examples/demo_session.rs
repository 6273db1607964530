//! Builds the three-block demo graph, draws a connection with pointer
//! events, then saves and reopens it.
//!
//! ```sh
//! RUST_LOG=debug cargo run -p nv-editor --example demo_session
//! ```

use nv_core::{BlockKey, Direction, Point, PortFlags, PortId};
use nv_editor::{EditorConfig, NodeEditor, PointerButton, PointerEvent};
use std::error::Error;

fn demo_block(ed: &mut NodeEditor, position: Point, index: usize) -> Result<BlockKey, Box<dyn Error>> {
    let block = ed.add_block(position);
    let g = ed.graph_mut();
    g.add_port(block, format!("myTest{index}"), Direction::Input, PortFlags::NAME, PortId::UNASSIGNED)?;
    g.add_port(block, "TestEntity", Direction::Input, PortFlags::TYPE, PortId::UNASSIGNED)?;
    g.add_input_ports(block, ["Input 1", "Input 2", "Input 3"])?;
    g.add_output_ports(block, ["Output 1", "Output 2", "Output 3", "Output 4"])?;
    Ok(block)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut editor = NodeEditor::new(EditorConfig::default());
    let first = demo_block(&mut editor, Point::new(0.0, 0.0), 1)?;
    let second = demo_block(&mut editor, Point::new(150.0, 0.0), 2)?;
    demo_block(&mut editor, Point::new(150.0, 150.0), 3)?;

    // Drag from "Output 1" of the first block to "Input 1" of the second
    let g = editor.graph();
    let from = g.ports_of(first).find(|(_, p)| p.name() == "Output 1").map(|(k, _)| k);
    let to = g.ports_of(second).find(|(_, p)| p.name() == "Input 1").map(|(k, _)| k);
    let (Some(from), Some(to)) = (
        from.and_then(|k| g.port_scene_position(k)),
        to.and_then(|k| g.port_scene_position(k)),
    ) else {
        return Err("demo ports missing".into());
    };
    for event in [
        PointerEvent::from_pointer_down(PointerButton::Left, from.x, from.y),
        PointerEvent::from_pointer_move((from.x + to.x) / 2.0, from.y + 40.0),
        PointerEvent::from_pointer_move(to.x, to.y),
        PointerEvent::from_pointer_up(PointerButton::Left, to.x, to.y),
    ] {
        let response = editor.handle_event(&event);
        log::info!("{event:?} -> {response:?}");
    }
    log::info!("{} change(s) since start", editor.take_changes().len());

    let mut bytes = Vec::new();
    let saved = editor.save(&mut bytes)?;
    log::info!(
        "saved {} blocks / {} ports / {} connections in {} bytes",
        saved.blocks,
        saved.ports,
        saved.connections,
        bytes.len()
    );

    let mut reopened = NodeEditor::default();
    let loaded = reopened.load(bytes.as_slice())?;
    reopened.graph().check_invariants()?;
    log::info!("reopened: {loaded:?}");
    log::info!("display list has {} items", reopened.display_list().len());
    Ok(())
}
