//! Integration tests: pointer gestures against real hit testing.

use nv_core::path::nearest_on_path;
use nv_core::{BlockKey, Point, PortKey};
use nv_editor::{EventResponse, GestureState, NodeEditor, PointerButton, PointerEvent};
use pretty_assertions::assert_eq;

const LEFT: PointerButton = PointerButton::Left;
const RIGHT: PointerButton = PointerButton::Right;

fn press(button: PointerButton, at: Point) -> PointerEvent {
    PointerEvent::from_pointer_down(button, at.x, at.y)
}

fn moved(at: Point) -> PointerEvent {
    PointerEvent::from_pointer_move(at.x, at.y)
}

fn release(button: PointerButton, at: Point) -> PointerEvent {
    PointerEvent::from_pointer_up(button, at.x, at.y)
}

fn port_at(ed: &NodeEditor, port: PortKey) -> Point {
    ed.graph().port_scene_position(port).unwrap()
}

/// Press on `from`, drag to `to`, release there.
fn drag(ed: &mut NodeEditor, from: Point, to: Point) -> [EventResponse; 3] {
    [
        ed.handle_event(&press(LEFT, from)),
        ed.handle_event(&moved(to)),
        ed.handle_event(&release(LEFT, to)),
    ]
}

struct Pair {
    ed: NodeEditor,
    a: BlockKey,
    out1: PortKey,
    in1: PortKey,
}

fn pair(b_at: Point) -> Pair {
    let mut ed = NodeEditor::default();
    let a = ed.add_block(Point::new(0.0, 0.0));
    let b = ed.add_block(b_at);
    let out1 = ed.graph_mut().add_output_port(a, "Out1").unwrap();
    let in1 = ed.graph_mut().add_input_port(b, "In1").unwrap();
    Pair { ed, a, out1, in1 }
}

// ─── Drawing ─────────────────────────────────────────────────────────────

#[test]
fn out1_to_in1_creates_one_connection() {
    let Pair { mut ed, out1, in1, .. } = pair(Point::new(150.0, 0.0));
    let (from, to) = (port_at(&ed, out1), port_at(&ed, in1));

    assert_eq!(ed.handle_event(&press(LEFT, from)), EventResponse::Consumed);
    assert!(matches!(ed.gesture(), GestureState::Drawing { .. }));
    assert_eq!(ed.handle_event(&moved(to)), EventResponse::Consumed);
    assert_eq!(ed.handle_event(&release(LEFT, to)), EventResponse::Consumed);
    assert_eq!(ed.gesture(), GestureState::Idle);

    let g = ed.graph();
    assert_eq!(g.connection_count(), 1);
    let (_, c) = g.connections().next().unwrap();
    assert_eq!(c.source(), Some(out1));
    assert_eq!(c.destination(), Some(in1));
    assert_eq!(c.start(), from);
    assert_eq!(c.end(), to);
    assert!(g.is_connected(out1, in1));
    g.check_invariants().unwrap();
}

#[test]
fn free_end_tracks_the_pointer() {
    let Pair { mut ed, out1, .. } = pair(Point::new(150.0, 0.0));
    ed.handle_event(&press(LEFT, port_at(&ed, out1)));
    ed.handle_event(&moved(Point::new(80.0, 120.0)));

    let GestureState::Drawing { connection } = ed.gesture() else {
        panic!("not drawing");
    };
    let c = ed.graph().connection(connection).unwrap();
    assert_eq!(c.end(), Point::new(80.0, 120.0));
    assert!(!c.is_complete());
}

#[test]
fn output_to_output_is_rejected() {
    let mut ed = NodeEditor::default();
    let a = ed.add_block(Point::new(0.0, 0.0));
    let b = ed.add_block(Point::new(200.0, 0.0));
    let oa = ed.graph_mut().add_output_port(a, "oa").unwrap();
    let ob = ed.graph_mut().add_output_port(b, "ob").unwrap();
    ed.take_changes();

    let (from, to) = (port_at(&ed, oa), port_at(&ed, ob));
    let responses = drag(&mut ed, from, to);
    assert_eq!(responses, [EventResponse::Consumed; 3]);
    assert_eq!(ed.gesture(), GestureState::Idle);
    assert_eq!(ed.graph().connection_count(), 0);
    assert!(ed.graph().port(oa).unwrap().attachments().is_empty());
    assert!(ed.graph().port(ob).unwrap().attachments().is_empty());
}

#[test]
fn same_block_is_rejected() {
    let mut ed = NodeEditor::default();
    let a = ed.add_block(Point::new(0.0, 0.0));
    let out = ed.graph_mut().add_output_port(a, "o").unwrap();
    let inp = ed.graph_mut().add_input_port(a, "i").unwrap();
    let (from, to) = (port_at(&ed, out), port_at(&ed, inp));
    drag(&mut ed, from, to);
    assert_eq!(ed.graph().connection_count(), 0);
}

#[test]
fn duplicate_edge_is_rejected() {
    let Pair { mut ed, out1, in1, .. } = pair(Point::new(150.0, 0.0));
    let (from, to) = (port_at(&ed, out1), port_at(&ed, in1));
    drag(&mut ed, from, to);
    drag(&mut ed, from, to);
    // Drawing from the input end is the same unordered pair
    drag(&mut ed, to, from);
    assert_eq!(ed.graph().connection_count(), 1);
    ed.graph().check_invariants().unwrap();
}

#[test]
fn release_on_empty_space_discards() {
    let Pair { mut ed, out1, .. } = pair(Point::new(150.0, 0.0));
    let (from, to) = (port_at(&ed, out1), Point::new(60.0, 300.0));
    drag(&mut ed, from, to);
    assert_eq!(ed.graph().connection_count(), 0);
    assert_eq!(ed.gesture(), GestureState::Idle);
}

#[test]
fn input_to_output_connects_backwards() {
    let Pair { mut ed, out1, in1, .. } = pair(Point::new(150.0, 0.0));
    let (from, to) = (port_at(&ed, in1), port_at(&ed, out1));
    drag(&mut ed, from, to);
    let (_, c) = ed.graph().connections().next().unwrap();
    assert_eq!((c.source(), c.destination()), (Some(in1), Some(out1)));
}

// ─── Forwarding ──────────────────────────────────────────────────────────

#[test]
fn block_press_and_empty_clicks_are_forwarded() {
    let Pair { mut ed, .. } = pair(Point::new(150.0, 0.0));
    assert_eq!(
        ed.handle_event(&press(LEFT, Point::new(0.0, 0.0))),
        EventResponse::Forwarded
    );
    assert_eq!(
        ed.handle_event(&press(RIGHT, Point::new(500.0, 500.0))),
        EventResponse::Forwarded
    );
    assert_eq!(
        ed.handle_event(&release(LEFT, Point::new(0.0, 0.0))),
        EventResponse::Forwarded
    );
    assert_eq!(
        ed.handle_event(&press(PointerButton::Middle, Point::new(0.0, 0.0))),
        EventResponse::Forwarded
    );
    assert_eq!(ed.graph().block_count(), 2);
}

// ─── Deletion ────────────────────────────────────────────────────────────

#[test]
fn right_click_on_block_cascades() {
    let Pair { mut ed, a, out1, in1 } = pair(Point::new(150.0, 0.0));
    let (from, to) = (port_at(&ed, out1), port_at(&ed, in1));
    drag(&mut ed, from, to);
    assert_eq!(ed.graph().connection_count(), 1);

    let centre = ed.graph().block(a).unwrap().position();
    assert_eq!(ed.handle_event(&press(RIGHT, centre)), EventResponse::Consumed);
    assert_eq!(ed.graph().block_count(), 1);
    assert_eq!(ed.graph().connection_count(), 0);
    assert!(ed.graph().port(in1).unwrap().attachments().is_empty());
    ed.graph().check_invariants().unwrap();
}

#[test]
fn right_click_on_connection_deletes_only_it() {
    let Pair { mut ed, out1, in1, .. } = pair(Point::new(300.0, 0.0));
    let (from, to) = (port_at(&ed, out1), port_at(&ed, in1));
    drag(&mut ed, from, to);
    let (_, c) = ed.graph().connections().next().unwrap();
    let on_curve = nearest_on_path(c.path(), Point::new(150.0, 0.0)).unwrap().point;

    assert_eq!(ed.handle_event(&press(RIGHT, on_curve)), EventResponse::Consumed);
    assert_eq!(ed.graph().connection_count(), 0);
    assert_eq!(ed.graph().block_count(), 2);
    assert_eq!(ed.graph().port_count(), 2);
}

// ─── Splits ──────────────────────────────────────────────────────────────

#[test]
fn dragging_a_split_bends_the_connection() {
    let Pair { mut ed, out1, in1, .. } = pair(Point::new(300.0, 0.0));
    let (from, to) = (port_at(&ed, out1), port_at(&ed, in1));
    drag(&mut ed, from, to);
    let conn = ed.graph().connection_keys()[0];
    let split = ed.graph_mut().insert_split(conn, Point::new(150.0, 0.0)).unwrap();
    let grab = ed.graph().split(split).unwrap().position();

    assert_eq!(ed.handle_event(&press(LEFT, grab)), EventResponse::Consumed);
    assert_eq!(ed.gesture(), GestureState::DraggingSplit { split });
    ed.handle_event(&moved(Point::new(150.0, 90.0)));
    assert_eq!(ed.handle_event(&release(LEFT, Point::new(150.0, 90.0))), EventResponse::Consumed);
    assert_eq!(ed.gesture(), GestureState::Idle);

    assert_eq!(ed.graph().split_positions(conn), vec![Point::new(150.0, 90.0)]);
    let path = ed.graph().connection(conn).unwrap().path();
    let hit = nearest_on_path(path, Point::new(150.0, 90.0)).unwrap();
    assert!(hit.distance < 1e-3);
}

#[test]
fn right_click_on_split_removes_it() {
    let Pair { mut ed, out1, in1, .. } = pair(Point::new(300.0, 0.0));
    let (from, to) = (port_at(&ed, out1), port_at(&ed, in1));
    drag(&mut ed, from, to);
    let conn = ed.graph().connection_keys()[0];
    let split = ed.graph_mut().insert_split(conn, Point::new(150.0, 0.0)).unwrap();
    let at = ed.graph().split(split).unwrap().position();

    assert_eq!(ed.handle_event(&press(RIGHT, at)), EventResponse::Consumed);
    assert_eq!(ed.graph().split_count(), 0);
    assert_eq!(ed.graph().connection_count(), 1);
}

// ─── Cancellation ────────────────────────────────────────────────────────

#[test]
fn cancel_mid_gesture_leaves_no_trace() {
    let Pair { mut ed, out1, .. } = pair(Point::new(150.0, 0.0));
    ed.handle_event(&press(LEFT, port_at(&ed, out1)));
    ed.handle_event(&moved(Point::new(40.0, 40.0)));
    ed.cancel_gesture();

    assert_eq!(ed.gesture(), GestureState::Idle);
    assert_eq!(ed.graph().connection_count(), 0);
    assert!(ed.graph().port(out1).unwrap().attachments().is_empty());
    ed.graph().check_invariants().unwrap();
}
