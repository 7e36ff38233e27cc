mod create;
mod delete;
mod drag;

use eframe::egui::{Pos2, Rect};

use super::{Editor, PointerInput, SessionConfig, Tool};
use crate::model::{DiagramSnapshot, Link, LinkStyle, NodeStyle, Shape, ShapeKind};
use crate::viewport::{DEVICE_SIZE, SurfaceMapping, Transform};

/// Helper to create a rectangle centred on (x, y).
fn rect(id: &str, x: f32, y: f32, w: f32, h: f32) -> Shape {
    Shape {
        id: id.to_string(),
        kind: ShapeKind::Rect,
        label: id.to_uppercase(),
        x,
        y,
        width: w,
        height: h,
        style: NodeStyle::default(),
    }
}

/// Helper to create a circle of diameter `d`.
fn circle(id: &str, x: f32, y: f32, d: f32) -> Shape {
    Shape {
        kind: ShapeKind::Circle,
        ..rect(id, x, y, d, d)
    }
}

/// Helper to create a link without a cached path.
fn link(id: &str, source: &str, target: &str) -> Link {
    Link {
        id: id.to_string(),
        source_id: source.to_string(),
        target_id: target.to_string(),
        path: None,
        traffic_speed: 1.0,
        traffic_density: 0.02,
        style: LinkStyle::default(),
    }
}

/// Editor over the given diagram with an identity view, so screen
/// coordinates equal world coordinates.
fn editor_with(shapes: Vec<Shape>, links: Vec<Link>) -> Editor {
    let mut editor =
        Editor::with_snapshot(SessionConfig::default(), DiagramSnapshot { shapes, links });
    *editor.transform_mut() = Transform {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };
    editor
}

fn surface() -> SurfaceMapping {
    SurfaceMapping::new(Rect::from_min_size(Pos2::ZERO, DEVICE_SIZE))
}

fn click(editor: &mut Editor, x: f32, y: f32) {
    let input = PointerInput::new(Pos2::new(x, y));
    editor.pointer_down(input, &surface());
    editor.pointer_up(input, &surface());
}

fn shift_click(editor: &mut Editor, x: f32, y: f32) {
    let input = PointerInput::with_modifier(Pos2::new(x, y));
    editor.pointer_down(input, &surface());
    editor.pointer_up(input, &surface());
}

/// Press at `from`, move to `to` in one step, and release there.
fn drag(editor: &mut Editor, from: (f32, f32), to: (f32, f32)) {
    let start = PointerInput::new(Pos2::new(from.0, from.1));
    let end = PointerInput::new(Pos2::new(to.0, to.1));
    editor.pointer_down(start, &surface());
    editor.pointer_move(end, &surface());
    editor.pointer_up(end, &surface());
}

fn center_of(editor: &Editor, id: &str) -> Pos2 {
    match editor.shape(id) {
        Some(shape) => shape.center(),
        None => panic!("shape {id} missing"),
    }
}

fn select_tool(editor: &mut Editor, tool: Tool) {
    editor.set_tool(tool);
    assert_eq!(editor.tool(), tool);
}
