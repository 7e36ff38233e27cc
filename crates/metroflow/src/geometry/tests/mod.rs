
use eframe::egui::Pos2;

use super::path::{PathSegment, RoutedPath};
use super::*;
use crate::model::{NodeStyle, Shape, ShapeKind};

/// Helper to create a shape of any kind centred on (x, y).
fn shape(kind: ShapeKind, x: f32, y: f32, w: f32, h: f32) -> Shape {
    Shape {
        id: format!("{}@{x},{y}", kind.name()),
        kind,
        label: String::new(),
        x,
        y,
        width: w,
        height: h,
        style: NodeStyle::default(),
    }
}

fn rect(x: f32, y: f32, w: f32, h: f32) -> Shape {
    shape(ShapeKind::Rect, x, y, w, h)
}

fn circle(x: f32, y: f32, d: f32) -> Shape {
    shape(ShapeKind::Circle, x, y, d, d)
}

fn pt(x: f32, y: f32) -> Pos2 {
    Pos2::new(x, y)
}

/// Assert two points agree to within `eps` world units.
fn assert_near(a: Pos2, b: Pos2, eps: f32) {
    assert!((a - b).length() <= eps, "{a:?} is not within {eps} of {b:?}");
}
