pub mod path;

#[cfg(test)]
mod tests;

use eframe::egui::{Pos2, Vec2};

use crate::model::{Shape, ShapeKind};
use path::{PathSegment, RoutedPath};

/// Default corner radius used when a caller has no session radius at hand.
pub const DEFAULT_CORNER_RADIUS: f32 = 24.0;

/// Differences below this many world units count as "aligned" when routing.
const ALIGN_EPSILON: f32 = 1.0;

/// Side of a shape an anchor sits on, in enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorSide {
    Top,
    Right,
    Bottom,
    Left,
}

impl AnchorSide {
    /// Enumeration order used by every anchor search. Changing it changes
    /// which of two equidistant pairs wins.
    pub const ALL: [AnchorSide; 4] = [
        AnchorSide::Top,
        AnchorSide::Right,
        AnchorSide::Bottom,
        AnchorSide::Left,
    ];
}

/// The pair of anchors chosen for a link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub start: Pos2,
    pub end: Pos2,
}

/// Unit vector of `v`, or the zero vector when `v` has no length.
pub fn normalize(v: Vec2) -> Vec2 {
    let len = v.length();
    if len == 0.0 || !len.is_finite() {
        Vec2::ZERO
    } else {
        v / len
    }
}

/// The four boundary anchors of a shape in (top, right, bottom, left) order.
///
/// Circles use the cardinal points on the circle of radius `width / 2`; every
/// other kind uses the side midpoints of its axis-aligned bounding box.
pub fn anchor_points(shape: &Shape) -> [Pos2; 4] {
    let (x, y) = (shape.x, shape.y);
    let (w2, h2) = match shape.kind {
        ShapeKind::Circle => {
            let r = shape.width / 2.0;
            (r, r)
        }
        ShapeKind::Rect | ShapeKind::Text | ShapeKind::Decorative => {
            (shape.width / 2.0, shape.height / 2.0)
        }
    };

    AnchorSide::ALL.map(|side| match side {
        AnchorSide::Top => Pos2::new(x, y - h2),
        AnchorSide::Right => Pos2::new(x + w2, y),
        AnchorSide::Bottom => Pos2::new(x, y + h2),
        AnchorSide::Left => Pos2::new(x - w2, y),
    })
}

/// Pick the anchor pair with the smallest squared distance between `a` and `b`.
///
/// All 16 combinations are scanned in (top, right, bottom, left) order for
/// both shapes; the first strict minimum wins.
pub fn best_connection(a: &Shape, b: &Shape) -> Connection {
    let anchors_a = anchor_points(a);
    let anchors_b = anchor_points(b);

    let mut best = Connection {
        start: anchors_a[0],
        end: anchors_b[0],
    };
    let mut min_dist = f32::INFINITY;

    for pa in anchors_a {
        for pb in anchors_b {
            let dist = (pa - pb).length_sq();
            if dist < min_dist {
                min_dist = dist;
                best = Connection { start: pa, end: pb };
            }
        }
    }

    best
}

/// Structural points of a single metro-style hop from `start` to `end`.
///
/// Near-aligned and near-45° hops stay a direct segment. Otherwise the longer
/// axis is split into two straight runs around one 45° diagonal, giving
/// `[start, kink1, kink2, end]`.
pub fn metro_points(start: Pos2, end: Pos2) -> Vec<Pos2> {
    let d = end - start;
    let abs_dx = d.x.abs();
    let abs_dy = d.y.abs();

    if abs_dx < ALIGN_EPSILON
        || abs_dy < ALIGN_EPSILON
        || (abs_dx - abs_dy).abs() < ALIGN_EPSILON
    {
        return vec![start, end];
    }

    if abs_dx > abs_dy {
        // Horizontal -> diagonal -> horizontal
        let split = (abs_dx - abs_dy) / 2.0;
        let sign_x = d.x.signum();
        vec![
            start,
            Pos2::new(start.x + split * sign_x, start.y),
            Pos2::new(end.x - split * sign_x, end.y),
            end,
        ]
    } else {
        // Vertical -> diagonal -> vertical
        let split = (abs_dy - abs_dx) / 2.0;
        let sign_y = d.y.signum();
        vec![
            start,
            Pos2::new(start.x, start.y + split * sign_y),
            Pos2::new(end.x, end.y - split * sign_y),
            end,
        ]
    }
}

/// Effective radius at an interior corner: never more than half of either
/// adjacent segment, never negative.
pub fn corner_radius_at(prev: Pos2, corner: Pos2, next: Pos2, radius: f32) -> f32 {
    let len_in = (corner - prev).length();
    let len_out = (next - corner).length();
    radius.max(0.0).min(len_in / 2.0).min(len_out / 2.0)
}

/// Round every interior corner of `points` with a quadratic curve.
///
/// Each corner becomes: a line to the cut point `r` before the vertex, then a
/// quadratic through the vertex to the symmetric cut point `r` after it.
pub fn smooth_path(points: &[Pos2], radius: f32) -> RoutedPath {
    if points.len() < 2 {
        return RoutedPath::empty();
    }

    let mut segments = Vec::with_capacity(points.len() * 2);
    let mut cursor = points[0];

    for window in points.windows(3) {
        let (prev, corner, next) = (window[0], window[1], window[2]);
        let r = corner_radius_at(prev, corner, next, radius);

        let start_cut = corner - normalize(corner - prev) * r;
        let end_cut = corner + normalize(next - corner) * r;

        segments.push(PathSegment::Line {
            from: cursor,
            to: start_cut,
        });
        segments.push(PathSegment::Quad {
            from: start_cut,
            ctrl: corner,
            to: end_cut,
        });
        cursor = end_cut;
    }

    if let Some(&last) = points.last() {
        segments.push(PathSegment::Line { from: cursor, to: last });
    }

    RoutedPath::new(points[0], segments)
}

/// All waypoints of a multi-hop metro route, without duplicated joints.
pub fn route_points(coords: &[Pos2]) -> Vec<Pos2> {
    let Some(&first) = coords.first() else {
        return Vec::new();
    };

    let mut all = vec![first];
    for hop in coords.windows(2) {
        all.extend(metro_points(hop[0], hop[1]).into_iter().skip(1));
    }
    all
}

/// Route through `coords` and round the corners.
///
/// Fewer than two coordinates yields an empty path.
pub fn generate_line_path(coords: &[Pos2], radius: f32) -> RoutedPath {
    if coords.len() < 2 {
        return RoutedPath::empty();
    }
    smooth_path(&route_points(coords), radius)
}

/// Routed path between two shapes through their closest anchors.
pub fn link_path(source: &Shape, target: &Shape, radius: f32) -> RoutedPath {
    let Connection { start, end } = best_connection(source, target);
    generate_line_path(&[start, end], radius)
}
