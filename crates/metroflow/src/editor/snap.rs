use eframe::egui::{Pos2, Vec2};

use crate::model::{Shape, ShapeKind};

/// Grid step applied to every drag move.
pub const DRAG_GRID: f32 = 10.0;
/// Grid step for newly placed shapes.
pub const PLACE_GRID: f32 = 20.0;
/// Centres closer than this on one axis snap together.
pub const ALIGN_THRESHOLD: f32 = 15.0;
/// Smallest extent a resize gesture can produce.
pub const MIN_RESIZE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideAxis {
    /// Line of constant x.
    Vertical,
    /// Line of constant y.
    Horizontal,
}

/// Transient feedback line shown while a dragged shape is aligned with another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentGuide {
    pub axis: GuideAxis,
    pub pos: f32,
}

/// Round half up, matching the placement grid users see in saved diagrams.
fn round_to(v: f32, step: f32) -> f32 {
    (v / step + 0.5).floor() * step
}

pub fn snap_to_grid(p: Pos2, step: f32) -> Pos2 {
    Pos2::new(round_to(p.x, step), round_to(p.y, step))
}

/// Snap `candidate` onto the centre axes of `others`.
///
/// Per axis, the first shape within [`ALIGN_THRESHOLD`] wins: the coordinate
/// is set to that shape's and one guide is emitted. Axes with no match keep
/// the candidate's value.
pub fn align<'a>(
    candidate: Pos2,
    others: impl IntoIterator<Item = &'a Shape>,
) -> (Pos2, Vec<AlignmentGuide>) {
    let mut snapped_x: Option<f32> = None;
    let mut snapped_y: Option<f32> = None;

    for other in others {
        if snapped_x.is_none() && (other.x - candidate.x).abs() < ALIGN_THRESHOLD {
            snapped_x = Some(other.x);
        }
        if snapped_y.is_none() && (other.y - candidate.y).abs() < ALIGN_THRESHOLD {
            snapped_y = Some(other.y);
        }
        if snapped_x.is_some() && snapped_y.is_some() {
            break;
        }
    }

    let mut guides = Vec::with_capacity(2);
    if let Some(x) = snapped_x {
        guides.push(AlignmentGuide {
            axis: GuideAxis::Vertical,
            pos: x,
        });
    }
    if let Some(y) = snapped_y {
        guides.push(AlignmentGuide {
            axis: GuideAxis::Horizontal,
            pos: y,
        });
    }

    (
        Pos2::new(
            snapped_x.unwrap_or(candidate.x),
            snapped_y.unwrap_or(candidate.y),
        ),
        guides,
    )
}

/// New (width, height) when the resize handle is dragged to `pointer`.
///
/// Sizes grow symmetrically from the centre. Circles keep a 1:1 aspect using
/// the larger axis distance.
pub fn resized_extent(kind: ShapeKind, center: Pos2, pointer: Pos2) -> Vec2 {
    let dx = (pointer.x - center.x).abs();
    let dy = (pointer.y - center.y).abs();
    match kind {
        ShapeKind::Circle => {
            let size = (dx.max(dy) * 2.0).max(MIN_RESIZE);
            Vec2::splat(size)
        }
        ShapeKind::Rect | ShapeKind::Text | ShapeKind::Decorative => {
            Vec2::new((dx * 2.0).max(MIN_RESIZE), (dy * 2.0).max(MIN_RESIZE))
        }
    }
}
