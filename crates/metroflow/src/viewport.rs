use eframe::egui::{Pos2, Rect, Vec2};

use crate::model::Shape;

/// Size of the fixed device canvas the transform operates in.
pub const DEVICE_SIZE: Vec2 = Vec2::new(2000.0, 2000.0);

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 5.0;
/// Fit-to-content never zooms in further than this.
const FIT_MAX_ZOOM: f32 = 2.0;
const FIT_PADDING: f32 = 100.0;
/// Content spans narrower than this are widened by `FIT_PADDING` per side.
const FIT_MIN_SPAN: f32 = 200.0;

const WHEEL_ZOOM_IN: f32 = 1.1;
const WHEEL_ZOOM_OUT: f32 = 0.9;
pub const BUTTON_ZOOM_IN: f32 = 1.2;
pub const BUTTON_ZOOM_OUT: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Pan/zoom mapping from world to device space: `device = world * k + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub k: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            k: 0.8,
        }
    }
}

impl Transform {
    /// Shift by a raw pointer delta. The delta is not divided by `k`, so
    /// panning speed does not depend on zoom.
    pub fn pan(&mut self, delta: Vec2) {
        if delta.x.is_finite() && delta.y.is_finite() {
            self.x += delta.x;
            self.y += delta.y;
        }
    }

    /// One wheel notch. Zoom is about the transform origin, not the cursor.
    pub fn zoom_wheel(&mut self, direction: ScrollDirection) {
        let factor = match direction {
            ScrollDirection::Down => WHEEL_ZOOM_OUT,
            ScrollDirection::Up => WHEEL_ZOOM_IN,
        };
        self.zoom_by(factor);
    }

    /// Multiply the scale by `factor`, clamped to [`MIN_ZOOM`, `MAX_ZOOM`].
    pub fn zoom_by(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn world_to_device(&self, p: Pos2) -> Pos2 {
        Pos2::new(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    pub fn device_to_world(&self, p: Pos2) -> Pos2 {
        Pos2::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
    }

    /// Centre the bounding box of `shapes` in a viewport of `viewport` device
    /// units. With no shapes, returns the default transform.
    pub fn fit_to_content(shapes: &[Shape], viewport: Vec2) -> Self {
        let Some(bounds) = shapes
            .iter()
            .map(Shape::bounds)
            .reduce(|acc, r| acc.union(r))
        else {
            return Self::default();
        };

        let (mut min_x, mut max_x) = (bounds.min.x, bounds.max.x);
        let (mut min_y, mut max_y) = (bounds.min.y, bounds.max.y);
        if max_x - min_x < FIT_MIN_SPAN {
            min_x -= FIT_PADDING;
            max_x += FIT_PADDING;
        }
        if max_y - min_y < FIT_MIN_SPAN {
            min_y -= FIT_PADDING;
            max_y += FIT_PADDING;
        }

        let content_w = max_x - min_x + FIT_PADDING * 2.0;
        let content_h = max_y - min_y + FIT_PADDING * 2.0;
        let center = Pos2::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);

        let k = (viewport.x / content_w)
            .min(viewport.y / content_h)
            .min(FIT_MAX_ZOOM);

        Self {
            x: viewport.x / 2.0 - center.x * k,
            y: viewport.y / 2.0 - center.y * k,
            k,
        }
    }

    /// Frame the bounding box of `shapes`, padded by `padding` world units,
    /// inside an output of `size` pixels. The content is scaled to fit and
    /// centred; no zoom limit applies.
    pub fn frame_for_export(shapes: &[Shape], size: Vec2, padding: f32) -> Self {
        let Some(bounds) = shapes
            .iter()
            .map(Shape::bounds)
            .reduce(|acc, r| acc.union(r))
        else {
            return Self::default();
        };
        let framed = bounds.expand(padding);
        let k = (size.x / framed.width()).min(size.y / framed.height());
        let k = if k.is_finite() && k > 0.0 { k } else { 1.0 };
        let center = framed.center();
        Self {
            x: size.x / 2.0 - center.x * k,
            y: size.y / 2.0 - center.y * k,
            k,
        }
    }
}

/// Maps the on-screen canvas rect onto the fixed device canvas, letterboxed
/// so the whole device area stays visible at a uniform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMapping {
    pub screen: Rect,
    pub device: Vec2,
}

impl SurfaceMapping {
    pub fn new(screen: Rect) -> Self {
        Self {
            screen,
            device: DEVICE_SIZE,
        }
    }

    /// A mapping whose device area is the screen rect itself, one device
    /// unit per pixel. Used for offscreen output.
    pub fn pixel_exact(screen: Rect) -> Self {
        Self {
            screen,
            device: screen.size(),
        }
    }

    /// Screen pixels per device unit.
    pub fn scale(&self) -> f32 {
        let s = (self.screen.width() / self.device.x).min(self.screen.height() / self.device.y);
        if s.is_finite() && s > 0.0 { s } else { 1.0 }
    }

    /// Top-left of the device area on screen.
    fn origin(&self) -> Pos2 {
        let used = self.device * self.scale();
        self.screen.center() - used / 2.0
    }

    pub fn screen_to_device(&self, p: Pos2) -> Pos2 {
        ((p - self.origin()) / self.scale()).to_pos2()
    }

    pub fn device_to_screen(&self, p: Pos2) -> Pos2 {
        self.origin() + p.to_vec2() * self.scale()
    }

    /// Pointer position to world coordinates through the surface and the
    /// pan/zoom transform.
    pub fn screen_to_world(&self, p: Pos2, transform: &Transform) -> Pos2 {
        transform.device_to_world(self.screen_to_device(p))
    }

    pub fn world_to_screen(&self, p: Pos2, transform: &Transform) -> Pos2 {
        self.device_to_screen(transform.world_to_device(p))
    }

    /// Screen pixels per world unit.
    pub fn world_scale(&self, transform: &Transform) -> f32 {
        self.scale() * transform.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeStyle, ShapeKind};

    fn rect(id: &str, x: f32, y: f32, w: f32, h: f32) -> Shape {
        Shape {
            id: id.to_string(),
            kind: ShapeKind::Rect,
            label: String::new(),
            x,
            y,
            width: w,
            height: h,
            style: NodeStyle::default(),
        }
    }

    #[test]
    fn test_export_frame_letterboxes_content() {
        // 400x200 content plus 50 padding is 500x300; into 1000x1000 the
        // width limits the scale to 2.
        let shapes = vec![rect("a", 0.0, 0.0, 400.0, 200.0)];
        let t = Transform::frame_for_export(&shapes, Vec2::new(1000.0, 1000.0), 50.0);
        assert_eq!(t.k, 2.0);
        let top_left = t.world_to_device(Pos2::new(-250.0, -150.0));
        assert_eq!(top_left, Pos2::new(0.0, 200.0));
        let center = t.world_to_device(Pos2::ZERO);
        assert_eq!(center, Pos2::new(500.0, 500.0));
    }

    #[test]
    fn test_export_frame_without_shapes() {
        let t = Transform::frame_for_export(&[], Vec2::new(1280.0, 720.0), 50.0);
        assert_eq!(t, Transform::default());
    }

    #[test]
    fn test_wheel_zoom_stays_in_bounds() {
        let mut t = Transform::default();
        for _ in 0..200 {
            t.zoom_wheel(ScrollDirection::Up);
        }
        assert_eq!(t.k, MAX_ZOOM);
        for _ in 0..200 {
            t.zoom_wheel(ScrollDirection::Down);
        }
        assert_eq!(t.k, MIN_ZOOM);
    }

    #[test]
    fn test_zoom_ignores_non_finite_factor() {
        let mut t = Transform::default();
        t.zoom_by(f32::NAN);
        t.zoom_by(f32::INFINITY);
        t.zoom_by(-3.0);
        assert_eq!(t.k, 0.8);
    }

    #[test]
    fn test_pan_is_scale_invariant() {
        let mut t = Transform {
            x: 10.0,
            y: 20.0,
            k: 3.0,
        };
        t.pan(Vec2::new(5.0, -5.0));
        assert_eq!((t.x, t.y, t.k), (15.0, 15.0, 3.0));
    }

    #[test]
    fn test_device_world_inverse() {
        let t = Transform {
            x: 120.0,
            y: -40.0,
            k: 1.5,
        };
        let world = Pos2::new(333.0, 71.0);
        let back = t.device_to_world(t.world_to_device(world));
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn test_surface_letterboxes_wide_screen() {
        // 2000x1000 screen shows the 2000x2000 device area at half scale,
        // centred horizontally.
        let mapping = SurfaceMapping::new(Rect::from_min_size(
            Pos2::ZERO,
            Vec2::new(2000.0, 1000.0),
        ));
        assert_eq!(mapping.scale(), 0.5);
        assert_eq!(mapping.device_to_screen(Pos2::ZERO), Pos2::new(500.0, 0.0));
        assert_eq!(
            mapping.screen_to_device(Pos2::new(1000.0, 500.0)),
            Pos2::new(1000.0, 1000.0)
        );
    }

    #[test]
    fn test_screen_to_world_through_transform() {
        let mapping = SurfaceMapping::new(Rect::from_min_size(Pos2::ZERO, DEVICE_SIZE));
        let t = Transform {
            x: 100.0,
            y: 200.0,
            k: 2.0,
        };
        assert_eq!(
            mapping.screen_to_world(Pos2::new(300.0, 400.0), &t),
            Pos2::new(100.0, 100.0)
        );
    }

    #[test]
    fn test_fit_empty_resets() {
        let t = Transform::fit_to_content(&[], DEVICE_SIZE);
        assert_eq!(t, Transform::default());
    }

    #[test]
    fn test_fit_centres_content() {
        let shapes = vec![rect("a", 0.0, 0.0, 100.0, 100.0), rect("b", 800.0, 400.0, 100.0, 100.0)];
        let t = Transform::fit_to_content(&shapes, DEVICE_SIZE);
        // Content spans -50..850 x -50..450 -> 1100 x 700 with padding.
        let expected_k = 2000.0 / 1100.0;
        assert!((t.k - expected_k).abs() < 1e-4);
        let center = t.world_to_device(Pos2::new(400.0, 200.0));
        assert!((center - Pos2::new(1000.0, 1000.0)).length() < 1e-2);
    }

    #[test]
    fn test_fit_single_shape_caps_zoom() {
        let shapes = vec![rect("a", 50.0, 50.0, 20.0, 20.0)];
        let t = Transform::fit_to_content(&shapes, DEVICE_SIZE);
        assert_eq!(t.k, 2.0);
        let center = t.world_to_device(Pos2::new(50.0, 50.0));
        assert!((center - Pos2::new(1000.0, 1000.0)).length() < 1e-3);
    }
}
