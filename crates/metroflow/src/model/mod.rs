pub mod document;

use eframe::egui::{Pos2, Rect, Vec2};

use crate::geometry::path::RoutedPath;

pub type ShapeId = String;
pub type LinkId = String;

/// Speed multiplier for links that do not set one.
pub const DEFAULT_TRAFFIC_SPEED: f32 = 1.0;
/// Spawn density for links that do not set one.
pub const DEFAULT_TRAFFIC_DENSITY: f32 = 0.02;

/// Geometric kind of a shape. `Decorative` shapes carry an icon and are
/// routed like rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rect,
    Circle,
    Text,
    Decorative,
}

impl ShapeKind {
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Rect => "rect",
            ShapeKind::Circle => "circle",
            ShapeKind::Text => "text",
            ShapeKind::Decorative => "svg",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
}

/// Cosmetic fields of a shape. None of these affect routing.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStyle {
    pub fill: String,
    pub border_color: String,
    pub border_width: f32,
    pub border_style: BorderStyle,
    pub label_color: String,
    pub font_size: f32,
    pub icon_name: Option<String>,
    pub icon_color: String,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            fill: "#1f2937".to_string(),
            border_color: "#9ca3af".to_string(),
            border_width: 2.0,
            border_style: BorderStyle::Solid,
            label_color: "#ffffff".to_string(),
            font_size: 14.0,
            icon_name: Some("Box".to_string()),
            icon_color: "#ffffff".to_string(),
        }
    }
}

/// A node on the canvas, positioned by its centre.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub label: String,
    pub x: f32,
    pub y: f32,
    /// Diameter for circles.
    pub width: f32,
    pub height: f32,
    pub style: NodeStyle,
}

impl Shape {
    pub fn center(&self) -> Pos2 {
        Pos2::new(self.x, self.y)
    }

    /// Axis-aligned bounds in world space.
    pub fn bounds(&self) -> Rect {
        let height = match self.kind {
            ShapeKind::Circle => self.width,
            _ => self.height,
        };
        Rect::from_center_size(self.center(), Vec2::new(self.width, height))
    }

    /// Whether `p` lies on the shape's body.
    pub fn contains(&self, p: Pos2) -> bool {
        match self.kind {
            ShapeKind::Circle => (p - self.center()).length() <= self.width / 2.0,
            _ => self.bounds().contains(p),
        }
    }

    /// Centre of the resize handle at the bottom-right corner of the bounds.
    pub fn resize_handle(&self) -> Pos2 {
        Pos2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Cosmetic fields of a link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkStyle {
    pub color: String,
    pub width: f32,
    pub label: Option<String>,
    pub label_size: f32,
    pub label_color: String,
    pub show_label_background: bool,
}

impl Default for LinkStyle {
    fn default() -> Self {
        Self {
            color: "#22d3ee".to_string(),
            width: 3.0,
            label: None,
            label_size: 12.0,
            label_color: "#ffffff".to_string(),
            show_label_background: true,
        }
    }
}

/// A directed connection between two shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub source_id: ShapeId,
    pub target_id: ShapeId,
    /// Cached route. Owned by the editor; stale or absent while an endpoint
    /// cannot be resolved.
    pub path: Option<RoutedPath>,
    /// Multiplier on the base signal speed (1 = normal).
    pub traffic_speed: f32,
    /// Spawn probability parameter.
    pub traffic_density: f32,
    pub style: LinkStyle,
}

impl Link {
    pub fn touches(&self, shape_id: &str) -> bool {
        self.source_id == shape_id || self.target_id == shape_id
    }
}

/// A marker travelling along a link.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub id: u64,
    pub link_id: LinkId,
    /// Fraction of the path travelled, in [0, 1).
    pub progress: f32,
    pub speed: f32,
}

/// Selected shape and link ids in click order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub shapes: Vec<ShapeId>,
    pub links: Vec<LinkId>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.links.is_empty()
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.links.clear();
    }

    pub fn has_shape(&self, id: &str) -> bool {
        self.shapes.iter().any(|s| s == id)
    }

    pub fn has_link(&self, id: &str) -> bool {
        self.links.iter().any(|l| l == id)
    }

    /// Replace the whole selection with one shape.
    pub fn select_shape(&mut self, id: &str) {
        self.links.clear();
        self.shapes.clear();
        self.shapes.push(id.to_string());
    }

    /// Replace the whole selection with one link.
    pub fn select_link(&mut self, id: &str) {
        self.shapes.clear();
        self.links.clear();
        self.links.push(id.to_string());
    }

    pub fn toggle_shape(&mut self, id: &str) {
        toggle(&mut self.shapes, id);
    }

    pub fn toggle_link(&mut self, id: &str) {
        toggle(&mut self.links, id);
    }

    /// The only selected shape, if exactly one shape is selected.
    pub fn single_shape(&self) -> Option<&str> {
        match self.shapes.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }
}

fn toggle(ids: &mut Vec<String>, id: &str) {
    if let Some(pos) = ids.iter().position(|x| x == id) {
        ids.remove(pos);
    } else {
        ids.push(id.to_string());
    }
}

/// Shapes and links captured for an external history stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagramSnapshot {
    pub shapes: Vec<Shape>,
    pub links: Vec<Link>,
}

/// Field edits for shapes coming from a property panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapePatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub label: Option<String>,
    pub fill: Option<String>,
    pub border_color: Option<String>,
    pub border_width: Option<f32>,
    pub border_style: Option<BorderStyle>,
    pub label_color: Option<String>,
    pub font_size: Option<f32>,
    pub icon_name: Option<String>,
    pub icon_color: Option<String>,
}

impl ShapePatch {
    /// Whether applying this patch can move an anchor.
    pub fn affects_geometry(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.width.is_some() || self.height.is_some()
    }

    pub fn apply(&self, shape: &mut Shape) {
        if let Some(x) = self.x {
            shape.x = x;
        }
        if let Some(y) = self.y {
            shape.y = y;
        }
        if let Some(w) = self.width {
            shape.width = w.max(MIN_EXTENT);
        }
        if let Some(h) = self.height {
            shape.height = h.max(MIN_EXTENT);
        }
        if let Some(label) = &self.label {
            shape.label = label.clone();
        }
        let style = &mut shape.style;
        if let Some(v) = &self.fill {
            style.fill = v.clone();
        }
        if let Some(v) = &self.border_color {
            style.border_color = v.clone();
        }
        if let Some(v) = self.border_width {
            style.border_width = v;
        }
        if let Some(v) = self.border_style {
            style.border_style = v;
        }
        if let Some(v) = &self.label_color {
            style.label_color = v.clone();
        }
        if let Some(v) = self.font_size {
            style.font_size = v;
        }
        if let Some(v) = &self.icon_name {
            style.icon_name = Some(v.clone());
        }
        if let Some(v) = &self.icon_color {
            style.icon_color = v.clone();
        }
    }
}

/// Field edits for links. No link field moves a route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPatch {
    pub traffic_speed: Option<f32>,
    pub traffic_density: Option<f32>,
    pub color: Option<String>,
    pub width: Option<f32>,
    pub label: Option<String>,
    pub label_size: Option<f32>,
    pub label_color: Option<String>,
    pub show_label_background: Option<bool>,
}

impl LinkPatch {
    pub fn apply(&self, link: &mut Link) {
        if let Some(v) = self.traffic_speed {
            link.traffic_speed = v.max(0.0);
        }
        if let Some(v) = self.traffic_density {
            link.traffic_density = v.max(0.0);
        }
        let style = &mut link.style;
        if let Some(v) = &self.color {
            style.color = v.clone();
        }
        if let Some(v) = self.width {
            style.width = v;
        }
        if let Some(v) = &self.label {
            style.label = (!v.is_empty()).then(|| v.clone());
        }
        if let Some(v) = self.label_size {
            style.label_size = v;
        }
        if let Some(v) = &self.label_color {
            style.label_color = v.clone();
        }
        if let Some(v) = self.show_label_background {
            style.show_label_background = v;
        }
    }
}

/// Smallest width/height a shape may take.
pub const MIN_EXTENT: f32 = 1.0;

/// The diagram shown when no file is opened.
pub fn starter_diagram() -> DiagramSnapshot {
    let shape = |id: &str, kind, label: &str, x, y, w, h, fill: &str| Shape {
        id: id.to_string(),
        kind,
        label: label.to_string(),
        x,
        y,
        width: w,
        height: h,
        style: NodeStyle {
            fill: fill.to_string(),
            border_color: "#ffffff".to_string(),
            icon_name: None,
            ..NodeStyle::default()
        },
    };
    let link = |id: &str, from: &str, to: &str, color: &str, width, speed, density, label: &str| {
        Link {
            id: id.to_string(),
            source_id: from.to_string(),
            target_id: to.to_string(),
            path: None,
            traffic_speed: speed,
            traffic_density: density,
            style: LinkStyle {
                color: color.to_string(),
                width,
                label: Some(label.to_string()),
                label_size: 10.0,
                ..LinkStyle::default()
            },
        }
    };

    DiagramSnapshot {
        shapes: vec![
            shape("n1", ShapeKind::Rect, "Server A", 400.0, 300.0, 120.0, 80.0, "#1e293b"),
            shape("n2", ShapeKind::Circle, "Router", 700.0, 300.0, 80.0, 80.0, "#0f766e"),
            shape("n3", ShapeKind::Rect, "Database", 700.0, 600.0, 100.0, 100.0, "#be185d"),
            shape("n4", ShapeKind::Rect, "Client", 200.0, 500.0, 100.0, 60.0, "#1d4ed8"),
        ],
        links: vec![
            link("l1", "n1", "n2", "#22d3ee", 4.0, 1.0, 0.02, "HTTP/2"),
            link("l2", "n2", "n3", "#f472b6", 4.0, 0.8, 0.015, "JDBC"),
            link("l3", "n4", "n1", "#60a5fa", 2.0, 1.5, 0.03, "WebSocket"),
        ],
    }
}
