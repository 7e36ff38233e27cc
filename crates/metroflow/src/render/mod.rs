pub mod icons;

use eframe::egui::{self, Color32, FontId, Pos2, Rect, Stroke, Vec2};

use crate::editor::Editor;
use crate::editor::snap::GuideAxis;
use crate::model::{BorderStyle, Link, Shape, ShapeKind};
use crate::simulation::Simulation;
use crate::theme::{Theme, color_or};
use crate::viewport::{SurfaceMapping, Transform};

/// Gap between a selected shape and its selection outline, in world units.
const SELECTION_MARGIN: f32 = 6.0;
const HANDLE_DRAW_RADIUS: f32 = 6.0;
const SHAPE_ROUNDING: f32 = 8.0;
/// Grid dots closer than this on screen are skipped.
const MIN_GRID_SCREEN_SPACING: f32 = 10.0;
const CIRCLE_SEGMENTS: usize = 48;

/// What to draw on top of the diagram itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overlay {
    /// Background fill and grid dots.
    pub backdrop: bool,
    /// Selection outlines, resize handle, guides and the connect preview.
    pub chrome: bool,
    /// Pointer position in world space, for the connect preview line.
    pub hover: Option<Pos2>,
}

/// Everything a frame needs to paint the canvas.
pub struct Canvas<'a> {
    pub editor: &'a Editor,
    pub simulation: &'a Simulation,
    pub theme: &'a Theme,
    pub mapping: SurfaceMapping,
    pub overlay: Overlay,
}

impl Canvas<'_> {
    fn transform(&self) -> &Transform {
        self.editor.transform()
    }

    fn to_screen(&self, p: Pos2) -> Pos2 {
        self.mapping.world_to_screen(p, self.transform())
    }

    fn scale(&self) -> f32 {
        self.mapping.world_scale(self.transform())
    }

    /// World-space rect currently visible on screen.
    fn visible_world(&self) -> Rect {
        let t = self.transform();
        Rect::from_two_pos(
            self.mapping.screen_to_world(self.mapping.screen.min, t),
            self.mapping.screen_to_world(self.mapping.screen.max, t),
        )
    }

    /// Paint the whole canvas: background, grid, guides, links, labels,
    /// signals, shapes and the interaction overlay.
    pub fn paint(&self, painter: &egui::Painter) {
        if self.overlay.backdrop {
            painter.rect_filled(self.mapping.screen, 0.0, self.theme.background);
            self.draw_grid(painter);
        }
        if self.overlay.chrome {
            self.draw_guides(painter);
        }
        for link in self.editor.links() {
            self.draw_link(painter, link);
        }
        for link in self.editor.links() {
            self.draw_link_label(painter, link);
        }
        self.draw_signals(painter);

        let pending = self.editor.pending_connection();
        for shape in self.editor.shapes() {
            let dimmed = pending.is_some_and(|source| source != shape.id);
            self.draw_shape(painter, shape, dimmed);
        }
        if self.overlay.chrome {
            self.draw_selection(painter);
            self.draw_connect_preview(painter);
        }
    }

    fn draw_grid(&self, painter: &egui::Painter) {
        let spacing = self.theme.grid_spacing;
        let scale = self.scale();
        if spacing * scale < MIN_GRID_SCREEN_SPACING {
            return;
        }
        let radius = scale.max(0.5);
        for p in grid_points(self.visible_world(), spacing) {
            painter.circle_filled(self.to_screen(p), radius, self.theme.grid_dot);
        }
    }

    fn draw_guides(&self, painter: &egui::Painter) {
        let visible = self.visible_world();
        let stroke = Stroke::new(1.0, self.theme.guide);
        for guide in self.editor.guides() {
            let (a, b) = match guide.axis {
                GuideAxis::Vertical => (
                    Pos2::new(guide.pos, visible.top()),
                    Pos2::new(guide.pos, visible.bottom()),
                ),
                GuideAxis::Horizontal => (
                    Pos2::new(visible.left(), guide.pos),
                    Pos2::new(visible.right(), guide.pos),
                ),
            };
            painter.extend(egui::Shape::dashed_line(
                &[self.to_screen(a), self.to_screen(b)],
                stroke,
                4.0,
                2.0,
            ));
        }
    }

    fn screen_path(&self, link: &Link) -> Option<Vec<Pos2>> {
        let path = link.path.as_ref().filter(|p| !p.is_empty())?;
        Some(path.flatten().into_iter().map(|p| self.to_screen(p)).collect())
    }

    fn draw_link(&self, painter: &egui::Painter, link: &Link) {
        let Some(points) = self.screen_path(link) else {
            return;
        };
        let color = color_or(&link.style.color, self.theme.accent);
        let width = (link.style.width * self.scale()).max(1.0);
        painter.add(egui::Shape::line(
            points.clone(),
            Stroke::new(width, Theme::with_opacity(color, 0.4)),
        ));
        if self.overlay.chrome && self.editor.selection().has_link(&link.id) {
            painter.extend(egui::Shape::dashed_line(
                &points,
                Stroke::new(1.0, Color32::WHITE),
                4.0,
                4.0,
            ));
        }
    }

    /// Label centred at the path's arclength midpoint, kept horizontal.
    fn draw_link_label(&self, painter: &egui::Painter, link: &Link) {
        let Some(label) = link.style.label.as_deref() else {
            return;
        };
        let Some(mid) = link.path.as_ref().and_then(|p| p.midpoint()) else {
            return;
        };
        let scale = self.scale();
        let font_size = link.style.label_size * scale;
        if font_size < 1.0 {
            return;
        }
        let color = color_or(&link.style.color, self.theme.accent);
        let text_color = color_or(&link.style.label_color, Color32::WHITE);
        let galley =
            painter.layout_no_wrap(label.to_string(), FontId::proportional(font_size), text_color);
        let center = self.to_screen(mid);

        if link.style.show_label_background {
            let padding = Vec2::new(font_size * 0.5, font_size * 0.25);
            let bg = Rect::from_center_size(center, galley.size() + padding * 2.0);
            painter.rect_filled(bg, 4.0 * scale, Theme::with_opacity(color, 0.2));
            painter.rect_stroke(bg, 4.0 * scale, Stroke::new(1.0, color), egui::StrokeKind::Middle);
        }
        painter.galley(center - galley.size() / 2.0, galley, text_color);
    }

    fn draw_signals(&self, painter: &egui::Painter) {
        let radius = self.theme.signal_radius * self.scale();
        let glow = Theme::with_opacity(Color32::WHITE, 0.25);
        for sprite in self.simulation.sprites(self.editor.links()) {
            let pos = self.to_screen(sprite.pos);
            let color = color_or(&sprite.link.style.color, self.theme.accent);
            painter.circle_filled(pos, radius * 2.0, glow);
            painter.circle_filled(pos, radius, color);
        }
    }

    fn draw_shape(&self, painter: &egui::Painter, shape: &Shape, dimmed: bool) {
        let scale = self.scale();
        let style = &shape.style;
        let alpha = if dimmed { 0.5 } else { 1.0 };
        let fill = fade(color_or(&style.fill, Color32::TRANSPARENT), alpha);
        let border = fade(color_or(&style.border_color, Color32::GRAY), alpha);
        let stroke = Stroke::new(style.border_width * scale, border);
        let dashed = style.border_style == BorderStyle::Dashed;
        let center = self.to_screen(shape.center());

        match shape.kind {
            ShapeKind::Circle => {
                let r = shape.width / 2.0 * scale;
                painter.circle_filled(center, r, fill);
                if dashed {
                    let outline = circle_outline(center, r, CIRCLE_SEGMENTS);
                    painter.extend(egui::Shape::dashed_line(
                        &outline,
                        stroke,
                        6.0 * scale,
                        4.0 * scale,
                    ));
                } else {
                    painter.circle_stroke(center, r, stroke);
                }
            }
            _ => {
                let size = Vec2::new(shape.width, shape.height) * scale;
                let rect = Rect::from_center_size(center, size);
                let rounding = if shape.kind == ShapeKind::Text {
                    0.0
                } else {
                    SHAPE_ROUNDING * scale
                };
                painter.rect_filled(rect, rounding, fill);
                if dashed {
                    painter.extend(egui::Shape::dashed_line(
                        &rect_outline(rect),
                        stroke,
                        6.0 * scale,
                        4.0 * scale,
                    ));
                } else {
                    painter.rect_stroke(rect, rounding, stroke, egui::StrokeKind::Middle);
                }
            }
        }

        let label_color = fade(color_or(&style.label_color, Color32::WHITE), alpha);
        let mut label_center = center;
        if shape.kind == ShapeKind::Decorative {
            let icon_color = fade(color_or(&style.icon_color, Color32::WHITE), alpha);
            let icon_size = shape.width.min(shape.height) * scale;
            let icon = style.icon_name.as_deref().unwrap_or("Box");
            icons::draw_icon(painter, icon, center, icon_size, icon_color, 2.0 * scale);
            label_center.y += (shape.height / 2.0 + style.font_size) * scale;
        }
        let font_size = style.font_size * scale;
        if !shape.label.is_empty() && font_size >= 1.0 {
            let galley = painter.layout_no_wrap(
                shape.label.clone(),
                FontId::proportional(font_size),
                label_color,
            );
            painter.galley(label_center - galley.size() / 2.0, galley, label_color);
        }
    }

    fn draw_selection(&self, painter: &egui::Painter) {
        let scale = self.scale();
        let stroke = Stroke::new(2.0, self.theme.accent);
        let selection = self.editor.selection();
        for id in &selection.shapes {
            let Some(shape) = self.editor.shape(id) else {
                continue;
            };
            let center = self.to_screen(shape.center());
            let outline = match shape.kind {
                ShapeKind::Circle => circle_outline(
                    center,
                    (shape.width / 2.0 + SELECTION_MARGIN) * scale,
                    CIRCLE_SEGMENTS,
                ),
                _ => rect_outline(
                    Rect::from_center_size(center, Vec2::new(shape.width, shape.height) * scale)
                        .expand(SELECTION_MARGIN * scale),
                ),
            };
            painter.extend(egui::Shape::dashed_line(&outline, stroke, 6.0, 4.0));
        }

        if let Some(shape) = selection.single_shape().and_then(|id| self.editor.shape(id)) {
            painter.circle_filled(
                self.to_screen(shape.resize_handle()),
                HANDLE_DRAW_RADIUS * scale,
                self.theme.accent,
            );
        }
    }

    fn draw_connect_preview(&self, painter: &egui::Painter) {
        let Some(source) = self.editor.pending_connection().and_then(|id| self.editor.shape(id))
        else {
            return;
        };
        let stroke = Stroke::new(2.0, self.theme.connect_preview);
        let bounds = source.bounds().expand(SELECTION_MARGIN);
        let outline = rect_outline(Rect::from_two_pos(
            self.to_screen(bounds.min),
            self.to_screen(bounds.max),
        ));
        painter.extend(egui::Shape::dashed_line(&outline, stroke, 6.0, 4.0));
        if let Some(hover) = self.overlay.hover {
            painter.extend(egui::Shape::dashed_line(
                &[self.to_screen(source.center()), self.to_screen(hover)],
                stroke,
                6.0,
                4.0,
            ));
        }
    }
}

fn fade(color: Color32, alpha: f32) -> Color32 {
    if alpha >= 1.0 {
        color
    } else {
        color.gamma_multiply(alpha)
    }
}

/// Grid dot positions inside `visible`, offset by 2 units like the
/// background pattern.
pub fn grid_points(visible: Rect, spacing: f32) -> Vec<Pos2> {
    if spacing.is_nan() || spacing <= 0.0 || !visible.is_finite() {
        return Vec::new();
    }
    let first_x = (visible.left() / spacing).floor() as i64;
    let last_x = (visible.right() / spacing).ceil() as i64;
    let first_y = (visible.top() / spacing).floor() as i64;
    let last_y = (visible.bottom() / spacing).ceil() as i64;

    let mut points = Vec::new();
    for gy in first_y..=last_y {
        for gx in first_x..=last_x {
            let p = Pos2::new(gx as f32 * spacing + 2.0, gy as f32 * spacing + 2.0);
            if visible.contains(p) {
                points.push(p);
            }
        }
    }
    points
}

/// Closed polyline around a circle; the first point is repeated at the end.
pub fn circle_outline(center: Pos2, radius: f32, segments: usize) -> Vec<Pos2> {
    let segments = segments.max(3);
    (0..=segments)
        .map(|i| {
            let t = std::f32::consts::TAU * i as f32 / segments as f32;
            Pos2::new(center.x + radius * t.cos(), center.y + radius * t.sin())
        })
        .collect()
}

/// Closed polyline around a rect, clockwise from the top-left corner.
pub fn rect_outline(rect: Rect) -> Vec<Pos2> {
    vec![
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
        rect.left_top(),
    ]
}
