use eframe::egui::{self, Color32, Pos2, Stroke};

/// Icon names offered for decorative shapes.
pub const ICON_NAMES: &[&str] = &[
    "Box", "Server", "Database", "Cloud", "User", "Lock", "Globe", "Smartphone", "Monitor", "Mail",
    "Zap",
];

/// Draw a line-art icon centred on `center`, fitting in a `size` square.
/// Unknown names draw a plain box.
pub fn draw_icon(
    painter: &egui::Painter,
    name: &str,
    center: Pos2,
    size: f32,
    color: Color32,
    stroke_width: f32,
) {
    let s = size * 0.4;
    let stroke = Stroke::new(stroke_width, color);

    match name.to_ascii_lowercase().as_str() {
        "server" => {
            let w = s * 0.7;
            let h = s * 0.25;
            for i in 0..3 {
                let y = center.y - s * 0.45 + i as f32 * (h + s * 0.05);
                let rack = egui::Rect::from_center_size(
                    Pos2::new(center.x, y + h / 2.0),
                    egui::vec2(w * 2.0, h),
                );
                painter.rect_stroke(rack, 2.0, stroke, egui::StrokeKind::Middle);
                painter.circle_filled(
                    Pos2::new(rack.right() - h * 0.4, rack.center().y),
                    h * 0.15,
                    color,
                );
            }
        }
        "database" => {
            let w = s * 0.6;
            let h = s * 0.7;
            let ey = s * 0.2;
            let top = center.y - h / 2.0;
            let bottom = center.y + h / 2.0;
            painter.line_segment(
                [Pos2::new(center.x - w, top), Pos2::new(center.x - w, bottom)],
                stroke,
            );
            painter.line_segment(
                [Pos2::new(center.x + w, top), Pos2::new(center.x + w, bottom)],
                stroke,
            );
            painter.add(egui::Shape::closed_line(
                ellipse_arc(Pos2::new(center.x, top), w, ey, 0.0, std::f32::consts::TAU, 20),
                stroke,
            ));
            painter.add(egui::Shape::line(
                ellipse_arc(Pos2::new(center.x, bottom), w, ey, 0.0, std::f32::consts::PI, 10),
                stroke,
            ));
        }
        "cloud" => {
            let r = s * 0.28;
            for (dx, dy) in [(-0.35, 0.1), (0.35, 0.1), (0.0, -0.2), (-0.2, 0.0), (0.2, 0.0)] {
                painter.circle_stroke(Pos2::new(center.x + s * dx, center.y + s * dy), r, stroke);
            }
        }
        "user" => {
            painter.circle_stroke(Pos2::new(center.x, center.y - s * 0.25), s * 0.35, stroke);
            let shoulders = ellipse_arc(
                Pos2::new(center.x, center.y + s * 0.15 + s * 0.3),
                s * 0.6,
                s * 0.3,
                std::f32::consts::PI,
                std::f32::consts::TAU,
                8,
            );
            painter.add(egui::Shape::line(shoulders, stroke));
        }
        "lock" => {
            let w = s * 0.6;
            let body = egui::Rect::from_min_size(
                Pos2::new(center.x - w, center.y),
                egui::vec2(w * 2.0, s * 0.5),
            );
            painter.rect_stroke(body, 3.0, stroke, egui::StrokeKind::Middle);
            let shackle = ellipse_arc(
                Pos2::new(center.x, center.y),
                w * 0.6,
                w * 0.6,
                std::f32::consts::PI,
                std::f32::consts::TAU,
                10,
            );
            painter.add(egui::Shape::line(shackle, stroke));
        }
        "globe" => {
            let r = s * 0.6;
            painter.circle_stroke(center, r, stroke);
            painter.add(egui::Shape::closed_line(
                ellipse_arc(center, r * 0.45, r, 0.0, std::f32::consts::TAU, 20),
                stroke,
            ));
            painter.line_segment(
                [Pos2::new(center.x - r, center.y), Pos2::new(center.x + r, center.y)],
                stroke,
            );
        }
        "smartphone" => {
            let phone = egui::Rect::from_center_size(center, egui::vec2(s * 0.7, s * 1.4));
            painter.rect_stroke(phone, 4.0, stroke, egui::StrokeKind::Middle);
            painter.circle_stroke(
                Pos2::new(center.x, phone.bottom() - s * 0.15),
                s * 0.08,
                stroke,
            );
        }
        "monitor" => {
            let screen = egui::Rect::from_center_size(
                Pos2::new(center.x, center.y - s * 0.1),
                egui::vec2(s * 1.4, s),
            );
            painter.rect_stroke(screen, 3.0, stroke, egui::StrokeKind::Middle);
            let foot = screen.bottom() + s * 0.3;
            painter.line_segment(
                [Pos2::new(center.x, screen.bottom()), Pos2::new(center.x, foot)],
                stroke,
            );
            painter.line_segment(
                [Pos2::new(center.x - s * 0.35, foot), Pos2::new(center.x + s * 0.35, foot)],
                stroke,
            );
        }
        "mail" => {
            let envelope = egui::Rect::from_center_size(center, egui::vec2(s * 1.3, s * 0.9));
            painter.rect_stroke(envelope, 2.0, stroke, egui::StrokeKind::Middle);
            painter.add(egui::Shape::line(
                vec![
                    envelope.left_top(),
                    Pos2::new(center.x, center.y + s * 0.1),
                    envelope.right_top(),
                ],
                stroke,
            ));
        }
        "zap" => {
            let bolt = vec![
                Pos2::new(center.x + s * 0.1, center.y - s * 0.5),
                Pos2::new(center.x - s * 0.2, center.y + s * 0.05),
                Pos2::new(center.x + s * 0.05, center.y + s * 0.05),
                Pos2::new(center.x - s * 0.1, center.y + s * 0.5),
            ];
            painter.add(egui::Shape::line(bolt, Stroke::new(stroke_width * 1.5, color)));
        }
        _ => {
            let front = egui::Rect::from_center_size(center, egui::vec2(s, s * 0.8));
            painter.rect_stroke(front, 4.0, stroke, egui::StrokeKind::Middle);
            painter.line_segment([front.left_top(), front.center()], stroke);
            painter.line_segment([front.right_top(), front.center()], stroke);
        }
    }
}

/// Points on an axis-aligned ellipse from angle `from` to `to` (radians,
/// screen orientation: positive angles go down).
fn ellipse_arc(center: Pos2, rx: f32, ry: f32, from: f32, to: f32, steps: usize) -> Vec<Pos2> {
    (0..=steps)
        .map(|i| {
            let t = from + (to - from) * i as f32 / steps as f32;
            Pos2::new(center.x + rx * t.cos(), center.y + ry * t.sin())
        })
        .collect()
}
