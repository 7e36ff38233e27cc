use eframe::egui::Color32;

/// Canvas palette. Shape and link colours come from the diagram itself;
/// the theme only covers chrome drawn around them.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub background: Color32,
    pub grid_dot: Color32,
    pub accent: Color32,
    pub guide: Color32,
    pub connect_preview: Color32,
    pub hud_background: Color32,
    pub hud_foreground: Color32,
    pub grid_spacing: f32,
    pub signal_radius: f32,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            background: Color32::from_rgb(0x11, 0x18, 0x27),
            grid_dot: Self::with_opacity(Color32::from_rgb(0x37, 0x41, 0x51), 0.5),
            accent: Color32::from_rgb(0x22, 0xD3, 0xEE),
            guide: Self::with_opacity(Color32::from_rgb(0x06, 0xB6, 0xD4), 0.7),
            connect_preview: Color32::WHITE,
            hud_background: Color32::from_rgba_unmultiplied(0x1F, 0x29, 0x37, 0xE6),
            hud_foreground: Color32::from_rgb(0xD1, 0xD5, 0xDB),
            grid_spacing: 40.0,
            signal_radius: 4.0,
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            background: Color32::from_rgb(0xF8, 0xFA, 0xFC),
            grid_dot: Self::with_opacity(Color32::from_rgb(0x94, 0xA3, 0xB8), 0.6),
            accent: Color32::from_rgb(0x08, 0x91, 0xB2),
            guide: Self::with_opacity(Color32::from_rgb(0x06, 0xB6, 0xD4), 0.9),
            connect_preview: Color32::from_rgb(0x1A, 0x1A, 0x2E),
            hud_background: Color32::from_rgba_unmultiplied(0xFF, 0xFF, 0xFF, 0xE6),
            hud_foreground: Color32::from_rgb(0x1A, 0x1A, 0x2E),
            grid_spacing: 40.0,
            signal_radius: 4.0,
        }
    }

    pub fn toggled(&self) -> Self {
        if self.name == "dark" {
            Self::light()
        } else {
            Self::dark()
        }
    }

    /// Apply opacity to a color
    pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
        Color32::from_rgba_unmultiplied(
            color.r(),
            color.g(),
            color.b(),
            (opacity.clamp(0.0, 1.0) * 255.0) as u8,
        )
    }
}

/// Parse a diagram colour (`#rgb`, `#rrggbb`, `#rrggbbaa` or `transparent`),
/// falling back when the value is unreadable.
pub fn color_or(value: &str, fallback: Color32) -> Color32 {
    let value = value.trim();
    if value.eq_ignore_ascii_case("transparent") {
        return Color32::TRANSPARENT;
    }
    if let Some(short) = expand_short_hex(value) {
        return Color32::from_hex(&short).unwrap_or(fallback);
    }
    Color32::from_hex(value).unwrap_or(fallback)
}

fn expand_short_hex(value: &str) -> Option<String> {
    let digits = value.strip_prefix('#')?;
    if digits.len() != 3 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let mut long = String::from("#");
    for c in digits.chars() {
        long.push(c);
        long.push(c);
    }
    Some(long)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        assert_eq!(color_or("#22d3ee", Color32::RED), Color32::from_rgb(0x22, 0xD3, 0xEE));
        assert_eq!(color_or("#fff", Color32::RED), Color32::WHITE);
        assert_eq!(color_or("transparent", Color32::RED), Color32::TRANSPARENT);
        assert_eq!(color_or("rebeccapurple", Color32::RED), Color32::RED);
    }

    #[test]
    fn test_toggle_round_trips() {
        let dark = Theme::dark();
        assert_eq!(dark.toggled().name, "light");
        assert_eq!(dark.toggled().toggled().name, "dark");
    }
}
