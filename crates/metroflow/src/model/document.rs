use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{
    BorderStyle, DEFAULT_TRAFFIC_DENSITY, DEFAULT_TRAFFIC_SPEED, DiagramSnapshot, Link, LinkStyle,
    NodeStyle, Shape, ShapeKind,
};

/// Fallback sizes for imported shapes that omit their extents.
const IMPORT_DEFAULT_EXTENT: f32 = 80.0;

/// Global settings stored alongside a diagram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_speed: Option<f32>,
}

/// On-disk diagram: shapes ("nodes"), links and optional global settings.
///
/// Cosmetic fields are optional on import and filled from the session's
/// default styles by [`DiagramDocument::into_snapshot`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramDocument {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_settings: Option<GlobalSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindRecord {
    Rect,
    Circle,
    Text,
    #[serde(alias = "decorative")]
    Svg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyleRecord {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: KindRecord,
    #[serde(default)]
    pub label: String,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_style: Option<BorderStyleRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_label_background: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_density: Option<f32>,
}

/// Defaults applied to records that omit cosmetic or traffic fields.
#[derive(Debug, Clone)]
pub struct ImportDefaults {
    pub node: NodeStyle,
    pub link: LinkStyle,
    pub traffic_speed: f32,
    pub traffic_density: f32,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            node: NodeStyle::default(),
            link: LinkStyle::default(),
            traffic_speed: DEFAULT_TRAFFIC_SPEED,
            traffic_density: DEFAULT_TRAFFIC_DENSITY,
        }
    }
}

impl DiagramDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("Invalid diagram {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "diagram saved");
        Ok(())
    }

    /// Load `path` and convert it in one step. Missing global settings come
    /// back as `None` fields.
    pub fn open(
        path: &Path,
        defaults: &ImportDefaults,
    ) -> Result<(DiagramSnapshot, GlobalSettings)> {
        let doc = Self::load(path)?;
        let settings = doc.global_settings.unwrap_or_default();
        let snapshot = doc.into_snapshot(defaults);
        tracing::info!(
            path = %path.display(),
            shapes = snapshot.shapes.len(),
            links = snapshot.links.len(),
            "diagram loaded"
        );
        Ok((snapshot, settings))
    }

    /// Build engine collections, filling missing fields from `defaults`.
    /// Paths are left empty; the editor recomputes them on load.
    pub fn into_snapshot(self, defaults: &ImportDefaults) -> DiagramSnapshot {
        let shapes = self
            .nodes
            .into_iter()
            .map(|n| node_to_shape(n, &defaults.node))
            .collect();
        let links = self
            .links
            .into_iter()
            .map(|l| record_to_link(l, defaults))
            .collect();
        DiagramSnapshot { shapes, links }
    }

    /// Serialise engine collections. Cached paths are not written.
    pub fn from_snapshot(snapshot: &DiagramSnapshot, settings: GlobalSettings) -> Self {
        Self {
            nodes: snapshot.shapes.iter().map(shape_to_node).collect(),
            links: snapshot.links.iter().map(link_to_record).collect(),
            global_settings: Some(settings),
        }
    }
}

fn node_to_shape(n: NodeRecord, defaults: &NodeStyle) -> Shape {
    let kind = match n.kind {
        KindRecord::Rect => ShapeKind::Rect,
        KindRecord::Circle => ShapeKind::Circle,
        KindRecord::Text => ShapeKind::Text,
        KindRecord::Svg => ShapeKind::Decorative,
    };
    let width = positive_or(n.width, IMPORT_DEFAULT_EXTENT);
    let height = match kind {
        ShapeKind::Circle => positive_or(n.height, width),
        _ => positive_or(n.height, IMPORT_DEFAULT_EXTENT),
    };
    let icon_name = match kind {
        ShapeKind::Decorative => n.icon_name.or_else(|| Some("Box".to_string())),
        _ => n.icon_name,
    };

    Shape {
        id: n.id,
        kind,
        label: n.label,
        x: n.x,
        y: n.y,
        width,
        height,
        style: NodeStyle {
            fill: non_empty_or(n.color, &defaults.fill),
            border_color: non_empty_or(n.border_color, &defaults.border_color),
            border_width: n.border_width.unwrap_or(defaults.border_width),
            border_style: match n.border_style {
                Some(BorderStyleRecord::Dashed) => BorderStyle::Dashed,
                _ => BorderStyle::Solid,
            },
            label_color: non_empty_or(n.label_color, &defaults.label_color),
            font_size: n.font_size.unwrap_or(defaults.font_size),
            icon_name,
            icon_color: non_empty_or(n.icon_color, &defaults.icon_color),
        },
    }
}

fn record_to_link(l: LinkRecord, defaults: &ImportDefaults) -> Link {
    Link {
        id: l.id,
        source_id: l.source_id,
        target_id: l.target_id,
        path: None,
        traffic_speed: l.traffic_speed.unwrap_or(defaults.traffic_speed),
        traffic_density: l.traffic_density.unwrap_or(defaults.traffic_density),
        style: LinkStyle {
            color: non_empty_or(l.color, &defaults.link.color),
            width: l.width.unwrap_or(defaults.link.width),
            label: l.label.filter(|s| !s.is_empty()),
            label_size: l
                .label_size
                .filter(|s| *s > 0.0)
                .unwrap_or(defaults.link.label_size),
            label_color: non_empty_or(l.label_color, &defaults.link.label_color),
            show_label_background: l.show_label_background.unwrap_or(true),
        },
    }
}

fn shape_to_node(s: &Shape) -> NodeRecord {
    NodeRecord {
        id: s.id.clone(),
        kind: match s.kind {
            ShapeKind::Rect => KindRecord::Rect,
            ShapeKind::Circle => KindRecord::Circle,
            ShapeKind::Text => KindRecord::Text,
            ShapeKind::Decorative => KindRecord::Svg,
        },
        label: s.label.clone(),
        x: s.x,
        y: s.y,
        width: Some(s.width),
        height: Some(s.height),
        color: Some(s.style.fill.clone()),
        border_color: Some(s.style.border_color.clone()),
        border_width: Some(s.style.border_width),
        border_style: Some(match s.style.border_style {
            BorderStyle::Solid => BorderStyleRecord::Solid,
            BorderStyle::Dashed => BorderStyleRecord::Dashed,
        }),
        label_color: Some(s.style.label_color.clone()),
        font_size: Some(s.style.font_size),
        icon_name: s.style.icon_name.clone(),
        icon_color: Some(s.style.icon_color.clone()),
    }
}

fn link_to_record(l: &Link) -> LinkRecord {
    LinkRecord {
        id: l.id.clone(),
        source_id: l.source_id.clone(),
        target_id: l.target_id.clone(),
        color: Some(l.style.color.clone()),
        width: Some(l.style.width),
        label: l.style.label.clone(),
        label_size: Some(l.style.label_size),
        label_color: Some(l.style.label_color.clone()),
        show_label_background: Some(l.style.show_label_background),
        traffic_speed: Some(l.traffic_speed),
        traffic_density: Some(l.traffic_density),
    }
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn positive_or(value: Option<f32>, fallback: f32) -> f32 {
    value.filter(|v| *v > 0.0).unwrap_or(fallback)
}
