use anyhow::Result;
use eframe::egui::Color32;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::editor::{
    LinkDefaults, MAX_CORNER_RADIUS, MIN_CORNER_RADIUS, NodeDefaults, SessionConfig,
};
use crate::geometry::DEFAULT_CORNER_RADIUS;
use crate::model::document::ImportDefaults;
use crate::simulation::scheduler::{DEFAULT_FPS, DEFAULT_RECORDING_FRAMES, MAX_FPS, MIN_FPS};
use crate::simulation::{MAX_GLOBAL_SPEED, MIN_GLOBAL_SPEED};

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "metroflow";
const CONFIG_HEADER: &str = "# Metroflow configuration - https://github.com/mklab-se/metroflow";

pub const DEFAULT_SEED: u64 = 1;
pub const MIN_TRAFFIC_SPEED: f32 = 0.1;
pub const MAX_TRAFFIC_SPEED: f32 = 5.0;
pub const MIN_TRAFFIC_DENSITY: f32 = 0.0;
pub const MAX_TRAFFIC_DENSITY: f32 = 0.1;

pub const VALID_KEYS: &[&str] = &[
    "defaults.corner_radius",
    "defaults.global_speed",
    "defaults.start_mode",
    "recording.fps",
    "recording.frames",
    "recording.seed",
    "recording.resolution",
    "style.node.fill",
    "style.node.border_color",
    "style.node.border_width",
    "style.node.width",
    "style.node.height",
    "style.node.font_size",
    "style.node.label_color",
    "style.link.color",
    "style.link.width",
    "style.link.traffic_speed",
    "style.link.traffic_density",
    "style.link.label_size",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording: Option<RecordingConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_speed: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_mode: Option<StartMode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeStyleConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkStyleConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeStyleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkStyleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_speed: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_density: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_size: Option<f32>,
}

/// Initial viewport when a diagram is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartMode {
    /// The stock transform (no pan, zoom 0.8).
    #[default]
    Default,
    /// Frame every shape.
    Fit,
}

impl std::fmt::Display for StartMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Fit => write!(f, "fit"),
        }
    }
}

/// Output size presets for recorded frames.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Resolution {
    #[serde(rename = "720p")]
    #[value(name = "720p")]
    Hd720,
    #[default]
    #[serde(rename = "1080p")]
    #[value(name = "1080p")]
    Hd1080,
    #[serde(rename = "square")]
    #[value(name = "square")]
    Square,
}

impl Resolution {
    pub fn size(self) -> (u32, u32) {
        match self {
            Self::Hd720 => (1280, 720),
            Self::Hd1080 => (1920, 1080),
            Self::Square => (1080, 1080),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Hd720 => "720p",
            Self::Hd1080 => "1080p",
            Self::Square => "square",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "720p" => Some(Self::Hd720),
            "1080p" => Some(Self::Hd1080),
            "square" => Some(Self::Square),
            _ => None,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Effective recording parameters after defaults are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingSettings {
    pub fps: u32,
    pub frames: u32,
    pub seed: u64,
    pub resolution: Resolution,
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `metroflow config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("using default config: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("{CONFIG_HEADER}\n{yaml}");
        std::fs::write(path, contents)?;
        tracing::info!(path = %path.display(), "config written");
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "defaults.corner_radius" => {
                let radius = parse_ranged(key, value, MIN_CORNER_RADIUS, MAX_CORNER_RADIUS)?;
                self.defaults_mut().corner_radius = Some(radius);
            }
            "defaults.global_speed" => {
                let speed = parse_ranged(key, value, MIN_GLOBAL_SPEED, MAX_GLOBAL_SPEED)?;
                self.defaults_mut().global_speed = Some(speed);
            }
            "defaults.start_mode" => {
                let mode = match value {
                    "fit" => StartMode::Fit,
                    "default" => StartMode::Default,
                    _ => anyhow::bail!(
                        "Invalid start_mode: {value}. Must be 'fit' or 'default'."
                    ),
                };
                self.defaults_mut().start_mode = Some(mode);
            }
            "recording.fps" => {
                let fps = parse_count(key, value)?;
                if !(MIN_FPS..=MAX_FPS).contains(&fps) {
                    anyhow::bail!("Invalid fps: {value}. Must be between {MIN_FPS} and {MAX_FPS}.");
                }
                self.recording_mut().fps = Some(fps);
            }
            "recording.frames" => {
                let frames = parse_count(key, value)?;
                if frames == 0 {
                    anyhow::bail!("Invalid frames: {value}. Must be at least 1.");
                }
                self.recording_mut().frames = Some(frames);
            }
            "recording.seed" => {
                let seed = value.parse::<u64>().map_err(|_| {
                    anyhow::anyhow!("Invalid seed: {value}. Must be a whole number.")
                })?;
                self.recording_mut().seed = Some(seed);
            }
            "recording.resolution" => {
                let Some(resolution) = Resolution::parse(value) else {
                    anyhow::bail!(
                        "Invalid resolution: {value}. Must be '720p', '1080p', or 'square'."
                    );
                };
                self.recording_mut().resolution = Some(resolution);
            }
            "style.node.fill" => self.node_style_mut().fill = Some(parse_color(key, value)?),
            "style.node.border_color" => {
                self.node_style_mut().border_color = Some(parse_color(key, value)?)
            }
            "style.node.label_color" => {
                self.node_style_mut().label_color = Some(parse_color(key, value)?)
            }
            "style.node.border_width" => {
                self.node_style_mut().border_width = Some(parse_ranged(key, value, 0.0, 20.0)?)
            }
            "style.node.width" => {
                self.node_style_mut().width = Some(parse_ranged(key, value, 20.0, 1000.0)?)
            }
            "style.node.height" => {
                self.node_style_mut().height = Some(parse_ranged(key, value, 20.0, 1000.0)?)
            }
            "style.node.font_size" => {
                self.node_style_mut().font_size = Some(parse_ranged(key, value, 6.0, 72.0)?)
            }
            "style.link.color" => self.link_style_mut().color = Some(parse_color(key, value)?),
            "style.link.width" => {
                self.link_style_mut().width = Some(parse_ranged(key, value, 1.0, 20.0)?)
            }
            "style.link.traffic_speed" => {
                self.link_style_mut().traffic_speed =
                    Some(parse_ranged(key, value, MIN_TRAFFIC_SPEED, MAX_TRAFFIC_SPEED)?)
            }
            "style.link.traffic_density" => {
                self.link_style_mut().traffic_density =
                    Some(parse_ranged(key, value, MIN_TRAFFIC_DENSITY, MAX_TRAFFIC_DENSITY)?)
            }
            "style.link.label_size" => {
                self.link_style_mut().label_size = Some(parse_ranged(key, value, 6.0, 48.0)?)
            }
            _ => anyhow::bail!("Unknown config key: {key}. Valid keys: {}", VALID_KEYS.join(", ")),
        }
        Ok(())
    }

    pub fn corner_radius(&self) -> f32 {
        self.defaults
            .as_ref()
            .and_then(|d| d.corner_radius)
            .unwrap_or(DEFAULT_CORNER_RADIUS)
    }

    pub fn global_speed(&self) -> f32 {
        self.defaults
            .as_ref()
            .and_then(|d| d.global_speed)
            .unwrap_or(1.0)
    }

    pub fn start_mode(&self) -> StartMode {
        self.defaults
            .as_ref()
            .and_then(|d| d.start_mode)
            .unwrap_or_default()
    }

    pub fn recording(&self) -> RecordingSettings {
        let rec = self.recording.clone().unwrap_or_default();
        RecordingSettings {
            fps: rec.fps.unwrap_or(DEFAULT_FPS),
            frames: rec.frames.unwrap_or(DEFAULT_RECORDING_FRAMES),
            seed: rec.seed.unwrap_or(DEFAULT_SEED),
            resolution: rec.resolution.unwrap_or_default(),
        }
    }

    pub fn node_defaults(&self) -> NodeDefaults {
        let mut defaults = NodeDefaults::default();
        let Some(node) = self.style.as_ref().and_then(|s| s.node.as_ref()) else {
            return defaults;
        };
        if let Some(v) = &node.fill {
            defaults.style.fill = v.clone();
        }
        if let Some(v) = &node.border_color {
            defaults.style.border_color = v.clone();
        }
        if let Some(v) = &node.label_color {
            defaults.style.label_color = v.clone();
        }
        if let Some(v) = node.border_width {
            defaults.style.border_width = v;
        }
        if let Some(v) = node.font_size {
            defaults.style.font_size = v;
        }
        if let Some(v) = node.width {
            defaults.width = v;
        }
        if let Some(v) = node.height {
            defaults.height = v;
        }
        defaults
    }

    pub fn link_defaults(&self) -> LinkDefaults {
        let mut defaults = LinkDefaults::default();
        let Some(link) = self.style.as_ref().and_then(|s| s.link.as_ref()) else {
            return defaults;
        };
        if let Some(v) = &link.color {
            defaults.style.color = v.clone();
        }
        if let Some(v) = link.width {
            defaults.style.width = v;
        }
        if let Some(v) = link.label_size {
            defaults.style.label_size = v;
        }
        if let Some(v) = link.traffic_speed {
            defaults.traffic_speed = v;
        }
        if let Some(v) = link.traffic_density {
            defaults.traffic_density = v;
        }
        defaults
    }

    /// The editor's starting session configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            corner_radius: self.corner_radius(),
            node_defaults: self.node_defaults(),
            link_defaults: self.link_defaults(),
            ..SessionConfig::default()
        }
    }

    /// Fallbacks for diagram records that omit cosmetic or traffic fields.
    pub fn import_defaults(&self) -> ImportDefaults {
        let node = self.node_defaults();
        let link = self.link_defaults();
        ImportDefaults {
            node: node.style,
            link: link.style,
            traffic_speed: link.traffic_speed,
            traffic_density: link.traffic_density,
        }
    }

    fn defaults_mut(&mut self) -> &mut DefaultsConfig {
        self.defaults.get_or_insert_with(DefaultsConfig::default)
    }

    fn recording_mut(&mut self) -> &mut RecordingConfig {
        self.recording.get_or_insert_with(RecordingConfig::default)
    }

    fn node_style_mut(&mut self) -> &mut NodeStyleConfig {
        self.style
            .get_or_insert_with(StyleConfig::default)
            .node
            .get_or_insert_with(NodeStyleConfig::default)
    }

    fn link_style_mut(&mut self) -> &mut LinkStyleConfig {
        self.style
            .get_or_insert_with(StyleConfig::default)
            .link
            .get_or_insert_with(LinkStyleConfig::default)
    }
}

fn parse_ranged(key: &str, value: &str, min: f32, max: f32) -> Result<f32> {
    let parsed: f32 = value
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid {key}: {value}. Must be a number."))?;
    if !parsed.is_finite() || parsed < min || parsed > max {
        anyhow::bail!("Invalid {key}: {value}. Must be between {min} and {max}.");
    }
    Ok(parsed)
}

fn parse_count(key: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid {key}: {value}. Must be a whole number."))
}

fn parse_color(key: &str, value: &str) -> Result<String> {
    if value == "transparent" || Color32::from_hex(value).is_ok() {
        Ok(value.to_string())
    } else {
        anyhow::bail!(
            "Invalid {key}: {value}. Must be a hex color like '#22d3ee' or 'transparent'."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_builtin_defaults() {
        let config = Config::default();
        assert_eq!(config.corner_radius(), DEFAULT_CORNER_RADIUS);
        assert_eq!(config.global_speed(), 1.0);
        assert_eq!(config.start_mode(), StartMode::Default);
        let rec = config.recording();
        assert_eq!(rec.fps, 30);
        assert_eq!(rec.frames, 90);
        assert_eq!(rec.resolution, Resolution::Hd1080);
        assert_eq!(config.session_config(), SessionConfig::default());
    }

    #[test]
    fn test_set_validates_ranges() {
        let mut config = Config::default();
        config.set("defaults.corner_radius", "40").unwrap();
        assert_eq!(config.corner_radius(), 40.0);

        assert!(config.set("defaults.corner_radius", "101").is_err());
        assert!(config.set("defaults.global_speed", "-1").is_err());
        assert!(config.set("recording.fps", "5").is_err());
        assert!(config.set("recording.frames", "0").is_err());
        assert!(config.set("style.link.traffic_density", "0.5").is_err());
        assert!(config.set("defaults.corner_radius", "NaN").is_err());
        assert_eq!(config.corner_radius(), 40.0);
    }

    #[test]
    fn test_set_rejects_bad_colors_and_keys() {
        let mut config = Config::default();
        config.set("style.node.fill", "#112233").unwrap();
        config.set("style.node.border_color", "transparent").unwrap();
        assert!(config.set("style.link.color", "cyan").is_err());

        let err = config.set("defaults.theme", "dark").unwrap_err().to_string();
        assert!(err.contains("Unknown config key"));
        assert!(err.contains("recording.fps"));
    }

    #[test]
    fn test_styles_flow_into_session() {
        let mut config = Config::default();
        config.set("style.node.width", "120").unwrap();
        config.set("style.link.traffic_speed", "2.5").unwrap();
        config.set("style.link.color", "#ff0000").unwrap();

        let session = config.session_config();
        assert_eq!(session.node_defaults.width, 120.0);
        assert_eq!(session.node_defaults.height, 80.0);
        assert_eq!(session.link_defaults.traffic_speed, 2.5);

        let import = config.import_defaults();
        assert_eq!(import.link.color, "#ff0000");
        assert_eq!(import.traffic_density, 0.02);
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut config = Config::default();
        config.set("recording.resolution", "square").unwrap();
        config.set("defaults.start_mode", "fit").unwrap();

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("resolution: square"));
        assert!(yaml.contains("start_mode: fit"));
        assert!(!yaml.contains("style"));

        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.recording().resolution, Resolution::Square);
        assert_eq!(back.start_mode(), StartMode::Fit);
    }

    #[test]
    fn test_save_to_writes_header() {
        let dir = std::env::temp_dir().join(format!("metroflow-config-{}", std::process::id()));
        let path = dir.join(FILENAME);
        let mut config = Config::default();
        config.set("recording.seed", "7").unwrap();
        config.save_to(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Metroflow configuration"));
        assert_eq!(Config::load_from(&path).unwrap().recording().seed, 7);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
