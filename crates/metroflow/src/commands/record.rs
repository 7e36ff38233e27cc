use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use eframe::egui;
use regex::Regex;

use crate::config::{Config, RecordingSettings, Resolution};
use crate::editor::Editor;
use crate::model::document::DiagramDocument;
use crate::render::{Canvas, Overlay};
use crate::simulation::Simulation;
use crate::simulation::scheduler::{CaptureOutcome, FrameScheduler, MAX_FPS, MIN_FPS, Recording};
use crate::theme::Theme;
use crate::viewport::{SurfaceMapping, Transform};

/// World units of empty space kept around the content in every frame.
const FRAME_PADDING: f32 = 50.0;
const FALLBACK_NAME: &str = "animation";

/// Command-line overrides on top of the `recording` config section.
#[derive(Debug, Default, Clone)]
pub struct RecordOverrides {
    pub fps: Option<u32>,
    pub frames: Option<u32>,
    pub resolution: Option<Resolution>,
    pub seed: Option<u64>,
}

impl RecordOverrides {
    fn apply(&self, mut settings: RecordingSettings) -> RecordingSettings {
        if let Some(fps) = self.fps {
            settings.fps = fps;
        }
        if let Some(frames) = self.frames {
            settings.frames = frames;
        }
        if let Some(resolution) = self.resolution {
            settings.resolution = resolution;
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        settings
    }
}

#[derive(Debug, Default)]
struct Outcome {
    saved: u32,
    error: Option<String>,
}

struct RecordApp {
    editor: Editor,
    simulation: Simulation,
    recording: Recording,
    theme: Theme,
    output_dir: PathBuf,
    base_name: String,
    resolution: Resolution,
    outcome: Rc<RefCell<Outcome>>,
}

impl RecordApp {
    fn frame_path(&self, index: u32) -> PathBuf {
        self.output_dir
            .join(frame_file_name(&self.base_name, self.resolution, index))
    }

    fn store(&mut self, image: &egui::ColorImage) {
        let path = self.frame_path(self.recording.captured() + 1);
        if let Err(e) = save_color_image(image, &path) {
            tracing::error!("failed to save {}: {e}", path.display());
            self.outcome.borrow_mut().error = Some(format!("{}: {e}", path.display()));
            self.recording.abort();
            return;
        }
        self.outcome.borrow_mut().saved += 1;

        match self.recording.frame_captured() {
            CaptureOutcome::Finished => {
                tracing::info!(frames = self.recording.captured(), "recording finished");
            }
            CaptureOutcome::Continue => {
                let pct = self.recording.progress_percent();
                if pct % 10 == 0 {
                    eprintln!(
                        "  {}/{} frames ({pct}%)",
                        self.recording.captured(),
                        self.recording.target()
                    );
                }
            }
            CaptureOutcome::Ignored => {
                tracing::debug!("screenshot arrived with no capture outstanding");
            }
        }
    }
}

impl eframe::App for RecordApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0; 4]
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let shots: Vec<_> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Screenshot { image, .. } => Some(image.clone()),
                    _ => None,
                })
                .collect()
        });
        for image in shots {
            if self.recording.awaiting_capture() {
                self.store(&image);
            }
        }

        if self.recording.is_finishing() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        let ticked = match self.recording.next_delta() {
            Some(dt) => {
                self.simulation.tick(dt, self.editor.links());
                true
            }
            None => false,
        };

        egui::CentralPanel::default()
            .frame(egui::Frame::new().inner_margin(0.0))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let mapping = SurfaceMapping::pixel_exact(rect);
                *self.editor.transform_mut() =
                    Transform::frame_for_export(self.editor.shapes(), rect.size(), FRAME_PADDING);

                Canvas {
                    editor: &self.editor,
                    simulation: &self.simulation,
                    theme: &self.theme,
                    mapping,
                    overlay: Overlay::default(),
                }
                .paint(ui.painter());
            });

        // The screenshot of this frame arrives with the next update.
        if ticked {
            ctx.send_viewport_cmd(egui::ViewportCommand::Screenshot(egui::UserData::default()));
        }

        ctx.request_repaint();
    }
}

/// Reduce a diagram name to something safe in a file name: letters, digits,
/// `_`, `-`, with whitespace runs turned into `_`.
pub fn safe_file_stem(name: &str) -> String {
    let (Ok(unsafe_chars), Ok(whitespace)) =
        (Regex::new(r"(?i)[^a-z0-9_\- ]"), Regex::new(r"\s+"))
    else {
        return FALLBACK_NAME.to_string();
    };
    let kept = unsafe_chars.replace_all(name, "");
    let joined = whitespace.replace_all(kept.trim(), "_");
    if joined.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        joined.into_owned()
    }
}

pub fn frame_file_name(stem: &str, resolution: Resolution, index: u32) -> String {
    format!("{stem}-{}-{index:04}.png", resolution.name())
}

fn save_color_image(image: &egui::ColorImage, path: &Path) -> image::ImageResult<()> {
    let width = image.width() as u32;
    let height = image.height() as u32;
    let pixels: Vec<u8> = image
        .pixels
        .iter()
        .flat_map(|c| c.to_srgba_unmultiplied())
        .collect();

    image::save_buffer(path, &pixels, width, height, image::ColorType::Rgba8)
}

pub fn run(file: PathBuf, output_dir: PathBuf, overrides: RecordOverrides) -> anyhow::Result<()> {
    let config = Config::load_or_default();
    let settings = overrides.apply(config.recording());
    if !(MIN_FPS..=MAX_FPS).contains(&settings.fps) {
        anyhow::bail!("--fps must be between {MIN_FPS} and {MAX_FPS}");
    }
    if settings.frames == 0 {
        anyhow::bail!("--frames must be at least 1");
    }

    let (snapshot, globals) = DiagramDocument::open(&file, &config.import_defaults())?;
    if snapshot.shapes.is_empty() {
        anyhow::bail!("No shapes found in {}", file.display());
    }

    std::fs::create_dir_all(&output_dir)?;

    let mut editor = Editor::with_snapshot(config.session_config(), snapshot);
    editor.set_corner_radius(globals.corner_radius.unwrap_or(config.corner_radius()));
    editor.recompute_paths();

    let mut simulation = Simulation::new(settings.seed);
    simulation.set_global_speed(globals.global_speed.unwrap_or(config.global_speed()));

    let mut recording = Recording::new(settings.fps, settings.frames);
    recording.start();

    let base_name = safe_file_stem(
        file.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(FALLBACK_NAME),
    );
    let (width, height) = settings.resolution.size();

    eprintln!(
        "Recording {} frames at {} fps to {} ({}x{})",
        settings.frames,
        settings.fps,
        output_dir.display(),
        width,
        height,
    );
    tracing::info!(seed = settings.seed, resolution = %settings.resolution, "recording started");

    let title = format!("metroflow record - {base_name}");
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([width as f32, height as f32])
        .with_title(&title)
        .with_transparent(true)
        .with_resizable(false)
        .with_decorations(false);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let outcome = Rc::new(RefCell::new(Outcome::default()));
    let app = RecordApp {
        editor,
        simulation,
        recording,
        theme: Theme::dark(),
        output_dir: output_dir.clone(),
        base_name,
        resolution: settings.resolution,
        outcome: Rc::clone(&outcome),
    };

    eframe::run_native(&title, options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let outcome = outcome.borrow();
    if let Some(error) = &outcome.error {
        anyhow::bail!("Recording aborted after {} frames: {error}", outcome.saved);
    }
    if outcome.saved < settings.frames {
        anyhow::bail!(
            "Recording window closed early: {} of {} frames saved",
            outcome.saved,
            settings.frames
        );
    }

    eprintln!("Recording complete.");
    Ok(())
}
