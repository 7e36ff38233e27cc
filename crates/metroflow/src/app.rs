use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, Pos2};
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};

use crate::config::{
    Config, MAX_TRAFFIC_DENSITY, MAX_TRAFFIC_SPEED, MIN_TRAFFIC_DENSITY, MIN_TRAFFIC_SPEED,
    StartMode,
};
use crate::editor::{Editor, MAX_CORNER_RADIUS, MIN_CORNER_RADIUS, PointerInput, Tool};
use crate::model::document::{DiagramDocument, GlobalSettings, ImportDefaults};
use crate::model::{BorderStyle, DiagramSnapshot, LinkPatch, ShapeKind, ShapePatch, starter_diagram};
use crate::render::{Canvas, Overlay, icons};
use crate::simulation::scheduler::{FrameScheduler, LiveClock};
use crate::simulation::{MAX_GLOBAL_SPEED, MIN_GLOBAL_SPEED, Simulation};
use crate::theme::{Theme, color_or};
use crate::viewport::{
    BUTTON_ZOOM_IN, BUTTON_ZOOM_OUT, DEVICE_SIZE, ScrollDirection, SurfaceMapping,
};

/// Undo snapshots kept by the window.
pub const HISTORY_LIMIT: usize = 30;
const SPEED_STEP: f32 = 0.25;
const RADIUS_STEP: f32 = 4.0;
const WATCH_DEBOUNCE: Duration = Duration::from_millis(250);
const UNTITLED_FILE: &str = "diagram.json";

/// Editor commands reachable from the keyboard and the toolbar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Delete,
    Undo,
    Copy,
    Paste,
    Cancel,
    SetTool(Tool),
    TogglePlay,
    Faster,
    Slower,
    RadiusUp,
    RadiusDown,
    Fit,
    ZoomIn,
    ZoomOut,
    BringToFront,
    SendToBack,
    ClearAll,
    Save,
    ToggleTheme,
    ToggleHud,
}

struct Toast {
    message: String,
    start: Instant,
}

impl Toast {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            start: Instant::now(),
        }
    }

    fn opacity(&self) -> f32 {
        let elapsed = self.start.elapsed().as_secs_f32();
        let duration = 1.5;
        let fade_start = 1.0;
        if elapsed < fade_start {
            1.0
        } else if elapsed < duration {
            1.0 - (elapsed - fade_start) / (duration - fade_start)
        } else {
            0.0
        }
    }

    fn is_expired(&self) -> bool {
        self.start.elapsed().as_secs_f32() >= 1.5
    }
}

/// Reloads the open diagram when it changes on disk.
struct FileWatch {
    _debouncer: Debouncer<RecommendedWatcher>,
    events: Receiver<DebounceEventResult>,
}

impl FileWatch {
    fn start(file: &Path, ctx: egui::Context) -> anyhow::Result<Self> {
        let (tx, events) = std::sync::mpsc::channel();
        let mut debouncer = new_debouncer(WATCH_DEBOUNCE, move |res: DebounceEventResult| {
            let _ = tx.send(res);
            ctx.request_repaint();
        })?;
        // Watch the directory so atomic replace-on-save is still seen.
        let dir = match file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(dir = %dir.display(), "watching for diagram changes");
        Ok(Self {
            _debouncer: debouncer,
            events,
        })
    }

    /// Whether any event since the last poll touched `file`.
    fn changed(&self, file: &Path) -> bool {
        let name = file.file_name();
        let mut changed = false;
        while let Ok(result) = self.events.try_recv() {
            match result {
                Ok(events) => {
                    changed |= events.iter().any(|e| e.path.file_name() == name);
                }
                Err(e) => tracing::warn!("file watch error: {e}"),
            }
        }
        changed
    }
}

pub struct MetroflowApp {
    editor: Editor,
    simulation: Simulation,
    clock: LiveClock,
    theme: Theme,
    import_defaults: ImportDefaults,
    file: Option<PathBuf>,
    history: Vec<DiagramSnapshot>,
    toast: Option<Toast>,
    show_hud: bool,
    watch: Option<FileWatch>,
    /// Last JSON this window wrote, so its own saves are not reloaded.
    last_written: Option<String>,
    hover_world: Option<Pos2>,
    /// Last pointer position seen over the window, used to finish a gesture
    /// after the pointer has left.
    last_pointer: Option<Pos2>,
}

impl MetroflowApp {
    fn new(
        editor: Editor,
        simulation: Simulation,
        import_defaults: ImportDefaults,
        file: Option<PathBuf>,
    ) -> Self {
        Self {
            editor,
            simulation,
            clock: LiveClock::new(),
            theme: Theme::dark(),
            import_defaults,
            file,
            history: Vec::new(),
            toast: None,
            show_hud: false,
            watch: None,
            last_written: None,
            hover_world: None,
            last_pointer: None,
        }
    }

    fn display_title(&self) -> String {
        match &self.file {
            Some(f) => format!(
                "metroflow - {}",
                f.file_name().unwrap_or_default().to_string_lossy()
            ),
            None => "metroflow".to_string(),
        }
    }

    fn notify(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast::new(message));
    }

    /// Move checkpoints produced by the editor onto the undo stack.
    fn sync_history(&mut self) {
        for snapshot in self.editor.take_checkpoints() {
            self.history.push(snapshot);
        }
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }

    /// Replace the diagram with freshly loaded content. History is dropped.
    fn load(&mut self, snapshot: DiagramSnapshot, settings: GlobalSettings) {
        self.editor.replace_collections(snapshot);
        if let Some(radius) = settings.corner_radius {
            self.editor.set_corner_radius(radius);
            self.editor.refresh_paths();
        }
        if let Some(speed) = settings.global_speed {
            self.simulation.set_global_speed(speed);
        }
        self.simulation.clear();
        self.editor.take_checkpoints();
        self.history.clear();
    }

    fn reload(&mut self) {
        let Some(file) = self.file.clone() else {
            return;
        };
        let contents = match std::fs::read_to_string(&file) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %file.display(), "reload failed: {e}");
                return;
            }
        };
        if self.last_written.as_deref() == Some(contents.as_str()) {
            return;
        }
        match DiagramDocument::from_json(&contents) {
            Ok(doc) => {
                let settings = doc.global_settings.unwrap_or_default();
                self.load(doc.into_snapshot(&self.import_defaults), settings);
                tracing::info!(path = %file.display(), "diagram reloaded");
                self.notify("Reloaded from disk");
            }
            Err(e) => {
                tracing::warn!(path = %file.display(), "ignoring invalid diagram: {e:#}");
                self.notify("Reload failed: invalid diagram");
            }
        }
    }

    fn save(&mut self) -> anyhow::Result<PathBuf> {
        let path = self
            .file
            .clone()
            .unwrap_or_else(|| PathBuf::from(UNTITLED_FILE));
        let doc = DiagramDocument::from_snapshot(
            &self.editor.snapshot(),
            GlobalSettings {
                corner_radius: Some(self.editor.corner_radius()),
                global_speed: Some(self.simulation.global_speed()),
            },
        );
        self.last_written = Some(doc.to_json()?);
        doc.save(&path)?;
        self.file = Some(path.clone());
        Ok(path)
    }

    fn set_playing(&mut self, playing: bool) {
        self.simulation.set_playing(playing);
        if playing {
            self.clock.start();
        } else {
            self.clock.stop();
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Delete => {
                let removed = self.editor.delete_selection();
                self.simulation.forget_links(&removed);
            }
            Action::Undo => match self.history.pop() {
                Some(snapshot) => {
                    self.editor.restore(snapshot);
                    self.notify("Undo");
                }
                None => self.notify("Nothing to undo"),
            },
            Action::Copy => {
                if self.editor.copy_selection() {
                    self.notify("Copied");
                }
            }
            Action::Paste => {
                self.editor.paste();
            }
            Action::Cancel => {
                self.editor.cancel_gesture();
                self.editor.set_tool(Tool::Select);
            }
            Action::SetTool(tool) => self.editor.set_tool(tool),
            Action::TogglePlay => {
                let playing = !self.simulation.is_playing();
                self.set_playing(playing);
                self.notify(if playing { "Playing" } else { "Paused" });
            }
            Action::Faster | Action::Slower => {
                let step = if action == Action::Faster { SPEED_STEP } else { -SPEED_STEP };
                self.simulation
                    .set_global_speed(self.simulation.global_speed() + step);
                self.notify(format!("Speed: {:.2}x", self.simulation.global_speed()));
            }
            Action::RadiusUp | Action::RadiusDown => {
                let step = if action == Action::RadiusUp { RADIUS_STEP } else { -RADIUS_STEP };
                self.editor.set_corner_radius(self.editor.corner_radius() + step);
                self.notify(format!("Corner radius: {}", self.editor.corner_radius()));
            }
            Action::Fit => self.editor.fit_to_content(DEVICE_SIZE),
            Action::ZoomIn => self.editor.transform_mut().zoom_by(BUTTON_ZOOM_IN),
            Action::ZoomOut => self.editor.transform_mut().zoom_by(BUTTON_ZOOM_OUT),
            Action::BringToFront => self.editor.bring_to_front(),
            Action::SendToBack => self.editor.send_to_back(),
            Action::ClearAll => {
                self.editor.clear();
                self.simulation.clear();
            }
            Action::Save => match self.save() {
                Ok(path) => self.notify(format!("Saved {}", path.display())),
                Err(e) => {
                    tracing::warn!("save failed: {e:#}");
                    self.notify(format!("Save failed: {e}"));
                }
            },
            Action::ToggleTheme => {
                self.theme = self.theme.toggled();
                self.notify(format!("Theme: {}", self.theme.name));
            }
            Action::ToggleHud => self.show_hud = !self.show_hud,
        }
        self.sync_history();
    }

    /// Keyboard shortcuts pressed this frame, plus whether to quit.
    fn read_shortcuts(ctx: &egui::Context) -> (Vec<Action>, bool) {
        if ctx.wants_keyboard_input() {
            return (Vec::new(), false);
        }
        ctx.input(|i| {
            let mut actions = Vec::new();
            for event in &i.events {
                match event {
                    egui::Event::Copy => actions.push(Action::Copy),
                    egui::Event::Paste(_) => actions.push(Action::Paste),
                    _ => {}
                }
            }

            let command = i.modifiers.command;
            let bindings: &[(egui::Key, bool, Action)] = &[
                (egui::Key::Delete, false, Action::Delete),
                (egui::Key::Backspace, false, Action::Delete),
                (egui::Key::Z, true, Action::Undo),
                (egui::Key::S, true, Action::Save),
                (egui::Key::CloseBracket, true, Action::BringToFront),
                (egui::Key::OpenBracket, true, Action::SendToBack),
                (egui::Key::Escape, false, Action::Cancel),
                (egui::Key::V, false, Action::SetTool(Tool::Select)),
                (egui::Key::R, false, Action::SetTool(Tool::Create(ShapeKind::Rect))),
                (egui::Key::C, false, Action::SetTool(Tool::Create(ShapeKind::Circle))),
                (egui::Key::T, false, Action::SetTool(Tool::Create(ShapeKind::Text))),
                (egui::Key::I, false, Action::SetTool(Tool::Create(ShapeKind::Decorative))),
                (egui::Key::L, false, Action::SetTool(Tool::Connect)),
                (egui::Key::Space, false, Action::TogglePlay),
                (egui::Key::Period, false, Action::Faster),
                (egui::Key::Comma, false, Action::Slower),
                (egui::Key::CloseBracket, false, Action::RadiusUp),
                (egui::Key::OpenBracket, false, Action::RadiusDown),
                (egui::Key::F, false, Action::Fit),
                (egui::Key::Plus, false, Action::ZoomIn),
                (egui::Key::Equals, false, Action::ZoomIn),
                (egui::Key::Minus, false, Action::ZoomOut),
                (egui::Key::D, false, Action::ToggleTheme),
                (egui::Key::H, false, Action::ToggleHud),
            ];
            for &(key, needs_command, action) in bindings {
                if i.key_pressed(key) && command == needs_command {
                    actions.push(action);
                }
            }
            let quit = i.key_pressed(egui::Key::Q) && !command;
            (actions, quit)
        })
    }

    /// Translate this frame's pointer state into editor events. A gesture
    /// ends on release, when the button is no longer down, or when the
    /// pointer leaves the window; a press released within the same frame
    /// is a complete click.
    fn handle_pointer(
        &mut self,
        ctx: &egui::Context,
        response: &egui::Response,
        mapping: &SurfaceMapping,
    ) {
        let (pressed, released, down, pos, shift, scroll_y) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.primary_down(),
                // `latest_pos` clears as soon as the pointer leaves the window.
                i.pointer.latest_pos().and(i.pointer.interact_pos()),
                i.modifiers.shift,
                i.raw_scroll_delta.y,
            )
        });

        self.hover_world = response
            .hover_pos()
            .map(|p| mapping.screen_to_world(p, self.editor.transform()));

        if response.hovered() && scroll_y != 0.0 {
            let direction = if scroll_y < 0.0 {
                ScrollDirection::Down
            } else {
                ScrollDirection::Up
            };
            self.editor.wheel(direction);
        }

        if pos.is_some() {
            self.last_pointer = pos;
        }
        let Some(at) = pos.or(self.last_pointer) else {
            return;
        };
        let input = PointerInput {
            pos: at,
            modifier: shift,
        };
        let ended = released || !down || pos.is_none();

        if pressed && response.hovered() {
            self.editor.pointer_down(input, mapping);
            if ended {
                self.editor.pointer_up(input, mapping);
            }
        } else if self.editor.gesture().is_pressed() {
            if pos.is_some() {
                self.editor.pointer_move(input, mapping);
            }
            if ended {
                self.editor.pointer_up(input, mapping);
            }
        }
    }

    /// Central canvas: pointer handling, path refresh, simulation step and
    /// painting.
    fn show_canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(self.theme.background).inner_margin(0.0))
            .show(ctx, |ui| {
                let (response, painter) =
                    ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
                let mapping = SurfaceMapping::new(response.rect);

                self.handle_pointer(ctx, &response, &mapping);
                self.sync_history();

                // Geometry settles before signals sample it.
                self.editor.refresh_paths();
                if let Some(dt) = self.clock.next_delta() {
                    self.simulation.tick(dt, self.editor.links());
                }

                Canvas {
                    editor: &self.editor,
                    simulation: &self.simulation,
                    theme: &self.theme,
                    mapping,
                    overlay: Overlay {
                        backdrop: true,
                        chrome: true,
                        hover: self.hover_world,
                    },
                }
                .paint(&painter);

                if self.toast.as_ref().is_some_and(|t| t.is_expired()) {
                    self.toast = None;
                }
                self.draw_toast(ui, response.rect);
                if self.show_hud {
                    draw_hud(ui, &self.theme, response.rect);
                }
            });
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui) -> Vec<Action> {
        let mut actions = Vec::new();
        ui.horizontal_wrapped(|ui| {
            let current = self.editor.tool();
            for tool in Tool::ALL {
                if ui.selectable_label(current == tool, tool.label()).clicked() {
                    actions.push(Action::SetTool(tool));
                }
            }
            ui.separator();

            let play_label = if self.simulation.is_playing() { "Pause" } else { "Play" };
            if ui.button(play_label).clicked() {
                actions.push(Action::TogglePlay);
            }
            let mut speed = self.simulation.global_speed();
            let speed_slider =
                egui::Slider::new(&mut speed, MIN_GLOBAL_SPEED..=MAX_GLOBAL_SPEED).text("Speed");
            if ui.add(speed_slider).changed() {
                self.simulation.set_global_speed(speed);
            }
            let mut radius = self.editor.corner_radius();
            let radius_slider =
                egui::Slider::new(&mut radius, MIN_CORNER_RADIUS..=MAX_CORNER_RADIUS)
                    .text("Corners");
            if ui.add(radius_slider).changed() {
                self.editor.set_corner_radius(radius);
            }
            ui.separator();

            if ui.button("-").on_hover_text("Zoom out").clicked() {
                actions.push(Action::ZoomOut);
            }
            ui.label(format!("{:.0}%", self.editor.transform().k * 100.0));
            if ui.button("+").on_hover_text("Zoom in").clicked() {
                actions.push(Action::ZoomIn);
            }
            if ui.button("Fit").clicked() {
                actions.push(Action::Fit);
            }
            ui.separator();
            if ui.button("Undo").clicked() {
                actions.push(Action::Undo);
            }
            if ui.button("Save").clicked() {
                actions.push(Action::Save);
            }
            if ui.button("Clear").clicked() {
                actions.push(Action::ClearAll);
            }
            ui.separator();
            ui.label(format!(
                "{} shapes, {} links, {} signals",
                self.editor.shapes().len(),
                self.editor.links().len(),
                self.simulation.signals().len()
            ));
        });
        actions
    }

    fn draw_properties(&mut self, ui: &mut egui::Ui) {
        let selection = self.editor.selection().clone();
        if selection.is_empty() {
            ui.heading("Properties");
            ui.label("Nothing selected.");
            ui.add_space(8.0);
            ui.label("Click a shape or link to edit it. Shift-click adds to the selection.");
            return;
        }

        let first_shape = selection
            .shapes
            .first()
            .and_then(|id| self.editor.shape(id))
            .cloned();
        if let Some(shape) = first_shape {
            ui.heading(if selection.shapes.len() > 1 {
                format!("{} shapes", selection.shapes.len())
            } else {
                format!("Shape {}", shape.id)
            });
            let mut patch = ShapePatch::default();

            let mut label = shape.label.clone();
            if ui.text_edit_singleline(&mut label).changed() {
                patch.label = Some(label);
            }
            egui::Grid::new("shape_geometry").num_columns(2).show(ui, |ui| {
                for (name, value, slot) in [
                    ("X", shape.x, &mut patch.x),
                    ("Y", shape.y, &mut patch.y),
                    ("Width", shape.width, &mut patch.width),
                    ("Height", shape.height, &mut patch.height),
                ] {
                    ui.label(name);
                    let mut v = value;
                    if ui.add(egui::DragValue::new(&mut v)).changed() {
                        *slot = Some(v);
                    }
                    ui.end_row();
                }
            });

            ui.horizontal(|ui| {
                if let Some(hex) = color_field(ui, "Fill", &shape.style.fill) {
                    patch.fill = Some(hex);
                }
                if let Some(hex) = color_field(ui, "Border", &shape.style.border_color) {
                    patch.border_color = Some(hex);
                }
                if let Some(hex) = color_field(ui, "Text", &shape.style.label_color) {
                    patch.label_color = Some(hex);
                }
            });
            let mut border_width = shape.style.border_width;
            if ui
                .add(egui::Slider::new(&mut border_width, 0.0..=10.0).text("Border width"))
                .changed()
            {
                patch.border_width = Some(border_width);
            }
            let mut dashed = shape.style.border_style == BorderStyle::Dashed;
            if ui.checkbox(&mut dashed, "Dashed border").changed() {
                patch.border_style = Some(if dashed {
                    BorderStyle::Dashed
                } else {
                    BorderStyle::Solid
                });
            }
            let mut font_size = shape.style.font_size;
            if ui
                .add(egui::Slider::new(&mut font_size, 6.0..=48.0).text("Font size"))
                .changed()
            {
                patch.font_size = Some(font_size);
            }
            if shape.kind == ShapeKind::Decorative {
                let current = shape.style.icon_name.clone().unwrap_or_default();
                let mut chosen = current.clone();
                egui::ComboBox::from_label("Icon")
                    .selected_text(current.as_str())
                    .show_ui(ui, |ui| {
                        for name in icons::ICON_NAMES {
                            ui.selectable_value(&mut chosen, name.to_string(), *name);
                        }
                    });
                if chosen != current {
                    patch.icon_name = Some(chosen);
                }
                if let Some(hex) = color_field(ui, "Icon color", &shape.style.icon_color) {
                    patch.icon_color = Some(hex);
                }
            }

            if patch != ShapePatch::default() {
                self.editor.update_selected(Some(&patch), None);
            }
            ui.separator();
        }

        if let Some(link) = selection.links.first().and_then(|id| self.editor.link(id)).cloned() {
            ui.heading(if selection.links.len() > 1 {
                format!("{} links", selection.links.len())
            } else {
                format!("Link {}", link.id)
            });
            let mut patch = LinkPatch::default();

            let mut label = link.style.label.clone().unwrap_or_default();
            if ui.text_edit_singleline(&mut label).changed() {
                patch.label = Some(label);
            }
            let mut speed = link.traffic_speed;
            if ui
                .add(
                    egui::Slider::new(&mut speed, MIN_TRAFFIC_SPEED..=MAX_TRAFFIC_SPEED)
                        .text("Traffic speed"),
                )
                .changed()
            {
                patch.traffic_speed = Some(speed);
            }
            let mut density = link.traffic_density;
            if ui
                .add(
                    egui::Slider::new(&mut density, MIN_TRAFFIC_DENSITY..=MAX_TRAFFIC_DENSITY)
                        .text("Traffic density"),
                )
                .changed()
            {
                patch.traffic_density = Some(density);
            }
            let mut width = link.style.width;
            if ui.add(egui::Slider::new(&mut width, 1.0..=12.0).text("Width")).changed() {
                patch.width = Some(width);
            }
            let mut label_size = link.style.label_size;
            if ui
                .add(egui::Slider::new(&mut label_size, 6.0..=32.0).text("Label size"))
                .changed()
            {
                patch.label_size = Some(label_size);
            }
            ui.horizontal(|ui| {
                if let Some(hex) = color_field(ui, "Line", &link.style.color) {
                    patch.color = Some(hex);
                }
                if let Some(hex) = color_field(ui, "Label", &link.style.label_color) {
                    patch.label_color = Some(hex);
                }
            });
            let mut show_bg = link.style.show_label_background;
            if ui.checkbox(&mut show_bg, "Label background").changed() {
                patch.show_label_background = Some(show_bg);
            }

            if patch != LinkPatch::default() {
                self.editor.update_selected(None, Some(&patch));
            }
        }
    }

    fn draw_toast(&self, ui: &egui::Ui, rect: egui::Rect) {
        let Some(toast) = &self.toast else {
            return;
        };
        let opacity = toast.opacity();
        if opacity <= 0.0 {
            return;
        }
        let color = Theme::with_opacity(self.theme.hud_foreground, opacity * 0.9);
        let bg = Theme::with_opacity(self.theme.hud_background, opacity * 0.9);
        let galley = ui.painter().layout_no_wrap(
            toast.message.clone(),
            egui::FontId::proportional(18.0),
            color,
        );
        let padding = 12.0;
        let toast_rect = egui::Rect::from_min_size(
            egui::pos2(
                rect.center().x - galley.rect.width() / 2.0 - padding,
                rect.bottom() - 72.0,
            ),
            egui::vec2(
                galley.rect.width() + padding * 2.0,
                galley.rect.height() + padding * 2.0,
            ),
        );
        ui.painter().rect_filled(toast_rect, 8.0, bg);
        ui.painter().galley(
            egui::pos2(toast_rect.left() + padding, toast_rect.top() + padding),
            galley,
            color,
        );
    }
}

/// Colour button bound to a hex string. Returns the new hex on change.
fn color_field(ui: &mut egui::Ui, label: &str, value: &str) -> Option<String> {
    let mut color = color_or(value, Color32::TRANSPARENT);
    ui.label(label);
    ui.color_edit_button_srgba(&mut color)
        .changed()
        .then(|| color.to_hex())
}

impl eframe::App for MetroflowApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let file_changed = match (&self.watch, &self.file) {
            (Some(watch), Some(file)) => watch.changed(file),
            _ => false,
        };
        if file_changed {
            self.reload();
        }

        let (mut actions, quit) = Self::read_shortcuts(ctx);
        if quit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            actions.extend(self.draw_toolbar(ui));
        });
        egui::SidePanel::right("properties")
            .default_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_properties(ui));
            });

        for action in actions {
            self.apply(action);
        }

        self.show_canvas(ctx);

        if self.simulation.is_playing() || self.toast.is_some() {
            ctx.request_repaint();
        }
    }
}

fn draw_hud(ui: &egui::Ui, theme: &Theme, rect: egui::Rect) {
    let shortcuts = [
        ("V / R / C / T / I / L", "Select, rectangle, circle, text, icon, connect"),
        ("Drag background", "Pan"),
        ("Wheel / + / -", "Zoom"),
        ("Shift click", "Add to selection"),
        ("Delete", "Delete selection"),
        ("Ctrl+Z", "Undo"),
        ("Ctrl+C / Ctrl+V", "Copy / paste shape"),
        ("Ctrl+] / Ctrl+[", "Bring to front / send to back"),
        ("Space", "Play / pause traffic"),
        (". / ,", "Faster / slower"),
        ("] / [", "Corner radius"),
        ("F", "Fit to content"),
        ("Ctrl+S", "Save"),
        ("D", "Toggle theme"),
        ("Esc", "Cancel"),
        ("H", "Toggle this HUD"),
        ("Q", "Quit"),
    ];

    let bg = Theme::with_opacity(theme.hud_background, 0.95);
    let text_color = theme.hud_foreground;
    let key_color = theme.accent;

    let padding = 20.0;
    let line_height = 24.0;
    let hud_height = shortcuts.len() as f32 * line_height + padding * 2.0 + 32.0;
    let hud_rect = egui::Rect::from_center_size(rect.center(), egui::vec2(480.0, hud_height));
    ui.painter().rect_filled(hud_rect, 12.0, bg);

    let title = ui.painter().layout_no_wrap(
        "Keyboard Shortcuts".to_string(),
        egui::FontId::proportional(18.0),
        text_color,
    );
    ui.painter().galley(
        egui::pos2(hud_rect.left() + padding, hud_rect.top() + padding),
        title,
        text_color,
    );

    let mut y = hud_rect.top() + padding + 32.0;
    for (key, desc) in shortcuts {
        let key_galley =
            ui.painter()
                .layout_no_wrap(key.to_string(), egui::FontId::monospace(13.0), key_color);
        ui.painter()
            .galley(egui::pos2(hud_rect.left() + padding, y), key_galley, key_color);
        let desc_galley =
            ui.painter()
                .layout_no_wrap(desc.to_string(), egui::FontId::proportional(13.0), text_color);
        ui.painter().galley(
            egui::pos2(hud_rect.left() + padding + 170.0, y),
            desc_galley,
            text_color,
        );
        y += line_height;
    }
}

/// Build the editor state the window opens with.
fn initial_state(
    file: Option<&Path>,
    config: &Config,
) -> anyhow::Result<(DiagramSnapshot, GlobalSettings)> {
    match file {
        Some(path) => DiagramDocument::open(path, &config.import_defaults()),
        None => Ok((starter_diagram(), GlobalSettings::default())),
    }
}

pub fn run(file: Option<PathBuf>, windowed: bool, watch: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default();
    let (snapshot, settings) = initial_state(file.as_deref(), &config)?;
    if watch && file.is_none() {
        anyhow::bail!("--watch needs a diagram file");
    }

    let mut simulation = Simulation::new(rand::random());
    simulation.set_global_speed(config.global_speed());
    let mut app = MetroflowApp::new(
        Editor::new(config.session_config()),
        simulation,
        config.import_defaults(),
        file,
    );
    app.load(snapshot, settings);
    if config.start_mode() == StartMode::Fit {
        app.editor.fit_to_content(DEVICE_SIZE);
    }

    let title = app.display_title();
    let viewport = if windowed {
        egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title(&title)
    } else {
        egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_title(&title)
    };
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| {
            if let Some(path) = app.file.as_deref().filter(|_| watch) {
                match FileWatch::start(path, cc.egui_ctx.clone()) {
                    Ok(w) => app.watch = Some(w),
                    Err(e) => tracing::warn!("could not watch {}: {e}", path.display()),
                }
            }
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> MetroflowApp {
        let mut app = MetroflowApp::new(
            Editor::new(Default::default()),
            Simulation::new(3),
            ImportDefaults::default(),
            None,
        );
        app.load(starter_diagram(), GlobalSettings::default());
        app
    }

    fn select(app: &mut MetroflowApp, id: &str) {
        let center = app.editor.shape(id).map(|s| s.center()).unwrap_or_default();
        let mapping = SurfaceMapping::new(egui::Rect::from_min_size(Pos2::ZERO, DEVICE_SIZE));
        *app.editor.transform_mut() = crate::viewport::Transform { x: 0.0, y: 0.0, k: 1.0 };
        app.editor.pointer_down(PointerInput::new(center), &mapping);
        app.editor.pointer_up(PointerInput::new(center), &mapping);
    }

    #[test]
    fn test_load_applies_global_settings_and_clears_history() {
        let mut app = app();
        app.apply(Action::ClearAll);
        assert_eq!(app.history.len(), 1);

        app.load(
            starter_diagram(),
            GlobalSettings {
                corner_radius: Some(40.0),
                global_speed: Some(2.0),
            },
        );
        assert!(app.history.is_empty());
        assert_eq!(app.editor.corner_radius(), 40.0);
        assert_eq!(app.simulation.global_speed(), 2.0);
        assert!(app.editor.links().iter().all(|l| l.path.is_some()));
    }

    #[test]
    fn test_undo_restores_deleted_shape() {
        let mut app = app();
        select(&mut app, "n1");
        app.apply(Action::Delete);
        assert!(app.editor.shape("n1").is_none());
        assert_eq!(app.editor.links().len(), 1);

        app.apply(Action::Undo);
        assert!(app.editor.shape("n1").is_some());
        assert_eq!(app.editor.links().len(), 3);
        assert!(app.history.is_empty());
    }

    #[test]
    fn test_history_is_capped() {
        let mut app = app();
        for _ in 0..(HISTORY_LIMIT + 10) {
            app.apply(Action::ClearAll);
        }
        assert_eq!(app.history.len(), HISTORY_LIMIT);
    }

    #[test]
    fn test_speed_and_radius_steps_clamp() {
        let mut app = app();
        for _ in 0..40 {
            app.apply(Action::Faster);
        }
        assert_eq!(app.simulation.global_speed(), MAX_GLOBAL_SPEED);
        for _ in 0..40 {
            app.apply(Action::RadiusDown);
        }
        assert_eq!(app.editor.corner_radius(), MIN_CORNER_RADIUS);
    }

    #[test]
    fn test_pause_stops_clock() {
        let mut app = app();
        app.apply(Action::TogglePlay);
        assert!(!app.simulation.is_playing());
        assert_eq!(app.clock.next_delta(), None);
        app.apply(Action::TogglePlay);
        assert!(app.clock.next_delta().is_some());
    }

    #[test]
    fn test_cancel_returns_to_select() {
        let mut app = app();
        app.apply(Action::SetTool(Tool::Connect));
        app.apply(Action::Cancel);
        assert_eq!(app.editor.tool(), Tool::Select);
    }

    fn screen_input(events: Vec<egui::Event>) -> egui::RawInput {
        egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(Pos2::ZERO, DEVICE_SIZE)),
            events,
            ..Default::default()
        }
    }

    fn run_frame(app: &mut MetroflowApp, ctx: &egui::Context, events: Vec<egui::Event>) {
        let _ = ctx.run(screen_input(events), |ctx| app.show_canvas(ctx));
    }

    fn button(pos: Pos2, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        }
    }

    fn hover(app: &mut MetroflowApp, ctx: &egui::Context, pos: Pos2) {
        for _ in 0..2 {
            run_frame(app, ctx, vec![egui::Event::PointerMoved(pos)]);
        }
    }

    #[test]
    fn test_press_and_release_in_one_frame_ends_gesture() {
        let mut app = app();
        let ctx = egui::Context::default();
        let at = Pos2::new(900.0, 900.0);
        hover(&mut app, &ctx, at);

        run_frame(&mut app, &ctx, vec![button(at, true), button(at, false)]);
        assert!(!app.editor.gesture().is_pressed());

        let before = *app.editor.transform();
        run_frame(&mut app, &ctx, vec![egui::Event::PointerMoved(Pos2::new(500.0, 500.0))]);
        assert_eq!(*app.editor.transform(), before);
    }

    #[test]
    fn test_single_frame_tap_selects_shape() {
        let mut app = app();
        let ctx = egui::Context::default();
        // n1 sits at world (400, 300); the default transform scales by 0.8.
        let at = Pos2::new(320.0, 240.0);
        hover(&mut app, &ctx, at);

        run_frame(&mut app, &ctx, vec![button(at, true), button(at, false)]);
        assert_eq!(app.editor.selection().shapes, vec!["n1".to_string()]);
        assert!(!app.editor.gesture().is_pressed());
    }

    #[test]
    fn test_pointer_leaving_window_ends_pan() {
        let mut app = app();
        let ctx = egui::Context::default();
        let at = Pos2::new(900.0, 900.0);
        hover(&mut app, &ctx, at);

        run_frame(&mut app, &ctx, vec![button(at, true)]);
        run_frame(&mut app, &ctx, vec![egui::Event::PointerMoved(Pos2::new(950.0, 950.0))]);
        assert!(app.editor.gesture().is_pressed());

        run_frame(&mut app, &ctx, vec![egui::Event::PointerGone]);
        assert!(!app.editor.gesture().is_pressed());

        let before = *app.editor.transform();
        run_frame(&mut app, &ctx, vec![egui::Event::PointerMoved(Pos2::new(600.0, 600.0))]);
        assert_eq!(*app.editor.transform(), before);
    }

    #[test]
    fn test_zoom_buttons_scale_transform() {
        let mut app = app();
        let k = app.editor.transform().k;
        app.apply(Action::ZoomIn);
        assert!((app.editor.transform().k - k * BUTTON_ZOOM_IN).abs() < 1e-5);
    }
}
