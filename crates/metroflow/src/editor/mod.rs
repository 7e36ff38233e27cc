pub mod interaction;
pub mod snap;

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};

use eframe::egui::{Pos2, Vec2};
use rayon::prelude::*;

use crate::geometry;
use crate::model::{
    DEFAULT_TRAFFIC_DENSITY, DEFAULT_TRAFFIC_SPEED, DiagramSnapshot, Link, LinkId, LinkPatch,
    LinkStyle, NodeStyle, Selection, Shape, ShapeId, ShapeKind, ShapePatch,
};
use crate::viewport::Transform;

pub use interaction::{Gesture, PointerInput, Tool};
pub use snap::AlignmentGuide;

pub const MIN_CORNER_RADIUS: f32 = 0.0;
pub const MAX_CORNER_RADIUS: f32 = 100.0;
/// Offset applied to pasted shapes.
const PASTE_OFFSET: f32 = 20.0;

/// Style and size given to shapes created with a creation tool.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDefaults {
    pub style: NodeStyle,
    pub width: f32,
    pub height: f32,
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            style: NodeStyle::default(),
            width: 80.0,
            height: 80.0,
        }
    }
}

/// Style and traffic parameters given to links created with the connect tool.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDefaults {
    pub style: LinkStyle,
    pub traffic_speed: f32,
    pub traffic_density: f32,
}

impl Default for LinkDefaults {
    fn default() -> Self {
        Self {
            style: LinkStyle::default(),
            traffic_speed: DEFAULT_TRAFFIC_SPEED,
            traffic_density: DEFAULT_TRAFFIC_DENSITY,
        }
    }
}

/// Per-session editing state that used to live in ambient UI globals.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub tool: Tool,
    pub corner_radius: f32,
    pub node_defaults: NodeDefaults,
    pub link_defaults: LinkDefaults,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tool: Tool::Select,
            corner_radius: geometry::DEFAULT_CORNER_RADIUS,
            node_defaults: NodeDefaults::default(),
            link_defaults: LinkDefaults::default(),
        }
    }
}

/// Result of a path recomputation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecomputeStats {
    pub routed: usize,
    /// Links whose endpoints could not be resolved; their old path is kept.
    pub stale: usize,
}

/// The editing session: sole owner of shapes, links, selection, viewport and
/// gesture state, and the only place link paths are computed.
#[derive(Debug)]
pub struct Editor {
    shapes: Vec<Shape>,
    links: Vec<Link>,
    selection: Selection,
    transform: Transform,
    guides: Vec<AlignmentGuide>,
    gesture: Gesture,
    config: SessionConfig,
    clipboard: Option<Shape>,
    /// Pre-mutation snapshots waiting to be taken by a history stack.
    checkpoints: Vec<DiagramSnapshot>,
    paths_dirty: bool,
    next_id: u64,
}

impl Editor {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            shapes: Vec::new(),
            links: Vec::new(),
            selection: Selection::default(),
            transform: Transform::default(),
            guides: Vec::new(),
            gesture: Gesture::Idle,
            config,
            clipboard: None,
            checkpoints: Vec::new(),
            paths_dirty: false,
            next_id: 1,
        }
    }

    pub fn with_snapshot(config: SessionConfig, snapshot: DiagramSnapshot) -> Self {
        let mut editor = Self::new(config);
        editor.replace_collections(snapshot);
        editor
    }

    // --- Read access ---

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.id == id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn guides(&self) -> &[AlignmentGuide] {
        &self.guides
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn tool(&self) -> Tool {
        self.config.tool
    }

    pub fn corner_radius(&self) -> f32 {
        self.config.corner_radius
    }

    /// Shape recorded as the first endpoint of a pending connection.
    pub fn pending_connection(&self) -> Option<&str> {
        self.gesture.pending_source()
    }

    // --- Session configuration ---

    pub fn set_tool(&mut self, tool: Tool) {
        if tool != Tool::Connect {
            if let Gesture::PendingConnection { .. } = self.gesture {
                self.gesture = Gesture::Idle;
            }
        }
        self.config.tool = tool;
    }

    /// Set the global rounding radius, clamped to the supported range.
    pub fn set_corner_radius(&mut self, radius: f32) {
        let radius = if radius.is_finite() {
            radius.clamp(MIN_CORNER_RADIUS, MAX_CORNER_RADIUS)
        } else {
            geometry::DEFAULT_CORNER_RADIUS
        };
        if radius != self.config.corner_radius {
            self.config.corner_radius = radius;
            self.paths_dirty = true;
        }
    }

    pub fn node_defaults_mut(&mut self) -> &mut NodeDefaults {
        &mut self.config.node_defaults
    }

    pub fn link_defaults_mut(&mut self) -> &mut LinkDefaults {
        &mut self.config.link_defaults
    }

    /// Fit the viewport to the current shapes in a `viewport`-sized device area.
    pub fn fit_to_content(&mut self, viewport: Vec2) {
        self.transform = Transform::fit_to_content(&self.shapes, viewport);
    }

    // --- Paths ---

    /// Whether a geometry change is waiting for [`Editor::refresh_paths`].
    pub fn paths_dirty(&self) -> bool {
        self.paths_dirty
    }

    /// Recompute paths if anything geometric changed since the last pass.
    pub fn refresh_paths(&mut self) -> Option<RecomputeStats> {
        if !self.paths_dirty {
            return None;
        }
        Some(self.recompute_paths())
    }

    /// Route every link whose endpoints resolve. Links with a missing
    /// endpoint keep their previous path.
    pub fn recompute_paths(&mut self) -> RecomputeStats {
        let by_id: HashMap<&str, &Shape> =
            self.shapes.iter().map(|s| (s.id.as_str(), s)).collect();
        let radius = self.config.corner_radius;

        let routed: usize = self
            .links
            .par_iter_mut()
            .map(|link| {
                match (
                    by_id.get(link.source_id.as_str()),
                    by_id.get(link.target_id.as_str()),
                ) {
                    (Some(source), Some(target)) => {
                        link.path = Some(geometry::link_path(source, target, radius));
                        1
                    }
                    _ => 0,
                }
            })
            .sum();

        let stats = RecomputeStats {
            routed,
            stale: self.links.len() - routed,
        };
        if stats.stale > 0 {
            tracing::debug!(stale = stats.stale, "kept previous path for unresolved links");
        }
        tracing::trace!(routed = stats.routed, radius, "link paths recomputed");
        self.paths_dirty = false;
        stats
    }

    // --- Collection replacement and history hooks ---

    /// Replace every shape and link (import, undo, clear). Paths are
    /// recomputed before returning.
    pub fn replace_collections(&mut self, snapshot: DiagramSnapshot) {
        self.shapes = snapshot.shapes;
        self.links = snapshot.links;
        self.selection.clear();
        self.guides.clear();
        self.gesture = Gesture::Idle;
        self.recompute_paths();
    }

    pub fn snapshot(&self) -> DiagramSnapshot {
        DiagramSnapshot {
            shapes: self.shapes.clone(),
            links: self.links.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: DiagramSnapshot) {
        self.replace_collections(snapshot);
    }

    /// Snapshots taken just before each structural mutation since the last
    /// call, oldest first. Retention is up to the caller.
    pub fn take_checkpoints(&mut self) -> Vec<DiagramSnapshot> {
        std::mem::take(&mut self.checkpoints)
    }

    fn checkpoint(&mut self) {
        let snapshot = self.snapshot();
        self.checkpoints.push(snapshot);
    }

    // --- Field mutation ---

    /// Apply a property edit to one shape. Unknown ids are ignored.
    pub fn update_shape(&mut self, id: &str, patch: &ShapePatch) {
        if self.shape(id).is_none() {
            return;
        }
        self.checkpoint();
        if let Some(shape) = self.shapes.iter_mut().find(|s| s.id == id) {
            patch.apply(shape);
        }
        if patch.affects_geometry() {
            self.paths_dirty = true;
        }
    }

    /// Apply a property edit to one link. Unknown ids are ignored.
    pub fn update_link(&mut self, id: &str, patch: &LinkPatch) {
        if self.link(id).is_none() {
            return;
        }
        self.checkpoint();
        if let Some(link) = self.links.iter_mut().find(|l| l.id == id) {
            patch.apply(link);
        }
    }

    /// Apply property edits to every selected shape and link.
    pub fn update_selected(
        &mut self,
        shape_patch: Option<&ShapePatch>,
        link_patch: Option<&LinkPatch>,
    ) {
        if self.selection.is_empty() {
            return;
        }
        self.checkpoint();
        if let Some(patch) = shape_patch {
            let ids: HashSet<&str> = self.selection.shapes.iter().map(String::as_str).collect();
            for shape in self.shapes.iter_mut().filter(|s| ids.contains(s.id.as_str())) {
                patch.apply(shape);
            }
            if patch.affects_geometry() && !ids.is_empty() {
                self.paths_dirty = true;
            }
        }
        if let Some(patch) = link_patch {
            let ids: HashSet<&str> = self.selection.links.iter().map(String::as_str).collect();
            for link in self.links.iter_mut().filter(|l| ids.contains(l.id.as_str())) {
                patch.apply(link);
            }
        }
    }

    // --- Structural edits ---

    /// Add a shape of `kind` centred on the placement grid nearest to `at`.
    pub fn create_shape(&mut self, kind: ShapeKind, at: Pos2) -> ShapeId {
        self.checkpoint();
        let pos = snap::snap_to_grid(at, snap::PLACE_GRID);
        let defaults = &self.config.node_defaults;

        let (width, height) = match kind {
            ShapeKind::Text => (100.0, 30.0),
            ShapeKind::Circle => (defaults.width, defaults.width),
            ShapeKind::Rect | ShapeKind::Decorative => (defaults.width, defaults.height),
        };
        let label = match kind {
            ShapeKind::Text => "New Text".to_string(),
            ShapeKind::Decorative => "New Icon".to_string(),
            ShapeKind::Rect | ShapeKind::Circle => format!("Node {}", self.shapes.len() + 1),
        };
        let mut style = defaults.style.clone();
        match kind {
            ShapeKind::Text => {
                style.fill = "transparent".to_string();
                style.border_color = "transparent".to_string();
                style.border_style = crate::model::BorderStyle::Solid;
                style.icon_name = None;
            }
            ShapeKind::Decorative => {
                style.icon_name.get_or_insert_with(|| "Box".to_string());
            }
            ShapeKind::Rect | ShapeKind::Circle => style.icon_name = None,
        }

        let id = self.allocate_id("n");
        self.shapes.push(Shape {
            id: id.clone(),
            kind,
            label,
            x: pos.x,
            y: pos.y,
            width: width.max(crate::model::MIN_EXTENT),
            height: height.max(crate::model::MIN_EXTENT),
            style,
        });
        tracing::debug!(%id, kind = kind.name(), x = pos.x, y = pos.y, "shape created");
        id
    }

    /// Link `source` to `target` through their closest anchors. Returns
    /// `None` if either shape is missing or they are the same shape.
    pub fn create_link(&mut self, source: &str, target: &str) -> Option<LinkId> {
        if source == target {
            return None;
        }
        let path = {
            let s = self.shape(source)?;
            let t = self.shape(target)?;
            geometry::link_path(s, t, self.config.corner_radius)
        };
        self.checkpoint();

        let id = self.allocate_id("l");
        let defaults = &self.config.link_defaults;
        self.links.push(Link {
            id: id.clone(),
            source_id: source.to_string(),
            target_id: target.to_string(),
            path: Some(path),
            traffic_speed: defaults.traffic_speed,
            traffic_density: defaults.traffic_density,
            style: defaults.style.clone(),
        });
        tracing::info!(%id, source, target, "link created");
        Some(id)
    }

    /// Remove a shape and every link touching it. Returns the removed link ids.
    pub fn delete_shape(&mut self, id: &str) -> Vec<LinkId> {
        if self.shape(id).is_none() {
            return Vec::new();
        }
        self.checkpoint();
        let removed = self.remove(&[id.to_string()], &[]);
        self.selection.shapes.retain(|s| s != id);
        removed
    }

    /// Remove selected shapes, their links, and selected links. Returns the
    /// removed link ids so their signals can be dropped.
    pub fn delete_selection(&mut self) -> Vec<LinkId> {
        if self.selection.is_empty() {
            return Vec::new();
        }
        self.checkpoint();
        let shapes = std::mem::take(&mut self.selection.shapes);
        let links = std::mem::take(&mut self.selection.links);
        let removed = self.remove(&shapes, &links);
        tracing::info!(
            shapes = shapes.len(),
            links = removed.len(),
            "selection deleted"
        );
        removed
    }

    fn remove(&mut self, shape_ids: &[ShapeId], link_ids: &[LinkId]) -> Vec<LinkId> {
        let shapes: HashSet<&str> = shape_ids.iter().map(String::as_str).collect();
        let links: HashSet<&str> = link_ids.iter().map(String::as_str).collect();

        self.shapes.retain(|s| !shapes.contains(s.id.as_str()));

        let mut removed = Vec::new();
        self.links.retain(|l| {
            let drop = links.contains(l.id.as_str())
                || shapes.contains(l.source_id.as_str())
                || shapes.contains(l.target_id.as_str());
            if drop {
                removed.push(l.id.clone());
            }
            !drop
        });
        self.selection.links.retain(|l| !removed.contains(l));

        if self
            .gesture
            .pending_source()
            .is_some_and(|src| shapes.contains(src))
        {
            self.gesture = Gesture::Idle;
        }
        removed
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.checkpoint();
        self.shapes.clear();
        self.links.clear();
        self.selection.clear();
        self.guides.clear();
        self.gesture = Gesture::Idle;
    }

    /// Move selected shapes and links to the end of their draw order.
    pub fn bring_to_front(&mut self) {
        let Selection { shapes, links } = &self.selection;
        reorder(&mut self.shapes, |s| shapes.contains(&s.id), false);
        reorder(&mut self.links, |l| links.contains(&l.id), false);
    }

    /// Move selected shapes and links to the start of their draw order.
    pub fn send_to_back(&mut self) {
        let Selection { shapes, links } = &self.selection;
        reorder(&mut self.shapes, |s| shapes.contains(&s.id), true);
        reorder(&mut self.links, |l| links.contains(&l.id), true);
    }

    /// Copy the selected shape if exactly one is selected.
    pub fn copy_selection(&mut self) -> bool {
        let copied = self
            .selection
            .single_shape()
            .and_then(|id| self.shape(id))
            .cloned();
        let ok = copied.is_some();
        if ok {
            self.clipboard = copied;
        }
        ok
    }

    /// Paste the clipboard shape with a fresh id, offset, and selected.
    pub fn paste(&mut self) -> Option<ShapeId> {
        let mut shape = self.clipboard.clone()?;
        self.checkpoint();
        shape.id = self.allocate_id("n");
        shape.x += PASTE_OFFSET;
        shape.y += PASTE_OFFSET;
        let id = shape.id.clone();
        self.shapes.push(shape);
        self.selection.select_shape(&id);
        Some(id)
    }

    fn allocate_id(&mut self, prefix: &str) -> String {
        loop {
            let candidate = format!("{prefix}-{}", self.next_id);
            self.next_id += 1;
            let taken = self.shapes.iter().any(|s| s.id == candidate)
                || self.links.iter().any(|l| l.id == candidate);
            if !taken {
                return candidate;
            }
        }
    }
}

/// Stable partition: items matching `pred` move to the start (`first`) or end.
fn reorder<T>(items: &mut Vec<T>, pred: impl Fn(&T) -> bool, first: bool) {
    let (matching, others): (Vec<T>, Vec<T>) = items.drain(..).partition(|x| pred(x));
    if first {
        items.extend(matching);
        items.extend(others);
    } else {
        items.extend(others);
        items.extend(matching);
    }
}
