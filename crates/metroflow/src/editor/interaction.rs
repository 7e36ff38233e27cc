use eframe::egui::{Pos2, Vec2};

use super::{Editor, snap};
use crate::model::{DiagramSnapshot, LinkId, ShapeId, ShapeKind};
use crate::viewport::{ScrollDirection, SurfaceMapping};

/// Pointer travel (screen pixels) before a press stops counting as a click.
pub const DRAG_THRESHOLD: f32 = 5.0;
/// Pick radius around the resize handle, in world units.
pub const HANDLE_RADIUS: f32 = 8.0;
/// Extra pick tolerance around a link's stroke, in world units.
const LINK_PICK_SLOP: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Create(ShapeKind),
    Connect,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::Select,
        Tool::Create(ShapeKind::Rect),
        Tool::Create(ShapeKind::Circle),
        Tool::Create(ShapeKind::Text),
        Tool::Create(ShapeKind::Decorative),
        Tool::Connect,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::Create(ShapeKind::Rect) => "Rectangle",
            Tool::Create(ShapeKind::Circle) => "Circle",
            Tool::Create(ShapeKind::Text) => "Text",
            Tool::Create(ShapeKind::Decorative) => "Icon",
            Tool::Connect => "Connect",
        }
    }
}

/// What a press landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    Shape(ShapeId),
    Link(LinkId),
    Background,
}

/// In-progress pointer gesture.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Canvas pan. Resolves to a click on `press` if released before the
    /// pointer travels [`DRAG_THRESHOLD`].
    Panning {
        last: Pos2,
        origin: Pos2,
        moved: bool,
        press: Hit,
        /// Pending connection source to restore on release.
        pending: Option<ShapeId>,
    },
    DraggingNode {
        grabbed: ShapeId,
        ids: Vec<ShapeId>,
        /// Pointer position minus the grabbed shape's centre, in world units.
        grab_offset: Vec2,
        origin: Pos2,
        /// False until the pointer passes the drag threshold.
        active: bool,
    },
    ResizingNode {
        id: ShapeId,
    },
    PendingConnection {
        source: ShapeId,
    },
}

impl Gesture {
    pub fn pending_source(&self) -> Option<&str> {
        match self {
            Gesture::PendingConnection { source } => Some(source),
            Gesture::Panning {
                pending: Some(source),
                ..
            } => Some(source),
            _ => None,
        }
    }

    /// Whether the pointer is currently held in a pan, drag or resize.
    pub fn is_pressed(&self) -> bool {
        matches!(
            self,
            Gesture::Panning { .. } | Gesture::DraggingNode { .. } | Gesture::ResizingNode { .. }
        )
    }
}

/// One pointer sample in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub pos: Pos2,
    /// Multi-select modifier (shift).
    pub modifier: bool,
}

impl PointerInput {
    pub fn new(pos: Pos2) -> Self {
        Self {
            pos,
            modifier: false,
        }
    }

    pub fn with_modifier(pos: Pos2) -> Self {
        Self {
            pos,
            modifier: true,
        }
    }
}

impl Editor {
    /// Topmost shape under `world`, then topmost link, else background.
    pub fn hit_test(&self, world: Pos2) -> Hit {
        if let Some(shape) = self.shapes.iter().rev().find(|s| s.contains(world)) {
            return Hit::Shape(shape.id.clone());
        }
        let link = self.links.iter().rev().find(|l| {
            l.path.as_ref().is_some_and(|path| {
                path.distance_to(world) <= l.style.width / 2.0 + LINK_PICK_SLOP
            })
        });
        match link {
            Some(link) => Hit::Link(link.id.clone()),
            None => Hit::Background,
        }
    }

    fn resize_target(&self, world: Pos2) -> Option<ShapeId> {
        let shape = self.shape(self.selection.single_shape()?)?;
        ((world - shape.resize_handle()).length() <= HANDLE_RADIUS).then(|| shape.id.clone())
    }

    pub fn pointer_down(&mut self, input: PointerInput, mapping: &SurfaceMapping) {
        let world = mapping.screen_to_world(input.pos, &self.transform);
        let pending = self.gesture.pending_source().map(str::to_owned);
        self.guides.clear();

        if self.config.tool == Tool::Select {
            if let Some(id) = self.resize_target(world) {
                self.checkpoint();
                self.gesture = Gesture::ResizingNode { id };
                return;
            }
        }

        let press = self.hit_test(world);
        if let (Tool::Select, Hit::Shape(id)) = (self.config.tool, &press) {
            if !self.selection.has_shape(id) && !input.modifier {
                self.selection.select_shape(id);
            }
            let ids = if self.selection.has_shape(id) {
                self.selection.shapes.clone()
            } else {
                vec![id.clone()]
            };
            let grab_offset = self
                .shape(id)
                .map(|s| world - s.center())
                .unwrap_or(Vec2::ZERO);
            self.gesture = Gesture::DraggingNode {
                grabbed: id.clone(),
                ids,
                grab_offset,
                origin: input.pos,
                active: false,
            };
            return;
        }

        self.gesture = Gesture::Panning {
            last: input.pos,
            origin: input.pos,
            moved: false,
            press,
            pending,
        };
    }

    pub fn pointer_move(&mut self, input: PointerInput, mapping: &SurfaceMapping) {
        let world = mapping.screen_to_world(input.pos, &self.transform);
        match &mut self.gesture {
            Gesture::Panning {
                last,
                origin,
                moved,
                ..
            } => {
                let delta = mapping.screen_to_device(input.pos) - mapping.screen_to_device(*last);
                *last = input.pos;
                if (input.pos - *origin).length() >= DRAG_THRESHOLD {
                    *moved = true;
                }
                self.transform.pan(delta);
            }
            Gesture::DraggingNode {
                grabbed,
                ids,
                grab_offset,
                origin,
                active,
            } => {
                if !*active {
                    if (input.pos - *origin).length() < DRAG_THRESHOLD {
                        return;
                    }
                    *active = true;
                    let snapshot = DiagramSnapshot {
                        shapes: self.shapes.clone(),
                        links: self.links.clone(),
                    };
                    self.checkpoints.push(snapshot);
                }
                let Some(current) = self.shapes.iter().find(|s| s.id == *grabbed) else {
                    return;
                };
                let candidate = snap::snap_to_grid(world - *grab_offset, snap::DRAG_GRID);
                let others = self.shapes.iter().filter(|s| !ids.contains(&s.id));
                let (target, guides) = snap::align(candidate, others);
                let delta = target - current.center();

                for shape in self.shapes.iter_mut().filter(|s| ids.contains(&s.id)) {
                    shape.x += delta.x;
                    shape.y += delta.y;
                }
                self.guides = guides;
                if delta != Vec2::ZERO {
                    self.paths_dirty = true;
                }
            }
            Gesture::ResizingNode { id } => {
                let Some(shape) = self.shapes.iter_mut().find(|s| s.id == *id) else {
                    return;
                };
                let size = snap::resized_extent(shape.kind, shape.center(), world);
                shape.width = size.x;
                shape.height = size.y;
                self.paths_dirty = true;
            }
            Gesture::Idle | Gesture::PendingConnection { .. } => {}
        }
    }

    pub fn pointer_up(&mut self, input: PointerInput, mapping: &SurfaceMapping) {
        let world = mapping.screen_to_world(input.pos, &self.transform);
        self.guides.clear();

        match std::mem::take(&mut self.gesture) {
            Gesture::Panning {
                moved,
                press,
                pending,
                ..
            } => {
                if let Some(source) = pending {
                    self.gesture = Gesture::PendingConnection { source };
                }
                if !moved {
                    self.click(press, input.modifier, world);
                }
            }
            Gesture::DraggingNode {
                grabbed, active, ..
            } => {
                if !active {
                    self.click(Hit::Shape(grabbed), input.modifier, world);
                }
            }
            Gesture::ResizingNode { .. } => {}
            other @ (Gesture::Idle | Gesture::PendingConnection { .. }) => self.gesture = other,
        }
    }

    pub fn wheel(&mut self, direction: ScrollDirection) {
        self.transform.zoom_wheel(direction);
    }

    /// Abandon the current gesture and any pending connection.
    pub fn cancel_gesture(&mut self) {
        self.gesture = Gesture::Idle;
        self.guides.clear();
    }

    fn click(&mut self, hit: Hit, modifier: bool, world: Pos2) {
        match (self.config.tool, hit) {
            (Tool::Connect, Hit::Shape(id)) => self.connect_click(id),
            (Tool::Connect, _) => self.selection.clear(),
            (_, Hit::Shape(id)) => {
                if self.shape(&id).is_none() {
                    return;
                }
                if modifier {
                    self.selection.toggle_shape(&id);
                } else {
                    self.selection.select_shape(&id);
                }
            }
            (Tool::Select, Hit::Link(id)) => {
                if modifier {
                    self.selection.toggle_link(&id);
                } else {
                    self.selection.select_link(&id);
                }
            }
            (Tool::Select, Hit::Background) => self.selection.clear(),
            (Tool::Create(kind), Hit::Link(_) | Hit::Background) => {
                let id = self.create_shape(kind, world);
                self.config.tool = Tool::Select;
                self.selection.select_shape(&id);
            }
        }
    }

    fn connect_click(&mut self, id: ShapeId) {
        match self.gesture.pending_source().map(str::to_owned) {
            None => self.gesture = Gesture::PendingConnection { source: id },
            Some(source) => {
                self.gesture = Gesture::Idle;
                if source != id {
                    self.create_link(&source, &id);
                }
            }
        }
    }
}
