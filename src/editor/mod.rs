//! Region editor
//!
//! Interactive state machine for defining named capture zones over a batch of
//! reference images. All mutation flows through [`RegionEditor::handle_event`]
//! so the active-zone and drag invariants are enforced in one place; the egui
//! canvas only translates pointer input into [`EditorEvent`]s.

pub mod canvas;
pub mod interaction;
pub mod zone;

use tracing::debug;

pub use interaction::DragState;
pub use zone::{CaptureZone, MatchPolicy, ZoneRect};

/// Zoom bounds for the editor viewport.
pub const MIN_ZOOM: f32 = 0.3;
pub const MAX_ZOOM: f32 = 3.0;

/// A zone under construction: named up front, rectangle committed by dragging.
#[derive(Debug, Clone)]
pub struct EditorZone {
    pub name: String,
    /// Committed (or in-progress) rectangle in unscaled image coordinates.
    pub rect: Option<ZoneRect>,
    pub match_policy: MatchPolicy,
}

/// Messages into the editor state machine.
#[derive(Debug, Clone)]
pub enum EditorEvent {
    /// Pointer pressed, position in display space (post-zoom).
    PointerPressed { display: (f32, f32) },
    /// Pointer moved while held, position in display space.
    PointerMoved { display: (f32, f32) },
    /// Pointer released; commits the active zone's geometry.
    PointerReleased,
    /// Append a new zone and make it active.
    AddZone { name: String },
    /// Rename an existing zone.
    RenameZone { index: usize, name: String },
    /// Change which zone receives pointer interactions.
    SelectZone { index: usize },
    /// Set a zone's fuzzy-matching policy.
    SetMatchPolicy { index: usize, policy: MatchPolicy },
    /// Change the display zoom (clamped to [MIN_ZOOM], [MAX_ZOOM]).
    SetZoom { zoom: f32 },
    /// Browse to the next reference image.
    NextImage,
    /// Browse to the previous reference image.
    PrevImage,
}

/// Editor state: zones, selection, zoom, viewport image, and the current drag.
#[derive(Debug)]
pub struct RegionEditor {
    zones: Vec<EditorZone>,
    active: Option<usize>,
    zoom: f32,
    image_index: usize,
    image_count: usize,
    drag: DragState,
}

impl RegionEditor {
    /// Create an editor over a batch of `image_count` reference images.
    pub fn new(image_count: usize) -> Self {
        Self {
            zones: Vec::new(),
            active: None,
            zoom: 1.0,
            image_index: 0,
            image_count,
            drag: DragState::Idle,
        }
    }

    pub fn zones(&self) -> &[EditorZone] {
        &self.zones
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn image_index(&self) -> usize {
        self.image_index
    }

    pub fn image_count(&self) -> usize {
        self.image_count
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    /// Process one event to completion. Only the active zone receives pointer
    /// interactions; navigating images never touches zone geometry.
    pub fn handle_event(&mut self, event: EditorEvent) {
        match event {
            EditorEvent::PointerPressed { display } => self.on_press(display),
            EditorEvent::PointerMoved { display } => self.on_move(display),
            EditorEvent::PointerReleased => self.on_release(),
            EditorEvent::AddZone { name } => {
                self.zones.push(EditorZone {
                    name,
                    rect: None,
                    match_policy: MatchPolicy::None,
                });
                self.active = Some(self.zones.len() - 1);
            }
            EditorEvent::RenameZone { index, name } => {
                if let Some(z) = self.zones.get_mut(index) {
                    z.name = name;
                }
            }
            EditorEvent::SelectZone { index } => {
                if index < self.zones.len() {
                    self.active = Some(index);
                }
            }
            EditorEvent::SetMatchPolicy { index, policy } => {
                if let Some(z) = self.zones.get_mut(index) {
                    z.match_policy = policy;
                }
            }
            EditorEvent::SetZoom { zoom } => {
                self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
            }
            EditorEvent::NextImage => {
                if self.image_index + 1 < self.image_count {
                    self.image_index += 1;
                }
            }
            EditorEvent::PrevImage => {
                self.image_index = self.image_index.saturating_sub(1);
            }
        }
    }

    fn on_press(&mut self, display: (f32, f32)) {
        let Some(idx) = self.active else { return };
        self.drag = interaction::begin_drag(self.zones[idx].rect.as_ref(), display, self.zoom);
    }

    fn on_move(&mut self, display: (f32, f32)) {
        let Some(idx) = self.active else { return };
        let image_pos = (display.0 / self.zoom, display.1 / self.zoom);

        let rect = match self.drag {
            DragState::Idle => return,
            // A Drawing drag only materializes its rectangle on the first
            // motion, so a motionless click never replaces prior geometry.
            DragState::Drawing { anchor } => ZoneRect::at_point(anchor.0, anchor.1),
            DragState::Resizing { .. } | DragState::Moving { .. } => {
                match self.zones[idx].rect {
                    Some(rect) => rect,
                    None => return,
                }
            }
        };

        let (updated, drag) = interaction::apply_drag(self.drag, rect, image_pos);
        self.zones[idx].rect = Some(updated);
        self.drag = drag;
    }

    fn on_release(&mut self) {
        if self.drag == DragState::Idle {
            return;
        }
        if let Some(idx) = self.active {
            if let Some(rect) = self.zones[idx].rect {
                let committed = rect.normalized();
                debug!(zone = %self.zones[idx].name, ?committed, "zone geometry committed");
                self.zones[idx].rect = Some(committed);
            }
        }
        self.drag = DragState::Idle;
    }

    /// Finalize the session: zones with a committed rectangle, in definition
    /// order. An empty result means "nothing to extract".
    pub fn finish(&self) -> Vec<CaptureZone> {
        self.zones
            .iter()
            .filter_map(|z| {
                z.rect.map(|rect| CaptureZone {
                    name: z.name.clone(),
                    rect: rect.normalized(),
                    match_policy: z.match_policy.clone(),
                })
            })
            .collect()
    }
}
