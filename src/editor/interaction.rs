//! Pointer interaction state for the region editor
//!
//! Reifies the drag lifecycle as a tagged state so that drawing a new
//! rectangle, dragging a corner handle, and translating a body are mutually
//! exclusive by construction.

use super::zone::{Corner, ZoneRect};

/// Corner handle hit radius in display pixels. Independent of zoom so handles
/// stay grabbable at any magnification.
pub const HANDLE_RADIUS: f32 = 6.0;

/// Current pointer interaction, at most one at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    /// No pointer held.
    Idle,
    /// Growing a fresh rectangle from the press point, in image coordinates.
    Drawing { anchor: (f32, f32) },
    /// Dragging one corner handle; the opposite corner stays fixed.
    Resizing { corner: Corner },
    /// Translating the whole rectangle; `last` is the previous pointer
    /// position in image coordinates.
    Moving { last: (f32, f32) },
}

impl Default for DragState {
    fn default() -> Self {
        DragState::Idle
    }
}

/// Hit-test the pointer against a zone's corner handles.
///
/// Both the pointer position and the handle radius are in display space, so
/// the grab area does not shrink as the user zooms out.
pub fn hit_handle(rect: &ZoneRect, display_pos: (f32, f32), zoom: f32) -> Option<Corner> {
    for corner in Corner::ALL {
        let (cx, cy) = rect.corner(corner);
        let dx = (cx * zoom - display_pos.0).abs();
        let dy = (cy * zoom - display_pos.1).abs();
        if dx <= HANDLE_RADIUS && dy <= HANDLE_RADIUS {
            return Some(corner);
        }
    }
    None
}

/// Hit-test the pointer against a zone's body.
pub fn hit_body(rect: &ZoneRect, display_pos: (f32, f32), zoom: f32) -> bool {
    rect.contains(display_pos.0 / zoom, display_pos.1 / zoom)
}

/// Decide which interaction a press starts. Handle hits take priority over
/// body hits, which take priority over starting a new Drawing.
pub fn begin_drag(rect: Option<&ZoneRect>, display_pos: (f32, f32), zoom: f32) -> DragState {
    let image_pos = (display_pos.0 / zoom, display_pos.1 / zoom);

    if let Some(rect) = rect {
        if let Some(corner) = hit_handle(rect, display_pos, zoom) {
            return DragState::Resizing { corner };
        }
        if hit_body(rect, display_pos, zoom) {
            return DragState::Moving { last: image_pos };
        }
    }
    DragState::Drawing { anchor: image_pos }
}

/// Apply a pointer move to the in-progress rectangle, returning the updated
/// rect and drag state. Pure; commit happens on release.
pub fn apply_drag(
    drag: DragState,
    rect: ZoneRect,
    image_pos: (f32, f32),
) -> (ZoneRect, DragState) {
    match drag {
        DragState::Idle => (rect, drag),
        DragState::Drawing { anchor } => (ZoneRect::from_points(anchor, image_pos), drag),
        DragState::Resizing { corner } => (rect.with_corner_at(corner, image_pos), drag),
        DragState::Moving { last } => {
            let moved = rect.translated(image_pos.0 - last.0, image_pos.1 - last.1);
            (moved, DragState::Moving { last: image_pos })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> ZoneRect {
        ZoneRect { x1: 100.0, y1: 100.0, x2: 200.0, y2: 200.0 }
    }

    #[test]
    fn test_press_on_handle_beats_body() {
        // The top-left corner is inside the body too; the handle must win.
        let state = begin_drag(Some(&rect()), (100.0, 100.0), 1.0);
        assert_eq!(state, DragState::Resizing { corner: Corner::TopLeft });
    }

    #[test]
    fn test_press_on_body_starts_moving() {
        let state = begin_drag(Some(&rect()), (150.0, 150.0), 1.0);
        assert_eq!(state, DragState::Moving { last: (150.0, 150.0) });
    }

    #[test]
    fn test_press_outside_starts_drawing_in_image_space() {
        let state = begin_drag(Some(&rect()), (600.0, 600.0), 2.0);
        assert_eq!(state, DragState::Drawing { anchor: (300.0, 300.0) });
    }

    #[test]
    fn test_press_with_no_rect_starts_drawing() {
        let state = begin_drag(None, (10.0, 20.0), 1.0);
        assert_eq!(state, DragState::Drawing { anchor: (10.0, 20.0) });
    }

    #[test]
    fn test_handle_radius_is_zoom_independent() {
        // At zoom 0.5 the corner (100, 100) lands at display (50, 50); a
        // pointer 5 display pixels away must still grab it.
        let state = begin_drag(Some(&rect()), (55.0, 50.0), 0.5);
        assert_eq!(state, DragState::Resizing { corner: Corner::TopLeft });
    }

    #[test]
    fn test_drawing_grows_from_anchor() {
        let drag = DragState::Drawing { anchor: (10.0, 10.0) };
        let (r, _) = apply_drag(drag, ZoneRect::at_point(10.0, 10.0), (40.0, 5.0));
        assert_eq!(r, ZoneRect { x1: 10.0, y1: 10.0, x2: 40.0, y2: 5.0 });
        // Commit-time normalization restores the invariant.
        let n = r.normalized();
        assert!(n.x1 <= n.x2 && n.y1 <= n.y2);
    }

    #[test]
    fn test_moving_translates_by_frame_delta() {
        let drag = DragState::Moving { last: (150.0, 150.0) };
        let (r, next) = apply_drag(drag, rect(), (160.0, 145.0));
        assert_eq!(r, ZoneRect { x1: 110.0, y1: 95.0, x2: 210.0, y2: 195.0 });
        assert_eq!(next, DragState::Moving { last: (160.0, 145.0) });
    }

    #[test]
    fn test_resizing_keeps_opposite_corner_fixed() {
        let drag = DragState::Resizing { corner: Corner::TopLeft };
        let (r, _) = apply_drag(drag, rect(), (120.0, 130.0));
        let n = r.normalized();
        assert_eq!((n.x2, n.y2), (200.0, 200.0));
        assert_eq!((n.x1, n.y1), (120.0, 130.0));
    }
}
