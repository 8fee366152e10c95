//! Editor canvas rendering
//!
//! Paints the current reference image scaled by the editor zoom, overlays the
//! capture zones with the active one highlighted, and translates raw pointer
//! input into [`EditorEvent`]s. All geometry decisions live in the state
//! machine; this module only converts between display and widget space.

use egui::{Color32, FontId, Pos2, Rect, Rounding, Stroke, TextureHandle};

use super::interaction::HANDLE_RADIUS;
use super::{EditorEvent, RegionEditor};

const ZONE_STROKE: Color32 = Color32::from_rgb(0, 200, 0);
const ZONE_FILL: Color32 = Color32::from_rgba_premultiplied(0, 80, 0, 40);
const ACTIVE_STROKE: Color32 = Color32::from_rgb(0, 150, 255);
const ACTIVE_FILL: Color32 = Color32::from_rgba_premultiplied(0, 40, 100, 50);

/// Render the canvas for the current image and feed pointer events into the
/// editor. `texture` must be the unscaled image for `editor.image_index()`.
pub fn show(ui: &mut egui::Ui, editor: &mut RegionEditor, texture: &TextureHandle) {
    let zoom = editor.zoom();
    let image_size = texture.size_vec2();
    let display_size = image_size * zoom;

    egui::ScrollArea::both()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let (rect, response) =
                ui.allocate_exact_size(display_size, egui::Sense::click_and_drag());
            let origin = rect.min;

            ui.painter().image(
                texture.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );

            // Pointer positions relative to the image origin are the editor's
            // display-space coordinates.
            let pointer = response
                .interact_pointer_pos()
                .map(|p| (p.x - origin.x, p.y - origin.y));

            if response.drag_started() {
                if let Some(display) = pointer {
                    editor.handle_event(EditorEvent::PointerPressed { display });
                }
            }
            if response.dragged() {
                if let Some(display) = pointer {
                    editor.handle_event(EditorEvent::PointerMoved { display });
                }
            }
            if response.drag_stopped() {
                editor.handle_event(EditorEvent::PointerReleased);
            }

            paint_zones(ui.painter(), editor, origin);
        });
}

fn paint_zones(painter: &egui::Painter, editor: &RegionEditor, origin: Pos2) {
    let zoom = editor.zoom();

    for (idx, zone) in editor.zones().iter().enumerate() {
        let Some(rect) = zone.rect else { continue };
        let is_active = editor.active_index() == Some(idx);

        let n = rect.normalized();
        let display_rect = Rect::from_min_max(
            origin + egui::vec2(n.x1 * zoom, n.y1 * zoom),
            origin + egui::vec2(n.x2 * zoom, n.y2 * zoom),
        );

        let (fill, stroke) = if is_active {
            (ACTIVE_FILL, ACTIVE_STROKE)
        } else {
            (ZONE_FILL, ZONE_STROKE)
        };

        painter.rect_filled(display_rect, Rounding::same(2.0), fill);
        painter.rect_stroke(display_rect, Rounding::same(2.0), Stroke::new(2.0, stroke));

        painter.text(
            display_rect.left_top() + egui::vec2(4.0, -16.0),
            egui::Align2::LEFT_TOP,
            &zone.name,
            FontId::proportional(13.0),
            stroke,
        );

        // Corner handles on the active zone, fixed display size.
        if is_active {
            for corner in crate::editor::zone::Corner::ALL {
                let (cx, cy) = rect.corner(corner);
                let center = origin + egui::vec2(cx * zoom, cy * zoom);
                let handle = Rect::from_center_size(
                    center,
                    egui::vec2(HANDLE_RADIUS * 2.0, HANDLE_RADIUS * 2.0),
                );
                painter.rect_filled(handle, Rounding::ZERO, stroke);
            }
        }
    }
}
