//! Drag and drop helpers for moving favorites around the tree.
//!
//! Uses egui's drag-and-drop payload: a row's handle sets a [`NodeDrag`]
//! payload, and whichever row is under the pointer on release claims it.

use egui::{Color32, Context, DragAndDrop, Pos2, Rect, Response, Sense, Stroke, Ui, Vec2};
use shared::favorites::{DropGeometry, Placement};
use std::sync::Arc;

/// Payload carried while a favorite is being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDrag {
    pub id: String,
}

/// The favorite currently being dragged, if any.
pub fn dragged_node(ctx: &Context) -> Option<Arc<NodeDrag>> {
    DragAndDrop::payload::<NodeDrag>(ctx)
}

/// True on the frame the pointer lets go.
pub fn pointer_released(ctx: &Context) -> bool {
    ctx.input(|i| i.pointer.any_released())
}

pub fn pointer_pos(ctx: &Context) -> Option<Pos2> {
    ctx.input(|i| i.pointer.interact_pos())
}

/// Geometry handed to the placement resolver.
pub fn drop_geometry(rect: Rect, pointer: Pos2) -> DropGeometry {
    DropGeometry {
        rect_top: rect.top(),
        rect_height: rect.height(),
        pointer_y: pointer.y,
    }
}

/// Area to highlight for a pending drop: a line above or below the row, or
/// the whole row for a drop into a folder.
pub fn indicator_rect(row: Rect, placement: Placement) -> Rect {
    const LINE: f32 = 3.0;
    match placement {
        Placement::Before => Rect::from_min_size(
            Pos2::new(row.left(), row.top() - LINE / 2.0),
            Vec2::new(row.width(), LINE),
        ),
        Placement::After => Rect::from_min_size(
            Pos2::new(row.left(), row.bottom() - LINE / 2.0),
            Vec2::new(row.width(), LINE),
        ),
        Placement::Inside => row,
    }
}

pub fn paint_drop_indicator(ui: &Ui, row: Rect, placement: Placement) {
    let accent = ui.visuals().selection.bg_fill;
    let target = indicator_rect(row, placement);
    match placement {
        Placement::Inside => {
            ui.painter()
                .rect(target, 4.0, accent.gamma_multiply(0.25), Stroke::new(2.0, accent));
        }
        _ => {
            ui.painter().rect_filled(target, 1.0, accent);
        }
    }
}

/// Strip under the tree that accepts drops to the top level.
pub fn show_root_drop_zone(ui: &mut Ui, dragging: bool, min_height: f32) -> Response {
    let size = Vec2::new(ui.available_width(), ui.available_height().max(min_height));
    let (rect, response) = ui.allocate_exact_size(size, Sense::hover());
    if !dragging {
        return response;
    }

    let hovering = ui.rect_contains_pointer(rect);
    let visuals = if hovering {
        ui.visuals().widgets.hovered
    } else {
        ui.visuals().widgets.inactive
    };
    ui.painter().rect(
        rect,
        4.0,
        if hovering {
            visuals.bg_fill.gamma_multiply(1.2)
        } else {
            Color32::TRANSPARENT
        },
        Stroke::new(1.0, visuals.bg_stroke.color),
    );
    ui.painter().text(
        rect.center_top() + Vec2::new(0.0, 16.0),
        egui::Align2::CENTER_CENTER,
        "📥 Drop here to move to top level",
        egui::FontId::proportional(13.0),
        if hovering {
            ui.visuals().strong_text_color()
        } else {
            ui.visuals().weak_text_color()
        },
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Rect {
        Rect::from_min_size(Pos2::new(10.0, 100.0), Vec2::new(200.0, 40.0))
    }

    #[test]
    fn test_drop_geometry() {
        let geom = drop_geometry(row(), Pos2::new(50.0, 130.0));
        assert_eq!(geom.rect_top, 100.0);
        assert_eq!(geom.rect_height, 40.0);
        assert_eq!(geom.relative_y(), 30.0);
    }

    #[test]
    fn test_indicator_rect() {
        let before = indicator_rect(row(), Placement::Before);
        assert_eq!(before.width(), 200.0);
        assert!((before.center().y - 100.0).abs() < f32::EPSILON);

        let after = indicator_rect(row(), Placement::After);
        assert!((after.center().y - 140.0).abs() < f32::EPSILON);

        assert_eq!(indicator_rect(row(), Placement::Inside), row());
    }

    #[test]
    fn test_no_payload_without_drag() {
        let ctx = Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            assert!(dragged_node(ctx).is_none());
        });
    }
}
