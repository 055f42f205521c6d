//! One row of the favorites tree, recursing into open folders.

use chrono::Local;
use egui::{CursorIcon, Id, Key, Label, RichText, Sense, TextEdit, Ui};
use shared::favorites::{
    resolve_drop, FavoriteCommand, FavoriteFolder, FavoriteItem, MoveDirection,
};

use super::{FavoriteAction, TreeView};
use crate::widgets::drag_drop::{self, NodeDrag};

const INDENT: f32 = 14.0;

pub(super) fn show_node(ui: &mut Ui, item: &FavoriteItem, depth: usize, view: &mut TreeView) {
    match item {
        FavoriteItem::Folder(folder) => show_folder(ui, item, folder, depth, view),
        FavoriteItem::Command(cmd) => show_command(ui, item, cmd, depth, view),
    }
}

fn show_folder(
    ui: &mut Ui,
    item: &FavoriteItem,
    folder: &FavoriteFolder,
    depth: usize,
    view: &mut TreeView,
) {
    let row = ui.horizontal(|ui| {
        ui.add_space(depth as f32 * INDENT);
        drag_handle(ui, &folder.id);

        let arrow = if folder.is_open { "⏷" } else { "⏵" };
        if ui
            .small_button(arrow)
            .on_hover_text(if folder.is_open { "Collapse" } else { "Expand" })
            .clicked()
        {
            view.actions.push(FavoriteAction::Toggle(folder.id.clone()));
        }
        ui.label("📁");
        name_or_rename(ui, &folder.id, &folder.name, view);

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui
                .small_button("🗑")
                .on_hover_text("Delete folder and everything in it")
                .clicked()
            {
                view.actions.push(FavoriteAction::Remove(folder.id.clone()));
            }
            move_buttons(ui, &folder.id, view);
            if ui.small_button("📁+").on_hover_text("New subfolder").clicked() {
                view.actions.push(FavoriteAction::AddFolder {
                    parent: Some(folder.id.clone()),
                });
            }
            if ui.small_button("+").on_hover_text("Add command here").clicked() {
                view.actions.push(FavoriteAction::OpenAddCommand {
                    parent: Some(folder.id.clone()),
                });
            }
        });
    });
    accept_drop(ui, item, row.response.rect, view);

    if !folder.is_open {
        return;
    }
    if folder.children.is_empty() {
        ui.horizontal(|ui| {
            ui.add_space((depth + 1) as f32 * INDENT + 18.0);
            ui.label(
                RichText::new("Empty folder. Drag favorites here.")
                    .small()
                    .weak()
                    .italics(),
            );
        });
        return;
    }
    for child in &folder.children {
        show_node(ui, child, depth + 1, view);
    }
}

fn show_command(
    ui: &mut Ui,
    item: &FavoriteItem,
    cmd: &FavoriteCommand,
    depth: usize,
    view: &mut TreeView,
) {
    let executing = view.executing_id == Some(cmd.id.as_str());

    let row = ui.horizontal(|ui| {
        ui.add_space(depth as f32 * INDENT);
        drag_handle(ui, &cmd.id);

        if executing {
            ui.add(egui::Spinner::new()).on_hover_text("Running…");
        } else if ui.small_button("▶").on_hover_text("Run").clicked() {
            view.actions.push(FavoriteAction::Execute(cmd.id.clone()));
        }

        ui.vertical(|ui| {
            name_or_rename(ui, &cmd.id, cmd.display_label(), view);
            ui.label(RichText::new(&cmd.command).monospace().small().weak());
        });

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.small_button("🗑").on_hover_text("Delete").clicked() {
                view.actions.push(FavoriteAction::Remove(cmd.id.clone()));
            }
            move_buttons(ui, &cmd.id, view);
            if ui.small_button("✏").on_hover_text("Edit").clicked() {
                view.actions.push(FavoriteAction::OpenEdit(cmd.id.clone()));
            }
            if ui.small_button("📋").on_hover_text("Copy command").clicked() {
                ui.output_mut(|o| o.copied_text = cmd.command.clone());
                view.actions
                    .push(FavoriteAction::Copied(cmd.display_label().to_string()));
            }
        });
    });
    accept_drop(ui, item, row.response.rect, view);

    if executing || cmd.output.is_some() {
        show_output(ui, cmd, depth, executing, view);
    }
}

/// Collapsible output pane that follows the newest line while streaming.
fn show_output(ui: &mut Ui, cmd: &FavoriteCommand, depth: usize, executing: bool, view: &mut TreeView) {
    let (bg_color, text_color) = if view.dark {
        (
            egui::Color32::from_rgb(20, 20, 25),
            egui::Color32::from_rgb(200, 220, 200),
        )
    } else {
        (
            egui::Color32::from_rgb(245, 245, 250),
            egui::Color32::from_rgb(40, 60, 40),
        )
    };

    let header = match cmd.last_run_at {
        Some(at) => format!("Output · {}", at.with_timezone(&Local).format("%H:%M:%S")),
        None => "Output".to_string(),
    };

    ui.horizontal(|ui| {
        ui.add_space(depth as f32 * INDENT + 18.0);
        ui.vertical(|ui| {
            egui::CollapsingHeader::new(RichText::new(header).small())
                .id_source(("favorite-output", &cmd.id))
                .default_open(true)
                .show(ui, |ui| {
                    egui::Frame::none()
                        .fill(bg_color)
                        .rounding(egui::Rounding::same(6.0))
                        .inner_margin(egui::Margin::same(8.0))
                        .show(ui, |ui| {
                            egui::ScrollArea::vertical()
                                .id_source(("favorite-output-scroll", &cmd.id))
                                .max_height(180.0)
                                .auto_shrink([false, true])
                                .stick_to_bottom(true)
                                .show(ui, |ui| {
                                    let text = cmd.output.as_deref().unwrap_or_default();
                                    let shown = if text.is_empty() && executing {
                                        "Running…"
                                    } else {
                                        text
                                    };
                                    ui.label(
                                        RichText::new(shown)
                                            .size(12.0)
                                            .color(text_color)
                                            .monospace(),
                                    );
                                });
                        });
                    if !executing && ui.small_button("Clear output").clicked() {
                        view.actions.push(FavoriteAction::ClearOutput(cmd.id.clone()));
                    }
                });
        });
    });
}

/// Label that turns into a text field while this node is being renamed.
fn name_or_rename(ui: &mut Ui, id: &str, text: &str, view: &mut TreeView) {
    if let Some(rename) = view.rename.as_mut().filter(|r| r.id == id) {
        let response = ui.add(TextEdit::singleline(&mut rename.buffer).desired_width(160.0));
        if rename.focus_pending {
            response.request_focus();
            rename.focus_pending = false;
        }
        if response.lost_focus() {
            // Enter and clicking away both commit; Escape discards
            if ui.input(|i| i.key_pressed(Key::Escape)) {
                view.actions.push(FavoriteAction::CancelRename);
            } else {
                view.actions.push(FavoriteAction::CommitRename {
                    id: id.to_string(),
                    label: rename.buffer.clone(),
                });
            }
        }
        return;
    }

    let response = ui
        .add(Label::new(RichText::new(text).strong()).sense(Sense::click()))
        .on_hover_text("Double-click to rename");
    if response.double_clicked() {
        view.actions.push(FavoriteAction::StartRename(id.to_string()));
    }
    response.context_menu(|ui| {
        if ui.button("Rename").clicked() {
            view.actions.push(FavoriteAction::StartRename(id.to_string()));
            ui.close_menu();
        }
        if ui.button("Delete").clicked() {
            view.actions.push(FavoriteAction::Remove(id.to_string()));
            ui.close_menu();
        }
    });
}

fn move_buttons(ui: &mut Ui, id: &str, view: &mut TreeView) {
    if ui.small_button("⬇").on_hover_text("Move down").clicked() {
        view.actions.push(FavoriteAction::Move {
            id: id.to_string(),
            direction: MoveDirection::Down,
        });
    }
    if ui.small_button("⬆").on_hover_text("Move up").clicked() {
        view.actions.push(FavoriteAction::Move {
            id: id.to_string(),
            direction: MoveDirection::Up,
        });
    }
}

fn drag_handle(ui: &mut Ui, id: &str) {
    ui.dnd_drag_source(
        Id::new(("favorite-drag", id)),
        NodeDrag { id: id.to_string() },
        |ui| ui.label(RichText::new("⠿").weak()),
    )
    .response
    .on_hover_cursor(CursorIcon::Grab);
}

/// Show where a dragged node would land on this row, and report the drop
/// on release. Rejected drops (self, own subtree) show nothing.
fn accept_drop(ui: &Ui, item: &FavoriteItem, rect: egui::Rect, view: &mut TreeView) {
    let Some(drag) = drag_drop::dragged_node(ui.ctx()) else {
        return;
    };
    let Some(pointer) = drag_drop::pointer_pos(ui.ctx()) else {
        return;
    };
    if !rect.contains(pointer) || !ui.clip_rect().contains(pointer) {
        return;
    }
    let geometry = drag_drop::drop_geometry(rect, pointer);
    let Some(placement) = resolve_drop(view.items, &drag.id, item.id(), geometry) else {
        return;
    };

    drag_drop::paint_drop_indicator(ui, rect, placement);
    if drag_drop::pointer_released(ui.ctx()) {
        view.actions.push(FavoriteAction::Drop {
            dragged: drag.id.clone(),
            target: item.id().to_string(),
            placement,
        });
    }
}
