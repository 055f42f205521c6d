//! Favorites panel: renders the tree and reports what the user did.
//!
//! Rendering never mutates the tree. Each node pushes [`FavoriteAction`]s
//! and the app state applies them after the frame's UI pass, so the tree
//! borrowed for drawing is never the one being changed.

mod node;

use egui::{RichText, Ui};
use shared::favorites::{CommandEdit, FavoriteItem, MoveDirection, Placement};

use crate::widgets::drag_drop;

/// Something the user asked the favorites tree to do.
#[derive(Debug, Clone, PartialEq)]
pub enum FavoriteAction {
    Toggle(String),
    Execute(String),
    Remove(String),
    StartRename(String),
    CommitRename { id: String, label: String },
    CancelRename,
    /// Open the add dialog, pre-targeted at `parent`
    OpenAddCommand { parent: Option<String> },
    AddCommand {
        parent: Option<String>,
        command: String,
        label: String,
    },
    /// New folder, immediately in rename mode
    AddFolder { parent: Option<String> },
    OpenEdit(String),
    UpdateCommand { id: String, edit: CommandEdit },
    ClearOutput(String),
    Move { id: String, direction: MoveDirection },
    Drop {
        dragged: String,
        target: String,
        placement: Placement,
    },
    DropOnRoot { dragged: String },
    /// Command text was put on the clipboard
    Copied(String),
}

/// Inline rename of a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameState {
    pub id: String,
    pub buffer: String,
    pub focus_pending: bool,
}

impl RenameState {
    pub fn new(id: impl Into<String>, current: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            buffer: current.into(),
            focus_pending: true,
        }
    }
}

/// Session state every node instance reads, plus the action sink.
pub(crate) struct TreeView<'a> {
    /// Whole tree, for drop validation
    pub items: &'a [FavoriteItem],
    pub executing_id: Option<&'a str>,
    pub rename: &'a mut Option<RenameState>,
    pub dark: bool,
    pub actions: Vec<FavoriteAction>,
}

/// Draw the tree and the top-level drop zone under it.
pub fn show_tree(
    ui: &mut Ui,
    items: &[FavoriteItem],
    executing_id: Option<&str>,
    rename: &mut Option<RenameState>,
    dark: bool,
) -> Vec<FavoriteAction> {
    let mut view = TreeView {
        items,
        executing_id,
        rename,
        dark,
        actions: Vec::new(),
    };

    if items.is_empty() {
        ui.add_space(8.0);
        ui.label(
            RichText::new("No favorites yet. Add a command to keep it one click away.")
                .weak()
                .italics(),
        );
    }
    for item in items {
        node::show_node(ui, item, 0, &mut view);
    }

    let dragging = drag_drop::dragged_node(ui.ctx());
    let zone = drag_drop::show_root_drop_zone(ui, dragging.is_some(), 48.0);
    if let Some(drag) = dragging {
        let over_zone = drag_drop::pointer_pos(ui.ctx())
            .is_some_and(|p| zone.rect.contains(p) && ui.clip_rect().contains(p));
        if over_zone && drag_drop::pointer_released(ui.ctx()) {
            view.actions.push(FavoriteAction::DropOnRoot {
                dragged: drag.id.clone(),
            });
        }
    }

    view.actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::favorites::{tree, FavoriteItem};

    fn sample() -> Vec<FavoriteItem> {
        let scripts = FavoriteItem::folder("Scripts");
        let scripts_id = scripts.id().to_string();
        let items = vec![FavoriteItem::command("ls -la", ""), scripts];
        tree::add(
            &items,
            FavoriteItem::command("docker ps -a", "List containers"),
            Some(scripts_id.as_str()),
        )
    }

    fn run_frame(
        items: &[FavoriteItem],
        executing_id: Option<&str>,
        rename: &mut Option<RenameState>,
    ) -> Vec<FavoriteAction> {
        let ctx = egui::Context::default();
        let mut actions = Vec::new();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                actions = show_tree(ui, items, executing_id, rename, true);
            });
        });
        actions
    }

    #[test]
    fn test_idle_frame_emits_nothing() {
        let items = sample();
        let mut rename = None;
        assert!(run_frame(&items, None, &mut rename).is_empty());
        assert!(run_frame(&[], None, &mut rename).is_empty());
    }

    #[test]
    fn test_executing_node_with_output_renders() {
        let items = sample();
        let ls_id = items[0].id().to_string();
        let items = tree::set_output(&items, &ls_id, Some("total 0\n".into()), None);
        let mut rename = None;
        assert!(run_frame(&items, Some(&ls_id), &mut rename).is_empty());
    }

    #[test]
    fn test_rename_field_takes_focus_once() {
        let items = sample();
        let folder_id = items[1].id().to_string();
        let mut rename = Some(RenameState::new(folder_id.clone(), "Scripts"));
        run_frame(&items, None, &mut rename);
        let state = rename.unwrap();
        assert_eq!(state.id, folder_id);
        assert_eq!(state.buffer, "Scripts");
        assert!(!state.focus_pending);
    }
}
