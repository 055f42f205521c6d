//! Add / edit dialog for a favorite command.
//!
//! Collects the shell text and an optional label. A blank label falls back
//! to the command when the draft is applied.

use super::{Modal, ModalResult};
use egui::{Align2, Context, Id, Key, RichText, TextEdit, Vec2};
use shared::favorites::FavoriteCommand;

/// What a submitted draft applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogTarget {
    /// New command at the top level or inside a folder
    Add { parent: Option<String> },
    /// Existing command
    Edit { id: String },
}

/// Values the user submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteDraft {
    pub target: DialogTarget,
    pub command: String,
    pub label: String,
}

pub struct FavoriteDialog {
    is_open: bool,
    target: DialogTarget,
    /// Shown under the title, e.g. the folder a new command goes into
    context: Option<String>,
    command: String,
    label: String,
    error: Option<String>,
    result: ModalResult<FavoriteDraft>,
    focus_pending: bool,
    id: Id,
}

impl FavoriteDialog {
    pub fn new(id: impl std::hash::Hash) -> Self {
        Self {
            is_open: false,
            target: DialogTarget::Add { parent: None },
            context: None,
            command: String::new(),
            label: String::new(),
            error: None,
            result: ModalResult::Pending,
            focus_pending: false,
            id: Id::new(id),
        }
    }

    /// Open empty, filing the new command under `parent` when given.
    pub fn open_add(&mut self, parent: Option<String>, parent_name: Option<String>) {
        self.reset(DialogTarget::Add { parent });
        self.context = parent_name.map(|name| format!("In folder: {}", name));
    }

    /// Open pre-filled with an existing command.
    pub fn open_edit(&mut self, cmd: &FavoriteCommand) {
        self.reset(DialogTarget::Edit { id: cmd.id.clone() });
        self.command = cmd.command.clone();
        self.label = cmd.label.clone();
    }

    pub fn target(&self) -> &DialogTarget {
        &self.target
    }

    pub fn take_result(&mut self) -> ModalResult<FavoriteDraft> {
        std::mem::replace(&mut self.result, ModalResult::Pending)
    }

    fn reset(&mut self, target: DialogTarget) {
        self.is_open = true;
        self.target = target;
        self.context = None;
        self.command.clear();
        self.label.clear();
        self.error = None;
        self.result = ModalResult::Pending;
        self.focus_pending = true;
    }

    fn title(&self) -> &'static str {
        match self.target {
            DialogTarget::Add { .. } => "⭐ Add Favorite",
            DialogTarget::Edit { .. } => "✏ Edit Favorite",
        }
    }

    /// Validate and stage the draft. Returns false when the command is blank.
    fn submit(&mut self) -> bool {
        let command = self.command.trim();
        if command.is_empty() {
            self.error = Some("Enter a command to save".to_string());
            return false;
        }
        self.result = ModalResult::Confirmed(FavoriteDraft {
            target: self.target.clone(),
            command: command.to_string(),
            label: self.label.trim().to_string(),
        });
        true
    }
}

impl Modal for FavoriteDialog {
    fn update(&mut self, ctx: &Context) -> bool {
        if !self.is_open {
            return false;
        }

        let mut should_close = false;

        egui::Window::new(self.title())
            .id(self.id.with("window"))
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.set_min_width(380.0);

                if let Some(context) = &self.context {
                    ui.label(RichText::new(context).weak());
                    ui.add_space(4.0);
                }

                ui.label("Command:");
                let command_field = ui.add(
                    TextEdit::multiline(&mut self.command)
                        .code_editor()
                        .desired_rows(2)
                        .desired_width(f32::INFINITY)
                        .hint_text("e.g. docker ps -a"),
                );
                if self.focus_pending {
                    command_field.request_focus();
                    self.focus_pending = false;
                }

                ui.add_space(6.0);
                ui.label("Label (optional):");
                let label_field = ui.add(
                    TextEdit::singleline(&mut self.label)
                        .desired_width(f32::INFINITY)
                        .hint_text("Defaults to the command"),
                );
                if label_field.lost_focus()
                    && ui.input(|i| i.key_pressed(Key::Enter))
                    && self.submit()
                {
                    should_close = true;
                }

                if let Some(error) = &self.error {
                    ui.add_space(4.0);
                    ui.colored_label(egui::Color32::from_rgb(220, 80, 80), error);
                }

                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        self.result = ModalResult::Cancelled;
                        should_close = true;
                    }
                    ui.add_space(8.0);
                    let save_enabled = !self.command.trim().is_empty();
                    if ui
                        .add_enabled(save_enabled, egui::Button::new("Save"))
                        .clicked()
                        && self.submit()
                    {
                        should_close = true;
                    }
                });
            });

        if ctx.input(|i| i.key_pressed(Key::Escape)) {
            self.result = ModalResult::Cancelled;
            should_close = true;
        }

        if should_close {
            self.is_open = false;
        }
        should_close
    }

    fn is_open(&self) -> bool {
        self.is_open
    }

    fn close(&mut self) {
        self.is_open = false;
        self.result = ModalResult::Cancelled;
    }
}
