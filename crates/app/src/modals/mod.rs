//! Modal dialogs drawn over the main window.

pub mod favorite_dialog;

pub use favorite_dialog::{DialogTarget, FavoriteDialog, FavoriteDraft};

use egui::Context;

/// A dialog the app shows on top of everything else until it closes.
pub trait Modal {
    /// Draw one frame. Returns true on the frame the dialog closes.
    fn update(&mut self, ctx: &Context) -> bool;

    fn is_open(&self) -> bool;

    /// Dismiss without submitting, e.g. when the edited node disappears.
    fn close(&mut self);
}

/// What the user decided in a dialog.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalResult<T> {
    Pending,
    Confirmed(T),
    Cancelled,
}

impl<T> ModalResult<T> {
    pub fn take_value(self) -> Option<T> {
        match self {
            ModalResult::Confirmed(v) => Some(v),
            _ => None,
        }
    }
}
