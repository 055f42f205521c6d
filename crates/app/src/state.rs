//! State management for the TechSupport app
//!
//! AppState owns the favorites tree and is the only place it changes:
//! actions from the panel become mutator calls, every structural change is
//! written through to storage, and streamed execution events are folded in
//! once per frame.

use agent_host::{spawn_stream, BackgroundTask, ExecSubscription, ExecutionChannel, RunOutcome};
use services::favorites_store::{self, FavoritesStore};
use shared::favorites::{
    apply_drop, move_to_root, tree, CommandEdit, ExecutionCoordinator, FavoriteItem,
};
use shared::settings::AppSettings;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::favorites::{FavoriteAction, RenameState};
use crate::modals::{DialogTarget, FavoriteDialog, FavoriteDraft, Modal};

pub struct AppState {
    pub settings: AppSettings,
    pub favorites: Vec<FavoriteItem>,
    pub rename: Option<RenameState>,
    pub dialog: FavoriteDialog,
    /// Last short notice shown in the status bar
    pub status: Option<String>,
    /// Quick-add form in the main panel
    pub quick_command: String,
    pub quick_label: String,
    /// Result of trying the quick-add command without saving it
    pub trial: Option<Result<RunOutcome, String>>,
    /// Last answer from the execution backend's health check
    pub backend_online: Option<bool>,
    store: FavoritesStore,
    channel: Arc<dyn ExecutionChannel>,
    coordinator: ExecutionCoordinator,
    subscription: Option<ExecSubscription>,
    trial_task: Option<BackgroundTask<RunOutcome>>,
    health_task: Option<BackgroundTask<bool>>,
}

impl AppState {
    pub fn new(settings: AppSettings, store: FavoritesStore, channel: Arc<dyn ExecutionChannel>) -> Self {
        let favorites = store.load();
        info!(count = tree::count(&favorites), "favorites loaded");
        Self {
            settings,
            favorites,
            rename: None,
            dialog: FavoriteDialog::new("favorite-dialog"),
            status: None,
            quick_command: String::new(),
            quick_label: String::new(),
            trial: None,
            backend_online: None,
            store,
            channel,
            coordinator: ExecutionCoordinator::new(),
            subscription: None,
            trial_task: None,
            health_task: None,
        }
    }

    pub fn executing_id(&self) -> Option<&str> {
        self.coordinator.executing_id()
    }

    pub fn is_executing(&self) -> bool {
        self.coordinator.is_busy()
    }

    /// Swap in the channel for new settings. A running command keeps its own.
    pub fn set_channel(&mut self, channel: Arc<dyn ExecutionChannel>) {
        self.channel = channel;
        self.check_backend();
    }

    /// Ask the current channel whether it can take commands.
    pub fn check_backend(&mut self) {
        let channel = self.channel.clone();
        self.backend_online = None;
        self.health_task = Some(BackgroundTask::spawn("health", async move {
            channel.health().await
        }));
    }

    pub fn is_trying(&self) -> bool {
        self.trial_task.is_some()
    }

    /// Run the quick-add command once, to completion, without saving it.
    pub fn try_quick_command(&mut self) {
        let command = self.quick_command.trim().to_string();
        if command.is_empty() || self.trial_task.is_some() {
            return;
        }
        let channel = self.channel.clone();
        let cwd = self.working_dir();
        self.trial = None;
        self.trial_task = Some(BackgroundTask::spawn("trial", async move {
            channel.run(&command, cwd.as_deref()).await
        }));
    }

    /// Collect finished one-shot tasks. True while any is still pending.
    pub fn poll_background(&mut self) -> bool {
        if let Some(result) = self.health_task.as_mut().and_then(BackgroundTask::try_take) {
            self.health_task = None;
            self.backend_online = Some(match result {
                Ok(online) => online,
                Err(e) => {
                    warn!("Execution backend check failed: {}", e);
                    false
                }
            });
        }
        if let Some(result) = self.trial_task.as_mut().and_then(BackgroundTask::try_take) {
            self.trial_task = None;
            self.trial = Some(result);
        }
        self.health_task.is_some() || self.trial_task.is_some()
    }

    pub fn working_dir(&self) -> Option<PathBuf> {
        self.settings
            .working_dir
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Replace the tree and write it through if anything changed.
    fn commit(&mut self, next: Vec<FavoriteItem>) {
        if next != self.favorites {
            self.favorites = next;
            self.store.save(&self.favorites);
        }
    }

    pub fn apply_action(&mut self, action: FavoriteAction) {
        debug!(?action, "favorite action");
        match action {
            FavoriteAction::Toggle(id) => {
                let next = tree::toggle_open(&self.favorites, &id);
                self.commit(next);
            }
            FavoriteAction::Execute(id) => self.execute(&id),
            FavoriteAction::Remove(id) => self.remove(&id),
            FavoriteAction::StartRename(id) => {
                if let Some(item) = tree::find(&self.favorites, &id) {
                    self.rename = Some(RenameState::new(id, item.display_name()));
                }
            }
            FavoriteAction::CommitRename { id, label } => {
                self.rename = None;
                let next = tree::relabel(&self.favorites, &id, &label);
                self.commit(next);
            }
            FavoriteAction::CancelRename => self.rename = None,
            FavoriteAction::OpenAddCommand { parent } => {
                let parent_name = parent
                    .as_deref()
                    .and_then(|p| tree::find(&self.favorites, p))
                    .map(|f| f.display_name().to_string());
                self.dialog.open_add(parent, parent_name);
            }
            FavoriteAction::AddCommand {
                parent,
                command,
                label,
            } => {
                if command.trim().is_empty() {
                    return;
                }
                let item = FavoriteItem::command(command, label);
                let next = tree::add(&self.favorites, item, parent.as_deref());
                self.commit(next);
            }
            FavoriteAction::AddFolder { parent } => {
                let folder = FavoriteItem::folder("New Folder");
                let id = folder.id().to_string();
                let next = tree::add(&self.favorites, folder, parent.as_deref());
                self.commit(next);
                self.rename = Some(RenameState::new(id, "New Folder"));
            }
            FavoriteAction::OpenEdit(id) => {
                if let Some(cmd) = tree::find(&self.favorites, &id).and_then(FavoriteItem::as_command) {
                    self.dialog.open_edit(cmd);
                }
            }
            FavoriteAction::UpdateCommand { id, edit } => {
                let next = tree::update_command(&self.favorites, &id, edit);
                self.commit(next);
            }
            FavoriteAction::ClearOutput(id) => {
                if !self.coordinator.is_executing(&id) {
                    let next = tree::clear_output(&self.favorites, &id);
                    self.commit(next);
                }
            }
            FavoriteAction::Move { id, direction } => {
                let next = tree::move_sibling(&self.favorites, &id, direction);
                self.commit(next);
            }
            FavoriteAction::Drop {
                dragged,
                target,
                placement,
            } => {
                let next = apply_drop(&self.favorites, &dragged, &target, placement);
                self.commit(next);
            }
            FavoriteAction::DropOnRoot { dragged } => {
                let next = move_to_root(&self.favorites, &dragged);
                self.commit(next);
            }
            FavoriteAction::Copied(label) => {
                self.status = Some(format!("Copied \"{}\"", label));
            }
        }
    }

    /// Apply what the add/edit dialog produced.
    pub fn submit_draft(&mut self, draft: FavoriteDraft) {
        let action = match draft.target {
            DialogTarget::Add { parent } => FavoriteAction::AddCommand {
                parent,
                command: draft.command,
                label: draft.label,
            },
            DialogTarget::Edit { id } => FavoriteAction::UpdateCommand {
                id,
                edit: CommandEdit {
                    label: Some(draft.label),
                    command: Some(draft.command),
                },
            },
        };
        self.apply_action(action);
    }

    /// Save the quick-add form as a top-level favorite.
    pub fn submit_quick_add(&mut self) {
        let command = std::mem::take(&mut self.quick_command);
        let label = std::mem::take(&mut self.quick_label);
        if command.trim().is_empty() {
            return;
        }
        self.apply_action(FavoriteAction::AddCommand {
            parent: None,
            command,
            label,
        });
        self.status = Some("Saved to favorites".to_string());
    }

    fn execute(&mut self, id: &str) {
        let started = match self.coordinator.start(&self.favorites, id) {
            Ok(started) => started,
            Err(e) => {
                debug!("not starting favorite: {}", e);
                return;
            }
        };
        if let Some(prev) = &started.interrupted {
            // Its node already carries the interruption in its output
            if let Some(sub) = self.subscription.take() {
                sub.cancel();
            }
            debug!(interrupted = %prev, "previous stream dropped");
        }
        self.commit(started.tree);
        self.subscription = Some(spawn_stream(
            self.channel.clone(),
            id,
            started.command,
            self.working_dir(),
        ));
    }

    fn remove(&mut self, id: &str) {
        let (next, removed) = tree::remove(&self.favorites, id);
        if removed.is_none() {
            return;
        }
        if self.rename.as_ref().is_some_and(|r| !tree::contains(&next, &r.id)) {
            self.rename = None;
        }
        let editing_removed = matches!(
            self.dialog.target(),
            DialogTarget::Edit { id } if !tree::contains(&next, id)
        );
        if self.dialog.is_open() && editing_removed {
            self.dialog.close();
        }
        self.commit(next);
        let orphaned = self
            .coordinator
            .executing_id()
            .is_some_and(|running| !tree::contains(&self.favorites, running));
        if orphaned {
            self.cancel_execution("Removed while running");
        }
    }

    /// Stop the running command, if any, recording `reason` on its node.
    pub fn cancel_execution(&mut self, reason: &str) {
        if let Some(sub) = self.subscription.take() {
            sub.cancel();
        }
        if let Some((id, next)) = self.coordinator.cancel(&self.favorites, reason) {
            info!(id = %id, reason, "favorite execution cancelled");
            self.commit(next);
        }
    }

    /// Fold pending stream events into the tree. True when anything changed.
    pub fn poll_exec_events(&mut self) -> bool {
        let Some(sub) = self.subscription.as_mut() else {
            return false;
        };
        let node_id = sub.node_id().to_string();
        let events = sub.drain();
        let finished = sub.is_finished();

        let mut changed = false;
        for event in &events {
            if let Some(next) = self.coordinator.apply(&self.favorites, &node_id, event) {
                self.favorites = next;
                changed = true;
                if event.is_terminal() {
                    self.store.save(&self.favorites);
                }
            }
        }
        if finished {
            self.subscription = None;
        }
        changed
    }

    /// Replace the whole tree with an imported one.
    pub fn import_favorites(&mut self, path: &Path) {
        match favorites_store::import_from(path) {
            Ok(items) => {
                self.cancel_execution("Favorites replaced by import");
                self.rename = None;
                let count = tree::count(&items);
                self.commit(items);
                self.status = Some(format!("Imported {} favorites", count));
            }
            Err(e) => {
                warn!("Import failed: {:#}", e);
                self.status = Some(format!("Import failed: {}", e));
            }
        }
    }

    pub fn export_favorites(&mut self, path: &Path) {
        self.status = Some(match favorites_store::export_to(path, &self.favorites) {
            Ok(()) => format!("Exported to {}", path.display()),
            Err(e) => {
                warn!("Export failed: {:#}", e);
                format!("Export failed: {}", e)
            }
        });
    }

    /// Called when the window closes: an open stream ends as an error.
    pub fn shutdown(&mut self) {
        self.cancel_execution("Cancelled: window closed");
    }
}
