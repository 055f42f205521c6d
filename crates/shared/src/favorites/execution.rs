//! Single-flight execution state for favorite commands.
//!
//! The coordinator remembers which command is running and the output
//! accumulated so far; each event produces a new tree with that output
//! written into the command node. Only one command runs at a time: starting
//! another one hands back the interrupted id so the caller can cancel its
//! stream. That node keeps its partial output, closed with
//! `Error: Interrupted` so it never reads as a finished run.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use super::{tree, FavoriteItem};
use crate::events::ExecEvent;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("favorite '{0}' no longer exists")]
    NotFound(String),
    #[error("favorite '{0}' is a folder, not a command")]
    NotACommand(String),
    #[error("favorite '{0}' is already running")]
    AlreadyRunning(String),
}

/// Outcome of a successful [`ExecutionCoordinator::start`].
#[derive(Debug, Clone)]
pub struct StartedExecution {
    /// Tree with the node's output reset to empty and any interrupted node
    /// marked as such
    pub tree: Vec<FavoriteItem>,
    /// Shell text to run
    pub command: String,
    /// Command that was running before and has been abandoned
    pub interrupted: Option<String>,
}

#[derive(Debug, Default)]
pub struct ExecutionCoordinator {
    executing_id: Option<String>,
    output: String,
    started_at: Option<DateTime<Utc>>,
}

impl ExecutionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executing_id(&self) -> Option<&str> {
        self.executing_id.as_deref()
    }

    pub fn is_executing(&self, id: &str) -> bool {
        self.executing_id.as_deref() == Some(id)
    }

    pub fn is_busy(&self) -> bool {
        self.executing_id.is_some()
    }

    /// Begin running command `id`: mark it executing and blank its output.
    pub fn start(
        &mut self,
        items: &[FavoriteItem],
        id: &str,
    ) -> Result<StartedExecution, ExecutionError> {
        if self.is_executing(id) {
            return Err(ExecutionError::AlreadyRunning(id.to_string()));
        }
        let command = match tree::find(items, id) {
            Some(FavoriteItem::Command(cmd)) => cmd.command.clone(),
            Some(FavoriteItem::Folder(_)) => return Err(ExecutionError::NotACommand(id.to_string())),
            None => return Err(ExecutionError::NotFound(id.to_string())),
        };

        let interrupted = self.executing_id.clone();
        let base = match &interrupted {
            Some(prev) => {
                info!(interrupted = %prev, next = %id, "interrupting running favorite");
                self.push_line("Error: Interrupted");
                self.finish(items, prev)
            }
            None => items.to_vec(),
        };

        let now = Utc::now();
        self.executing_id = Some(id.to_string());
        self.started_at = Some(now);
        info!(id, command = %command, "favorite execution started");

        Ok(StartedExecution {
            tree: tree::set_output(&base, id, Some(String::new()), Some(now)),
            command,
            interrupted,
        })
    }

    /// Append a streamed chunk. `None` when `id` is not the running command.
    pub fn on_chunk(&mut self, items: &[FavoriteItem], id: &str, text: &str) -> Option<Vec<FavoriteItem>> {
        if !self.is_executing(id) {
            debug!(id, "dropping chunk for inactive favorite");
            return None;
        }
        self.output.push_str(text);
        Some(self.write_output(items, id))
    }

    /// Terminal success/failure. A non-zero exit code is appended to the output.
    pub fn on_complete(
        &mut self,
        items: &[FavoriteItem],
        id: &str,
        exit_code: i32,
    ) -> Option<Vec<FavoriteItem>> {
        if !self.is_executing(id) {
            return None;
        }
        if exit_code != 0 {
            self.push_line(&format!("Exit Code: {}", exit_code));
        }
        info!(id, exit_code, "favorite execution finished");
        Some(self.finish(items, id))
    }

    /// Terminal transport or spawn failure. Partial output is kept.
    pub fn on_error(&mut self, items: &[FavoriteItem], id: &str, message: &str) -> Option<Vec<FavoriteItem>> {
        if !self.is_executing(id) {
            return None;
        }
        self.push_line(&format!("Error: {}", message));
        info!(id, message, "favorite execution failed");
        Some(self.finish(items, id))
    }

    /// Route one stream event.
    pub fn apply(&mut self, items: &[FavoriteItem], id: &str, event: &ExecEvent) -> Option<Vec<FavoriteItem>> {
        match event {
            ExecEvent::Output { text, .. } => self.on_chunk(items, id, text),
            ExecEvent::Done { exit_code } => self.on_complete(items, id, *exit_code),
            ExecEvent::Error { text } => self.on_error(items, id, text),
        }
    }

    /// Abandon the running command, if any, as an error.
    pub fn cancel(&mut self, items: &[FavoriteItem], reason: &str) -> Option<(String, Vec<FavoriteItem>)> {
        let id = self.executing_id.clone()?;
        self.on_error(items, &id, reason).map(|next| (id, next))
    }

    fn push_line(&mut self, line: &str) {
        if !self.output.is_empty() && !self.output.ends_with('\n') {
            self.output.push('\n');
        }
        self.output.push_str(line);
    }

    fn write_output(&self, items: &[FavoriteItem], id: &str) -> Vec<FavoriteItem> {
        tree::set_output(items, id, Some(self.output.clone()), self.started_at)
    }

    fn finish(&mut self, items: &[FavoriteItem], id: &str) -> Vec<FavoriteItem> {
        let next = self.write_output(items, id);
        self.executing_id = None;
        self.output.clear();
        self.started_at = None;
        next
    }
}
