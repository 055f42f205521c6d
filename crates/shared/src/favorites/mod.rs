//! Favorites tree: user-saved shell commands grouped into nested folders.
//!
//! The tree is a plain `Vec<FavoriteItem>` owned by the app state. Every
//! operation in [`tree`] and [`dnd`] takes the current tree by reference and
//! returns a new one, so the caller decides when to persist.

pub mod dnd;
pub mod execution;
pub mod tree;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use dnd::{apply_drop, move_to_root, placement_for, resolve_drop, DropGeometry, Placement};
pub use execution::{ExecutionCoordinator, ExecutionError, StartedExecution};
pub use tree::{CommandEdit, MoveDirection};

/// A node of the favorites tree.
///
/// Serialized as the persisted shape: `{ id, type: "folder", name, isOpen, items }`
/// or `{ id, type: "command", command, label, output?, timestamp? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FavoriteItem {
    Command(FavoriteCommand),
    Folder(FavoriteFolder),
}

/// A saved shell command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteCommand {
    pub id: String,
    /// Literal shell text
    pub command: String,
    /// Display text; empty means "show the command"
    #[serde(default)]
    pub label: String,
    /// Output of the most recent run in this session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(
        default,
        rename = "timestamp",
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_run_at: Option<DateTime<Utc>>,
}

/// A folder grouping commands and other folders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteFolder {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "isOpen")]
    pub is_open: bool,
    #[serde(default, rename = "items")]
    pub children: Vec<FavoriteItem>,
}

impl FavoriteItem {
    /// New command node. A blank label falls back to the command text.
    pub fn command(command: impl Into<String>, label: impl Into<String>) -> Self {
        let command = command.into().trim().to_string();
        let label = label.into().trim().to_string();
        FavoriteItem::Command(FavoriteCommand {
            id: new_id(),
            label: if label.is_empty() {
                command.clone()
            } else {
                label
            },
            command,
            output: None,
            last_run_at: None,
        })
    }

    /// New empty folder, open so that items filed into it are visible.
    pub fn folder(name: impl Into<String>) -> Self {
        FavoriteItem::Folder(FavoriteFolder {
            id: new_id(),
            name: name.into().trim().to_string(),
            is_open: true,
            children: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        match self {
            FavoriteItem::Command(c) => &c.id,
            FavoriteItem::Folder(f) => &f.id,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, FavoriteItem::Folder(_))
    }

    /// Text shown in the tree for this node.
    pub fn display_name(&self) -> &str {
        match self {
            FavoriteItem::Command(c) => c.display_label(),
            FavoriteItem::Folder(f) => &f.name,
        }
    }

    pub fn as_command(&self) -> Option<&FavoriteCommand> {
        match self {
            FavoriteItem::Command(c) => Some(c),
            FavoriteItem::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&FavoriteFolder> {
        match self {
            FavoriteItem::Folder(f) => Some(f),
            FavoriteItem::Command(_) => None,
        }
    }

    /// Children of a folder; commands have none.
    pub fn children(&self) -> &[FavoriteItem] {
        match self {
            FavoriteItem::Folder(f) => &f.children,
            FavoriteItem::Command(_) => &[],
        }
    }
}

impl FavoriteCommand {
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.command
        } else {
            &self.label
        }
    }
}

/// Fresh node id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_label_defaults_to_command() {
        let item = FavoriteItem::command("  docker ps -a ", "   ");
        let cmd = item.as_command().unwrap();
        assert_eq!(cmd.command, "docker ps -a");
        assert_eq!(cmd.label, "docker ps -a");
        assert_eq!(item.display_name(), "docker ps -a");
    }

    #[test]
    fn test_persisted_shape() {
        let mut folder = FavoriteItem::folder("Scripts");
        if let FavoriteItem::Folder(f) = &mut folder {
            f.id = "f1".into();
            f.children.push(FavoriteItem::Command(FavoriteCommand {
                id: "c1".into(),
                command: "ls -la".into(),
                label: "List".into(),
                output: Some("a\n".into()),
                last_run_at: DateTime::from_timestamp_millis(1_700_000_000_000),
            }));
        }

        let json = serde_json::to_value(&folder).unwrap();
        assert_eq!(json["type"], "folder");
        assert_eq!(json["isOpen"], true);
        assert_eq!(json["items"][0]["type"], "command");
        assert_eq!(json["items"][0]["label"], "List");
        assert_eq!(json["items"][0]["output"], "a\n");
        assert_eq!(json["items"][0]["timestamp"], 1_700_000_000_000i64);
    }

    #[test]
    fn test_parse_minimal_command() {
        let item: FavoriteItem =
            serde_json::from_str(r#"{"id":"x","type":"command","command":"uptime"}"#).unwrap();
        let cmd = item.as_command().unwrap();
        assert_eq!(cmd.display_label(), "uptime");
        assert!(cmd.output.is_none());
        assert!(cmd.last_run_at.is_none());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let parsed = serde_json::from_str::<FavoriteItem>(r#"{"id":"x","type":"link"}"#);
        assert!(parsed.is_err());
    }
}
