//! Copy-on-write operations over the favorites tree.
//!
//! Every function re-walks the whole tree; favorites are curated by hand and
//! stay in the tens-to-hundreds of nodes. Stale ids are expected during
//! drag/drop races, so nothing here fails: an operation that cannot apply
//! returns an unchanged copy and logs at `debug`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{new_id, FavoriteItem, Placement};

/// Partial update of a command node's editable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandEdit {
    pub label: Option<String>,
    pub command: Option<String>,
}

/// Direction for sibling reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Depth-first search for the node with `id`.
pub fn find<'a>(tree: &'a [FavoriteItem], id: &str) -> Option<&'a FavoriteItem> {
    for item in tree {
        if item.id() == id {
            return Some(item);
        }
        if let Some(found) = find(item.children(), id) {
            return Some(found);
        }
    }
    None
}

pub fn contains(tree: &[FavoriteItem], id: &str) -> bool {
    find(tree, id).is_some()
}

/// Every id in the tree, depth-first, in display order.
pub fn all_ids(tree: &[FavoriteItem]) -> Vec<&str> {
    let mut ids = Vec::new();
    collect_ids(tree, &mut ids);
    ids
}

fn collect_ids<'a>(tree: &'a [FavoriteItem], out: &mut Vec<&'a str>) {
    for item in tree {
        out.push(item.id());
        collect_ids(item.children(), out);
    }
}

/// Number of nodes, folders included.
pub fn count(tree: &[FavoriteItem]) -> usize {
    tree.iter().map(|item| 1 + count(item.children())).sum()
}

pub(crate) fn find_mut<'a>(tree: &'a mut [FavoriteItem], id: &str) -> Option<&'a mut FavoriteItem> {
    for item in tree.iter_mut() {
        if item.id() == id {
            return Some(item);
        }
        if let FavoriteItem::Folder(folder) = item {
            if let Some(found) = find_mut(&mut folder.children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// The sibling list holding `id`, with its index there.
fn locate_mut<'a>(
    level: &'a mut Vec<FavoriteItem>,
    id: &str,
) -> Option<(&'a mut Vec<FavoriteItem>, usize)> {
    if let Some(idx) = level.iter().position(|item| item.id() == id) {
        return Some((level, idx));
    }
    for item in level.iter_mut() {
        if let FavoriteItem::Folder(folder) = item {
            if let Some(found) = locate_mut(&mut folder.children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// True when inserting `item` would repeat an id already in `tree`.
fn collides(tree: &[FavoriteItem], item: &FavoriteItem) -> bool {
    let mut ids = vec![item.id()];
    collect_ids(item.children(), &mut ids);
    ids.into_iter().any(|id| contains(tree, id))
}

/// Take the node with `id` out of whatever level holds it.
pub fn remove(tree: &[FavoriteItem], id: &str) -> (Vec<FavoriteItem>, Option<FavoriteItem>) {
    let mut next = tree.to_vec();
    let removed = locate_mut(&mut next, id).map(|(level, idx)| level.remove(idx));
    if removed.is_none() {
        debug!(id, "remove: node not found");
    }
    (next, removed)
}

/// Append `item` to a folder's children and open the folder.
pub fn insert_into_folder(
    tree: &[FavoriteItem],
    folder_id: &str,
    item: FavoriteItem,
) -> Vec<FavoriteItem> {
    let mut next = tree.to_vec();
    if collides(tree, &item) {
        debug!(id = item.id(), "insert: id already present");
        return next;
    }
    match find_mut(&mut next, folder_id) {
        Some(FavoriteItem::Folder(folder)) => {
            folder.children.push(item);
            folder.is_open = true;
        }
        _ => debug!(folder_id, "insert: target is not a folder"),
    }
    next
}

/// Place `item` before, after, or inside the node `target_id`.
pub fn insert_at_position(
    tree: &[FavoriteItem],
    target_id: &str,
    item: FavoriteItem,
    placement: Placement,
) -> Vec<FavoriteItem> {
    if placement == Placement::Inside {
        return insert_into_folder(tree, target_id, item);
    }

    let mut next = tree.to_vec();
    if collides(tree, &item) {
        debug!(id = item.id(), "insert: id already present");
        return next;
    }
    match locate_mut(&mut next, target_id) {
        Some((level, idx)) => {
            let at = if placement == Placement::Before {
                idx
            } else {
                idx + 1
            };
            level.insert(at, item);
        }
        None => debug!(target_id, "insert: target not found"),
    }
    next
}

/// Append at the root, or into `parent` when it names a folder.
pub fn add(tree: &[FavoriteItem], item: FavoriteItem, parent: Option<&str>) -> Vec<FavoriteItem> {
    if let Some(parent) = parent {
        if find(tree, parent).is_some_and(FavoriteItem::is_folder) {
            return insert_into_folder(tree, parent, item);
        }
        debug!(parent, "add: parent folder missing, filing at root");
    }
    let mut next = tree.to_vec();
    if !collides(tree, &item) {
        next.push(item);
    }
    next
}

/// Rename a folder or relabel a command. Blank labels are ignored.
pub fn relabel(tree: &[FavoriteItem], id: &str, new_label: &str) -> Vec<FavoriteItem> {
    let mut next = tree.to_vec();
    let label = new_label.trim();
    if label.is_empty() {
        return next;
    }
    match find_mut(&mut next, id) {
        Some(FavoriteItem::Folder(folder)) => folder.name = label.to_string(),
        Some(FavoriteItem::Command(cmd)) => cmd.label = label.to_string(),
        None => debug!(id, "relabel: node not found"),
    }
    next
}

pub fn toggle_open(tree: &[FavoriteItem], folder_id: &str) -> Vec<FavoriteItem> {
    let mut next = tree.to_vec();
    if let Some(FavoriteItem::Folder(folder)) = find_mut(&mut next, folder_id) {
        folder.is_open = !folder.is_open;
    }
    next
}

/// Change a command's label and/or shell text.
///
/// A blank command is ignored; a blank label resets to the command text.
pub fn update_command(tree: &[FavoriteItem], id: &str, edit: CommandEdit) -> Vec<FavoriteItem> {
    let mut next = tree.to_vec();
    let Some(FavoriteItem::Command(cmd)) = find_mut(&mut next, id) else {
        debug!(id, "update_command: no such command");
        return next;
    };

    if let Some(command) = edit.command {
        let command = command.trim();
        if !command.is_empty() {
            cmd.command = command.to_string();
        }
    }
    if let Some(label) = edit.label {
        let label = label.trim();
        cmd.label = if label.is_empty() {
            cmd.command.clone()
        } else {
            label.to_string()
        };
    }
    next
}

/// Swap a node with its neighbour in the same folder.
pub fn move_sibling(tree: &[FavoriteItem], id: &str, direction: MoveDirection) -> Vec<FavoriteItem> {
    let mut next = tree.to_vec();
    if let Some((level, idx)) = locate_mut(&mut next, id) {
        let other = match direction {
            MoveDirection::Up => idx.checked_sub(1),
            MoveDirection::Down => Some(idx + 1).filter(|&i| i < level.len()),
        };
        if let Some(other) = other {
            level.swap(idx, other);
        }
    }
    next
}

/// Write a command node's transient run state.
pub fn set_output(
    tree: &[FavoriteItem],
    id: &str,
    output: Option<String>,
    last_run_at: Option<DateTime<Utc>>,
) -> Vec<FavoriteItem> {
    let mut next = tree.to_vec();
    if let Some(FavoriteItem::Command(cmd)) = find_mut(&mut next, id) {
        cmd.output = output;
        cmd.last_run_at = last_run_at;
    }
    next
}

pub fn clear_output(tree: &[FavoriteItem], id: &str) -> Vec<FavoriteItem> {
    set_output(tree, id, None, None)
}

/// Drop `output` and `lastRunAt` from every command.
pub fn strip_transient(tree: &[FavoriteItem]) -> Vec<FavoriteItem> {
    tree.iter()
        .map(|item| match item {
            FavoriteItem::Command(cmd) => {
                let mut cmd = cmd.clone();
                cmd.output = None;
                cmd.last_run_at = None;
                FavoriteItem::Command(cmd)
            }
            FavoriteItem::Folder(folder) => {
                let mut folder = folder.clone();
                folder.children = strip_transient(&folder.children);
                FavoriteItem::Folder(folder)
            }
        })
        .collect()
}

/// Give a fresh id to every node whose id is blank or already used.
pub fn ensure_unique_ids(tree: &[FavoriteItem]) -> Vec<FavoriteItem> {
    let mut next = tree.to_vec();
    let mut seen = HashSet::new();
    let mut replaced = 0usize;
    reassign_duplicates(&mut next, &mut seen, &mut replaced);
    if replaced > 0 {
        debug!(replaced, "reassigned duplicate favorite ids");
    }
    next
}

fn reassign_duplicates(level: &mut [FavoriteItem], seen: &mut HashSet<String>, replaced: &mut usize) {
    for item in level.iter_mut() {
        let id = match item {
            FavoriteItem::Command(cmd) => &mut cmd.id,
            FavoriteItem::Folder(folder) => &mut folder.id,
        };
        if id.trim().is_empty() || seen.contains(id.as_str()) {
            *id = new_id();
            *replaced += 1;
        }
        seen.insert(id.clone());

        if let FavoriteItem::Folder(folder) = item {
            reassign_duplicates(&mut folder.children, seen, replaced);
        }
    }
}
