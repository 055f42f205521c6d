//! Drag-and-drop placement for the favorites tree.
//!
//! Turns a pointer position over a target row into a discrete [`Placement`]
//! and applies it as a single remove-then-insert step.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tree;
use super::FavoriteItem;

/// Where a dragged node lands relative to the drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Before,
    After,
    Inside,
}

/// Share of a folder row's height, at top and bottom, that means
/// "sibling" rather than "inside".
pub const FOLDER_EDGE_FRACTION: f32 = 0.25;

/// Target row geometry and the pointer's vertical position, in screen units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropGeometry {
    pub rect_top: f32,
    pub rect_height: f32,
    pub pointer_y: f32,
}

impl DropGeometry {
    pub fn relative_y(&self) -> f32 {
        self.pointer_y - self.rect_top
    }
}

/// Zone under the pointer: two zones for commands, three for folders.
pub fn placement_for(target: &FavoriteItem, geometry: DropGeometry) -> Placement {
    let y = geometry.relative_y();
    let height = geometry.rect_height;
    if target.is_folder() {
        if y < height * FOLDER_EDGE_FRACTION {
            Placement::Before
        } else if y > height * (1.0 - FOLDER_EDGE_FRACTION) {
            Placement::After
        } else {
            Placement::Inside
        }
    } else if y < height / 2.0 {
        Placement::Before
    } else {
        Placement::After
    }
}

/// True when `id` sits anywhere below `node`. Only walks `node`'s subtree.
pub fn is_descendant(node: &FavoriteItem, id: &str) -> bool {
    tree::contains(node.children(), id)
}

/// Placement for dropping `dragged_id` onto `target_id`, or `None` when
/// the drop must be rejected: self-drop, unknown ids, or a folder dropped
/// into its own subtree.
pub fn resolve_drop(
    items: &[FavoriteItem],
    dragged_id: &str,
    target_id: &str,
    geometry: DropGeometry,
) -> Option<Placement> {
    if dragged_id == target_id {
        return None;
    }
    let dragged = tree::find(items, dragged_id)?;
    let target = tree::find(items, target_id)?;
    if dragged.is_folder() && is_descendant(dragged, target_id) {
        debug!(dragged_id, target_id, "drop rejected: folder into its own subtree");
        return None;
    }
    Some(placement_for(target, geometry))
}

/// Move `dragged_id` to `placement` relative to `target_id`.
///
/// If the node cannot land (stale target, cycle, or an `Inside` drop on a
/// command), the input tree comes back so nothing is lost.
pub fn apply_drop(
    items: &[FavoriteItem],
    dragged_id: &str,
    target_id: &str,
    placement: Placement,
) -> Vec<FavoriteItem> {
    if dragged_id == target_id {
        return items.to_vec();
    }
    let Some(dragged) = tree::find(items, dragged_id) else {
        return items.to_vec();
    };
    if dragged.is_folder() && is_descendant(dragged, target_id) {
        debug!(dragged_id, target_id, "drop rejected: folder into its own subtree");
        return items.to_vec();
    }

    let (without, removed) = tree::remove(items, dragged_id);
    let Some(node) = removed else {
        return items.to_vec();
    };
    let next = tree::insert_at_position(&without, target_id, node, placement);
    if tree::contains(&next, dragged_id) {
        next
    } else {
        debug!(dragged_id, target_id, ?placement, "drop target vanished, keeping tree");
        items.to_vec()
    }
}

/// Drop onto the root container: append at the top level.
pub fn move_to_root(items: &[FavoriteItem], dragged_id: &str) -> Vec<FavoriteItem> {
    let (mut without, removed) = tree::remove(items, dragged_id);
    match removed {
        Some(node) => {
            without.push(node);
            without
        }
        None => items.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::tree::{all_ids, find};
    use crate::favorites::{FavoriteCommand, FavoriteFolder};

    fn cmd(id: &str) -> FavoriteItem {
        FavoriteItem::Command(FavoriteCommand {
            id: id.into(),
            command: id.into(),
            label: String::new(),
            output: None,
            last_run_at: None,
        })
    }

    fn folder(id: &str, children: Vec<FavoriteItem>) -> FavoriteItem {
        FavoriteItem::Folder(FavoriteFolder {
            id: id.into(),
            name: id.into(),
            is_open: true,
            children,
        })
    }

    fn at(y: f32) -> DropGeometry {
        DropGeometry {
            rect_top: 100.0,
            rect_height: 40.0,
            pointer_y: 100.0 + y,
        }
    }

    #[test]
    fn test_command_zones() {
        let target = cmd("c");
        assert_eq!(placement_for(&target, at(5.0)), Placement::Before);
        assert_eq!(placement_for(&target, at(19.9)), Placement::Before);
        assert_eq!(placement_for(&target, at(20.0)), Placement::After);
        assert_eq!(placement_for(&target, at(39.0)), Placement::After);
    }

    #[test]
    fn test_folder_zones() {
        let target = folder("f", vec![]);
        assert_eq!(placement_for(&target, at(2.0)), Placement::Before);
        assert_eq!(placement_for(&target, at(20.0)), Placement::Inside);
        assert_eq!(placement_for(&target, at(38.0)), Placement::After);
    }

    #[test]
    fn test_resolve_rejects_self_and_unknown() {
        let items = vec![cmd("a"), cmd("b")];
        assert_eq!(resolve_drop(&items, "a", "a", at(5.0)), None);
        assert_eq!(resolve_drop(&items, "a", "zzz", at(5.0)), None);
        assert_eq!(resolve_drop(&items, "zzz", "a", at(5.0)), None);
        assert_eq!(resolve_drop(&items, "a", "b", at(30.0)), Some(Placement::After));
    }

    #[test]
    fn test_folder_into_own_child_is_rejected() {
        let items = vec![folder("parent", vec![folder("child", vec![cmd("leaf")])])];
        assert_eq!(resolve_drop(&items, "parent", "child", at(20.0)), None);
        assert_eq!(resolve_drop(&items, "parent", "leaf", at(5.0)), None);
        assert_eq!(apply_drop(&items, "parent", "child", Placement::Inside), items);
        // the other direction is fine
        assert_eq!(
            resolve_drop(&items, "child", "parent", at(20.0)),
            Some(Placement::Inside)
        );
    }

    #[test]
    fn test_drag_command_into_folder() {
        let items = vec![cmd("ls"), folder("scripts", vec![])];
        let placement = resolve_drop(&items, "ls", "scripts", at(20.0)).unwrap();
        assert_eq!(placement, Placement::Inside);
        let next = apply_drop(&items, "ls", "scripts", placement);
        assert_eq!(next.len(), 1);
        assert_eq!(find(&next, "scripts").unwrap().children()[0].id(), "ls");
    }

    #[test]
    fn test_reorder_among_siblings() {
        let items = vec![cmd("a"), cmd("b"), cmd("c")];
        let next = apply_drop(&items, "c", "a", Placement::Before);
        assert_eq!(all_ids(&next), vec!["c", "a", "b"]);
        let next = apply_drop(&items, "a", "c", Placement::After);
        assert_eq!(all_ids(&next), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_inside_on_command_keeps_node() {
        let items = vec![cmd("a"), cmd("b")];
        assert_eq!(apply_drop(&items, "a", "b", Placement::Inside), items);
    }

    #[test]
    fn test_move_to_root() {
        let items = vec![folder("f", vec![cmd("a"), cmd("b")]), cmd("c")];
        let next = move_to_root(&items, "a");
        assert_eq!(next.iter().map(|i| i.id()).collect::<Vec<_>>(), vec!["f", "c", "a"]);
        assert_eq!(find(&next, "f").unwrap().children().len(), 1);
        assert_eq!(move_to_root(&items, "ghost"), items);
    }

    #[test]
    fn test_no_self_containment_after_moves() {
        let mut items = vec![
            folder("p", vec![folder("q", vec![cmd("x")])]),
            folder("r", vec![]),
        ];
        let moves = [
            ("p", "q", Placement::Inside),
            ("q", "r", Placement::Inside),
            ("r", "x", Placement::After),
            ("p", "x", Placement::Before),
        ];
        for (dragged, target, placement) in moves {
            items = apply_drop(&items, dragged, target, placement);
            for id in all_ids(&items) {
                let node = find(&items, id).unwrap();
                assert!(!is_descendant(node, node.id()));
            }
        }
        assert_eq!(all_ids(&items).len(), 4);
    }
}
