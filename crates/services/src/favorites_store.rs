//! Durable copy of the favorites tree.
//!
//! The in-memory tree is the source of truth for a session; this adapter
//! writes it through after every mutation and reads it back on startup.
//! Run output and timestamps describe a run that is over by the next launch,
//! so `load` always strips them.

use anyhow::{Context, Result};
use serde_json::Value;
use shared::favorites::{tree, FavoriteItem};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::storage::KeyValueStore;

/// Storage key for the favorites tree.
pub const FAVORITES_KEY: &str = "techsupport_favorites";

pub struct FavoritesStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl FavoritesStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: FAVORITES_KEY.to_string(),
        }
    }

    /// Read the stored tree. Missing or unreadable storage gives an empty tree.
    pub fn load(&self) -> Vec<FavoriteItem> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read favorites: {:#}", e);
                return Vec::new();
            }
        };

        match parse_tree(&raw) {
            Ok(items) => {
                debug!(count = tree::count(&items), "loaded favorites");
                items
            }
            Err(e) => {
                warn!("Stored favorites are malformed, starting empty: {:#}", e);
                Vec::new()
            }
        }
    }

    /// Write the tree through. Failures are logged; the caller keeps its tree.
    pub fn save(&self, items: &[FavoriteItem]) {
        if let Err(e) = self.try_save(items) {
            warn!("Failed to save favorites: {:#}", e);
        }
    }

    pub fn try_save(&self, items: &[FavoriteItem]) -> Result<()> {
        let json = serde_json::to_string(items).context("Failed to serialize favorites")?;
        self.store.set(&self.key, &json)
    }
}

/// Parse the persisted shape: a JSON array of nodes.
///
/// Entries that don't parse are skipped at every depth, so one bad child
/// costs only itself. The result has no run state and no repeated ids.
pub fn parse_tree(raw: &str) -> Result<Vec<FavoriteItem>> {
    let values: Vec<Value> =
        serde_json::from_str(raw).context("Favorites must be a JSON array")?;
    let items = parse_level(values, "");
    Ok(tree::ensure_unique_ids(&tree::strip_transient(&items)))
}

fn parse_level(values: Vec<Value>, parent: &str) -> Vec<FavoriteItem> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| parse_node(value, &format!("{}/{}", parent, idx)))
        .collect()
}

fn parse_node(mut value: Value, at: &str) -> Option<FavoriteItem> {
    // Children are parsed one by one rather than as part of the folder
    let children = match value.get_mut("items") {
        Some(Value::Array(items)) => std::mem::take(items),
        _ => Vec::new(),
    };
    match serde_json::from_value::<FavoriteItem>(value) {
        Ok(FavoriteItem::Folder(mut folder)) => {
            folder.children = parse_level(children, at);
            Some(FavoriteItem::Folder(folder))
        }
        Ok(item) => Some(item),
        Err(e) => {
            warn!(at, "Skipping malformed favorite: {}", e);
            None
        }
    }
}

/// Write a backup file in the persisted shape, without run output.
pub fn export_to(path: &Path, items: &[FavoriteItem]) -> Result<()> {
    let json = serde_json::to_string_pretty(&tree::strip_transient(items))
        .context("Failed to serialize favorites")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Read a backup file written by [`export_to`] (or by hand).
pub fn import_from(path: &Path) -> Result<Vec<FavoriteItem>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_tree(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use shared::favorites::tree::{add, find, set_output, strip_transient};
    use shared::favorites::{apply_drop, move_to_root, MoveDirection, Placement};
    use std::collections::HashSet;
    use tempfile::TempDir;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            anyhow::bail!("storage unavailable")
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            anyhow::bail!("quota exceeded")
        }
    }

    fn memory() -> FavoritesStore {
        FavoritesStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_empty_storage_loads_empty() {
        assert!(memory().load().is_empty());
    }

    #[test]
    fn test_round_trip_strips_run_state() {
        let store = memory();
        let scripts = FavoriteItem::folder("Scripts");
        let scripts_id = scripts.id().to_string();
        let ps = FavoriteItem::command("docker ps -a", "List containers");
        let ps_id = ps.id().to_string();

        let items = add(&[scripts], ps, Some(scripts_id.as_str()));
        let items = set_output(&items, &ps_id, Some("CONTAINER ID".into()), Some(Utc::now()));
        store.save(&items);

        let loaded = store.load();
        assert_eq!(loaded, strip_transient(&items));
        let folder = find(&loaded, &scripts_id).unwrap().as_folder().unwrap();
        assert!(folder.is_open);
        let cmd = folder.children[0].as_command().unwrap();
        assert_eq!(cmd.label, "List containers");
        assert!(cmd.output.is_none());
        assert!(cmd.last_run_at.is_none());
    }

    #[test]
    fn test_malformed_storage_loads_empty() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(FAVORITES_KEY, "{not json").unwrap();
        assert!(FavoritesStore::new(kv.clone()).load().is_empty());
        kv.set(FAVORITES_KEY, r#"{"id":"x"}"#).unwrap();
        assert!(FavoritesStore::new(kv).load().is_empty());
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(
            FAVORITES_KEY,
            r#"[{"id":"a","type":"command","command":"ls","output":"old","timestamp":1700000000000},
                {"id":"b","type":"bookmark"},
                {"id":"a","type":"folder","name":"Dup","isOpen":false,"items":[]}]"#,
        )
        .unwrap();
        let loaded = FavoritesStore::new(kv).load();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id(), "a");
        assert!(loaded[0].as_command().unwrap().output.is_none());
        assert_ne!(loaded[1].id(), "a");
    }

    #[test]
    fn test_bad_nested_entry_costs_only_itself() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(
            FAVORITES_KEY,
            r#"[{"id":"f","type":"folder","name":"Ops","isOpen":true,"items":[
                  {"id":"s","type":"folder","name":"Deep","items":[
                    {"id":"c1","type":"command","command":"uptime"},
                    {"id":"x","type":"bookmark","url":"http://example.com"}]},
                  {"id":"c2","type":"command","command":"df -h","output":"stale"},
                  {"id":"y","type":"command"}]}]"#,
        )
        .unwrap();
        let loaded = FavoritesStore::new(kv).load();
        assert_eq!(tree::count(&loaded), 4);
        assert_eq!(find(&loaded, "f").unwrap().children().len(), 2);
        assert_eq!(find(&loaded, "s").unwrap().children()[0].id(), "c1");
        assert!(find(&loaded, "c2").unwrap().as_command().unwrap().output.is_none());
        assert!(find(&loaded, "x").is_none());
        assert!(find(&loaded, "y").is_none());
    }

    #[test]
    fn test_random_edit_sequences_reload_cleanly() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..20 {
            let store = memory();
            let mut items: Vec<FavoriteItem> = Vec::new();
            for step in 0..60 {
                let ids: Vec<String> = tree::all_ids(&items).into_iter().map(String::from).collect();
                let folders: Vec<String> = ids
                    .iter()
                    .filter(|id| find(&items, id).is_some_and(|n| n.is_folder()))
                    .cloned()
                    .collect();
                let pick = |rng: &mut StdRng, from: &[String]| -> Option<String> {
                    (!from.is_empty()).then(|| from[rng.gen_range(0..from.len())].clone())
                };

                items = match rng.gen_range(0..7) {
                    0 => {
                        let parent = if rng.gen_bool(0.5) { pick(&mut rng, &folders) } else { None };
                        add(&items, FavoriteItem::command(format!("echo {}", step), ""), parent.as_deref())
                    }
                    1 => {
                        let parent = pick(&mut rng, &folders);
                        add(&items, FavoriteItem::folder(format!("F{}", step)), parent.as_deref())
                    }
                    2 => match pick(&mut rng, &ids) {
                        Some(id) if rng.gen_bool(0.3) => tree::remove(&items, &id).0,
                        _ => items,
                    },
                    3 => match (pick(&mut rng, &ids), pick(&mut rng, &ids)) {
                        (Some(dragged), Some(target)) => {
                            let placement =
                                [Placement::Before, Placement::After, Placement::Inside][rng.gen_range(0..3)];
                            apply_drop(&items, &dragged, &target, placement)
                        }
                        _ => items,
                    },
                    4 => match pick(&mut rng, &ids) {
                        Some(id) => move_to_root(&items, &id),
                        None => items,
                    },
                    5 => match pick(&mut rng, &ids) {
                        Some(id) => tree::move_sibling(&items, &id, MoveDirection::Up),
                        None => items,
                    },
                    _ => match pick(&mut rng, &ids) {
                        Some(id) => set_output(&items, &id, Some(format!("run {}", step)), Some(Utc::now())),
                        None => items,
                    },
                };
                store.save(&items);

                let loaded = store.load();
                assert_eq!(loaded, strip_transient(&items));
                let loaded_ids = tree::all_ids(&loaded);
                let unique: HashSet<&str> = loaded_ids.iter().copied().collect();
                assert_eq!(unique.len(), loaded_ids.len());
                assert_eq!(tree::count(&loaded), tree::count(&items));
            }
        }
    }

    #[test]
    fn test_storage_failures_do_not_panic() {
        let store = FavoritesStore::new(Arc::new(BrokenStore));
        assert!(store.load().is_empty());
        store.save(&[FavoriteItem::command("ls", "")]);
        assert!(store.try_save(&[]).is_err());
    }

    #[test]
    fn test_file_backed_store() {
        let dir = TempDir::new().unwrap();
        let items = vec![FavoriteItem::command("uptime", "Load")];
        FavoritesStore::new(Arc::new(FileStore::new(dir.path()))).save(&items);
        let reopened = FavoritesStore::new(Arc::new(FileStore::new(dir.path())));
        assert_eq!(reopened.load(), items);
    }

    #[test]
    fn test_export_import() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("favorites.json");
        let cmd = FavoriteItem::command("df -h", "Disk");
        let id = cmd.id().to_string();
        let items = set_output(&[cmd], &id, Some("Filesystem".into()), Some(Utc::now()));

        export_to(&path, &items).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("Filesystem"));
        assert_eq!(import_from(&path).unwrap(), strip_transient(&items));
        assert!(import_from(&dir.path().join("missing.json")).is_err());
    }
}
