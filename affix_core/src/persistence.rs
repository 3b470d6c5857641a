use crate::catalog::Catalog;
use crate::instance::sanitize_item_instance_record;
use crate::state::{CharacterState, GameState, GridCell, GridContainer};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Extra cell fields that survive a save. Everything else is UI state or
/// static template data.
pub const PERSISTED_CELL_FIELDS: &[&str] = &["quantity", "locked"];

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("IO error at {}: {error}", .path.display())]
    Io {
        #[source]
        error: std::io::Error,
        path: PathBuf,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid save data: {0}")]
    InvalidData(String),
}

/// Deep-copied JSON snapshot of `state` ready to be written out. Instances
/// no cell references are pruned and cell fields outside
/// [`PERSISTED_CELL_FIELDS`] are stripped.
pub fn sanitize_save_data_for_persistence(state: &GameState) -> Result<Value, SaveError> {
    let mut snapshot = state.clone();
    snapshot.prune_unreferenced_instances();
    for container in snapshot.containers.values_mut() {
        for cell in container.cells.values_mut() {
            cell.extra
                .retain(|key, _| PERSISTED_CELL_FIELDS.contains(&key.as_str()));
        }
    }
    Ok(serde_json::to_value(&snapshot)?)
}

/// Rebuild a trustworthy [`GameState`] from an untrusted JSON blob.
///
/// Malformed characters, containers, cells and instance records are
/// dropped one by one, then the integrity pass rebuilds whatever placed
/// items lost their record.
pub fn sanitize_loaded_save_data(raw: &Value, catalog: &Catalog) -> GameState {
    let mut state = GameState::new();
    let Some(root) = raw.as_object() else {
        log::warn!("Save data is not an object; starting from an empty state");
        return state;
    };

    if let Some(characters) = root.get("characters").and_then(Value::as_object) {
        for (id, value) in characters {
            state.characters.insert(id.clone(), sanitize_character(value));
        }
    }

    if let Some(containers) = root.get("containers").and_then(Value::as_object) {
        for (key, value) in containers {
            match sanitize_container(value) {
                Some(container) => {
                    state.containers.insert(key.clone(), container);
                }
                None => log::warn!("Dropping malformed container '{}'", key),
            }
        }
    }

    if let Some(instances) = root.get("itemInstances").and_then(Value::as_object) {
        for (id, value) in instances {
            match sanitize_item_instance_record(value, &catalog.affixes) {
                Some(record) => {
                    state.item_instances.set(id.clone(), record);
                }
                None => log::warn!("Dropping malformed item instance '{}'", id),
            }
        }
    }

    state.ensure_item_instance_integrity(&catalog.affixes);
    state.prune_unreferenced_instances();
    state
}

pub fn save_to_file(state: &GameState, path: &Path) -> Result<(), SaveError> {
    let snapshot = sanitize_save_data_for_persistence(state)?;
    let json = serde_json::to_string_pretty(&snapshot)?;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|error| SaveError::Io {
            error,
            path: dir.to_path_buf(),
        })?;
    }
    fs::write(path, json).map_err(|error| SaveError::Io {
        error,
        path: path.to_path_buf(),
    })?;
    log::info!("Saved game state to {}", path.display());
    Ok(())
}

/// Read and sanitize a save. Only unreadable files and invalid JSON fail;
/// bad content inside valid JSON is repaired.
pub fn load_from_file(path: &Path, catalog: &Catalog) -> Result<GameState, SaveError> {
    let data = fs::read_to_string(path).map_err(|error| SaveError::Io {
        error,
        path: path.to_path_buf(),
    })?;
    let raw: Value = serde_json::from_str(&data)?;
    if !raw.is_object() {
        return Err(SaveError::InvalidData(format!(
            "{} does not hold a game state object",
            path.display()
        )));
    }
    Ok(sanitize_loaded_save_data(&raw, catalog))
}

fn sanitize_character(raw: &Value) -> CharacterState {
    let level = raw
        .get("level")
        .and_then(positive_level)
        .unwrap_or(1);
    CharacterState { level }
}

fn sanitize_container(raw: &Value) -> Option<GridContainer> {
    let obj = raw.as_object()?;
    let owner = obj
        .get("owner")
        .and_then(Value::as_str)
        .filter(|owner| !owner.is_empty())
        .map(str::to_string);

    let mut container = GridContainer {
        owner,
        cells: Default::default(),
    };
    if let Some(cells) = obj.get("cells").and_then(Value::as_object) {
        for (slot, value) in cells {
            match sanitize_cell(value) {
                Some(cell) => {
                    container.cells.insert(slot.clone(), cell);
                }
                None => log::debug!("Dropping malformed cell '{}'", slot),
            }
        }
    }
    Some(container)
}

fn sanitize_cell(raw: &Value) -> Option<GridCell> {
    let obj = raw.as_object()?;
    let item_id = obj.get("itemId")?.as_str()?.trim();
    if item_id.is_empty() {
        return None;
    }

    let extra: Map<String, Value> = PERSISTED_CELL_FIELDS
        .iter()
        .filter_map(|key| obj.get(*key).map(|value| (key.to_string(), value.clone())))
        .collect();

    Some(GridCell {
        item_id: item_id.to_string(),
        instance_id: obj
            .get("instanceId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        root: obj.get("root").and_then(Value::as_bool).unwrap_or(true),
        item_level: obj.get("itemLevel").and_then(positive_level),
        rotated: obj.get("rotated").and_then(Value::as_bool).unwrap_or(false),
        extra,
    })
}

fn positive_level(raw: &Value) -> Option<u32> {
    let level = raw.as_f64().filter(|l| l.is_finite())?;
    Some(level.floor().clamp(1.0, f64::from(u32::MAX)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GenerateOptions, Generator};
    use serde_json::json;

    fn populated(catalog: &Catalog) -> GameState {
        let generator = Generator::new(catalog);
        let mut rng = Generator::make_rng(99);
        let mut state = GameState::new();
        state.characters.insert("hero".to_string(), CharacterState { level: 30 });

        let mut bank = GridContainer::default();
        let mut cell = GridCell::new("chain_shirt", "a");
        cell.extra.insert("quantity".to_string(), json!(1));
        cell.extra.insert("hovered".to_string(), json!(true));
        cell.extra.insert("price".to_string(), json!(999));
        bank.cells.insert("0,0".to_string(), cell);
        bank.cells.insert("0,1".to_string(), GridCell::covering("chain_shirt", "a"));
        state.containers.insert("bank".to_string(), bank);

        state
            .item_instances
            .register_item_instance("a", "chain_shirt", 30, &generator, GenerateOptions::default(), &mut rng);
        state
            .item_instances
            .register_item_instance("sold", "sword_new_2", 30, &generator, GenerateOptions::default(), &mut rng);
        state
    }

    #[test]
    fn test_snapshot_strips_and_prunes() {
        let catalog = Catalog::builtin().unwrap();
        let state = populated(&catalog);
        let snapshot = sanitize_save_data_for_persistence(&state).unwrap();

        let cell = &snapshot["containers"]["bank"]["cells"]["0,0"];
        assert_eq!(cell["itemId"], "chain_shirt");
        assert_eq!(cell["quantity"], 1);
        assert!(cell.get("hovered").is_none());
        assert!(cell.get("price").is_none());

        let instances = snapshot["itemInstances"].as_object().unwrap();
        assert_eq!(instances.len(), 1);
        assert!(instances.contains_key("a"));
        assert!(instances["a"].get("name").is_none());

        // The live state is untouched
        assert!(state.item_instances.contains("sold"));
    }

    #[test]
    fn test_save_load_keeps_rolls() {
        let catalog = Catalog::builtin().unwrap();
        let state = populated(&catalog);
        let snapshot = sanitize_save_data_for_persistence(&state).unwrap();
        let loaded = sanitize_loaded_save_data(&snapshot, &catalog);

        assert_eq!(loaded.item_instances.get("a"), state.item_instances.get("a"));
        assert_eq!(loaded.characters["hero"].level, 30);
        assert_eq!(loaded.cell("bank", "0,1").map(|c| c.root), Some(false));
        assert_eq!(sanitize_save_data_for_persistence(&loaded).unwrap(), snapshot);
    }

    #[test]
    fn test_load_repairs_bad_content() {
        let catalog = Catalog::builtin().unwrap();
        let raw = json!({
            "characters": { "hero": { "level": 14.9 }, "ghost": "x" },
            "containers": {
                "loadout_1": {
                    "owner": "hero",
                    "cells": {
                        "0,0": { "itemId": "sword_new_1", "instanceId": "s1" },
                        "1,0": { "itemId": "" },
                        "2,0": 17,
                        "3,0": { "itemId": "copper_ring", "instanceId": "r1", "itemLevel": 3, "name": "Copper Ring" }
                    }
                },
                "broken": []
            },
            "itemInstances": {
                "s1": { "itemId": "sword_new_1", "itemLevel": "NaN" },
                "r1": { "itemId": "copper_ring", "itemLevel": 8 },
                "orphan": { "itemId": "copper_ring", "itemLevel": 8 }
            }
        });

        let state = sanitize_loaded_save_data(&raw, &catalog);
        assert_eq!(state.characters["hero"].level, 14);
        assert_eq!(state.characters["ghost"].level, 1);
        assert!(!state.containers.contains_key("broken"));

        let cells = &state.containers["loadout_1"].cells;
        assert_eq!(cells.len(), 2);
        assert!(cells["3,0"].extra.is_empty());

        // Unreadable record rebuilt at the owner's level
        assert_eq!(state.item_instances.get("s1").unwrap().item_level, 14);
        // Valid record kept over the cell's own level
        assert_eq!(state.item_instances.get("r1").unwrap().item_level, 8);
        assert!(!state.item_instances.contains("orphan"));
    }

    #[test]
    fn test_non_object_save_gives_empty_state() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(sanitize_loaded_save_data(&json!([1, 2]), &catalog), GameState::new());
    }

    #[test]
    fn test_file_round_trip() {
        let catalog = Catalog::builtin().unwrap();
        let state = populated(&catalog);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saves").join("slot1.json");

        save_to_file(&state, &path).unwrap();
        let loaded = load_from_file(&path, &catalog).unwrap();
        assert_eq!(loaded.item_instances.get("a"), state.item_instances.get("a"));
        assert!(!loaded.item_instances.contains("sold"));

        let missing = load_from_file(&path.with_file_name("missing.json"), &catalog);
        assert!(matches!(missing, Err(SaveError::Io { .. })));
    }
}
