use crate::affixes::AffixCatalog;
use crate::instance::{sanitize_record, ItemInstanceRecord};
use crate::store::ItemInstanceStore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// One occupied slot in a grid container. A multi-cell item has one root
/// cell and any number of non-root cells pointing at the same instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Whether this cell anchors the item (multi-cell items have one root)
    #[serde(default = "default_root")]
    pub root: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_level: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rotated: bool,
    /// Anything else the UI attached to the cell
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_root() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl GridCell {
    pub fn new(item_id: &str, instance_id: &str) -> Self {
        GridCell {
            item_id: item_id.to_string(),
            instance_id: Some(instance_id.to_string()),
            root: true,
            item_level: None,
            rotated: false,
            extra: Map::new(),
        }
    }

    /// A non-root cell covering part of a larger item
    pub fn covering(item_id: &str, instance_id: &str) -> Self {
        GridCell {
            root: false,
            ..GridCell::new(item_id, instance_id)
        }
    }
}

/// A grid-like container (bank tab, loadout page, ...) keyed by slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridContainer {
    /// Character whose level placed items inherit when they have none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub cells: BTreeMap<String, GridCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterState {
    #[serde(default = "default_level")]
    pub level: u32,
}

fn default_level() -> u32 {
    1
}

/// Everything this core persists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(default)]
    pub characters: BTreeMap<String, CharacterState>,
    #[serde(default)]
    pub containers: BTreeMap<String, GridContainer>,
    #[serde(default)]
    pub item_instances: ItemInstanceStore,
}

/// What an integrity pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Root cells that received a blank record
    pub synthesized: usize,
    /// Stored records dropped because they failed sanitization
    pub discarded: usize,
}

impl GameState {
    pub fn new() -> Self {
        GameState::default()
    }

    pub fn cell(&self, container: &str, slot: &str) -> Option<&GridCell> {
        self.containers.get(container)?.cells.get(slot)
    }

    /// Remove a cell, dropping its instance once no other cell references it
    pub fn remove_cell(&mut self, container: &str, slot: &str) -> Option<GridCell> {
        let cell = self.containers.get_mut(container)?.cells.remove(slot)?;
        if let Some(ref instance_id) = cell.instance_id {
            if !self.referenced_instance_ids().contains(instance_id.as_str()) {
                self.item_instances.remove(instance_id);
            }
        }
        Some(cell)
    }

    /// Every instance id referenced by any placed cell
    pub fn referenced_instance_ids(&self) -> BTreeSet<&str> {
        self.containers
            .values()
            .flat_map(|c| c.cells.values())
            .filter_map(|cell| cell.instance_id.as_deref())
            .collect()
    }

    /// Item level for a cell that has no record: the cell's own level, then
    /// the owning character's, then 1
    pub fn infer_item_level(&self, container: &GridContainer, cell: &GridCell) -> u32 {
        cell.item_level
            .filter(|level| *level >= 1)
            .or_else(|| {
                let owner = container.owner.as_ref()?;
                self.characters.get(owner).map(|c| c.level).filter(|level| *level >= 1)
            })
            .unwrap_or(1)
    }

    /// Reconcile the instance store with every placed root cell.
    ///
    /// Stored records that no longer sanitize are dropped. Root cells
    /// without a valid record for their item get a blank one at the
    /// inferred item level, assigning an instance id when the cell has none.
    pub fn ensure_item_instance_integrity(&mut self, affixes: &AffixCatalog) -> IntegrityReport {
        let mut report = IntegrityReport::default();

        let stored: Vec<String> = self.item_instances.ids().cloned().collect();
        for id in stored {
            let sanitized = self
                .item_instances
                .get(&id)
                .and_then(|record| sanitize_record(record, affixes));
            match sanitized {
                Some(record) => {
                    self.item_instances.set(id, record);
                }
                None => {
                    log::warn!("Discarding unreadable instance record '{}'", id);
                    self.item_instances.remove(&id);
                    report.discarded += 1;
                }
            }
        }

        let mut missing: Vec<(String, String, u32)> = Vec::new();
        for (container_key, container) in &self.containers {
            for (slot, cell) in &container.cells {
                if !cell.root {
                    continue;
                }
                let valid = cell
                    .instance_id
                    .as_deref()
                    .and_then(|id| self.item_instances.get(id))
                    .is_some_and(|record| record.item_id == cell.item_id);
                if !valid {
                    missing.push((container_key.clone(), slot.clone(), self.infer_item_level(container, cell)));
                }
            }
        }

        for (container_key, slot, item_level) in missing {
            let Some(cell) = self
                .containers
                .get(&container_key)
                .and_then(|c| c.cells.get(&slot))
            else {
                continue;
            };
            let item_id = cell.item_id.clone();
            let instance_id = match &cell.instance_id {
                Some(id) => id.clone(),
                None => self.allocate_instance_id(&container_key, &slot),
            };

            self.item_instances
                .set(instance_id.clone(), ItemInstanceRecord::blank(&item_id, item_level));
            if let Some(cell) = self
                .containers
                .get_mut(&container_key)
                .and_then(|c| c.cells.get_mut(&slot))
            {
                cell.instance_id = Some(instance_id);
            }
            report.synthesized += 1;
        }

        if report != IntegrityReport::default() {
            log::info!(
                "Instance integrity: {} synthesized, {} discarded",
                report.synthesized,
                report.discarded
            );
        }
        report
    }

    /// Drop store entries no placed cell references. Returns how many went.
    pub fn prune_unreferenced_instances(&mut self) -> usize {
        let referenced: BTreeSet<String> = self
            .referenced_instance_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        let pruned = self.item_instances.retain(|id, _| referenced.contains(id));
        if pruned > 0 {
            log::debug!("Pruned {} unreferenced item instances", pruned);
        }
        pruned
    }

    fn allocate_instance_id(&self, container: &str, slot: &str) -> String {
        let base = format!("{}:{}", container, slot);
        let referenced = self.referenced_instance_ids();
        let taken = |id: &str| self.item_instances.contains(id) || referenced.contains(id);
        if !taken(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{}#{}", base, n))
            .find(|id| !taken(id))
            .unwrap_or(base)
    }
}
