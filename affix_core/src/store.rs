use crate::generator::{GenerateOptions, Generator};
use crate::instance::ItemInstanceRecord;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Instance id -> rolled record, scoped to one game state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemInstanceStore {
    instances: BTreeMap<String, ItemInstanceRecord>,
}

impl ItemInstanceStore {
    pub fn new() -> Self {
        ItemInstanceStore::default()
    }

    pub fn get(&self, instance_id: &str) -> Option<&ItemInstanceRecord> {
        self.instances.get(instance_id)
    }

    pub fn get_mut(&mut self, instance_id: &str) -> Option<&mut ItemInstanceRecord> {
        self.instances.get_mut(instance_id)
    }

    /// Insert or replace, returning the previous record
    pub fn set(&mut self, instance_id: impl Into<String>, record: ItemInstanceRecord) -> Option<ItemInstanceRecord> {
        self.instances.insert(instance_id.into(), record)
    }

    pub fn remove(&mut self, instance_id: &str) -> Option<ItemInstanceRecord> {
        self.instances.remove(instance_id)
    }

    pub fn contains(&self, instance_id: &str) -> bool {
        self.instances.contains_key(instance_id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.instances.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ItemInstanceRecord)> {
        self.instances.iter()
    }

    /// Keep only the instances `keep` accepts, returning how many were removed
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &ItemInstanceRecord) -> bool) -> usize {
        let before = self.instances.len();
        self.instances.retain(|id, record| keep(id, record));
        before - self.instances.len()
    }

    /// Make sure `instance_id` holds a record for `base_item_id`.
    ///
    /// An existing record for the same base item is reused as-is, only
    /// backfilling an invalid item level, so a placed item is never
    /// re-rolled across save/load or re-render. Otherwise a new record is
    /// generated and stored. `None` if the base item is unknown.
    pub fn register_item_instance<R: Rng + ?Sized>(
        &mut self,
        instance_id: &str,
        base_item_id: &str,
        item_level: u32,
        generator: &Generator<'_>,
        options: GenerateOptions,
        rng: &mut R,
    ) -> Option<&ItemInstanceRecord> {
        let reuse = self
            .instances
            .get(instance_id)
            .is_some_and(|existing| existing.item_id == base_item_id);

        if reuse {
            let existing = self.instances.get_mut(instance_id)?;
            if !existing.has_valid_item_level() {
                existing.item_level = item_level.max(1);
            }
            return Some(&*existing);
        }

        let record = generator.generate_item(base_item_id, item_level, options, rng)?;
        if self.instances.contains_key(instance_id) {
            log::debug!(
                "Instance '{}' re-registered as '{}'; replacing stale record",
                instance_id,
                base_item_id
            );
        }
        self.instances.insert(instance_id.to_string(), record);
        self.instances.get(instance_id)
    }
}
