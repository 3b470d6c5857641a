use crate::affixes::AffixCatalog;
use crate::types::AffixGroup;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One rolled modifier on an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffixRollEntry {
    pub affix_id: String,
    pub tier: u32,
    pub roll: f64,
}

/// Rolled data for one placed item. Only ids and numbers; the definitions
/// they point at live in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInstanceRecord {
    pub item_id: String,
    pub item_level: u32,
    #[serde(default)]
    pub implicits: Vec<AffixRollEntry>,
    #[serde(default)]
    pub prefixes: Vec<AffixRollEntry>,
    #[serde(default)]
    pub suffixes: Vec<AffixRollEntry>,
}

impl ItemInstanceRecord {
    /// A record with no affixes
    pub fn blank(item_id: &str, item_level: u32) -> Self {
        ItemInstanceRecord {
            item_id: item_id.to_string(),
            item_level: item_level.max(1),
            implicits: Vec::new(),
            prefixes: Vec::new(),
            suffixes: Vec::new(),
        }
    }

    pub fn group(&self, group: AffixGroup) -> &[AffixRollEntry] {
        match group {
            AffixGroup::Implicit => &self.implicits,
            AffixGroup::Prefix => &self.prefixes,
            AffixGroup::Suffix => &self.suffixes,
        }
    }

    pub fn group_mut(&mut self, group: AffixGroup) -> &mut Vec<AffixRollEntry> {
        match group {
            AffixGroup::Implicit => &mut self.implicits,
            AffixGroup::Prefix => &mut self.prefixes,
            AffixGroup::Suffix => &mut self.suffixes,
        }
    }

    /// Count total affixes
    pub fn affix_count(&self) -> usize {
        self.implicits.len() + self.prefixes.len() + self.suffixes.len()
    }

    /// Implicits, prefixes, then suffixes
    pub fn rolls(&self) -> impl Iterator<Item = &AffixRollEntry> {
        self.implicits
            .iter()
            .chain(self.prefixes.iter())
            .chain(self.suffixes.iter())
    }

    pub fn has_valid_item_level(&self) -> bool {
        self.item_level >= 1
    }
}

/// Validate an untrusted record. Anything loaded from outside goes through
/// here before it is trusted.
///
/// Returns `None` when the record itself is unusable (not an object, no
/// item id, non-finite item level). Malformed roll entries are dropped, as
/// are duplicates within a group and implicits past the first. Rolls for
/// known affixes are reconciled against their stored tier.
pub fn sanitize_item_instance_record(raw: &Value, affixes: &AffixCatalog) -> Option<ItemInstanceRecord> {
    let obj = raw.as_object()?;

    let item_id = obj.get("itemId")?.as_str()?.trim();
    if item_id.is_empty() {
        return None;
    }

    let item_level = obj.get("itemLevel")?.as_f64().filter(|l| l.is_finite())?;
    let item_level = item_level.floor().clamp(1.0, f64::from(u32::MAX)) as u32;

    let mut implicits = sanitize_roll_list(obj.get("implicits"), affixes);
    implicits.truncate(1);

    Some(ItemInstanceRecord {
        item_id: item_id.to_string(),
        item_level,
        implicits,
        prefixes: sanitize_roll_list(obj.get("prefixes"), affixes),
        suffixes: sanitize_roll_list(obj.get("suffixes"), affixes),
    })
}

/// Sanitize an in-memory record by the same rules as a loaded one
pub fn sanitize_record(record: &ItemInstanceRecord, affixes: &AffixCatalog) -> Option<ItemInstanceRecord> {
    let raw = serde_json::to_value(record).ok()?;
    sanitize_item_instance_record(&raw, affixes)
}

fn sanitize_roll_list(raw: Option<&Value>, affixes: &AffixCatalog) -> Vec<AffixRollEntry> {
    let Some(list) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut entries: Vec<AffixRollEntry> = Vec::with_capacity(list.len());
    for value in list {
        let Some(entry) = sanitize_roll_entry(value, affixes) else {
            log::debug!("Dropping malformed roll entry: {}", value);
            continue;
        };
        if entries.iter().any(|e| e.affix_id == entry.affix_id) {
            log::debug!("Dropping duplicate roll for affix '{}'", entry.affix_id);
            continue;
        }
        entries.push(entry);
    }
    entries
}

fn sanitize_roll_entry(raw: &Value, affixes: &AffixCatalog) -> Option<AffixRollEntry> {
    let obj = raw.as_object()?;
    let affix_id = obj.get("affixId")?.as_str()?.trim();
    if affix_id.is_empty() {
        return None;
    }
    let tier = obj.get("tier")?.as_f64().filter(|t| t.is_finite() && *t >= 1.0)?;
    let roll = obj.get("roll")?.as_f64().filter(|r| r.is_finite())?;

    let mut entry = AffixRollEntry {
        affix_id: affix_id.to_string(),
        tier: tier.floor().min(f64::from(u32::MAX)) as u32,
        roll,
    };
    reconcile_roll(&mut entry, affixes);
    Some(entry)
}

/// Make a roll agree with its stored tier.
///
/// If the roll sits outside the stored tier, the strongest tier containing
/// it is adopted; failing that the roll is clamped into the stored tier.
/// Unknown affixes are left alone so removed content doesn't erase saves.
fn reconcile_roll(entry: &mut AffixRollEntry, affixes: &AffixCatalog) {
    let Some(def) = affixes.affix_def(&entry.affix_id) else {
        return;
    };
    if def.tier(entry.tier).is_some_and(|t| t.contains(entry.roll)) {
        return;
    }

    if let Some(matching) = def.tiers.iter().find(|t| t.contains(entry.roll)) {
        log::debug!(
            "Roll {} of '{}' moved from tier {} to tier {}",
            entry.roll,
            entry.affix_id,
            entry.tier,
            matching.tier
        );
        entry.tier = matching.tier;
    } else if let Some(stored) = def.tier(entry.tier) {
        entry.roll = entry.roll.clamp(stored.min, stored.max);
    } else if let Some(nearest) = def.tiers.iter().min_by(|a, b| {
        distance(a, entry.roll).total_cmp(&distance(b, entry.roll))
    }) {
        entry.tier = nearest.tier;
        entry.roll = entry.roll.clamp(nearest.min, nearest.max);
    }
}

fn distance(tier: &crate::tiers::AffixTier, roll: f64) -> f64 {
    if roll < tier.min {
        tier.min - roll
    } else if roll > tier.max {
        roll - tier.max
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use serde_json::json;

    fn affixes() -> AffixCatalog {
        Catalog::builtin().unwrap().affixes
    }

    #[test]
    fn test_valid_record_survives() {
        let affixes = affixes();
        let tier12 = affixes.affix_def("weapon_slash_min").unwrap().tier(12).copied().unwrap();
        let raw = json!({
            "itemId": "sword_new_2",
            "itemLevel": 7,
            "implicits": [],
            "prefixes": [{ "affixId": "weapon_slash_min", "tier": 12, "roll": tier12.min }],
            "suffixes": [],
            "name": "static fields are ignored"
        });
        let record = sanitize_item_instance_record(&raw, &affixes).unwrap();
        assert_eq!(record.item_id, "sword_new_2");
        assert_eq!(record.item_level, 7);
        assert_eq!(record.prefixes.len(), 1);
        assert_eq!(record.prefixes[0].tier, 12);
    }

    #[test]
    fn test_unusable_records_are_rejected() {
        let affixes = affixes();
        assert!(sanitize_item_instance_record(&json!(null), &affixes).is_none());
        assert!(sanitize_item_instance_record(&json!("sword"), &affixes).is_none());
        assert!(sanitize_item_instance_record(&json!({ "itemLevel": 3 }), &affixes).is_none());
        assert!(sanitize_item_instance_record(&json!({ "itemId": "", "itemLevel": 3 }), &affixes).is_none());
        assert!(sanitize_item_instance_record(&json!({ "itemId": "a" }), &affixes).is_none());
        assert!(sanitize_item_instance_record(&json!({ "itemId": "a", "itemLevel": "x" }), &affixes).is_none());
    }

    #[test]
    fn test_item_level_is_floored_and_clamped() {
        let affixes = affixes();
        let record = sanitize_item_instance_record(&json!({ "itemId": "a", "itemLevel": 4.8 }), &affixes).unwrap();
        assert_eq!(record.item_level, 4);
        let record = sanitize_item_instance_record(&json!({ "itemId": "a", "itemLevel": -2 }), &affixes).unwrap();
        assert_eq!(record.item_level, 1);
        assert!(record.prefixes.is_empty());
    }

    #[test]
    fn test_malformed_entries_are_dropped() {
        let affixes = affixes();
        let raw = json!({
            "itemId": "a",
            "itemLevel": 10,
            "implicits": [
                { "affixId": "weapon_implicit_crit", "tier": 12, "roll": 0.015 },
                { "affixId": "weapon_implicit_accuracy", "tier": 12, "roll": 6 }
            ],
            "prefixes": [
                42,
                { "affixId": "", "tier": 1, "roll": 1 },
                { "affixId": "weapon_slash_min", "tier": 0, "roll": 1 },
                { "affixId": "weapon_slash_min", "tier": 12 },
                { "affixId": "removed_affix", "tier": 3, "roll": 9.5 },
                { "affixId": "removed_affix", "tier": 4, "roll": 8 }
            ],
            "suffixes": "nope"
        });
        let record = sanitize_item_instance_record(&raw, &affixes).unwrap();
        assert_eq!(record.implicits.len(), 1);
        assert_eq!(record.implicits[0].affix_id, "weapon_implicit_crit");
        assert_eq!(
            record.prefixes,
            vec![AffixRollEntry {
                affix_id: "removed_affix".to_string(),
                tier: 3,
                roll: 9.5
            }]
        );
        assert!(record.suffixes.is_empty());
    }

    #[test]
    fn test_roll_outside_stored_tier_is_reconciled() {
        let affixes = affixes();
        let def = affixes.affix_def("weapon_slash_min").unwrap();
        let best = def.tier(1).copied().unwrap();

        // Roll belongs to tier 1 but claims tier 12
        let raw = json!({
            "itemId": "a",
            "itemLevel": 60,
            "prefixes": [{ "affixId": "weapon_slash_min", "tier": 12, "roll": best.max }]
        });
        let record = sanitize_item_instance_record(&raw, &affixes).unwrap();
        assert_eq!(record.prefixes[0].tier, 1);

        // Roll above every tier is clamped into the stored one
        let raw = json!({
            "itemId": "a",
            "itemLevel": 60,
            "prefixes": [{ "affixId": "weapon_slash_min", "tier": 5, "roll": 1000.0 }]
        });
        let record = sanitize_item_instance_record(&raw, &affixes).unwrap();
        let tier5 = def.tier(5).unwrap();
        assert_eq!(record.prefixes[0].roll, tier5.max);

        // Unknown tier number snaps to the nearest tier
        let raw = json!({
            "itemId": "a",
            "itemLevel": 60,
            "prefixes": [{ "affixId": "weapon_slash_min", "tier": 40, "roll": -5.0 }]
        });
        let record = sanitize_item_instance_record(&raw, &affixes).unwrap();
        let entry = &record.prefixes[0];
        assert!(def.tier(entry.tier).unwrap().contains(entry.roll));
    }

    #[test]
    fn test_sanitization_is_idempotent() {
        let affixes = affixes();
        let inputs = [
            json!({ "itemId": "a", "itemLevel": 3.3, "prefixes": [{ "affixId": "weapon_slash_min", "tier": 40, "roll": 99 }] }),
            json!({ "itemId": " b ", "itemLevel": 60, "implicits": [
                { "affixId": "x", "tier": 2.7, "roll": 1 },
                { "affixId": "y", "tier": 1, "roll": 1 }
            ] }),
            json!({ "itemId": "c", "itemLevel": 1, "suffixes": [{ "affixId": "weapon_attack_speed", "tier": 12, "roll": 0.5 }] }),
        ];
        for raw in inputs {
            let once = sanitize_item_instance_record(&raw, &affixes).unwrap();
            let twice = sanitize_record(&once, &affixes).unwrap();
            assert_eq!(once, twice);
        }
    }
}
