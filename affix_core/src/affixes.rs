use crate::config::{AffixConfig, AffixPoolConfig, PoolEntryConfig};
use crate::tiers::{expand_tiers, AffixTier};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A rollable modifier with its expanded tier ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffixDefinition {
    pub id: String,
    pub name: String,
    pub category: AffixCategory,
    pub group: AffixGroup,
    pub stat: StatPath,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Ascending by tier number, so strongest first
    pub tiers: Vec<AffixTier>,
}

impl AffixDefinition {
    pub fn from_config(config: &AffixConfig) -> Self {
        let tiers = expand_tiers(&config.tiers);
        if tiers.is_empty() {
            log::warn!("Affix '{}' has no usable seed tiers and can never roll", config.id);
        }
        AffixDefinition {
            id: config.id.clone(),
            name: if config.name.is_empty() {
                config.id.clone()
            } else {
                config.name.clone()
            },
            category: config.category,
            group: config.group,
            stat: config.stat,
            value_type: config.value_type,
            tiers,
        }
    }

    pub fn tier(&self, tier: u32) -> Option<&AffixTier> {
        self.tiers.iter().find(|t| t.tier == tier)
    }
}

/// One weighted entry of a pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffixPoolEntry {
    pub affix_id: String,
    pub weight: f64,
}

impl AffixPoolEntry {
    /// Normalize an authored entry. Bare ids weigh 1; invalid weights are rejected.
    pub fn from_config(entry: &PoolEntryConfig) -> Option<Self> {
        let (affix_id, weight) = match entry {
            PoolEntryConfig::Id(id) => (id, 1.0),
            PoolEntryConfig::Weighted { affix_id, weight } => (affix_id, weight.unwrap_or(1.0)),
        };
        if affix_id.is_empty() || !weight.is_finite() || weight <= 0.0 {
            return None;
        }
        Some(AffixPoolEntry {
            affix_id: affix_id.clone(),
            weight,
        })
    }
}

/// Registry of affix definitions and curated category/group pools.
/// Frozen once built.
#[derive(Debug, Clone, Default)]
pub struct AffixCatalog {
    defs: Vec<AffixDefinition>,
    index: HashMap<String, usize>,
    pools: BTreeMap<(AffixCategory, AffixGroup), Vec<AffixPoolEntry>>,
}

impl AffixCatalog {
    pub fn new(affixes: &HashMap<String, AffixConfig>, pools: &[AffixPoolConfig]) -> Self {
        let mut defs: Vec<AffixDefinition> = affixes.values().map(AffixDefinition::from_config).collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        let index = defs
            .iter()
            .enumerate()
            .map(|(i, def)| (def.id.clone(), i))
            .collect();

        let mut catalog = AffixCatalog {
            defs,
            index,
            pools: BTreeMap::new(),
        };

        for pool in pools {
            if pool.group == AffixGroup::Implicit {
                log::warn!(
                    "Ignoring {:?} implicit pool: implicits are only authored per item",
                    pool.category
                );
                continue;
            }
            let entries = catalog.normalize_pool(&pool.entries);
            catalog
                .pools
                .entry((pool.category, pool.group))
                .or_default()
                .extend(entries);
        }

        log::info!(
            "Built affix catalog: {} affixes, {} pools",
            catalog.defs.len(),
            catalog.pools.len()
        );
        catalog
    }

    /// Normalize authored pool entries, dropping bad weights and unknown ids
    pub fn normalize_pool(&self, entries: &[PoolEntryConfig]) -> Vec<AffixPoolEntry> {
        entries
            .iter()
            .filter_map(|entry| {
                let Some(normalized) = AffixPoolEntry::from_config(entry) else {
                    log::warn!("Dropping pool entry with invalid id or weight: {:?}", entry);
                    return None;
                };
                if !self.index.contains_key(&normalized.affix_id) {
                    log::warn!("Dropping pool entry for unknown affix '{}'", normalized.affix_id);
                    return None;
                }
                Some(normalized)
            })
            .collect()
    }

    pub fn all_affix_defs(&self) -> &[AffixDefinition] {
        &self.defs
    }

    pub fn affix_def(&self, id: &str) -> Option<&AffixDefinition> {
        self.index.get(id).map(|&i| &self.defs[i])
    }

    pub fn affix_defs_by_group(&self, group: AffixGroup) -> Vec<&AffixDefinition> {
        self.defs.iter().filter(|d| d.group == group).collect()
    }

    /// Every definition for a category/group, regardless of curation
    pub fn affix_defs_by_category_group(
        &self,
        category: AffixCategory,
        group: AffixGroup,
    ) -> Vec<&AffixDefinition> {
        self.defs
            .iter()
            .filter(|d| d.category == category && d.group == group)
            .collect()
    }

    /// The curated weighted pool for a category/group; empty if none was authored
    pub fn affix_pool(&self, category: AffixCategory, group: AffixGroup) -> &[AffixPoolEntry] {
        self.pools
            .get(&(category, group))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tiers of `def` an item of `item_level` may roll, ascending by tier number
    pub fn eligible_tiers<'a>(&self, def: &'a AffixDefinition, item_level: u32) -> Vec<&'a AffixTier> {
        let mut tiers: Vec<&AffixTier> = def
            .tiers
            .iter()
            .filter(|t| t.required_ilvl <= item_level)
            .collect();
        tiers.sort_by_key(|t| t.tier);
        tiers
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn catalog() -> AffixCatalog {
        let config = Config::builtin().unwrap();
        AffixCatalog::new(&config.affixes, &config.affix_pools)
    }

    #[test]
    fn test_lookup_by_id_and_group() {
        let catalog = catalog();
        let def = catalog.affix_def("weapon_slash_min").unwrap();
        assert_eq!(def.group, AffixGroup::Prefix);
        assert_eq!(def.tiers.len(), 12);
        assert!(catalog.affix_def("missing").is_none());

        assert!(catalog
            .affix_defs_by_group(AffixGroup::Implicit)
            .iter()
            .all(|d| d.group == AffixGroup::Implicit));
    }

    #[test]
    fn test_accessory_content_lands_in_jewelry() {
        let catalog = catalog();
        let defs = catalog.affix_defs_by_category_group(AffixCategory::Jewelry, AffixGroup::Prefix);
        assert!(defs.iter().any(|d| d.id == "jewelry_life"));
        let pool = catalog.affix_pool(AffixCategory::Jewelry, AffixGroup::Prefix);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].affix_id, "jewelry_life");
        assert_eq!(pool[0].weight, 2.0);
        assert_eq!(pool[1].weight, 1.0);
    }

    #[test]
    fn test_missing_pool_is_empty() {
        let catalog = catalog();
        assert!(catalog.affix_pool(AffixCategory::Jewelry, AffixGroup::Implicit).is_empty());
    }

    #[test]
    fn test_eligible_tiers_at_low_level() {
        let catalog = catalog();
        let def = catalog.affix_def("weapon_slash_min").unwrap();

        let at_4 = catalog.eligible_tiers(def, 4);
        assert_eq!(at_4.len(), 1);
        assert_eq!(at_4[0].tier, 12);

        let at_5 = catalog.eligible_tiers(def, 5);
        assert_eq!(at_5.iter().map(|t| t.tier).collect::<Vec<_>>(), vec![11, 12]);

        assert!(catalog.eligible_tiers(def, 0).is_empty());
        assert_eq!(catalog.eligible_tiers(def, 60).len(), 12);
    }

    #[test]
    fn test_eligibility_only_grows_with_level() {
        let catalog = catalog();
        for def in catalog.all_affix_defs() {
            for level in 2..=70 {
                let lower = catalog.eligible_tiers(def, level - 1);
                let higher = catalog.eligible_tiers(def, level);
                assert!(lower.iter().all(|t| higher.contains(t)));
            }
        }
    }

    #[test]
    fn test_pool_normalization_drops_bad_entries() {
        let catalog = catalog();
        let entries = vec![
            PoolEntryConfig::Id("weapon_slash_min".to_string()),
            PoolEntryConfig::Id("no_such_affix".to_string()),
            PoolEntryConfig::Weighted {
                affix_id: "weapon_slash_max".to_string(),
                weight: Some(0.0),
            },
            PoolEntryConfig::Weighted {
                affix_id: "weapon_fire_max".to_string(),
                weight: Some(f64::INFINITY),
            },
            PoolEntryConfig::Weighted {
                affix_id: "weapon_pierce_min".to_string(),
                weight: Some(2.5),
            },
        ];
        let pool = catalog.normalize_pool(&entries);
        assert_eq!(
            pool,
            vec![
                AffixPoolEntry {
                    affix_id: "weapon_slash_min".to_string(),
                    weight: 1.0
                },
                AffixPoolEntry {
                    affix_id: "weapon_pierce_min".to_string(),
                    weight: 2.5
                },
            ]
        );
    }

    #[test]
    fn test_category_implicit_pools_are_ignored() {
        let config = Config::builtin().unwrap();
        assert!(config.affix_pools.iter().all(|p| p.group != AffixGroup::Implicit));

        let pools = vec![AffixPoolConfig {
            category: AffixCategory::Weapon,
            group: AffixGroup::Implicit,
            entries: vec![PoolEntryConfig::Id("weapon_implicit_crit".to_string())],
        }];
        let catalog = AffixCatalog::new(&config.affixes, &pools);
        assert!(catalog.affix_pool(AffixCategory::Weapon, AffixGroup::Implicit).is_empty());
    }
}
