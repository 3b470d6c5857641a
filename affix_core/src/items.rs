use crate::affixes::{AffixCatalog, AffixPoolEntry};
use crate::config::{BaseStatsConfig, DefenseConfig, ItemConfig, PoolEntryConfig};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single stat contribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatModifier {
    pub stat: StatPath,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub value: f64,
}

impl StatModifier {
    pub fn flat(stat: StatPath, value: f64) -> Self {
        StatModifier {
            stat,
            value_type: ValueType::Flat,
            value,
        }
    }

    pub fn percent(stat: StatPath, value: f64) -> Self {
        StatModifier {
            stat,
            value_type: ValueType::Percent,
            value,
        }
    }
}

impl fmt::Display for StatModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.value < 0.0 { "" } else { "+" };
        match self.value_type {
            ValueType::Flat => write!(f, "{}{} {}", sign, self.value, self.stat.label()),
            ValueType::Percent => write!(
                f,
                "{}{}% {}",
                sign,
                crate::tiers::round_to(self.value * 100.0, 2),
                self.stat.label()
            ),
        }
    }
}

/// A base item after content migration. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTemplate {
    pub id: String,
    pub name: String,
    pub base_type: String,
    pub price: u32,
    pub drop_chance: f64,
    pub drop_sources: Vec<String>,
    pub rarity: Rarity,
    /// Resolved from the authored category or the base type
    pub affix_category: Option<AffixCategory>,
    pub size: [u32; 2],
    pub weight: f64,
    pub base_stats: Vec<StatModifier>,
    pub prefix_slots: u32,
    pub suffix_slots: u32,
    pub implicit_pool: Vec<AffixPoolEntry>,
    pub prefix_pool: Vec<AffixPoolEntry>,
    pub suffix_pool: Vec<AffixPoolEntry>,
}

impl ItemTemplate {
    /// Run the one-time content migration for an authored item
    pub fn from_config(config: &ItemConfig, affixes: &AffixCatalog) -> Self {
        let affix_category = config
            .affix_category
            .or_else(|| AffixCategory::from_base_type(&config.base_type));
        if affix_category.is_none() {
            log::debug!(
                "Item '{}' has no affix category (base type '{}'); pools must be explicit",
                config.id,
                config.base_type
            );
        }

        let size = config.size.unwrap_or([1, 1]);
        let weight = config
            .weight
            .filter(|w| w.is_finite() && *w >= 0.0)
            .unwrap_or_else(|| f64::from(size[0].max(1)) * f64::from(size[1].max(1)));

        let prefix_pool = Self::resolve_pool(
            config.prefix_pool.as_deref(),
            affix_category,
            AffixGroup::Prefix,
            affixes,
        );
        let suffix_pool = Self::resolve_pool(
            config.suffix_pool.as_deref(),
            affix_category,
            AffixGroup::Suffix,
            affixes,
        );
        // Implicits are part of a base's authored identity and never inherited
        let implicit_pool = config
            .implicit_pool
            .as_deref()
            .map(|entries| affixes.normalize_pool(entries))
            .unwrap_or_default();

        ItemTemplate {
            id: config.id.clone(),
            name: if config.name.is_empty() {
                config.id.clone()
            } else {
                config.name.clone()
            },
            base_type: config.base_type.clone(),
            price: config.price,
            drop_chance: if config.drop_chance.is_finite() {
                config.drop_chance.clamp(0.0, 1.0)
            } else {
                0.0
            },
            drop_sources: config.drop_sources.clone(),
            rarity: config.rarity,
            affix_category,
            size,
            weight,
            base_stats: normalize_base_stats(config),
            prefix_slots: normalize_slots(config.prefix_slots, config.rarity.default_prefix_slots()),
            suffix_slots: normalize_slots(config.suffix_slots, config.rarity.default_suffix_slots()),
            implicit_pool,
            prefix_pool,
            suffix_pool,
        }
    }

    fn resolve_pool(
        explicit: Option<&[PoolEntryConfig]>,
        category: Option<AffixCategory>,
        group: AffixGroup,
        affixes: &AffixCatalog,
    ) -> Vec<AffixPoolEntry> {
        match (explicit, category) {
            (Some(entries), _) => affixes.normalize_pool(entries),
            (None, Some(category)) => affixes.affix_pool(category, group).to_vec(),
            (None, None) => Vec::new(),
        }
    }

    pub fn pool(&self, group: AffixGroup) -> &[AffixPoolEntry] {
        match group {
            AffixGroup::Implicit => &self.implicit_pool,
            AffixGroup::Prefix => &self.prefix_pool,
            AffixGroup::Suffix => &self.suffix_pool,
        }
    }

    /// Slot count for a group; implicits always have one
    pub fn slots(&self, group: AffixGroup) -> u32 {
        match group {
            AffixGroup::Implicit => 1,
            AffixGroup::Prefix => self.prefix_slots,
            AffixGroup::Suffix => self.suffix_slots,
        }
    }
}

/// Explicit slot counts are floored and clamped at zero
fn normalize_slots(explicit: Option<f64>, default: u32) -> u32 {
    match explicit {
        Some(slots) if slots.is_finite() => slots.floor().max(0.0) as u32,
        _ => default,
    }
}

/// Explicit base stats win; otherwise legacy flat fields are converted
fn normalize_base_stats(config: &ItemConfig) -> Vec<StatModifier> {
    match &config.base_stats {
        Some(BaseStatsConfig::List(list)) => list
            .iter()
            .filter(|s| s.value.is_finite())
            .map(|s| StatModifier {
                stat: s.stat,
                value_type: s.value_type,
                value: s.value,
            })
            .collect(),
        Some(BaseStatsConfig::Table(table)) => table
            .iter()
            .filter(|(_, value)| value.is_finite())
            .map(|(stat, value)| StatModifier::flat(*stat, *value))
            .collect(),
        None => legacy_base_stats(config),
    }
}

fn legacy_base_stats(config: &ItemConfig) -> Vec<StatModifier> {
    let mut stats = Vec::new();

    if let Some(ref damage) = config.damage {
        for (key, range) in damage {
            let Ok(kind) = key.parse::<DamageType>() else {
                log::warn!("Item '{}' has unknown damage type '{}'", config.id, key);
                continue;
            };
            let (min, max) = if range.min <= range.max {
                (range.min, range.max)
            } else {
                (range.max, range.min)
            };
            stats.push(StatModifier::flat(StatPath::Damage(kind, Bound::Min), min));
            stats.push(StatModifier::flat(StatPath::Damage(kind, Bound::Max), max));
        }
    }

    match &config.defense {
        Some(DefenseConfig::Uniform(value)) => {
            for kind in DamageType::PHYSICAL {
                stats.push(StatModifier::flat(StatPath::Armor(kind), *value));
            }
        }
        Some(DefenseConfig::PerType(table)) => {
            for (key, value) in table {
                match key.parse::<DamageType>() {
                    Ok(kind) => stats.push(StatModifier::flat(StatPath::Armor(kind), *value)),
                    Err(_) => log::warn!("Item '{}' has unknown defense type '{}'", config.id, key),
                }
            }
        }
        None => {}
    }

    let scalars = [
        (config.life, StatPath::Life, ValueType::Flat),
        (config.mana, StatPath::Mana, ValueType::Flat),
        (config.attack_speed, StatPath::AttackSpeed, ValueType::Flat),
        (config.crit_chance, StatPath::CritChance, ValueType::Percent),
        (config.block_chance, StatPath::BlockChance, ValueType::Percent),
    ];
    for (value, stat, value_type) in scalars {
        if let Some(value) = value {
            stats.push(StatModifier {
                stat,
                value_type,
                value,
            });
        }
    }

    stats.retain(|s| s.value.is_finite());
    stats
}

/// Registry of migrated base items. Frozen once built.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: HashMap<String, ItemTemplate>,
}

impl ItemCatalog {
    pub fn new(items: &HashMap<String, ItemConfig>, affixes: &AffixCatalog) -> Self {
        let items: HashMap<String, ItemTemplate> = items
            .values()
            .map(|config| (config.id.clone(), ItemTemplate::from_config(config, affixes)))
            .collect();
        log::info!("Built item catalog: {} items", items.len());
        ItemCatalog { items }
    }

    pub fn item_def(&self, id: &str) -> Option<&ItemTemplate> {
        self.items.get(id)
    }

    /// All templates, sorted by id
    pub fn all_item_defs(&self) -> Vec<&ItemTemplate> {
        let mut all: Vec<&ItemTemplate> = self.items.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
