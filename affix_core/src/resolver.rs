use crate::catalog::Catalog;
use crate::instance::{AffixRollEntry, ItemInstanceRecord};
use crate::items::{ItemTemplate, StatModifier};
use crate::state::GridCell;
use crate::store::ItemInstanceStore;
use crate::types::*;
use std::collections::BTreeMap;

/// Where a resolved modifier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierSource {
    Base,
    Implicit,
    Prefix,
    Suffix,
}

impl From<AffixGroup> for ModifierSource {
    fn from(group: AffixGroup) -> Self {
        match group {
            AffixGroup::Implicit => ModifierSource::Implicit,
            AffixGroup::Prefix => ModifierSource::Prefix,
            AffixGroup::Suffix => ModifierSource::Suffix,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModifier {
    pub source: ModifierSource,
    pub modifier: StatModifier,
    /// Affix name and tier for rolled modifiers
    pub affix: Option<(String, u32)>,
}

/// A base item merged with its rolled instance
#[derive(Debug, Clone)]
pub struct RuntimeItem<'a> {
    pub template: &'a ItemTemplate,
    pub instance: Option<&'a ItemInstanceRecord>,
    pub item_level: u32,
    /// Base stats, then implicit, prefixes, suffixes
    pub modifiers: Vec<ResolvedModifier>,
}

impl<'a> RuntimeItem<'a> {
    pub fn stat_modifiers(&self) -> impl Iterator<Item = &StatModifier> {
        self.modifiers.iter().map(|m| &m.modifier)
    }

    /// Sum of every modifier per stat and value type
    pub fn stat_totals(&self) -> BTreeMap<(StatPath, ValueType), f64> {
        let mut totals = BTreeMap::new();
        for m in self.stat_modifiers() {
            *totals.entry((m.stat, m.value_type)).or_insert(0.0) += m.value;
        }
        totals
    }

    pub fn total(&self, stat: StatPath, value_type: ValueType) -> f64 {
        self.stat_modifiers()
            .filter(|m| m.stat == stat && m.value_type == value_type)
            .map(|m| m.value)
            .sum()
    }

    /// Format item as markdown for display
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## {}\n", self.template.name));
        md.push_str(&format!(
            "**{}** ({:?}, item level {})\n\n",
            self.template.base_type, self.template.rarity, self.item_level
        ));

        let modifiers = &self.modifiers;
        let section = move |source: ModifierSource| modifiers.iter().filter(move |m| m.source == source);

        if section(ModifierSource::Base).next().is_some() {
            md.push_str("### Base\n");
            for m in section(ModifierSource::Base) {
                md.push_str(&format!("- {}\n", m.modifier));
            }
            md.push('\n');
        }

        if let Some(imp) = section(ModifierSource::Implicit).next() {
            md.push_str("### Implicit\n");
            md.push_str(&format!("- {}\n\n", describe(imp)));
        }

        if section(ModifierSource::Prefix)
            .chain(section(ModifierSource::Suffix))
            .next()
            .is_some()
        {
            md.push_str("### Modifiers\n");
            for prefix in section(ModifierSource::Prefix) {
                md.push_str(&format!("- {} (P)\n", describe(prefix)));
            }
            for suffix in section(ModifierSource::Suffix) {
                md.push_str(&format!("- {} (S)\n", describe(suffix)));
            }
            md.push('\n');
        }

        md.push_str(&format!("*Price: {}*\n", self.template.price));
        md
    }
}

fn describe(m: &ResolvedModifier) -> String {
    match m.affix {
        Some((ref name, tier)) => format!("{} [{} T{}]", m.modifier, name, tier),
        None => m.modifier.to_string(),
    }
}

/// Resolve the item placed in a grid cell. `None` if the base item is unknown.
pub fn resolve_runtime_item_from_cell<'a>(
    catalog: &'a Catalog,
    store: &'a ItemInstanceStore,
    cell: &GridCell,
) -> Option<RuntimeItem<'a>> {
    let mut item = get_runtime_item_definition(catalog, store, &cell.item_id, cell.instance_id.as_deref())?;
    if item.instance.is_none() {
        if let Some(level) = cell.item_level.filter(|l| *l >= 1) {
            item.item_level = level;
        }
    }
    Some(item)
}

/// Merge a base item with the instance stored under `instance_id`.
///
/// A missing instance, or one rolled for a different base item, resolves
/// to the bare base item. Rolls for affixes no longer in the catalog are
/// skipped.
pub fn get_runtime_item_definition<'a>(
    catalog: &'a Catalog,
    store: &'a ItemInstanceStore,
    item_id: &str,
    instance_id: Option<&str>,
) -> Option<RuntimeItem<'a>> {
    let template = catalog.items.item_def(item_id)?;

    let instance = instance_id.and_then(|id| store.get(id)).filter(|record| {
        let matches = record.item_id == template.id;
        if !matches {
            log::warn!(
                "Instance for '{}' belongs to '{}'; ignoring it",
                template.id,
                record.item_id
            );
        }
        matches
    });

    let mut modifiers: Vec<ResolvedModifier> = template
        .base_stats
        .iter()
        .map(|modifier| ResolvedModifier {
            source: ModifierSource::Base,
            modifier: *modifier,
            affix: None,
        })
        .collect();

    if let Some(record) = instance {
        for group in [AffixGroup::Implicit, AffixGroup::Prefix, AffixGroup::Suffix] {
            modifiers.extend(
                record
                    .group(group)
                    .iter()
                    .filter_map(|roll| roll_to_modifier(catalog, roll, group.into())),
            );
        }
    }

    Some(RuntimeItem {
        template,
        instance,
        item_level: instance.map_or(1, |record| record.item_level.max(1)),
        modifiers,
    })
}

fn roll_to_modifier(catalog: &Catalog, roll: &AffixRollEntry, source: ModifierSource) -> Option<ResolvedModifier> {
    let Some(def) = catalog.affixes.affix_def(&roll.affix_id) else {
        log::debug!("Skipping roll for unknown affix '{}'", roll.affix_id);
        return None;
    };
    Some(ResolvedModifier {
        source,
        modifier: StatModifier {
            stat: def.stat,
            value_type: def.value_type,
            value: roll.roll,
        },
        affix: Some((def.name.clone(), roll.tier)),
    })
}
