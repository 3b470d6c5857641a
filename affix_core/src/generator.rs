use crate::affixes::{AffixDefinition, AffixPoolEntry};
use crate::catalog::Catalog;
use crate::config::GenerationSettings;
use crate::instance::{AffixRollEntry, ItemInstanceRecord};
use crate::items::ItemTemplate;
use crate::tiers::round_to;
use crate::types::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Attempts allowed when filling a group with distinct affixes
pub const MAX_PICK_ATTEMPTS: u32 = 100;

/// Knobs for a single generation call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateOptions {
    /// Chance that an item with an implicit pool rolls an implicit
    pub implicit_chance: f64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            implicit_chance: GenerationSettings::default().implicit_chance,
        }
    }
}

/// Rolls affixes for base items. Every entry point takes the RNG explicitly.
pub struct Generator<'c> {
    catalog: &'c Catalog,
}

impl<'c> Generator<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Generator { catalog }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// Create a seeded RNG from a u64 seed
    pub fn make_rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    /// Options taken from the catalog's generation settings
    pub fn default_options(&self) -> GenerateOptions {
        GenerateOptions {
            implicit_chance: self.catalog.settings.implicit_chance,
        }
    }

    /// Roll a fresh instance record for a base item.
    ///
    /// Returns `None` for an unknown base item id.
    pub fn generate_item<R: Rng + ?Sized>(
        &self,
        base_item_id: &str,
        item_level: u32,
        options: GenerateOptions,
        rng: &mut R,
    ) -> Option<ItemInstanceRecord> {
        let Some(template) = self.catalog.items.item_def(base_item_id) else {
            log::debug!("Cannot generate unknown base item '{}'", base_item_id);
            return None;
        };
        let item_level = item_level.max(1);
        let mut record = ItemInstanceRecord::blank(&template.id, item_level);

        if let Some(implicit) = self.roll_implicit(template, item_level, options, rng) {
            record.implicits.push(implicit);
        }
        record.prefixes = self.roll_group(template, AffixGroup::Prefix, item_level, &[], rng);
        record.suffixes = self.roll_group(template, AffixGroup::Suffix, item_level, &[], rng);

        log::debug!(
            "Generated '{}' at ilvl {}: {} implicit, {} prefixes, {} suffixes",
            record.item_id,
            item_level,
            record.implicits.len(),
            record.prefixes.len(),
            record.suffixes.len()
        );
        Some(record)
    }

    /// At most one implicit, gated by the implicit chance
    pub fn roll_implicit<R: Rng + ?Sized>(
        &self,
        template: &ItemTemplate,
        item_level: u32,
        options: GenerateOptions,
        rng: &mut R,
    ) -> Option<AffixRollEntry> {
        if template.implicit_pool.is_empty() {
            return None;
        }
        if rng.gen::<f64>() >= options.implicit_chance {
            return None;
        }
        for _ in 0..MAX_PICK_ATTEMPTS {
            let entry = pick_weighted(&template.implicit_pool, rng)?;
            let Some(def) = self.catalog.affixes.affix_def(&entry.affix_id) else {
                continue;
            };
            if def.group != AffixGroup::Implicit {
                continue;
            }
            return self.roll_affix(def, item_level, rng);
        }
        log::debug!("No implicit-group affix in the implicit pool of '{}'", template.id);
        None
    }

    /// Roll between zero and the template's slot count of distinct affixes
    /// for a prefix or suffix group. `existing` ids are never picked again.
    pub fn roll_group<R: Rng + ?Sized>(
        &self,
        template: &ItemTemplate,
        group: AffixGroup,
        item_level: u32,
        existing: &[String],
        rng: &mut R,
    ) -> Vec<AffixRollEntry> {
        let slots = template.slots(group);
        let pool = template.pool(group);
        if slots == 0 || pool.is_empty() {
            return Vec::new();
        }
        let count = rng.gen_range(0..=slots) as usize;
        self.pick_distinct(pool, group, count, item_level, existing, rng)
    }

    /// Fill up to `count` distinct rolls from `pool`, giving up after
    /// [`MAX_PICK_ATTEMPTS`] draws
    pub fn pick_distinct<R: Rng + ?Sized>(
        &self,
        pool: &[AffixPoolEntry],
        group: AffixGroup,
        count: usize,
        item_level: u32,
        existing: &[String],
        rng: &mut R,
    ) -> Vec<AffixRollEntry> {
        // Never more distinct picks than pool entries
        let mut rolls: Vec<AffixRollEntry> = Vec::with_capacity(count.min(pool.len()));
        let mut attempts = 0;

        while rolls.len() < count && attempts < MAX_PICK_ATTEMPTS {
            attempts += 1;
            let Some(entry) = pick_weighted(pool, rng) else {
                break;
            };
            if existing.contains(&entry.affix_id) || rolls.iter().any(|r| r.affix_id == entry.affix_id) {
                continue;
            }
            let Some(def) = self.catalog.affixes.affix_def(&entry.affix_id) else {
                continue;
            };
            if def.group != group {
                continue;
            }
            if let Some(roll) = self.roll_affix(def, item_level, rng) {
                rolls.push(roll);
            }
        }

        if rolls.len() < count {
            log::debug!(
                "Filled {} of {} {:?} slots after {} attempts",
                rolls.len(),
                count,
                group,
                attempts
            );
        }
        rolls
    }

    /// Pick an eligible tier uniformly and roll a value inside it.
    ///
    /// `None` when the item level is below every tier of the affix.
    pub fn roll_affix<R: Rng + ?Sized>(
        &self,
        def: &AffixDefinition,
        item_level: u32,
        rng: &mut R,
    ) -> Option<AffixRollEntry> {
        let eligible = self.catalog.affixes.eligible_tiers(def, item_level);
        let tier = **eligible.choose(rng)?;
        Some(AffixRollEntry {
            affix_id: def.id.clone(),
            tier: tier.tier,
            roll: roll_value(tier.min, tier.max, rng),
        })
    }
}

/// Uniform value in [min, max], rounded to 4 decimals when max <= 1 and
/// 2 otherwise. Clamped so rounding never leaves the bounds.
pub fn roll_value<R: Rng + ?Sized>(min: f64, max: f64, rng: &mut R) -> f64 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    let raw = min + rng.gen::<f64>() * (max - min);
    let decimals = if max <= 1.0 { 4 } else { 2 };
    round_to(raw, decimals).clamp(min, max)
}

/// Cumulative-weight pick. A pool whose weights sum to nothing falls back
/// to its first entry; an empty pool yields `None`.
pub fn pick_weighted<'p, R: Rng + ?Sized>(pool: &'p [AffixPoolEntry], rng: &mut R) -> Option<&'p AffixPoolEntry> {
    let first = pool.first()?;
    let total: f64 = pool.iter().map(|e| e.weight).sum();
    if !(total > 0.0) {
        return Some(first);
    }

    let mut ticket = rng.gen::<f64>() * total;
    for entry in pool {
        ticket -= entry.weight;
        if ticket <= 0.0 {
            return Some(entry);
        }
    }
    pool.last()
}
