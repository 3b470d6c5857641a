use crate::generator::{roll_value, GenerateOptions, Generator};
use crate::instance::{AffixRollEntry, ItemInstanceRecord};
use crate::items::ItemTemplate;
use crate::types::*;
use rand::Rng;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CraftError {
    #[error("Unknown base item: {0}")]
    UnknownItem(String),
    #[error("No {0:?} slots available")]
    NoAffixSlots(AffixGroup),
    #[error("No valid {0:?} affixes to add")]
    NoValidAffixes(AffixGroup),
    #[error("No affixes to remove")]
    NoAffixesToRemove,
    #[error("No affixes to reroll")]
    NoAffixesToReroll,
}

fn template_for<'c>(generator: &Generator<'c>, record: &ItemInstanceRecord) -> Result<&'c ItemTemplate, CraftError> {
    generator
        .catalog()
        .items
        .item_def(&record.item_id)
        .ok_or_else(|| CraftError::UnknownItem(record.item_id.clone()))
}

/// Replace every affix with a fresh roll at the record's item level
pub fn reroll_affixes<R: Rng + ?Sized>(
    generator: &Generator<'_>,
    record: &mut ItemInstanceRecord,
    options: GenerateOptions,
    rng: &mut R,
) -> Result<(), CraftError> {
    let fresh = generator
        .generate_item(&record.item_id, record.item_level, options, rng)
        .ok_or_else(|| CraftError::UnknownItem(record.item_id.clone()))?;
    *record = fresh;
    Ok(())
}

/// Re-sample every roll inside its current tier. Affix and tier stay put;
/// rolls for affixes missing from the catalog are left alone.
pub fn reroll_values<R: Rng + ?Sized>(
    generator: &Generator<'_>,
    record: &mut ItemInstanceRecord,
    rng: &mut R,
) -> Result<(), CraftError> {
    if record.affix_count() == 0 {
        return Err(CraftError::NoAffixesToReroll);
    }
    let affixes = &generator.catalog().affixes;
    for group in [AffixGroup::Implicit, AffixGroup::Prefix, AffixGroup::Suffix] {
        for entry in record.group_mut(group).iter_mut() {
            let Some(tier) = affixes.affix_def(&entry.affix_id).and_then(|def| def.tier(entry.tier)) else {
                continue;
            };
            entry.roll = roll_value(tier.min, tier.max, rng);
        }
    }
    Ok(())
}

/// Roll one new affix into `group` if the item has a free slot there
pub fn add_affix<R: Rng + ?Sized>(
    generator: &Generator<'_>,
    record: &mut ItemInstanceRecord,
    group: AffixGroup,
    rng: &mut R,
) -> Result<AffixRollEntry, CraftError> {
    let template = template_for(generator, record)?;
    if record.group(group).len() >= template.slots(group) as usize {
        return Err(CraftError::NoAffixSlots(group));
    }

    let existing: Vec<String> = record.group(group).iter().map(|e| e.affix_id.clone()).collect();
    let roll = generator
        .pick_distinct(template.pool(group), group, 1, record.item_level, &existing, rng)
        .pop()
        .ok_or(CraftError::NoValidAffixes(group))?;
    record.group_mut(group).push(roll.clone());
    Ok(roll)
}

/// Remove one random prefix or suffix. Implicits are never removed.
pub fn remove_affix<R: Rng + ?Sized>(record: &mut ItemInstanceRecord, rng: &mut R) -> Result<AffixRollEntry, CraftError> {
    let total = record.prefixes.len() + record.suffixes.len();
    if total == 0 {
        return Err(CraftError::NoAffixesToRemove);
    }
    let idx = rng.gen_range(0..total);
    if idx < record.prefixes.len() {
        Ok(record.prefixes.remove(idx))
    } else {
        Ok(record.suffixes.remove(idx - record.prefixes.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_add_affix_respects_slots() {
        let catalog = Catalog::builtin().unwrap();
        let generator = Generator::new(&catalog);
        let mut rng = Generator::make_rng(5);
        let mut record = ItemInstanceRecord::blank("chain_shirt", 60);

        let first = add_affix(&generator, &mut record, AffixGroup::Prefix, &mut rng).unwrap();
        let second = add_affix(&generator, &mut record, AffixGroup::Prefix, &mut rng).unwrap();
        assert_ne!(first.affix_id, second.affix_id);
        assert_eq!(
            add_affix(&generator, &mut record, AffixGroup::Prefix, &mut rng),
            Err(CraftError::NoAffixSlots(AffixGroup::Prefix))
        );

        add_affix(&generator, &mut record, AffixGroup::Implicit, &mut rng).unwrap();
        assert_eq!(record.implicits[0].affix_id, "armor_implicit_block");
        assert_eq!(
            add_affix(&generator, &mut record, AffixGroup::Implicit, &mut rng),
            Err(CraftError::NoAffixSlots(AffixGroup::Implicit))
        );
    }

    #[test]
    fn test_add_affix_needs_eligible_affix() {
        let catalog = Catalog::builtin().unwrap();
        let generator = Generator::new(&catalog);
        let mut rng = Generator::make_rng(8);

        // Rare with free slots but no affix category to draw from
        let mut idol = ItemInstanceRecord::blank("idol_of_whispers", 60);
        assert_eq!(
            add_affix(&generator, &mut idol, AffixGroup::Suffix, &mut rng),
            Err(CraftError::NoValidAffixes(AffixGroup::Suffix))
        );
        assert_eq!(idol.affix_count(), 0);

        let mut record = ItemInstanceRecord::blank("chain_shirt", 1);
        let added = add_affix(&generator, &mut record, AffixGroup::Suffix, &mut rng).unwrap();
        assert_eq!(added.tier, 12);

        let mut shield = ItemInstanceRecord::blank("tower_shield", 60);
        assert_eq!(
            add_affix(&generator, &mut shield, AffixGroup::Suffix, &mut rng),
            Err(CraftError::NoAffixSlots(AffixGroup::Suffix))
        );
    }

    #[test]
    fn test_reroll_values_keeps_tiers() {
        let catalog = Catalog::builtin().unwrap();
        let generator = Generator::new(&catalog);
        let mut rng = Generator::make_rng(13);
        let mut record = ItemInstanceRecord::blank("chain_shirt", 60);
        assert_eq!(
            reroll_values(&generator, &mut record, &mut rng),
            Err(CraftError::NoAffixesToReroll)
        );

        add_affix(&generator, &mut record, AffixGroup::Prefix, &mut rng).unwrap();
        add_affix(&generator, &mut record, AffixGroup::Suffix, &mut rng).unwrap();
        let before = record.clone();

        for _ in 0..20 {
            reroll_values(&generator, &mut record, &mut rng).unwrap();
            for (old, new) in before.rolls().zip(record.rolls()) {
                assert_eq!(old.affix_id, new.affix_id);
                assert_eq!(old.tier, new.tier);
                let tier = catalog.affixes.affix_def(&new.affix_id).unwrap().tier(new.tier).unwrap();
                assert!(tier.contains(new.roll));
            }
        }
    }

    #[test]
    fn test_reroll_affixes_keeps_item_and_level() {
        let catalog = Catalog::builtin().unwrap();
        let generator = Generator::new(&catalog);
        let mut rng = Generator::make_rng(2);
        let mut record = ItemInstanceRecord::blank("axe_rare_1", 44);

        reroll_affixes(&generator, &mut record, GenerateOptions::default(), &mut rng).unwrap();
        assert_eq!(record.item_id, "axe_rare_1");
        assert_eq!(record.item_level, 44);

        let mut ghost = ItemInstanceRecord::blank("ghost", 4);
        assert_eq!(
            reroll_affixes(&generator, &mut ghost, GenerateOptions::default(), &mut rng),
            Err(CraftError::UnknownItem("ghost".to_string()))
        );
    }

    #[test]
    fn test_remove_affix() {
        let catalog = Catalog::builtin().unwrap();
        let generator = Generator::new(&catalog);
        let mut rng = Generator::make_rng(3);
        let mut record = ItemInstanceRecord::blank("chain_shirt", 60);
        assert_eq!(remove_affix(&mut record, &mut rng), Err(CraftError::NoAffixesToRemove));

        add_affix(&generator, &mut record, AffixGroup::Implicit, &mut rng).unwrap();
        add_affix(&generator, &mut record, AffixGroup::Prefix, &mut rng).unwrap();
        add_affix(&generator, &mut record, AffixGroup::Suffix, &mut rng).unwrap();

        remove_affix(&mut record, &mut rng).unwrap();
        remove_affix(&mut record, &mut rng).unwrap();
        assert_eq!(record.affix_count(), 1);
        assert_eq!(record.implicits.len(), 1);
        assert_eq!(remove_affix(&mut record, &mut rng), Err(CraftError::NoAffixesToRemove));
    }
}
