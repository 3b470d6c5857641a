use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Item rarity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Common,
    Magic,
    Rare,
    Unique,
    Legendary,
}

impl Rarity {
    /// Prefix slots an item of this rarity gets when its template doesn't say
    pub fn default_prefix_slots(&self) -> u32 {
        match self {
            Rarity::Common => 0,
            Rarity::Magic => 1,
            Rarity::Rare => 2,
            Rarity::Unique => 2,
            Rarity::Legendary => 3,
        }
    }

    pub fn default_suffix_slots(&self) -> u32 {
        match self {
            Rarity::Common => 0,
            Rarity::Magic => 1,
            Rarity::Rare => 2,
            Rarity::Unique => 2,
            Rarity::Legendary => 3,
        }
    }
}

/// Which family of items an affix (or pool) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffixCategory {
    Weapon,
    Armor,
    #[serde(alias = "accessory")]
    Jewelry,
}

impl AffixCategory {
    /// Infer the category from an item's base type name
    pub fn from_base_type(base_type: &str) -> Option<Self> {
        match base_type.to_ascii_lowercase().as_str() {
            "sword" | "axe" | "mace" | "dagger" | "spear" | "bow" | "staff" | "wand" | "weapon" => {
                Some(AffixCategory::Weapon)
            }
            "helmet" | "chest" | "body" | "gloves" | "boots" | "shield" | "armor" | "armour" => {
                Some(AffixCategory::Armor)
            }
            "ring" | "amulet" | "belt" | "jewelry" | "accessory" => Some(AffixCategory::Jewelry),
            _ => None,
        }
    }
}

impl FromStr for AffixCategory {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weapon" => Ok(AffixCategory::Weapon),
            "armor" => Ok(AffixCategory::Armor),
            "jewelry" | "accessory" => Ok(AffixCategory::Jewelry),
            _ => Err(ParseKeyError::new("affix category", s)),
        }
    }
}

/// Affix group: implicit, prefix or suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffixGroup {
    Implicit,
    Prefix,
    Suffix,
}

/// How a modifier's value combines downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    Flat,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Slash,
    Pierce,
    Blunt,
    Fire,
    Cold,
    Lightning,
}

impl DamageType {
    pub const PHYSICAL: [DamageType; 3] = [DamageType::Slash, DamageType::Pierce, DamageType::Blunt];

    fn key(&self) -> &'static str {
        match self {
            DamageType::Slash => "slash",
            DamageType::Pierce => "pierce",
            DamageType::Blunt => "blunt",
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Lightning => "lightning",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "slash" => Some(DamageType::Slash),
            "pierce" => Some(DamageType::Pierce),
            "blunt" => Some(DamageType::Blunt),
            "fire" => Some(DamageType::Fire),
            "cold" => Some(DamageType::Cold),
            "lightning" => Some(DamageType::Lightning),
            _ => None,
        }
    }
}

impl FromStr for DamageType {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DamageType::from_key(s).ok_or_else(|| ParseKeyError::new("damage type", s))
    }
}

/// Lower or upper end of a damage range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bound {
    Min,
    Max,
}

/// Address of a derived stat a modifier applies to.
///
/// Written in content and save files as a dotted path such as
/// `damage.slash.min`, `armor.pierce` or `critChance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatPath {
    Damage(DamageType, Bound),
    Armor(DamageType),
    CritChance,
    CritMultiplier,
    AttackSpeed,
    Life,
    LifeRegen,
    Mana,
    ManaRegen,
    Accuracy,
    BlockChance,
    MoveSpeed,
    LifeSteal,
}

/// Single-segment stat paths
const SCALAR_STATS: &[(&str, StatPath)] = &[
    ("critChance", StatPath::CritChance),
    ("critMultiplier", StatPath::CritMultiplier),
    ("attackSpeed", StatPath::AttackSpeed),
    ("life", StatPath::Life),
    ("lifeRegen", StatPath::LifeRegen),
    ("mana", StatPath::Mana),
    ("manaRegen", StatPath::ManaRegen),
    ("accuracy", StatPath::Accuracy),
    ("blockChance", StatPath::BlockChance),
    ("moveSpeed", StatPath::MoveSpeed),
    ("lifeSteal", StatPath::LifeSteal),
];

impl StatPath {
    /// Human-readable stat name for tooltips
    pub fn label(&self) -> String {
        match self {
            StatPath::Damage(kind, Bound::Min) => format!("Minimum {} Damage", title(kind.key())),
            StatPath::Damage(kind, Bound::Max) => format!("Maximum {} Damage", title(kind.key())),
            StatPath::Armor(kind) => format!("{} Armor", title(kind.key())),
            StatPath::CritChance => "Critical Chance".to_string(),
            StatPath::CritMultiplier => "Critical Multiplier".to_string(),
            StatPath::AttackSpeed => "Attack Speed".to_string(),
            StatPath::Life => "Life".to_string(),
            StatPath::LifeRegen => "Life Regeneration".to_string(),
            StatPath::Mana => "Mana".to_string(),
            StatPath::ManaRegen => "Mana Regeneration".to_string(),
            StatPath::Accuracy => "Accuracy".to_string(),
            StatPath::BlockChance => "Block Chance".to_string(),
            StatPath::MoveSpeed => "Movement Speed".to_string(),
            StatPath::LifeSteal => "Life Steal".to_string(),
        }
    }
}

fn title(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

impl fmt::Display for StatPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatPath::Damage(kind, Bound::Min) => write!(f, "damage.{}.min", kind.key()),
            StatPath::Damage(kind, Bound::Max) => write!(f, "damage.{}.max", kind.key()),
            StatPath::Armor(kind) => write!(f, "armor.{}", kind.key()),
            scalar => {
                let key = SCALAR_STATS
                    .iter()
                    .find(|(_, stat)| stat == scalar)
                    .map(|(key, _)| *key)
                    .unwrap_or("unknown");
                f.write_str(key)
            }
        }
    }
}

impl FromStr for StatPath {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.split('.').collect();
        let parsed = match segments.as_slice() {
            ["damage", kind, "min"] => DamageType::from_key(kind).map(|k| StatPath::Damage(k, Bound::Min)),
            ["damage", kind, "max"] => DamageType::from_key(kind).map(|k| StatPath::Damage(k, Bound::Max)),
            ["armor", kind] => DamageType::from_key(kind).map(StatPath::Armor),
            [key] => SCALAR_STATS
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, stat)| *stat),
            _ => None,
        };
        parsed.ok_or_else(|| ParseKeyError::new("stat path", s))
    }
}

impl TryFrom<String> for StatPath {
    type Error = ParseKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StatPath> for String {
    fn from(stat: StatPath) -> Self {
        stat.to_string()
    }
}

/// Unrecognized key in authored content
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseKeyError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseKeyError {
    fn new(kind: &'static str, value: &str) -> Self {
        ParseKeyError {
            kind,
            value: value.to_string(),
        }
    }
}
