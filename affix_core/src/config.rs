use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

const BUILTIN_AFFIXES: &str = include_str!("../content/affixes/affixes.toml");
const BUILTIN_POOLS: &str = include_str!("../content/affix_pools/pools.toml");
const BUILTIN_WEAPONS: &str = include_str!("../content/items/weapons.toml");
const BUILTIN_ARMOR: &str = include_str!("../content/items/armor.toml");
const BUILTIN_JEWELRY: &str = include_str!("../content/items/jewelry.toml");
const BUILTIN_SETTINGS: &str = include_str!("../content/settings.toml");

/// Raw item content loaded from TOML files, before any normalization
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub affixes: HashMap<String, AffixConfig>,
    pub affix_pools: Vec<AffixPoolConfig>,
    pub items: HashMap<String, ItemConfig>,
    pub settings: SettingsConfig,
}

impl Config {
    /// Load content from a directory containing subdirectories for each table
    /// Expected structure:
    ///   content/
    ///     affixes/       - .toml files containing [[affixes]] arrays
    ///     affix_pools/   - .toml files containing [[pools]] arrays
    ///     items/         - .toml files containing [[items]] arrays
    ///     settings.toml  - optional [generation] table
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        for path in Self::toml_files(&dir.join("affixes"))? {
            let content = Self::read_file_with_context(&path)?;
            config.add_affixes(&content, &path)?;
        }
        for path in Self::toml_files(&dir.join("affix_pools"))? {
            let content = Self::read_file_with_context(&path)?;
            config.add_pools(&content, &path)?;
        }
        for path in Self::toml_files(&dir.join("items"))? {
            let content = Self::read_file_with_context(&path)?;
            config.add_items(&content, &path)?;
        }

        let settings_path = dir.join("settings.toml");
        if settings_path.exists() {
            let content = Self::read_file_with_context(&settings_path)?;
            config.settings = Self::parse_toml_with_context(&content, &settings_path)?;
        }

        log::info!(
            "Loaded content from {}: {} affixes, {} pools, {} items",
            dir.display(),
            config.affixes.len(),
            config.affix_pools.len(),
            config.items.len()
        );
        Ok(config)
    }

    /// Content compiled into the crate
    pub fn builtin() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.add_affixes(BUILTIN_AFFIXES, Path::new("builtin/affixes/affixes.toml"))?;
        config.add_pools(BUILTIN_POOLS, Path::new("builtin/affix_pools/pools.toml"))?;
        config.add_items(BUILTIN_WEAPONS, Path::new("builtin/items/weapons.toml"))?;
        config.add_items(BUILTIN_ARMOR, Path::new("builtin/items/armor.toml"))?;
        config.add_items(BUILTIN_JEWELRY, Path::new("builtin/items/jewelry.toml"))?;
        config.settings = Self::parse_toml_with_context(BUILTIN_SETTINGS, Path::new("builtin/settings.toml"))?;
        Ok(config)
    }

    /// Parse a file of [[affixes]] entries into this config
    pub fn add_affixes(&mut self, content: &str, path: &Path) -> Result<(), ConfigError> {
        let wrapper: AffixesWrapper = Self::parse_toml_with_context(content, path)?;
        for affix in wrapper.affixes {
            if self.affixes.contains_key(&affix.id) {
                return Err(ConfigError::Duplicate {
                    kind: "affix",
                    id: affix.id,
                    path: path.to_path_buf(),
                });
            }
            self.affixes.insert(affix.id.clone(), affix);
        }
        Ok(())
    }

    /// Parse a file of [[pools]] entries into this config
    pub fn add_pools(&mut self, content: &str, path: &Path) -> Result<(), ConfigError> {
        let wrapper: AffixPoolsWrapper = Self::parse_toml_with_context(content, path)?;
        self.affix_pools.extend(wrapper.pools);
        Ok(())
    }

    /// Parse a file of [[items]] entries into this config
    pub fn add_items(&mut self, content: &str, path: &Path) -> Result<(), ConfigError> {
        let wrapper: ItemsWrapper = Self::parse_toml_with_context(content, path)?;
        for item in wrapper.items {
            if self.items.contains_key(&item.id) {
                return Err(ConfigError::Duplicate {
                    kind: "item",
                    id: item.id,
                    path: path.to_path_buf(),
                });
            }
            self.items.insert(item.id.clone(), item);
        }
        Ok(())
    }

    // Helper functions for error context

    /// Sorted .toml files in a directory; a missing directory has none
    fn toml_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::Io {
            error: e,
            path: Some(dir.to_path_buf()),
        })?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "toml") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_file_with_context(path: &Path) -> Result<String, ConfigError> {
        std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            error: e,
            path: Some(path.to_path_buf()),
        })
    }

    fn parse_toml_with_context<T: serde::de::DeserializeOwned>(
        content: &str,
        path: &Path,
    ) -> Result<T, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            error: e,
            path: path.to_path_buf(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error with optional file path
    #[error("IO error{}: {error}", fmt_path(.path))]
    Io {
        #[source]
        error: std::io::Error,
        path: Option<PathBuf>,
    },
    /// TOML parse error with file path and location details
    #[error("Parse error in '{}': {error}", .path.display())]
    Parse {
        #[source]
        error: toml::de::Error,
        path: PathBuf,
    },
    /// The same id was defined twice
    #[error("duplicate {kind} id '{id}' in '{}'", .path.display())]
    Duplicate {
        kind: &'static str,
        id: String,
        path: PathBuf,
    },
}

fn fmt_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" in '{}'", p.display()),
        None => String::new(),
    }
}

impl ConfigError {
    /// Get the file path associated with this error, if any
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            ConfigError::Io { path, .. } => path.as_deref(),
            ConfigError::Parse { path, .. } | ConfigError::Duplicate { path, .. } => Some(path),
        }
    }

    /// Get a user-friendly description of where the error occurred
    pub fn location_description(&self) -> String {
        match self {
            ConfigError::Parse { error, path } => {
                let mut desc = format!("File: {}", path.display());
                if let Some(span) = error.span() {
                    desc.push_str(&format!("\nPosition: bytes {}..{}", span.start, span.end));
                }
                desc
            }
            other => match other.file_path() {
                Some(p) => format!("File: {}", p.display()),
                None => "Unknown location".to_string(),
            },
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io {
            error: e,
            path: None,
        }
    }
}

// Wrapper types for TOML parsing

#[derive(Deserialize)]
struct AffixesWrapper {
    #[serde(default)]
    affixes: Vec<AffixConfig>,
}

#[derive(Deserialize)]
struct AffixPoolsWrapper {
    #[serde(default)]
    pools: Vec<AffixPoolConfig>,
}

#[derive(Deserialize)]
struct ItemsWrapper {
    #[serde(default)]
    items: Vec<ItemConfig>,
}

/// Tunables for item generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default)]
    pub generation: GenerationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Chance for an item with an implicit pool to roll an implicit
    #[serde(default = "default_implicit_chance")]
    pub implicit_chance: f64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            implicit_chance: default_implicit_chance(),
        }
    }
}

fn default_implicit_chance() -> f64 {
    0.65
}

/// Affix definition as authored: a handful of seed tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffixConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub category: AffixCategory,
    pub group: AffixGroup,
    pub stat: StatPath,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    /// Seed tiers, expanded to the full tier ladder at catalog build
    #[serde(default)]
    pub tiers: Vec<SeedTierConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedTierConfig {
    #[serde(default)]
    pub tier: Option<u32>,
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_required_ilvl")]
    pub required_ilvl: u32,
}

fn default_required_ilvl() -> u32 {
    1
}

/// Curated weighted pool for one category/group pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffixPoolConfig {
    pub category: AffixCategory,
    pub group: AffixGroup,
    #[serde(default)]
    pub entries: Vec<PoolEntryConfig>,
}

/// A pool entry is written either as a bare affix id or as a table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PoolEntryConfig {
    Id(String),
    Weighted {
        affix_id: String,
        #[serde(default)]
        weight: Option<f64>,
    },
}

/// Base item as authored, possibly using legacy flat stat fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_type: String,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub affix_category: Option<AffixCategory>,
    #[serde(default)]
    pub price: u32,
    #[serde(default)]
    pub drop_chance: f64,
    #[serde(default)]
    pub drop_sources: Vec<String>,
    /// Grid footprint as [width, height]
    #[serde(default)]
    pub size: Option<[u32; 2]>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub base_stats: Option<BaseStatsConfig>,
    #[serde(default)]
    pub prefix_slots: Option<f64>,
    #[serde(default)]
    pub suffix_slots: Option<f64>,
    #[serde(default)]
    pub implicit_pool: Option<Vec<PoolEntryConfig>>,
    #[serde(default)]
    pub prefix_pool: Option<Vec<PoolEntryConfig>>,
    #[serde(default)]
    pub suffix_pool: Option<Vec<PoolEntryConfig>>,

    // Legacy flat stat fields, only read when base_stats is absent
    #[serde(default)]
    pub damage: Option<BTreeMap<String, RollRange>>,
    #[serde(default)]
    pub defense: Option<DefenseConfig>,
    #[serde(default)]
    pub life: Option<f64>,
    #[serde(default)]
    pub mana: Option<f64>,
    #[serde(default)]
    pub crit_chance: Option<f64>,
    #[serde(default)]
    pub attack_speed: Option<f64>,
    #[serde(default)]
    pub block_chance: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RollRange {
    pub min: f64,
    pub max: f64,
}

/// Legacy defense: one number for all physical types, or per type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefenseConfig {
    Uniform(f64),
    PerType(BTreeMap<String, f64>),
}

/// Explicit base stats: a list of modifiers or a stat -> flat value table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BaseStatsConfig {
    List(Vec<BaseStatConfig>),
    Table(BTreeMap<StatPath, f64>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseStatConfig {
    pub stat: StatPath,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    pub value: f64,
}
