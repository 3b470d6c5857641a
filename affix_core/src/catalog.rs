use crate::affixes::AffixCatalog;
use crate::config::{Config, ConfigError, GenerationSettings};
use crate::items::ItemCatalog;
use std::path::Path;

/// Affix and item registries, built once at startup and passed by reference
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub affixes: AffixCatalog,
    pub items: ItemCatalog,
    pub settings: GenerationSettings,
}

impl Catalog {
    pub fn from_config(config: &Config) -> Self {
        let affixes = AffixCatalog::new(&config.affixes, &config.affix_pools);
        let items = ItemCatalog::new(&config.items, &affixes);
        Catalog {
            affixes,
            items,
            settings: config.settings.generation.clone(),
        }
    }

    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        Ok(Self::from_config(&Config::load_from_dir(dir)?))
    }

    /// Catalog over the content compiled into the crate
    pub fn builtin() -> Result<Self, ConfigError> {
        Ok(Self::from_config(&Config::builtin()?))
    }
}
