pub mod affixes;
pub mod catalog;
pub mod config;
pub mod crafting;
pub mod generator;
pub mod instance;
pub mod items;
pub mod persistence;
pub mod resolver;
pub mod rng;
pub mod state;
pub mod store;
pub mod tiers;
pub mod types;

pub use catalog::Catalog;
pub use config::Config;
pub use generator::{GenerateOptions, Generator};
pub use instance::{sanitize_item_instance_record, AffixRollEntry, ItemInstanceRecord};
pub use resolver::{get_runtime_item_definition, resolve_runtime_item_from_cell, RuntimeItem};
pub use state::GameState;
pub use store::ItemInstanceStore;
pub use types::*;
