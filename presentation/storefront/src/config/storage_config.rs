use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use persistence::storage::{JsonFileStorage, KeyValueStorage, MemoryStorage};

use super::env::{EnvSource, string_or};

pub const DEFAULT_STORAGE_DIR: &str = ".storefront";

/// Local storage backing the cart and wishlist.
///
/// Environment variables:
/// - STOREFRONT_STORAGE_DIR: directory for JSON documents, or `memory` to
///   keep everything in process (default: ".storefront")
#[derive(Debug, Clone, PartialEq)]
pub enum StorageConfig {
    Memory,
    Directory(PathBuf),
}

impl StorageConfig {
    pub fn from_source(env: &dyn EnvSource) -> Self {
        let value = string_or(env, "STOREFRONT_STORAGE_DIR", DEFAULT_STORAGE_DIR);
        if value.eq_ignore_ascii_case("memory") {
            StorageConfig::Memory
        } else {
            StorageConfig::Directory(PathBuf::from(value))
        }
    }

    pub fn open(&self) -> anyhow::Result<Arc<dyn KeyValueStorage>> {
        match self {
            StorageConfig::Memory => Ok(Arc::new(MemoryStorage::new())),
            StorageConfig::Directory(dir) => {
                let storage = JsonFileStorage::new(dir)
                    .with_context(|| format!("cannot open storage directory {}", dir.display()))?;
                Ok(Arc::new(storage))
            }
        }
    }
}
