use std::sync::Arc;

use chrono::Utc;

use business::domain::cart::model::CartLine;
use business::domain::cart::repository::CartRepository;
use business::domain::errors::RepositoryError;

use super::entity::CartLineEntity;
use crate::storage::{KeyValueStorage, StorageError};

pub const CART_KEY: &str = "cart";

pub struct CartRepositoryLocal {
    storage: Arc<dyn KeyValueStorage>,
}

impl CartRepositoryLocal {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }
}

impl CartRepository for CartRepositoryLocal {
    fn load(&self) -> Result<Option<Vec<CartLine>>, RepositoryError> {
        load_lines(self.storage.as_ref(), CART_KEY)
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), RepositoryError> {
        save_lines(self.storage.as_ref(), CART_KEY, lines)
    }
}

/// Reads a JSON array of lines stored under `key`.
pub(crate) fn load_lines(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> Result<Option<Vec<CartLine>>, RepositoryError> {
    let Some(raw) = storage.read(key).map_err(storage_error)? else {
        return Ok(None);
    };

    let entities: Vec<CartLineEntity> = serde_json::from_str(&raw).map_err(|e| {
        tracing::warn!(key, error = %e, "stored lines are not readable");
        RepositoryError::corrupted()
    })?;

    let now = Utc::now();
    let stored = entities.len();
    let lines: Vec<CartLine> = entities
        .into_iter()
        .filter_map(|entity| entity.into_domain(now))
        .collect();
    if lines.len() < stored {
        tracing::warn!(key, skipped = stored - lines.len(), "dropped lines without identity");
    }

    Ok(Some(lines))
}

pub(crate) fn save_lines(
    storage: &dyn KeyValueStorage,
    key: &str,
    lines: &[CartLine],
) -> Result<(), RepositoryError> {
    let entities: Vec<CartLineEntity> = lines.iter().map(CartLineEntity::from_domain).collect();
    let raw = serde_json::to_string(&entities).map_err(|_| RepositoryError::persistence())?;
    storage.write(key, &raw).map_err(storage_error)
}

fn storage_error(error: StorageError) -> RepositoryError {
    tracing::error!(error = %error, "local storage failure");
    match error {
        StorageError::Io(_) => RepositoryError::storage_unavailable(),
        StorageError::InvalidKey(_) => RepositoryError::persistence(),
    }
}
