use std::sync::Arc;

use business::domain::cart::model::CartLine;
use business::domain::cart::repository::WishlistRepository;
use business::domain::errors::RepositoryError;

use crate::cart::repository::{load_lines, save_lines};
use crate::storage::KeyValueStorage;

pub const WISHLIST_KEY: &str = "wishlist";

pub struct WishlistRepositoryLocal {
    storage: Arc<dyn KeyValueStorage>,
}

impl WishlistRepositoryLocal {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }
}

impl WishlistRepository for WishlistRepositoryLocal {
    fn load(&self) -> Result<Option<Vec<CartLine>>, RepositoryError> {
        load_lines(self.storage.as_ref(), WISHLIST_KEY)
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), RepositoryError> {
        save_lines(self.storage.as_ref(), WISHLIST_KEY, lines)
    }
}
