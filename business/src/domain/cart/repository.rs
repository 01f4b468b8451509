use crate::domain::errors::RepositoryError;

use super::model::CartLine;

/// Durable local storage for an ordered collection of cart-shaped lines.
///
/// Implementations write the whole collection on every save. `load` returns
/// `Ok(None)` when nothing was stored yet and `Err(RepositoryError::Corrupted)`
/// when stored data cannot be read back.
pub trait CartRepository: Send + Sync {
    fn load(&self) -> Result<Option<Vec<CartLine>>, RepositoryError>;
    fn save(&self, lines: &[CartLine]) -> Result<(), RepositoryError>;
}

/// Same contract as [`CartRepository`], under the wishlist key.
pub trait WishlistRepository: Send + Sync {
    fn load(&self) -> Result<Option<Vec<CartLine>>, RepositoryError>;
    fn save(&self, lines: &[CartLine]) -> Result<(), RepositoryError>;
}
