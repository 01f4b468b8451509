use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::application::cart::store::CartStore;
use crate::domain::cart::errors::CartError;
use crate::domain::cart::events::CartEvent;
use crate::domain::cart::model::{CartLine, product_signature};
use crate::domain::cart::repository::WishlistRepository;
use crate::domain::catalog::model::CartProduct;
use crate::domain::errors::RepositoryError;
use crate::domain::logger::Logger;
use crate::domain::shared::clock::Clock;

/// Saved-for-later products, persisted like the cart.
pub struct WishlistStore {
    repository: Arc<dyn WishlistRepository>,
    logger: Arc<dyn Logger>,
    clock: Arc<dyn Clock>,
    items: Mutex<Vec<CartLine>>,
    events: broadcast::Sender<CartEvent>,
}

impl WishlistStore {
    pub fn new(
        repository: Arc<dyn WishlistRepository>,
        logger: Arc<dyn Logger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let items = match repository.load() {
            Ok(items) => items.unwrap_or_default(),
            Err(RepositoryError::Corrupted) => {
                logger.warn("Stored wishlist could not be read, starting empty");
                Vec::new()
            }
            Err(e) => {
                logger.error(&format!("Failed to load wishlist: {}", e));
                Vec::new()
            }
        };
        let (events, _) = broadcast::channel(16);

        Self {
            repository,
            logger,
            clock,
            items: Mutex::new(items),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    pub fn items(&self) -> Vec<CartLine> {
        self.lock().clone()
    }

    pub fn contains(&self, product: &CartProduct) -> bool {
        product_signature(product)
            .is_some_and(|signature| self.lock().iter().any(|i| i.signature() == signature))
    }

    /// Adds a product once. Adding it again returns the existing entry.
    pub fn add(&self, product: &CartProduct) -> Result<CartLine, CartError> {
        let candidate = CartLine::new(product, 1, self.clock.now())?;
        let signature = candidate.signature();

        let mut items = self.lock();
        if let Some(existing) = items.iter().find(|i| i.signature() == signature) {
            return Ok(existing.clone());
        }

        let mut next = items.clone();
        next.push(candidate.clone());
        self.persist(&next)?;
        *items = next;
        drop(items);

        let _ = self.events.send(CartEvent::WishlistAdded {
            line_id: candidate.line_id,
            name: candidate.name.clone(),
        });
        Ok(candidate)
    }

    pub fn remove(&self, line_id: Uuid) -> Result<CartLine, CartError> {
        let mut items = self.lock();
        let position = items
            .iter()
            .position(|i| i.line_id == line_id)
            .ok_or(CartError::LineNotFound(line_id))?;

        let mut next = items.clone();
        let removed = next.remove(position);
        self.persist(&next)?;
        *items = next;
        drop(items);

        let _ = self.events.send(CartEvent::WishlistRemoved { line_id });
        Ok(removed)
    }

    /// Adds the saved product to the cart, then drops it from the wishlist.
    pub fn move_to_cart(&self, line_id: Uuid, cart: &CartStore) -> Result<CartLine, CartError> {
        let item = self
            .lock()
            .iter()
            .find(|i| i.line_id == line_id)
            .cloned()
            .ok_or(CartError::LineNotFound(line_id))?;

        let line = cart.add_item(&item.to_cart_product(), item.quantity.max(1))?;
        if let Err(e) = self.remove(line_id) {
            self.logger.warn(&format!(
                "'{}' moved to cart but is still on the wishlist: {}",
                item.name, e
            ));
        }
        Ok(line)
    }

    pub fn clear(&self) -> Result<(), CartError> {
        let mut items = self.lock();
        self.persist(&[])?;
        items.clear();
        Ok(())
    }

    fn persist(&self, items: &[CartLine]) -> Result<(), CartError> {
        self.repository.save(items).map_err(|e| {
            self.logger
                .error(&format!("Failed to persist wishlist: {}", e));
            CartError::from(e)
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CartLine>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::model::CartConfig;
    use crate::domain::cart::repository::CartRepository;
    use crate::domain::identity::model::{ProductRef, VariantSelection};
    use crate::domain::shared::clock::SystemClock;
    use mockall::mock;

    mock! {
        pub WishlistRepo {}

        impl WishlistRepository for WishlistRepo {
            fn load(&self) -> Result<Option<Vec<CartLine>>, RepositoryError>;
            fn save(&self, lines: &[CartLine]) -> Result<(), RepositoryError>;
        }
    }

    mock! {
        pub CartRepo {}

        impl CartRepository for CartRepo {
            fn load(&self) -> Result<Option<Vec<CartLine>>, RepositoryError>;
            fn save(&self, lines: &[CartLine]) -> Result<(), RepositoryError>;
        }
    }

    mock! {
        pub Log {}

        impl Logger for Log {
            fn info(&self, message: &str);
            fn warn(&self, message: &str);
            fn error(&self, message: &str);
            fn debug(&self, message: &str);
        }
    }

    fn mock_logger() -> Arc<dyn Logger> {
        let mut logger = MockLog::new();
        logger.expect_info().returning(|_| ());
        logger.expect_warn().returning(|_| ());
        logger.expect_error().returning(|_| ());
        logger.expect_debug().returning(|_| ());
        Arc::new(logger)
    }

    fn wishlist() -> WishlistStore {
        let mut repo = MockWishlistRepo::new();
        repo.expect_load().returning(|| Ok(None));
        repo.expect_save().returning(|_| Ok(()));
        WishlistStore::new(Arc::new(repo), mock_logger(), Arc::new(SystemClock))
    }

    fn cart() -> CartStore {
        let mut repo = MockCartRepo::new();
        repo.expect_load().returning(|| Ok(None));
        repo.expect_save().returning(|_| Ok(()));
        CartStore::new(
            Arc::new(repo),
            mock_logger(),
            Arc::new(SystemClock),
            CartConfig::default(),
        )
    }

    fn product(id: &str) -> CartProduct {
        CartProduct {
            ids: ProductRef::with_id(id),
            name: format!("Product {}", id),
            price: 450,
            ..CartProduct::default()
        }
    }

    #[test]
    fn should_not_duplicate_saved_products() {
        let store = wishlist();

        let first = store.add(&product("A1")).unwrap();
        let second = store.add(&product("A1")).unwrap();

        assert_eq!(first.line_id, second.line_id);
        assert_eq!(store.items().len(), 1);
        assert!(store.contains(&product("A1")));
        assert!(!store.contains(&product("B2")));
    }

    #[test]
    fn should_move_item_into_cart() {
        let store = wishlist();
        let cart = cart();
        let mut sized = product("A1");
        sized.ids.selected_variant = Some(VariantSelection {
            size: Some("1kg".to_string()),
            ..VariantSelection::default()
        });
        let saved = store.add(&sized).unwrap();

        let line = store.move_to_cart(saved.line_id, &cart).unwrap();

        assert!(store.items().is_empty());
        assert_eq!(line.signature(), saved.signature());
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn should_report_unknown_item() {
        let store = wishlist();
        let unknown = Uuid::new_v4();

        assert_eq!(store.remove(unknown), Err(CartError::LineNotFound(unknown)));
        assert_eq!(
            store.move_to_cart(unknown, &cart()),
            Err(CartError::LineNotFound(unknown))
        );
    }

    #[test]
    fn should_keep_items_when_save_fails() {
        let mut repo = MockWishlistRepo::new();
        repo.expect_load().returning(|| Ok(None));
        repo.expect_save()
            .returning(|_| Err(RepositoryError::Persistence));
        let store = WishlistStore::new(Arc::new(repo), mock_logger(), Arc::new(SystemClock));

        let result = store.add(&product("A1"));

        assert!(matches!(result, Err(CartError::Repository(_))));
        assert!(store.items().is_empty());
    }

    #[test]
    fn should_clear_all_items() {
        let store = wishlist();
        store.add(&product("A1")).unwrap();
        store.add(&product("B2")).unwrap();

        store.clear().unwrap();

        assert!(store.items().is_empty());
    }
}
