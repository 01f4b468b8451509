use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::cart::errors::CartError;
use crate::domain::cart::events::{CartEvent, UnavailableLine};
use crate::domain::cart::model::{CartConfig, CartLine, CartTotals, product_signature};
use crate::domain::cart::repository::CartRepository;
use crate::domain::catalog::index::LineRefresh;
use crate::domain::catalog::model::CartProduct;
use crate::domain::errors::RepositoryError;
use crate::domain::identity::normalizer::line_signature;
use crate::domain::logger::Logger;
use crate::domain::shared::clock::Clock;

const EVENT_CAPACITY: usize = 64;

/// Result of a quantity change. `capped` is set when the requested quantity
/// exceeded the line's stock limit.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantityUpdate {
    pub line: CartLine,
    pub capped: bool,
}

/// What a catalog refresh changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshOutcome {
    pub refreshed: usize,
    pub now_unavailable: Vec<UnavailableLine>,
}

/// Authoritative, persisted cart.
///
/// Every mutation builds the next line set from the current snapshot, writes
/// it in full and only then swaps it in. A failed write leaves the in-memory
/// cart untouched. The lock is never held across an `.await`.
pub struct CartStore {
    repository: Arc<dyn CartRepository>,
    logger: Arc<dyn Logger>,
    clock: Arc<dyn Clock>,
    config: CartConfig,
    lines: Mutex<Vec<CartLine>>,
    events: broadcast::Sender<CartEvent>,
}

impl CartStore {
    /// Hydrates from storage. Missing data yields an empty cart, unreadable
    /// data an empty cart plus a warning.
    pub fn new(
        repository: Arc<dyn CartRepository>,
        logger: Arc<dyn Logger>,
        clock: Arc<dyn Clock>,
        config: CartConfig,
    ) -> Self {
        let lines = match repository.load() {
            Ok(Some(lines)) => {
                logger.info(&format!("Cart restored with {} line(s)", lines.len()));
                lines
            }
            Ok(None) => Vec::new(),
            Err(RepositoryError::Corrupted) => {
                logger.warn("Stored cart could not be read, starting with an empty cart");
                Vec::new()
            }
            Err(e) => {
                logger.error(&format!("Failed to load cart: {}", e));
                Vec::new()
            }
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            repository,
            logger,
            clock,
            config,
            lines: Mutex::new(lines),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    pub fn lines(&self) -> Vec<CartLine> {
        self.lock().clone()
    }

    pub fn line(&self, line_id: Uuid) -> Option<CartLine> {
        self.lock().iter().find(|l| l.line_id == line_id).cloned()
    }

    /// The line a product would merge into, if any.
    pub fn find_by_product(&self, product: &CartProduct) -> Option<CartLine> {
        let signature = product_signature(product)?;
        self.lock()
            .iter()
            .find(|l| l.signature() == signature)
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals::compute(&self.lock(), self.config.shipping_fee)
    }

    /// Adds a product, merging into the line with the same signature.
    /// Quantities are capped at the line's stock limit.
    pub fn add_item(&self, product: &CartProduct, quantity: u32) -> Result<CartLine, CartError> {
        let now = self.clock.now();
        let candidate = match CartLine::new(product, quantity, now) {
            Ok(line) => line,
            Err(e) => {
                self.logger
                    .warn(&format!("Rejected add to cart for '{}': {}", product.name, e));
                self.reject(&e);
                return Err(e);
            }
        };

        self.commit(move |lines| {
            let mut events = Vec::new();
            let signature = candidate.signature();

            let line = match lines.iter_mut().find(|l| l.signature() == signature) {
                Some(existing) => {
                    let limit = existing.stock_limit.max(1);
                    let wanted = existing.quantity.saturating_add(quantity);
                    existing.quantity = wanted.min(limit);
                    existing.updated_at = now;
                    events.push(CartEvent::QuantityMerged {
                        line_id: existing.line_id,
                        name: existing.name.clone(),
                        quantity: existing.quantity,
                    });
                    if wanted > limit {
                        events.push(limited_stock(existing));
                    }
                    existing.clone()
                }
                None => {
                    let mut line = candidate;
                    let limit = line.stock_limit.max(1);
                    let capped = line.quantity > limit;
                    line.quantity = line.quantity.min(limit);
                    events.push(CartEvent::ItemAdded {
                        line_id: line.line_id,
                        name: line.name.clone(),
                        quantity: line.quantity,
                    });
                    if capped {
                        events.push(limited_stock(&line));
                    }
                    lines.push(line.clone());
                    line
                }
            };

            Ok((line, events))
        })
    }

    pub fn remove_item(&self, line_id: Uuid) -> Result<CartLine, CartError> {
        self.commit(|lines| {
            let position = lines
                .iter()
                .position(|l| l.line_id == line_id)
                .ok_or(CartError::LineNotFound(line_id))?;
            let removed = lines.remove(position);
            let event = CartEvent::ItemRemoved {
                line_id,
                name: removed.name.clone(),
            };
            Ok((removed, vec![event]))
        })
    }

    /// Sets a line's quantity. Zero is rejected; anything above the stock
    /// limit is capped.
    pub fn update_quantity(&self, line_id: Uuid, quantity: u32) -> Result<QuantityUpdate, CartError> {
        if quantity < 1 {
            let e = CartError::QuantityBelowMinimum;
            self.reject(&e);
            return Err(e);
        }
        let now = self.clock.now();

        self.commit(|lines| {
            let line = lines
                .iter_mut()
                .find(|l| l.line_id == line_id)
                .ok_or(CartError::LineNotFound(line_id))?;
            let limit = line.stock_limit.max(1);
            let capped = quantity > limit;
            line.quantity = quantity.min(limit);
            line.updated_at = now;

            let mut events = vec![CartEvent::QuantityUpdated {
                line_id,
                quantity: line.quantity,
            }];
            if capped {
                events.push(limited_stock(line));
            }
            Ok((
                QuantityUpdate {
                    line: line.clone(),
                    capped,
                },
                events,
            ))
        })
    }

    pub fn clear(&self) -> Result<(), CartError> {
        self.commit(|lines| {
            lines.clear();
            Ok(((), vec![CartEvent::Cleared]))
        })
    }

    /// Writes catalog data onto existing lines. Quantities are kept, lines
    /// removed since the refresh was computed are skipped.
    pub fn apply_catalog_refresh(
        &self,
        refreshes: &[LineRefresh],
    ) -> Result<RefreshOutcome, CartError> {
        if refreshes.is_empty() {
            return Ok(RefreshOutcome::default());
        }

        self.commit(|lines| {
            let mut outcome = RefreshOutcome::default();

            for refresh in refreshes {
                let Some(position) = lines.iter().position(|l| l.line_id == refresh.line_id)
                else {
                    continue;
                };

                let new_signature =
                    line_signature(&refresh.canonical_product_id, &lines[position].variant.size);
                let collides = lines
                    .iter()
                    .any(|l| l.line_id != refresh.line_id && l.signature() == new_signature);

                let line = &mut lines[position];
                if line.in_stock && !refresh.in_stock {
                    outcome.now_unavailable.push(UnavailableLine {
                        line_id: line.line_id,
                        name: refresh.name.clone(),
                    });
                }
                if !collides {
                    line.canonical_product_id = refresh.canonical_product_id.clone();
                    line.product_id = refresh.product_id.clone();
                }
                line.name = refresh.name.clone();
                line.unit_price = refresh.unit_price;
                line.in_stock = refresh.in_stock;
                line.image = refresh.image.clone();
                line.last_synced_at = Some(refresh.synced_at);
                outcome.refreshed += 1;
            }

            let mut events = vec![CartEvent::LinesRefreshed {
                refreshed: outcome.refreshed,
            }];
            if !outcome.now_unavailable.is_empty() {
                events.push(CartEvent::NowUnavailable {
                    lines: outcome.now_unavailable.clone(),
                });
            }
            Ok((outcome, events))
        })
    }

    /// Re-reads the persisted cart, replacing the in-memory lines.
    pub fn reload(&self) -> Result<(), CartError> {
        let mut guard = self.lock();
        match self.repository.load() {
            Ok(lines) => *guard = lines.unwrap_or_default(),
            Err(RepositoryError::Corrupted) => {
                self.logger
                    .warn("Stored cart could not be read on reload, clearing in-memory cart");
                guard.clear();
            }
            Err(e) => {
                self.logger.error(&format!("Failed to reload cart: {}", e));
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut Vec<CartLine>) -> Result<(T, Vec<CartEvent>), CartError>,
    ) -> Result<T, CartError> {
        let mut guard = self.lock();
        let mut next = guard.clone();

        let (value, events) = match mutate(&mut next) {
            Ok(outcome) => outcome,
            Err(e) => {
                drop(guard);
                self.logger.warn(&format!("Cart operation rejected: {}", e));
                self.reject(&e);
                return Err(e);
            }
        };

        if let Err(e) = self.repository.save(&next) {
            drop(guard);
            self.logger.error(&format!("Failed to persist cart: {}", e));
            let e = CartError::from(e);
            self.reject(&e);
            return Err(e);
        }

        *guard = next;
        drop(guard);

        for event in events {
            self.emit(event);
        }
        Ok(value)
    }

    fn reject(&self, error: &CartError) {
        self.emit(CartEvent::OperationRejected { code: error.code() });
    }

    fn emit(&self, event: CartEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CartLine>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn limited_stock(line: &CartLine) -> CartEvent {
    CartEvent::LimitedStock {
        line_id: line.line_id,
        name: line.name.clone(),
        available: line.stock_limit,
    }
}
