use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::cart::store::CartStore;
use crate::application::retry::retry_with_backoff;
use crate::domain::cart::events::UnavailableLine;
use crate::domain::cart::model::CartLine;
use crate::domain::catalog::errors::SyncError;
use crate::domain::catalog::index::{LineRefresh, ProductIndex};
use crate::domain::catalog::model::CatalogQuery;
use crate::domain::catalog::services::CatalogService;
use crate::domain::logger::Logger;
use crate::domain::retry::RetryPolicy;
use crate::domain::shared::clock::Clock;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSyncConfig {
    /// A sync older than this is stale.
    pub staleness: Duration,
    pub retry: RetryPolicy,
}

impl Default for CatalogSyncConfig {
    fn default() -> Self {
        Self {
            staleness: Duration::from_secs(300),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncStatus {
    Skipped,
    Refreshed { matched: usize, unmatched: usize },
    /// Recoverable. The cart was left exactly as it was.
    Failed { error: SyncError },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Cart lines after the sync.
    pub lines: Vec<CartLine>,
    pub status: SyncStatus,
    /// Lines that went from in stock to out of stock during this sync.
    pub now_unavailable: Vec<UnavailableLine>,
    /// Lines the catalog no longer knows about.
    pub unmatched: Vec<UnavailableLine>,
}

impl SyncReport {
    fn without_changes(lines: Vec<CartLine>, status: SyncStatus) -> Self {
        Self {
            lines,
            status,
            now_unavailable: Vec::new(),
            unmatched: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SyncStatus::Failed { .. })
    }

    /// Lines that are currently out of stock.
    pub fn out_of_stock(&self) -> Vec<UnavailableLine> {
        self.lines
            .iter()
            .filter(|l| !l.in_stock)
            .map(|l| UnavailableLine {
                line_id: l.line_id,
                name: l.name.clone(),
            })
            .collect()
    }
}

type SyncRun = BoxFuture<'static, SyncReport>;

/// Shortest period the background task will tick at.
pub const MIN_BACKGROUND_INTERVAL: Duration = Duration::from_secs(1);

/// Reconciles cart lines against the live catalog.
///
/// The service only reads the catalog and hands refresh records to the cart
/// store, which stays the sole writer of cart storage.
pub struct CatalogSyncService {
    catalog: Arc<dyn CatalogService>,
    cart: Arc<CartStore>,
    logger: Arc<dyn Logger>,
    clock: Arc<dyn Clock>,
    config: CatalogSyncConfig,
    last_synced_at: Mutex<Option<DateTime<Utc>>>,
    /// Weak so a run abandoned by every caller is dropped with its `Arc<Self>`.
    in_flight: Mutex<Option<WeakShared<SyncRun>>>,
}

impl CatalogSyncService {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        cart: Arc<CartStore>,
        logger: Arc<dyn Logger>,
        clock: Arc<dyn Clock>,
        config: CatalogSyncConfig,
    ) -> Self {
        Self {
            catalog,
            cart,
            logger,
            clock,
            config,
            last_synced_at: Mutex::new(None),
            in_flight: Mutex::new(None),
        }
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        *lock(&self.last_synced_at)
    }

    /// Syncs when forced or due. Concurrent callers share one execution.
    pub async fn sync(self: &Arc<Self>, force: bool) -> SyncReport {
        if !force && !self.is_due() {
            return SyncReport::without_changes(self.cart.lines(), SyncStatus::Skipped);
        }

        let shared = {
            let mut slot = lock(&self.in_flight);
            match slot.as_ref().and_then(WeakShared::upgrade) {
                Some(running) => {
                    self.logger.debug("Joining in-flight catalog sync");
                    running
                }
                None => {
                    let this = Arc::clone(self);
                    let run: Shared<SyncRun> = async move {
                        let report = this.run().await;
                        lock(&this.in_flight).take();
                        report
                    }
                    .boxed()
                    .shared();
                    *slot = run.downgrade();
                    run
                }
            }
        };

        shared.await
    }

    /// Runs `sync(false)` on every tick until the returned handle is stopped
    /// or dropped. Intervals below [`MIN_BACKGROUND_INTERVAL`] are raised to it.
    pub fn spawn_background(self: &Arc<Self>, interval: Duration) -> BackgroundSync {
        let interval = interval.max(MIN_BACKGROUND_INTERVAL);
        let token = CancellationToken::new();
        let shutdown = token.clone();
        let this = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => {
                        this.logger.debug("Background catalog sync stopped");
                        return;
                    }

                    _ = ticker.tick() => {
                        tokio::select! {
                            biased;
                            _ = shutdown.cancelled() => return,
                            report = this.sync(false) => {
                                if let SyncStatus::Failed { error } = &report.status {
                                    this.logger.warn(&format!("Background catalog sync failed: {}", error));
                                }
                            }
                        }
                    }
                }
            }
        });

        BackgroundSync {
            token,
            handle: Some(handle),
        }
    }

    fn is_due(&self) -> bool {
        match self.last_synced_at() {
            None => !self.cart.is_empty(),
            Some(last) => (self.clock.now() - last)
                .to_std()
                .is_ok_and(|elapsed| elapsed > self.config.staleness),
        }
    }

    async fn run(&self) -> SyncReport {
        let query = CatalogQuery::default();
        let fetched = retry_with_backoff(
            &self.config.retry,
            self.logger.as_ref(),
            "Catalog fetch",
            || self.catalog.fetch_products(&query),
        )
        .await;

        let products = match fetched {
            Ok(products) => products,
            Err(e) => {
                self.logger
                    .warn(&format!("Catalog sync failed, keeping cart as is: {}", e));
                return SyncReport::without_changes(
                    self.cart.lines(),
                    SyncStatus::Failed { error: e.into() },
                );
            }
        };

        let snapshot = self.cart.lines();
        let index = ProductIndex::build(&products);
        let now = self.clock.now();

        let mut refreshes = Vec::with_capacity(snapshot.len());
        let mut unmatched = Vec::new();
        for line in &snapshot {
            match index.find(line) {
                Some((product, kind)) => {
                    self.logger.debug(&format!(
                        "Cart line '{}' matched catalog product '{}' by {:?}",
                        line.name, product.name, kind
                    ));
                    refreshes.push(LineRefresh::from_match(line, product, now));
                }
                None => unmatched.push(UnavailableLine {
                    line_id: line.line_id,
                    name: line.name.clone(),
                }),
            }
        }

        let outcome = match self.cart.apply_catalog_refresh(&refreshes) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.logger
                    .error(&format!("Failed to store catalog refresh: {}", e));
                return SyncReport::without_changes(
                    self.cart.lines(),
                    SyncStatus::Failed { error: e.into() },
                );
            }
        };

        *lock(&self.last_synced_at) = Some(now);

        if !unmatched.is_empty() {
            self.logger.warn(&format!(
                "{} cart line(s) not found in catalog ({} products)",
                unmatched.len(),
                index.len()
            ));
        }
        self.logger.info(&format!(
            "Catalog sync refreshed {} line(s)",
            outcome.refreshed
        ));

        SyncReport {
            lines: self.cart.lines(),
            status: SyncStatus::Refreshed {
                matched: refreshes.len(),
                unmatched: unmatched.len(),
            },
            now_unavailable: outcome.now_unavailable,
            unmatched,
        }
    }
}

/// Handle to the periodic sync task. Dropping it stops the task.
pub struct BackgroundSync {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundSync {
    /// Stops the task and waits for it to exit.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for BackgroundSync {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
