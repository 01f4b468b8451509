use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use logger::TracingLogger;
use persistence::cart::repository::CartRepositoryLocal;
use persistence::wishlist::repository::WishlistRepositoryLocal;
use storefront_api::{
    ApiClient, CatalogServiceHttp, MpesaGatewayHttp, OrderServiceHttp,
};

use business::application::cart::store::CartStore;
use business::application::catalog::sync::{BackgroundSync, CatalogSyncService};
use business::application::checkout::orchestrator::{CheckoutOrchestrator, CheckoutPorts};
use business::application::payment::processor::PaymentProcessor;
use business::application::wishlist::store::WishlistStore;
use business::domain::shared::clock::SystemClock;

use crate::config::app_config::AppConfig;
use crate::notifications::{self, Notification};
use crate::session::SharedSession;

const NOTIFICATION_CAPACITY: usize = 64;

/// Every service of the checkout core, wired to the storefront backend and
/// local storage.
pub struct StorefrontContainer {
    pub config: AppConfig,
    pub session: Arc<SharedSession>,
    pub cart: Arc<CartStore>,
    pub wishlist: Arc<WishlistStore>,
    pub catalog_sync: Arc<CatalogSyncService>,
    pub payments: Arc<PaymentProcessor>,
    pub checkout: Arc<CheckoutOrchestrator>,
    notifications: broadcast::Sender<Notification>,
}

impl StorefrontContainer {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let clock = Arc::new(SystemClock);
        let session = Arc::new(SharedSession::default());

        // Infrastructure adapters
        let storage = config.storage.open()?;
        let cart_repository = Arc::new(CartRepositoryLocal::new(storage.clone()));
        let wishlist_repository = Arc::new(WishlistRepositoryLocal::new(storage));

        let api_client = ApiClient::new(&config.api);
        let catalog = Arc::new(CatalogServiceHttp::new(api_client.clone()));
        let orders = Arc::new(OrderServiceHttp::new(api_client.clone()));
        let gateway = Arc::new(MpesaGatewayHttp::new(api_client));

        // Application services
        let cart = Arc::new(CartStore::new(
            cart_repository,
            Arc::new(TracingLogger::new("cart")),
            clock.clone(),
            config.cart.clone(),
        ));
        let wishlist = Arc::new(WishlistStore::new(
            wishlist_repository,
            Arc::new(TracingLogger::new("wishlist")),
            clock.clone(),
        ));
        let catalog_sync = Arc::new(CatalogSyncService::new(
            catalog,
            cart.clone(),
            Arc::new(TracingLogger::new("catalog_sync")),
            clock.clone(),
            config.catalog.clone(),
        ));
        let payments = Arc::new(PaymentProcessor {
            gateway,
            logger: Arc::new(TracingLogger::new("payment")),
            config: config.payment.clone(),
        });
        let checkout = Arc::new(CheckoutOrchestrator::new(
            CheckoutPorts {
                cart: cart.clone(),
                catalog_sync: catalog_sync.clone(),
                payments: payments.clone(),
                orders,
                auth: session.clone(),
                logger: Arc::new(TracingLogger::new("checkout")),
                clock,
            },
            config.checkout.clone(),
            config.retry.clone(),
        ));

        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        tracing::info!(
            api = %config.api.base_url,
            lines = cart.lines().len(),
            "storefront core ready"
        );

        Ok(Self {
            config,
            session,
            cart,
            wishlist,
            catalog_sync,
            payments,
            checkout,
            notifications,
        })
    }

    /// Periodic catalog refresh. Stops when the returned handle is dropped.
    pub fn start_background_sync(&self) -> BackgroundSync {
        self.catalog_sync
            .spawn_background(self.config.sync_interval)
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Starts forwarding cart and wishlist events to notification
    /// subscribers. Must be called inside a Tokio runtime.
    pub fn start_notifications(&self) -> Vec<JoinHandle<()>> {
        vec![
            notifications::spawn_forwarder(self.cart.subscribe(), self.notifications.clone()),
            notifications::spawn_forwarder(self.wishlist.subscribe(), self.notifications.clone()),
        ]
    }

    /// Publishes a notification raised outside the stores (checkout,
    /// payment, sync).
    pub fn notify(&self, notification: Notification) {
        let _ = self.notifications.send(notification);
    }
}
