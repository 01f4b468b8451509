use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use business::application::catalog::sync::{SyncReport, SyncStatus};
use business::domain::cart::events::{CartEvent, UnavailableLine};
use business::domain::checkout::errors::CheckoutError;
use business::domain::payment::model::{PaymentAttempt, PaymentState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A shopper-facing message. `code` is stable for translation, `message` is
/// the default English text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_id: Option<Uuid>,
}

impl Notification {
    fn new(level: NotificationLevel, code: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            code: code.to_string(),
            message: message.into(),
            line_id: None,
        }
    }

    fn for_line(mut self, line_id: Uuid) -> Self {
        self.line_id = Some(line_id);
        self
    }
}

fn names(lines: &[UnavailableLine]) -> String {
    lines
        .iter()
        .map(|l| l.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<&CartEvent> for Notification {
    fn from(event: &CartEvent) -> Self {
        use NotificationLevel::*;

        match event {
            CartEvent::ItemAdded { line_id, name, .. } => {
                Notification::new(Success, "cart.item_added", format!("{} added to cart", name))
                    .for_line(*line_id)
            }
            CartEvent::QuantityMerged {
                line_id,
                name,
                quantity,
            } => Notification::new(
                Success,
                "cart.quantity_merged",
                format!("{} quantity is now {}", name, quantity),
            )
            .for_line(*line_id),
            CartEvent::QuantityUpdated { line_id, quantity } => Notification::new(
                Info,
                "cart.quantity_updated",
                format!("Quantity updated to {}", quantity),
            )
            .for_line(*line_id),
            CartEvent::LimitedStock {
                line_id,
                name,
                available,
            } => Notification::new(
                Warning,
                "cart.limited_stock",
                format!("Only {} of {} available", available, name),
            )
            .for_line(*line_id),
            CartEvent::ItemRemoved { line_id, name } => Notification::new(
                Info,
                "cart.item_removed",
                format!("{} removed from cart", name),
            )
            .for_line(*line_id),
            CartEvent::Cleared => Notification::new(Info, "cart.cleared", "Cart cleared"),
            CartEvent::LinesRefreshed { refreshed } => Notification::new(
                Info,
                "cart.refreshed",
                format!("Updated {} item(s) from the catalog", refreshed),
            ),
            CartEvent::NowUnavailable { lines } => Notification::new(
                Warning,
                "cart.now_unavailable",
                format!("No longer in stock: {}", names(lines)),
            ),
            CartEvent::WishlistAdded { line_id, name } => Notification::new(
                Success,
                "wishlist.item_added",
                format!("{} saved to wishlist", name),
            )
            .for_line(*line_id),
            CartEvent::WishlistRemoved { line_id } => {
                Notification::new(Info, "wishlist.item_removed", "Removed from wishlist")
                    .for_line(*line_id)
            }
            CartEvent::OperationRejected { code } => {
                Notification::new(Error, code, "That change could not be saved")
            }
        }
    }
}

/// Shopper message for a payment snapshot. Idle and in-flight states with
/// nothing to say yield `None`.
pub fn from_payment(attempt: &PaymentAttempt) -> Option<Notification> {
    use NotificationLevel::*;

    let notification = match attempt.state {
        PaymentState::Idle | PaymentState::Initiating => return None,
        PaymentState::Initiated => Notification::new(
            Info,
            "payment.initiated",
            "Check your phone and enter your M-Pesa PIN",
        ),
        PaymentState::Processing => {
            Notification::new(Info, "payment.processing", "Waiting for payment confirmation")
        }
        PaymentState::Completed => Notification::new(
            Success,
            "payment.completed",
            format!("Payment received ({})", attempt.receipt().unwrap_or_default()),
        ),
        PaymentState::Failed => Notification::new(
            Error,
            "payment.failed",
            attempt.failure_message().unwrap_or("Payment failed").to_string(),
        ),
        PaymentState::Timeout => Notification::new(
            Warning,
            "payment.timeout",
            "Payment was not confirmed in time",
        ),
        PaymentState::Cancelled => {
            Notification::new(Warning, "payment.cancelled", "Payment cancelled")
        }
    };
    Some(notification)
}

/// Shopper message for a catalog sync. Skipped and clean syncs say nothing.
pub fn from_sync_report(report: &SyncReport) -> Option<Notification> {
    match &report.status {
        SyncStatus::Failed { error } => Some(Notification::new(
            NotificationLevel::Warning,
            &error.to_string(),
            "Could not refresh prices, showing last known values",
        )),
        SyncStatus::Refreshed { .. } if !report.now_unavailable.is_empty() => Some(Notification::new(
            NotificationLevel::Warning,
            "cart.now_unavailable",
            format!("No longer in stock: {}", names(&report.now_unavailable)),
        )),
        _ => None,
    }
}

impl From<&CheckoutError> for Notification {
    fn from(error: &CheckoutError) -> Self {
        use NotificationLevel::*;

        let code = error.to_string();
        let (level, message) = match error {
            CheckoutError::EmptyCart => (Warning, "Your cart is empty".to_string()),
            CheckoutError::NotAuthenticated => (Warning, "Please sign in to continue".to_string()),
            CheckoutError::NameRequired => (Warning, "Please enter your name".to_string()),
            CheckoutError::InvalidEmail => (Warning, "Please enter a valid email".to_string()),
            CheckoutError::InvalidPhoneNumber => {
                (Warning, "Please enter a valid M-Pesa phone number".to_string())
            }
            CheckoutError::AddressUnresolved => {
                (Warning, "Please enter a delivery address".to_string())
            }
            CheckoutError::PaymentMethodRequired => {
                (Warning, "Please choose a payment method".to_string())
            }
            CheckoutError::WrongStep(step) => {
                (Error, format!("That action is not available during {}", step))
            }
            CheckoutError::NoNextStep => (Info, "Checkout is complete".to_string()),
            CheckoutError::ItemsUnavailable(lines) => (
                Warning,
                format!("Some items are unavailable: {}", names(lines)),
            ),
            CheckoutError::CatalogUnavailable => (
                Error,
                "We could not confirm item availability, please try again".to_string(),
            ),
            CheckoutError::PaymentFailed { message } => (Error, message.clone()),
            CheckoutError::PaymentTimedOut => {
                (Warning, "Payment was not confirmed in time".to_string())
            }
            CheckoutError::PaymentCancelled => (Warning, "Payment cancelled".to_string()),
            CheckoutError::PaymentInProgress => {
                (Info, "A payment is already in progress".to_string())
            }
            CheckoutError::OrderRecordingFailed { receipt, .. } => (
                Error,
                format!(
                    "Payment {} received but the order was not recorded, please retry or contact support",
                    receipt
                ),
            ),
            CheckoutError::OrderSubmissionFailed(_) => {
                (Error, "Your order could not be placed, please try again".to_string())
            }
            CheckoutError::Payment(_) => (Error, "Payment could not be started".to_string()),
            CheckoutError::Cart(e) => {
                return Notification::new(Error, e.code(), "Your cart could not be updated");
            }
        };

        Notification::new(level, &code, message)
    }
}

/// Forwards store events as notifications until the store goes away.
pub fn spawn_forwarder(
    mut events: broadcast::Receiver<CartEvent>,
    sink: broadcast::Sender<Notification>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let _ = sink.send(Notification::from(&event));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification forwarder fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
