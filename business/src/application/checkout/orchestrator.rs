use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::application::cart::store::CartStore;
use crate::application::catalog::sync::CatalogSyncService;
use crate::application::payment::processor::{PaymentCanceller, PaymentHandle, PaymentProcessor};
use crate::application::retry::retry_with_backoff;
use crate::domain::cart::events::UnavailableLine;
use crate::domain::checkout::errors::CheckoutError;
use crate::domain::checkout::model::{
    CheckoutConfig, CheckoutSession, CheckoutStep, CustomerInfo, OrderConfirmation, OrderDraft,
    PaymentMethod,
};
use crate::domain::checkout::services::{AuthSession, OrderService};
use crate::domain::checkout::validation::validate_customer;
use crate::domain::logger::Logger;
use crate::domain::payment::errors::PaymentError;
use crate::domain::payment::model::{GENERIC_FAILURE_MESSAGE, PaymentRequest, PaymentState};
use crate::domain::retry::RetryPolicy;
use crate::domain::shared::clock::Clock;

/// Collaborators the checkout flow talks to.
pub struct CheckoutPorts {
    pub cart: Arc<CartStore>,
    pub catalog_sync: Arc<CatalogSyncService>,
    pub payments: Arc<PaymentProcessor>,
    pub orders: Arc<dyn OrderService>,
    pub auth: Arc<dyn AuthSession>,
    pub logger: Arc<dyn Logger>,
    pub clock: Arc<dyn Clock>,
}

/// Drives one shopper through review, sign-in, details, payment and
/// confirmation.
pub struct CheckoutOrchestrator {
    ports: CheckoutPorts,
    config: CheckoutConfig,
    retry: RetryPolicy,
    session: Mutex<CheckoutSession>,
    live_payment: Mutex<Option<PaymentCanceller>>,
    paying: AtomicBool,
}

/// Held for the whole of one `pay()` call.
struct PayingGuard<'a>(&'a AtomicBool);

impl<'a> PayingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PayingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CheckoutOrchestrator {
    pub fn new(ports: CheckoutPorts, config: CheckoutConfig, retry: RetryPolicy) -> Self {
        let session = CheckoutSession::new(ports.auth.is_authenticated(), ports.clock.now());
        ports.logger.info(&format!(
            "Checkout session started for order {}",
            session.order_number
        ));

        Self {
            ports,
            config,
            retry,
            session: Mutex::new(session),
            live_payment: Mutex::new(None),
            paying: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> CheckoutSession {
        self.aligned_session().0.clone()
    }

    /// Current step sequence. Login is present only while signed out.
    pub fn steps(&self) -> Vec<CheckoutStep> {
        self.aligned_session().0.steps.clone()
    }

    pub fn active_step(&self) -> CheckoutStep {
        self.aligned_session().0.active_step
    }

    pub fn set_customer_info(&self, customer: CustomerInfo) {
        self.lock_session().customer = customer;
    }

    pub fn select_payment(&self, method: PaymentMethod) {
        self.lock_session().payment_method = Some(method);
    }

    /// Validates the active step and moves forward.
    pub async fn next(&self) -> Result<CheckoutStep, CheckoutError> {
        let (current, target) = {
            let (session, _) = self.aligned_session();
            (session.active_step, session.next_step())
        };

        match current {
            CheckoutStep::CartReview => {
                if self.ports.cart.is_empty() {
                    return Err(CheckoutError::EmptyCart);
                }
            }
            CheckoutStep::Login => {
                if !self.ports.auth.is_authenticated() {
                    return Err(CheckoutError::NotAuthenticated);
                }
            }
            CheckoutStep::CustomerInfo => validate_customer(&self.lock_session().customer)?,
            CheckoutStep::Payment => return Err(CheckoutError::WrongStep(current)),
            CheckoutStep::Confirmation => return Err(CheckoutError::NoNextStep),
        }

        let target = target.ok_or(CheckoutError::NoNextStep)?;
        if target == CheckoutStep::Payment {
            self.verify_items().await?;
        }

        self.lock_session().active_step = target;
        self.ports
            .logger
            .debug(&format!("Checkout moved from {} to {}", current, target));
        Ok(target)
    }

    /// Moves one step back without validation. Confirmation is final, and a
    /// step already moved by a sign-in change counts as the move.
    pub fn back(&self) -> CheckoutStep {
        let (mut session, realigned) = self.aligned_session();
        if !realigned && !session.is_confirmed() {
            if let Some(previous) = session.previous_step() {
                session.active_step = previous;
            }
        }
        session.active_step
    }

    /// Pays with the selected method and records the order. The cart is
    /// cleared and the session confirmed only once the order is recorded.
    /// One call at a time; a concurrent call gets `PaymentInProgress`.
    pub async fn pay(&self) -> Result<OrderConfirmation, CheckoutError> {
        let _paying =
            PayingGuard::acquire(&self.paying).ok_or(CheckoutError::PaymentInProgress)?;

        let (active, method, customer, order_number, settled_receipt) = {
            let (session, _) = self.aligned_session();
            (
                session.active_step,
                session.payment_method.clone(),
                session.customer.clone(),
                session.order_number.clone(),
                session.payment_receipt.clone(),
            )
        };

        if active != CheckoutStep::Payment {
            return Err(CheckoutError::WrongStep(active));
        }
        let method = method.ok_or(CheckoutError::PaymentMethodRequired)?;
        if self.ports.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let lines = self.ports.cart.lines();
        let totals = self.ports.cart.totals();

        let receipt = match (&method, settled_receipt) {
            (_, Some(receipt)) => Some(receipt),
            (PaymentMethod::Mpesa { phone_number }, None) => {
                let phone_number = if phone_number.trim().is_empty() {
                    customer.phone_number.clone()
                } else {
                    phone_number.clone()
                };
                let request = PaymentRequest {
                    phone_number,
                    amount: totals.total,
                    order_reference: order_number.clone(),
                    description: format!("Payment for order {}", order_number),
                };
                Some(self.collect_payment(request).await?)
            }
            (PaymentMethod::CashOnDelivery, None) => None,
        };

        let draft = OrderDraft::assemble(
            &order_number,
            &customer,
            &method,
            &lines,
            &totals,
            receipt.clone(),
        );
        let submitted = retry_with_backoff(
            &self.retry,
            self.ports.logger.as_ref(),
            "Order submission",
            || self.ports.orders.submit(&draft),
        )
        .await;

        let confirmation = match submitted {
            Ok(confirmation) => confirmation,
            Err(e) => {
                return Err(match receipt {
                    Some(receipt) => {
                        self.ports.logger.error(&format!(
                            "Payment {} settled but order {} could not be recorded: {}",
                            receipt, order_number, e
                        ));
                        CheckoutError::OrderRecordingFailed {
                            receipt,
                            order_number,
                        }
                    }
                    None => CheckoutError::OrderSubmissionFailed(e),
                });
            }
        };

        if let Err(e) = self.ports.cart.clear() {
            self.ports.logger.error(&format!(
                "Order {} recorded but the cart could not be cleared: {}",
                confirmation.reference_number, e
            ));
        }

        self.lock_session().confirm(confirmation.clone());
        self.ports.logger.info(&format!(
            "Order {} confirmed as {}",
            order_number, confirmation.reference_number
        ));
        Ok(confirmation)
    }

    /// Cancels the live M-Pesa prompt, if it can still be cancelled.
    pub fn cancel_payment(&self) -> Result<(), CheckoutError> {
        let live = self.lock_payment().clone();
        match live {
            Some(canceller) => Ok(canceller.cancel()?),
            None => Err(PaymentError::NotCancellable(self.lock_session().payment_state).into()),
        }
    }

    /// Abandons checkout, or closes a confirmed one, tearing down any live
    /// payment and starting over.
    pub fn cancel(&self) {
        if let Some(canceller) = self.lock_payment().take() {
            canceller.abort();
        }
        let fresh = CheckoutSession::new(
            self.ports.auth.is_authenticated(),
            self.ports.clock.now(),
        );
        let previous = std::mem::replace(&mut *self.lock_session(), fresh);
        if previous.is_confirmed() {
            self.ports.logger.debug(&format!(
                "Checkout for order {} closed",
                previous.order_number
            ));
        } else {
            self.ports.logger.info(&format!(
                "Checkout for order {} abandoned at {}",
                previous.order_number, previous.active_step
            ));
        }
    }

    async fn verify_items(&self) -> Result<(), CheckoutError> {
        let report = self.ports.catalog_sync.sync(true).await;
        if report.is_failed() {
            return Err(CheckoutError::CatalogUnavailable);
        }

        let mut blocked: Vec<UnavailableLine> = report.out_of_stock();
        if self.config.block_unmatched_items {
            for line in report.unmatched {
                if !blocked.iter().any(|b| b.line_id == line.line_id) {
                    blocked.push(line);
                }
            }
        }

        if blocked.is_empty() {
            Ok(())
        } else {
            self.ports.logger.warn(&format!(
                "{} cart item(s) unavailable, payment blocked",
                blocked.len()
            ));
            Err(CheckoutError::ItemsUnavailable(blocked))
        }
    }

    async fn collect_payment(&self, request: PaymentRequest) -> Result<String, CheckoutError> {
        let handle = {
            let mut live = self.lock_payment();
            if live.as_ref().is_some_and(PaymentCanceller::is_live) {
                return Err(CheckoutError::PaymentInProgress);
            }
            let handle = self.ports.payments.start(request);
            *live = Some(handle.canceller());
            handle
        };
        self.await_payment(handle).await
    }

    async fn await_payment(&self, mut handle: PaymentHandle) -> Result<String, CheckoutError> {
        let outcome = handle.wait().await;
        self.lock_payment().take();

        let attempt = match outcome {
            Ok(attempt) => attempt,
            Err(e) => {
                self.lock_session().payment_state = PaymentState::Failed;
                return Err(CheckoutError::PaymentFailed {
                    message: e.code().to_string(),
                });
            }
        };
        self.lock_session().payment_state = attempt.state;

        match attempt.state {
            PaymentState::Completed => {
                let receipt = attempt.receipt().unwrap_or_default().to_string();
                self.lock_session().payment_receipt = Some(receipt.clone());
                Ok(receipt)
            }
            PaymentState::Timeout => Err(CheckoutError::PaymentTimedOut),
            PaymentState::Cancelled => Err(CheckoutError::PaymentCancelled),
            _ => Err(CheckoutError::PaymentFailed {
                message: attempt
                    .failure_message()
                    .unwrap_or(GENERIC_FAILURE_MESSAGE)
                    .to_string(),
            }),
        }
    }

    /// Locks the session with its steps matched to the current sign-in
    /// state. The flag tells whether that moved the active step.
    fn aligned_session(&self) -> (MutexGuard<'_, CheckoutSession>, bool) {
        let authenticated = self.ports.auth.is_authenticated();
        let mut session = self.lock_session();
        let realigned = session.align_steps(authenticated);
        if realigned {
            self.ports.logger.debug(&format!(
                "Checkout steps changed with sign-in state, now at {}",
                session.active_step
            ));
        }
        (session, realigned)
    }

    fn lock_session(&self) -> MutexGuard<'_, CheckoutSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_payment(&self) -> MutexGuard<'_, Option<PaymentCanceller>> {
        self.live_payment
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
