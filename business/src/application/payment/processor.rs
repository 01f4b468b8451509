use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::domain::logger::Logger;
use crate::domain::payment::errors::PaymentError;
use crate::domain::payment::machine::{PaymentAction, PaymentInput, PaymentMachine};
use crate::domain::payment::model::{
    GatewayStatus, PaymentAttempt, PaymentConfig, PaymentRequest, PaymentState,
};
use crate::domain::payment::services::PaymentGateway;

/// Drives [`PaymentMachine`] against a [`PaymentGateway`] on a spawned task.
pub struct PaymentProcessor {
    pub gateway: Arc<dyn PaymentGateway>,
    pub logger: Arc<dyn Logger>,
    pub config: PaymentConfig,
}

impl PaymentProcessor {
    /// Submits the request and starts polling in the background. Must be
    /// called inside a Tokio runtime.
    pub fn start(&self, request: PaymentRequest) -> PaymentHandle {
        let (tx, rx) = watch::channel(PaymentAttempt::idle());
        let user_cancel = CancellationToken::new();
        let teardown = CancellationToken::new();

        self.logger.info(&format!(
            "Starting M-Pesa payment for order {}",
            request.order_reference
        ));

        let driver = Driver {
            machine: PaymentMachine::new(self.config.clone()),
            gateway: Arc::clone(&self.gateway),
            logger: Arc::clone(&self.logger),
            tx,
            user_cancel: user_cancel.clone(),
            teardown: teardown.clone(),
        };
        let task = tokio::spawn(driver.run(request));

        PaymentHandle {
            state: rx,
            user_cancel,
            teardown,
            task,
        }
    }
}

/// Live view of one payment attempt. Dropping the handle cancels the
/// attempt and stops polling.
pub struct PaymentHandle {
    state: watch::Receiver<PaymentAttempt>,
    user_cancel: CancellationToken,
    teardown: CancellationToken,
    task: JoinHandle<()>,
}

impl PaymentHandle {
    pub fn state(&self) -> PaymentState {
        self.state.borrow().state
    }

    pub fn attempt(&self) -> PaymentAttempt {
        self.state.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn subscribe(&self) -> watch::Receiver<PaymentAttempt> {
        self.state.clone()
    }

    /// Explicit shopper cancel, allowed while the payer is being prompted.
    pub fn cancel(&self) -> Result<(), PaymentError> {
        self.canceller().cancel()
    }

    /// A cancel-only handle that can be used while another task waits.
    pub fn canceller(&self) -> PaymentCanceller {
        PaymentCanceller {
            state: self.state.clone(),
            user_cancel: self.user_cancel.clone(),
            teardown: self.teardown.clone(),
        }
    }

    /// Waits for a terminal state.
    pub async fn wait(&mut self) -> Result<PaymentAttempt, PaymentError> {
        loop {
            {
                let current = self.state.borrow_and_update();
                if current.state.is_terminal() {
                    return Ok(current.clone());
                }
            }
            if self.state.changed().await.is_err() {
                let last = self.state.borrow().clone();
                return if last.state.is_terminal() {
                    Ok(last)
                } else {
                    Err(PaymentError::TaskAborted)
                };
            }
        }
    }
}

impl Drop for PaymentHandle {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}

#[derive(Clone)]
pub struct PaymentCanceller {
    state: watch::Receiver<PaymentAttempt>,
    user_cancel: CancellationToken,
    teardown: CancellationToken,
}

impl PaymentCanceller {
    pub fn cancel(&self) -> Result<(), PaymentError> {
        let state = self.state.borrow().state;
        if !state.is_cancellable() {
            return Err(PaymentError::NotCancellable(state));
        }
        self.user_cancel.cancel();
        Ok(())
    }

    /// Whether the attempt is still running.
    pub fn is_live(&self) -> bool {
        self.state.has_changed().is_ok() && !self.state.borrow().state.is_terminal()
    }

    /// Ends the attempt from any non-terminal state, including initiation.
    pub fn abort(&self) {
        self.teardown.cancel();
    }
}

struct Driver {
    machine: PaymentMachine,
    gateway: Arc<dyn PaymentGateway>,
    logger: Arc<dyn Logger>,
    tx: watch::Sender<PaymentAttempt>,
    user_cancel: CancellationToken,
    teardown: CancellationToken,
}

impl Driver {
    async fn run(mut self, request: PaymentRequest) {
        let mut action = self.step(PaymentInput::Submit(request));

        loop {
            action = match action {
                PaymentAction::Initiate(payment) => {
                    let deadline = self.deadline();
                    tokio::select! {
                        biased;

                        _ = self.teardown.cancelled() => self.step(PaymentInput::Teardown),
                        _ = sleep_until(deadline) => self.step(PaymentInput::DeadlineReached),
                        result = self.gateway.initiate(&payment) => match result {
                            Ok(response) => self.step(PaymentInput::InitiateAccepted(response)),
                            Err(e) => {
                                self.logger.warn(&format!("M-Pesa initiation failed: {}", e));
                                self.step(PaymentInput::InitiateFailed(e))
                            }
                        },
                    }
                }
                PaymentAction::PollAfter(delay) => {
                    let deadline = self.deadline();
                    tokio::select! {
                        biased;

                        _ = self.user_cancel.cancelled() => self.step(PaymentInput::Cancel),
                        _ = self.teardown.cancelled() => self.step(PaymentInput::Teardown),
                        _ = sleep_until(deadline) => self.step(PaymentInput::DeadlineReached),
                        _ = sleep(delay) => self.poll(deadline).await,
                    }
                }
                PaymentAction::Finish | PaymentAction::None => break,
            };
        }

        let attempt = self.machine.attempt();
        self.logger.info(&format!(
            "M-Pesa payment finished as {} after {} poll(s)",
            attempt.state, attempt.attempt_count
        ));
    }

    async fn poll(&mut self, deadline: Instant) -> PaymentAction {
        let Some(request_id) = self.machine.attempt().checkout_request_id.clone() else {
            return self.step(PaymentInput::PollFailed);
        };

        tokio::select! {
            biased;

            _ = self.user_cancel.cancelled() => self.step(PaymentInput::Cancel),
            _ = self.teardown.cancelled() => self.step(PaymentInput::Teardown),
            _ = sleep_until(deadline) => self.step(PaymentInput::DeadlineReached),
            result = self.gateway.query_status(&request_id) => match result {
                Ok(status) => {
                    if status == GatewayStatus::Pending {
                        self.logger.debug(&format!("Payment {} still pending", request_id));
                    }
                    self.step(PaymentInput::PollResult(status))
                }
                Err(e) => {
                    self.logger.debug(&format!(
                        "Status check for {} failed, retrying next interval: {}",
                        request_id, e
                    ));
                    self.step(PaymentInput::PollFailed)
                }
            },
        }
    }

    fn step(&mut self, input: PaymentInput) -> PaymentAction {
        let action = match self.machine.handle(input, Instant::now()) {
            Ok(action) => action,
            Err(e) => {
                self.logger
                    .error(&format!("Payment state machine rejected input: {}", e));
                PaymentAction::None
            }
        };
        self.tx.send_replace(self.machine.attempt().clone());
        action
    }

    fn deadline(&self) -> Instant {
        self.machine.deadline().unwrap_or_else(Instant::now)
    }
}
