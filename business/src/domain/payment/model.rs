use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::domain::shared::value_objects::{MinorUnits, PhoneNumber};

/// Message used whenever the gateway's answer cannot be tied to a request.
pub const UNVERIFIABLE_PAYMENT_MESSAGE: &str = "could not verify payment status";

/// Message used when the gateway fails a payment without saying why.
pub const GENERIC_FAILURE_MESSAGE: &str = "payment failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Idle,
    Initiating,
    Initiated,
    Processing,
    Completed,
    Failed,
    Timeout,
    Cancelled,
}

impl PaymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentState::Completed
                | PaymentState::Failed
                | PaymentState::Timeout
                | PaymentState::Cancelled
        )
    }

    /// States from which a shopper may cancel.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, PaymentState::Initiated | PaymentState::Processing)
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentState::Idle => write!(f, "idle"),
            PaymentState::Initiating => write!(f, "initiating"),
            PaymentState::Initiated => write!(f, "initiated"),
            PaymentState::Processing => write!(f, "processing"),
            PaymentState::Completed => write!(f, "completed"),
            PaymentState::Failed => write!(f, "failed"),
            PaymentState::Timeout => write!(f, "timeout"),
            PaymentState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Unvalidated push-payment request as submitted by checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub phone_number: String,
    pub amount: MinorUnits,
    pub order_reference: String,
    pub description: String,
}

/// A request that passed local validation and can go to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPayment {
    pub phone_number: PhoneNumber,
    pub amount: MinorUnits,
    pub order_reference: String,
    pub description: String,
}

/// Gateway answer to a push request.
#[derive(Debug, Clone, PartialEq)]
pub struct InitiateResponse {
    /// `None` when the gateway response carried no usable request id.
    pub checkout_request_id: Option<String>,
    pub message: Option<String>,
}

/// Gateway answer to a status poll.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayStatus {
    Pending,
    Completed { receipt_number: Option<String> },
    Failed { message: Option<String> },
}

/// How an attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalResult {
    Receipt(String),
    Failure { code: String, message: String },
}

/// Configuration for the push-payment flow.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfig {
    pub timeout: Duration,
    pub first_poll_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            first_poll_delay: Duration::from_secs(10),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// One run of the payment state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentAttempt {
    pub checkout_request_id: Option<String>,
    pub phone_number: Option<PhoneNumber>,
    pub amount: MinorUnits,
    pub state: PaymentState,
    /// Status polls performed so far.
    pub attempt_count: u32,
    pub started_at: Option<Instant>,
    pub last_polled_at: Option<Instant>,
    pub terminal_result: Option<TerminalResult>,
}

impl PaymentAttempt {
    pub fn idle() -> Self {
        Self {
            checkout_request_id: None,
            phone_number: None,
            amount: 0,
            state: PaymentState::Idle,
            attempt_count: 0,
            started_at: None,
            last_polled_at: None,
            terminal_result: None,
        }
    }

    pub fn receipt(&self) -> Option<&str> {
        match &self.terminal_result {
            Some(TerminalResult::Receipt(receipt)) => Some(receipt),
            _ => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match &self.terminal_result {
            Some(TerminalResult::Failure { message, .. }) => Some(message),
            _ => None,
        }
    }
}
