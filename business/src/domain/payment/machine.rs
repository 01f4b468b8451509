//! Pure push-payment state machine.
//!
//! The machine never sleeps and never talks to the gateway. It records what
//! happened and tells the driver what to do next; time comes in with each
//! input.

use std::time::Duration;

use tokio::time::Instant;

use super::errors::{PaymentError, PaymentGatewayError};
use super::model::{
    GENERIC_FAILURE_MESSAGE, GatewayStatus, InitiateResponse, PaymentAttempt, PaymentConfig,
    PaymentRequest, PaymentState, TerminalResult, UNVERIFIABLE_PAYMENT_MESSAGE, ValidatedPayment,
};
use crate::domain::shared::value_objects::PhoneNumber;

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentInput {
    Submit(PaymentRequest),
    InitiateAccepted(InitiateResponse),
    InitiateFailed(PaymentGatewayError),
    PollResult(GatewayStatus),
    /// The status query itself failed. Inconclusive.
    PollFailed,
    DeadlineReached,
    /// Explicit shopper cancel.
    Cancel,
    /// The owner went away (session destroyed, handle dropped).
    Teardown,
}

impl PaymentInput {
    fn name(&self) -> &'static str {
        match self {
            PaymentInput::Submit(_) => "submit",
            PaymentInput::InitiateAccepted(_) => "initiate_accepted",
            PaymentInput::InitiateFailed(_) => "initiate_failed",
            PaymentInput::PollResult(_) => "poll_result",
            PaymentInput::PollFailed => "poll_failed",
            PaymentInput::DeadlineReached => "deadline_reached",
            PaymentInput::Cancel => "cancel",
            PaymentInput::Teardown => "teardown",
        }
    }
}

/// What the driver must do after an input was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentAction {
    Initiate(ValidatedPayment),
    PollAfter(Duration),
    Finish,
    None,
}

#[derive(Debug, Clone)]
pub struct PaymentMachine {
    config: PaymentConfig,
    attempt: PaymentAttempt,
}

impl PaymentMachine {
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            config,
            attempt: PaymentAttempt::idle(),
        }
    }

    pub fn state(&self) -> PaymentState {
        self.attempt.state
    }

    pub fn attempt(&self) -> &PaymentAttempt {
        &self.attempt
    }

    /// Instant at which a non-terminal attempt times out.
    pub fn deadline(&self) -> Option<Instant> {
        self.attempt
            .started_at
            .map(|started| started + self.config.timeout)
    }

    /// Applies one input. Inputs arriving after a terminal state are ignored
    /// and yield [`PaymentAction::None`].
    pub fn handle(
        &mut self,
        input: PaymentInput,
        now: Instant,
    ) -> Result<PaymentAction, PaymentError> {
        let state = self.attempt.state;
        if state.is_terminal() {
            return Ok(PaymentAction::None);
        }

        match (state, input) {
            (PaymentState::Idle, PaymentInput::Submit(request)) => Ok(self.submit(request, now)),

            (PaymentState::Initiating, PaymentInput::InitiateAccepted(response)) => {
                let request_id = response
                    .checkout_request_id
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty());
                match request_id {
                    Some(id) => {
                        self.attempt.checkout_request_id = Some(id);
                        self.attempt.state = PaymentState::Initiated;
                        Ok(PaymentAction::PollAfter(self.config.first_poll_delay))
                    }
                    None => Ok(self.fail(
                        "payment.unverifiable",
                        UNVERIFIABLE_PAYMENT_MESSAGE.to_string(),
                    )),
                }
            }

            (PaymentState::Initiating, PaymentInput::InitiateFailed(error)) => {
                let message = match &error {
                    PaymentGatewayError::Rejected { message: Some(m) } if !m.trim().is_empty() => {
                        m.clone()
                    }
                    PaymentGatewayError::InvalidResponse => UNVERIFIABLE_PAYMENT_MESSAGE.to_string(),
                    _ => GENERIC_FAILURE_MESSAGE.to_string(),
                };
                Ok(self.fail(gateway_code(&error), message))
            }

            (
                PaymentState::Initiated | PaymentState::Processing,
                PaymentInput::PollResult(status),
            ) => {
                self.record_poll(now);
                Ok(match status {
                    GatewayStatus::Completed { receipt_number } => {
                        let receipt = receipt_number
                            .filter(|r| !r.trim().is_empty())
                            .or_else(|| self.attempt.checkout_request_id.clone())
                            .unwrap_or_default();
                        self.finish(PaymentState::Completed, TerminalResult::Receipt(receipt))
                    }
                    GatewayStatus::Failed { message } => {
                        let message = message
                            .filter(|m| !m.trim().is_empty())
                            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
                        self.fail("payment.gateway_failed", message)
                    }
                    GatewayStatus::Pending if self.is_past_deadline(now) => self.time_out(),
                    GatewayStatus::Pending => {
                        self.attempt.state = PaymentState::Processing;
                        PaymentAction::PollAfter(self.config.poll_interval)
                    }
                })
            }

            (PaymentState::Initiated | PaymentState::Processing, PaymentInput::PollFailed) => {
                self.record_poll(now);
                if self.is_past_deadline(now) {
                    Ok(self.time_out())
                } else {
                    Ok(PaymentAction::PollAfter(self.config.poll_interval))
                }
            }

            (
                PaymentState::Initiating | PaymentState::Initiated | PaymentState::Processing,
                PaymentInput::DeadlineReached,
            ) => Ok(self.time_out()),

            (PaymentState::Initiated | PaymentState::Processing, PaymentInput::Cancel) => {
                Ok(self.cancel())
            }
            (_, PaymentInput::Cancel) => Err(PaymentError::NotCancellable(state)),

            (PaymentState::Idle, PaymentInput::Teardown) => Ok(PaymentAction::None),
            (_, PaymentInput::Teardown) => Ok(self.cancel()),

            (from, input) => Err(PaymentError::InvalidTransition {
                from,
                input: input.name(),
            }),
        }
    }

    fn submit(&mut self, request: PaymentRequest, now: Instant) -> PaymentAction {
        let Some(phone_number) = PhoneNumber::parse(&request.phone_number) else {
            return self.reject(PaymentError::InvalidPhoneNumber);
        };
        if request.amount == 0 {
            return self.reject(PaymentError::InvalidAmount);
        }

        self.attempt.phone_number = Some(phone_number.clone());
        self.attempt.amount = request.amount;
        self.attempt.started_at = Some(now);
        self.attempt.state = PaymentState::Initiating;

        PaymentAction::Initiate(ValidatedPayment {
            phone_number,
            amount: request.amount,
            order_reference: request.order_reference,
            description: request.description,
        })
    }

    fn reject(&mut self, error: PaymentError) -> PaymentAction {
        self.fail(error.code(), error.code().to_string())
    }

    fn fail(&mut self, code: &str, message: String) -> PaymentAction {
        self.finish(
            PaymentState::Failed,
            TerminalResult::Failure {
                code: code.to_string(),
                message,
            },
        )
    }

    fn time_out(&mut self) -> PaymentAction {
        self.finish(
            PaymentState::Timeout,
            TerminalResult::Failure {
                code: "payment.timeout".to_string(),
                message: "payment was not confirmed in time".to_string(),
            },
        )
    }

    fn cancel(&mut self) -> PaymentAction {
        self.finish(
            PaymentState::Cancelled,
            TerminalResult::Failure {
                code: "payment.cancelled".to_string(),
                message: "payment was cancelled".to_string(),
            },
        )
    }

    fn finish(&mut self, state: PaymentState, result: TerminalResult) -> PaymentAction {
        self.attempt.state = state;
        self.attempt.terminal_result = Some(result);
        PaymentAction::Finish
    }

    fn record_poll(&mut self, now: Instant) {
        self.attempt.attempt_count += 1;
        self.attempt.last_polled_at = Some(now);
    }

    fn is_past_deadline(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }
}

fn gateway_code(error: &PaymentGatewayError) -> &'static str {
    match error {
        PaymentGatewayError::Network => "payment_gateway.network",
        PaymentGatewayError::Rejected { .. } => "payment_gateway.rejected",
        PaymentGatewayError::InvalidResponse => "payment_gateway.invalid_response",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request() -> PaymentRequest {
        PaymentRequest {
            phone_number: "0712 345 678".to_string(),
            amount: 150_000,
            order_reference: "ORD-1".to_string(),
            description: "Order ORD-1".to_string(),
        }
    }

    fn accepted(id: &str) -> PaymentInput {
        PaymentInput::InitiateAccepted(InitiateResponse {
            checkout_request_id: Some(id.to_string()),
            message: None,
        })
    }

    fn initiated(now: Instant) -> PaymentMachine {
        let mut machine = PaymentMachine::new(PaymentConfig::default());
        machine.handle(PaymentInput::Submit(request()), now).unwrap();
        machine.handle(accepted("ws_CO_1"), now).unwrap();
        machine
    }

    #[test]
    fn should_validate_and_normalize_phone_before_initiating() {
        let mut machine = PaymentMachine::new(PaymentConfig::default());

        let action = machine
            .handle(PaymentInput::Submit(request()), Instant::now())
            .unwrap();

        match action {
            PaymentAction::Initiate(payment) => {
                assert_eq!(payment.phone_number.as_str(), "254712345678");
                assert_eq!(payment.amount, 150_000);
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert_eq!(machine.state(), PaymentState::Initiating);
    }

    #[test]
    fn should_fail_without_gateway_call_on_invalid_phone() {
        let mut machine = PaymentMachine::new(PaymentConfig::default());
        let mut bad = request();
        bad.phone_number = "12345".to_string();

        let action = machine
            .handle(PaymentInput::Submit(bad), Instant::now())
            .unwrap();

        assert_eq!(action, PaymentAction::Finish);
        assert_eq!(machine.state(), PaymentState::Failed);
        assert_eq!(machine.attempt().failure_message(), Some("payment.invalid_phone"));
    }

    #[test]
    fn should_fail_on_zero_amount() {
        let mut machine = PaymentMachine::new(PaymentConfig::default());
        let mut zero = request();
        zero.amount = 0;

        machine
            .handle(PaymentInput::Submit(zero), Instant::now())
            .unwrap();

        assert_eq!(machine.state(), PaymentState::Failed);
    }

    #[test]
    fn should_schedule_first_poll_after_initiation() {
        let now = Instant::now();
        let mut machine = PaymentMachine::new(PaymentConfig::default());
        machine.handle(PaymentInput::Submit(request()), now).unwrap();

        let action = machine.handle(accepted("ws_CO_1"), now).unwrap();

        assert_eq!(action, PaymentAction::PollAfter(Duration::from_secs(10)));
        assert_eq!(machine.state(), PaymentState::Initiated);
    }

    #[test]
    fn should_fail_when_gateway_returns_no_request_id() {
        let now = Instant::now();
        let mut machine = PaymentMachine::new(PaymentConfig::default());
        machine.handle(PaymentInput::Submit(request()), now).unwrap();

        machine.handle(accepted("  "), now).unwrap();

        assert_eq!(machine.state(), PaymentState::Failed);
        assert_eq!(
            machine.attempt().failure_message(),
            Some(UNVERIFIABLE_PAYMENT_MESSAGE)
        );
    }

    #[test]
    fn should_carry_gateway_message_on_rejected_initiation() {
        let now = Instant::now();
        let mut machine = PaymentMachine::new(PaymentConfig::default());
        machine.handle(PaymentInput::Submit(request()), now).unwrap();

        machine
            .handle(
                PaymentInput::InitiateFailed(PaymentGatewayError::Rejected {
                    message: Some("Insufficient balance".to_string()),
                }),
                now,
            )
            .unwrap();

        assert_eq!(machine.state(), PaymentState::Failed);
        assert_eq!(
            machine.attempt().failure_message(),
            Some("Insufficient balance")
        );
    }

    #[test]
    fn should_move_to_processing_on_pending_poll() {
        let now = Instant::now();
        let mut machine = initiated(now);

        let action = machine
            .handle(
                PaymentInput::PollResult(GatewayStatus::Pending),
                now + Duration::from_secs(10),
            )
            .unwrap();

        assert_eq!(action, PaymentAction::PollAfter(Duration::from_secs(5)));
        assert_eq!(machine.state(), PaymentState::Processing);
        assert_eq!(machine.attempt().attempt_count, 1);
    }

    #[test]
    fn should_complete_with_receipt() {
        let now = Instant::now();
        let mut machine = initiated(now);

        let action = machine
            .handle(
                PaymentInput::PollResult(GatewayStatus::Completed {
                    receipt_number: Some("QK7XYZ".to_string()),
                }),
                now + Duration::from_secs(10),
            )
            .unwrap();

        assert_eq!(action, PaymentAction::Finish);
        assert_eq!(machine.state(), PaymentState::Completed);
        assert_eq!(machine.attempt().receipt(), Some("QK7XYZ"));
    }

    #[test]
    fn should_use_generic_message_when_gateway_fails_silently() {
        let now = Instant::now();
        let mut machine = initiated(now);

        machine
            .handle(
                PaymentInput::PollResult(GatewayStatus::Failed { message: None }),
                now + Duration::from_secs(10),
            )
            .unwrap();

        assert_eq!(machine.state(), PaymentState::Failed);
        assert_eq!(
            machine.attempt().failure_message(),
            Some(GENERIC_FAILURE_MESSAGE)
        );
    }

    #[test]
    fn should_not_transition_on_poll_network_failure() {
        let now = Instant::now();
        let mut machine = initiated(now);

        let action = machine
            .handle(PaymentInput::PollFailed, now + Duration::from_secs(10))
            .unwrap();

        assert_eq!(action, PaymentAction::PollAfter(Duration::from_secs(5)));
        assert_eq!(machine.state(), PaymentState::Initiated);
    }

    #[test]
    fn should_time_out_at_deadline() {
        let now = Instant::now();
        let mut machine = initiated(now);

        machine
            .handle(PaymentInput::DeadlineReached, now + Duration::from_secs(60))
            .unwrap();

        assert_eq!(machine.state(), PaymentState::Timeout);
        assert_eq!(machine.deadline(), Some(now + Duration::from_secs(60)));
    }

    #[test]
    fn should_cancel_only_from_initiated_or_processing() {
        let now = Instant::now();
        let mut idle = PaymentMachine::new(PaymentConfig::default());
        assert_eq!(
            idle.handle(PaymentInput::Cancel, now),
            Err(PaymentError::NotCancellable(PaymentState::Idle))
        );

        let mut machine = initiated(now);
        machine.handle(PaymentInput::Cancel, now).unwrap();
        assert_eq!(machine.state(), PaymentState::Cancelled);
    }

    #[test]
    fn should_cancel_on_teardown_while_initiating() {
        let now = Instant::now();
        let mut machine = PaymentMachine::new(PaymentConfig::default());
        machine.handle(PaymentInput::Submit(request()), now).unwrap();

        machine.handle(PaymentInput::Teardown, now).unwrap();

        assert_eq!(machine.state(), PaymentState::Cancelled);
    }

    #[test]
    fn should_ignore_inputs_after_terminal_state() {
        let now = Instant::now();
        let mut machine = initiated(now);
        machine.handle(PaymentInput::Cancel, now).unwrap();

        let action = machine
            .handle(
                PaymentInput::PollResult(GatewayStatus::Completed {
                    receipt_number: Some("LATE".to_string()),
                }),
                now,
            )
            .unwrap();

        assert_eq!(action, PaymentAction::None);
        assert_eq!(machine.state(), PaymentState::Cancelled);
        assert_eq!(machine.attempt().receipt(), None);
    }

    #[test]
    fn should_reject_poll_before_initiation() {
        let mut machine = PaymentMachine::new(PaymentConfig::default());

        let result = machine.handle(PaymentInput::PollFailed, Instant::now());

        assert!(matches!(
            result,
            Err(PaymentError::InvalidTransition {
                from: PaymentState::Idle,
                ..
            })
        ));
    }

    proptest! {
        #[test]
        fn every_attempt_terminates_within_the_deadline(
            outcomes in proptest::collection::vec(0u8..10, 0..40),
        ) {
            let config = PaymentConfig::default();
            let start = Instant::now();
            let mut machine = PaymentMachine::new(config.clone());
            machine.handle(PaymentInput::Submit(request()), start).unwrap();
            let mut action = machine.handle(accepted("ws_CO_1"), start).unwrap();
            let mut now = start;
            let mut outcomes = outcomes.into_iter();

            while let PaymentAction::PollAfter(delay) = action {
                now += delay;
                let input = if now >= start + config.timeout {
                    PaymentInput::DeadlineReached
                } else {
                    match outcomes.next().unwrap_or(0) {
                        0..=5 => PaymentInput::PollResult(GatewayStatus::Pending),
                        6..=7 => PaymentInput::PollFailed,
                        8 => PaymentInput::PollResult(GatewayStatus::Completed { receipt_number: None }),
                        _ => PaymentInput::PollResult(GatewayStatus::Failed { message: None }),
                    }
                };
                action = machine.handle(input, now).unwrap();
            }

            prop_assert!(machine.state().is_terminal());
            prop_assert!(now <= start + config.timeout);
            prop_assert!(machine.attempt().attempt_count <= 10);
        }
    }
}
