use super::model::PaymentState;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentError {
    #[error("payment.invalid_phone")]
    InvalidPhoneNumber,
    #[error("payment.invalid_amount")]
    InvalidAmount,
    #[error("payment.invalid_transition")]
    InvalidTransition { from: PaymentState, input: &'static str },
    #[error("payment.not_cancellable")]
    NotCancellable(PaymentState),
    #[error("payment.task_aborted")]
    TaskAborted,
}

impl PaymentError {
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::InvalidPhoneNumber => "payment.invalid_phone",
            PaymentError::InvalidAmount => "payment.invalid_amount",
            PaymentError::InvalidTransition { .. } => "payment.invalid_transition",
            PaymentError::NotCancellable(_) => "payment.not_cancellable",
            PaymentError::TaskAborted => "payment.task_aborted",
        }
    }
}

/// Errors reported by a payment gateway adapter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentGatewayError {
    #[error("payment_gateway.network")]
    Network,
    #[error("payment_gateway.rejected")]
    Rejected { message: Option<String> },
    #[error("payment_gateway.invalid_response")]
    InvalidResponse,
}
