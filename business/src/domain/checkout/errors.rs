use crate::domain::cart::events::UnavailableLine;
use crate::domain::retry::Retryable;

use super::model::CheckoutStep;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("order.network")]
    Network,
    #[error("order.rejected")]
    Rejected { status: u16, message: Option<String> },
    #[error("order.invalid_response")]
    InvalidResponse,
}

impl Retryable for OrderError {
    fn is_retryable(&self) -> bool {
        match self {
            OrderError::Network => true,
            OrderError::Rejected { status, .. } => *status >= 500,
            OrderError::InvalidResponse => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckoutError {
    #[error("checkout.empty_cart")]
    EmptyCart,
    #[error("checkout.not_authenticated")]
    NotAuthenticated,
    #[error("checkout.name_required")]
    NameRequired,
    #[error("checkout.invalid_email")]
    InvalidEmail,
    #[error("checkout.invalid_phone")]
    InvalidPhoneNumber,
    #[error("checkout.address_unresolved")]
    AddressUnresolved,
    #[error("checkout.payment_method_required")]
    PaymentMethodRequired,
    #[error("checkout.wrong_step")]
    WrongStep(CheckoutStep),
    #[error("checkout.no_next_step")]
    NoNextStep,
    #[error("checkout.items_unavailable")]
    ItemsUnavailable(Vec<UnavailableLine>),
    #[error("checkout.catalog_unavailable")]
    CatalogUnavailable,
    #[error("checkout.payment_failed")]
    PaymentFailed { message: String },
    #[error("checkout.payment_timed_out")]
    PaymentTimedOut,
    #[error("checkout.payment_cancelled")]
    PaymentCancelled,
    #[error("checkout.payment_in_progress")]
    PaymentInProgress,
    #[error("checkout.order_recording_failed")]
    OrderRecordingFailed {
        receipt: String,
        order_number: String,
    },
    #[error("checkout.order_submission_failed")]
    OrderSubmissionFailed(OrderError),
    #[error("checkout.payment")]
    Payment(#[from] crate::domain::payment::errors::PaymentError),
    #[error("checkout.cart")]
    Cart(#[from] crate::domain::cart::errors::CartError),
}

impl CheckoutError {
    /// Validation failures are rejected before any I/O and never retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CheckoutError::EmptyCart
                | CheckoutError::NotAuthenticated
                | CheckoutError::NameRequired
                | CheckoutError::InvalidEmail
                | CheckoutError::InvalidPhoneNumber
                | CheckoutError::AddressUnresolved
                | CheckoutError::PaymentMethodRequired
        )
    }
}
