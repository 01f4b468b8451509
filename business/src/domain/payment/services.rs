use async_trait::async_trait;

use super::errors::PaymentGatewayError;
use super::model::{GatewayStatus, InitiateResponse, ValidatedPayment};

/// Service port for a mobile-money push gateway (M-Pesa STK push).
///
/// `initiate` asks the gateway to prompt the payer; `query_status` is polled
/// until the gateway settles the request.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate(
        &self,
        payment: &ValidatedPayment,
    ) -> Result<InitiateResponse, PaymentGatewayError>;

    async fn query_status(
        &self,
        checkout_request_id: &str,
    ) -> Result<GatewayStatus, PaymentGatewayError>;
}
