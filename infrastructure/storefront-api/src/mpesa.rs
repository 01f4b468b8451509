use async_trait::async_trait;

use business::domain::payment::errors::PaymentGatewayError;
use business::domain::payment::model::{GatewayStatus, InitiateResponse, ValidatedPayment};
use business::domain::payment::services::PaymentGateway;
use business::domain::shared::value_objects::MinorUnits;

use crate::client::{ApiClient, error_message};
use crate::dto::{MpesaInitiateDto, MpesaInitiatedDto, MpesaStatusDto};

/// M-Pesa STK push through the storefront backend.
pub struct MpesaGatewayHttp {
    client: ApiClient,
}

impl MpesaGatewayHttp {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// The gateway takes whole shillings; any fractional part rounds up.
    fn whole_units(amount: MinorUnits) -> u64 {
        amount.div_ceil(100)
    }

    fn parse_status(dto: MpesaStatusDto) -> GatewayStatus {
        let status = dto
            .status
            .as_deref()
            .map(|s| s.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match status.as_str() {
            "completed" => GatewayStatus::Completed {
                receipt_number: dto.receipt_number.filter(|r| !r.trim().is_empty()),
            },
            "failed" => GatewayStatus::Failed {
                message: dto.message.filter(|m| !m.trim().is_empty()),
            },
            _ => GatewayStatus::Pending,
        }
    }
}

#[async_trait]
impl PaymentGateway for MpesaGatewayHttp {
    async fn initiate(
        &self,
        payment: &ValidatedPayment,
    ) -> Result<InitiateResponse, PaymentGatewayError> {
        let body = MpesaInitiateDto {
            phone_number: payment.phone_number.as_str(),
            amount: Self::whole_units(payment.amount),
            order_id: &payment.order_reference,
            description: &payment.description,
        };

        let response = self
            .client
            .client
            .post(self.client.mpesa_initiate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(order = %payment.order_reference, error = %e, "stk push request failed");
                PaymentGatewayError::Network
            })?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PaymentGatewayError::Rejected {
                message: error_message(&text),
            });
        }

        let initiated: MpesaInitiatedDto = response
            .json()
            .await
            .map_err(|_| PaymentGatewayError::InvalidResponse)?;

        if initiated.success == Some(false) {
            return Err(PaymentGatewayError::Rejected {
                message: initiated.message,
            });
        }

        Ok(InitiateResponse {
            checkout_request_id: initiated
                .checkout_request_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            message: initiated.message,
        })
    }

    async fn query_status(
        &self,
        checkout_request_id: &str,
    ) -> Result<GatewayStatus, PaymentGatewayError> {
        let response = self
            .client
            .client
            .get(self.client.mpesa_status_url(checkout_request_id))
            .send()
            .await
            .map_err(|_| PaymentGatewayError::Network)?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PaymentGatewayError::Rejected {
                message: error_message(&text),
            });
        }

        let dto: MpesaStatusDto = response
            .json()
            .await
            .map_err(|_| PaymentGatewayError::InvalidResponse)?;

        Ok(Self::parse_status(dto))
    }
}
