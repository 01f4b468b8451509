use async_trait::async_trait;
use serde_json::Value;

use business::domain::checkout::errors::OrderError;
use business::domain::checkout::model::{OrderConfirmation, OrderDraft};
use business::domain::checkout::services::OrderService;

use crate::client::{ApiClient, error_message};

pub struct OrderServiceHttp {
    client: ApiClient,
}

impl OrderServiceHttp {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Reads `{orderId, referenceNumber}`, optionally wrapped in `data` or
    /// `order`. The reference falls back to the order id.
    fn parse_confirmation(body: &Value) -> Option<OrderConfirmation> {
        let record = ["data", "order"]
            .iter()
            .find_map(|key| body.get(*key).filter(|v| v.is_object()))
            .unwrap_or(body);

        let text = |key: &str| match record.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let order_id = text("orderId").or_else(|| text("_id")).or_else(|| text("id"))?;
        let reference_number = text("referenceNumber")
            .or_else(|| text("orderNumber"))
            .unwrap_or_else(|| order_id.clone());

        Some(OrderConfirmation {
            order_id,
            reference_number,
        })
    }
}

#[async_trait]
impl OrderService for OrderServiceHttp {
    async fn submit(&self, order: &OrderDraft) -> Result<OrderConfirmation, OrderError> {
        let response = self
            .client
            .client
            .post(self.client.orders_url())
            .json(order)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(order_number = %order.order_number, error = %e, "order request failed");
                OrderError::Network
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OrderError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|_| OrderError::InvalidResponse)?;

        Self::parse_confirmation(&body).ok_or(OrderError::InvalidResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use business::domain::checkout::model::{OrderCustomer, OrderPaymentStatus};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> OrderServiceHttp {
        let config = ApiConfig::new(server.uri(), Duration::from_secs(2));
        OrderServiceHttp::new(ApiClient::new(&config))
    }

    fn draft() -> OrderDraft {
        OrderDraft {
            order_number: "ORD-1700000000000-1234".to_string(),
            customer: OrderCustomer {
                name: "Wanjiru".to_string(),
                email: "w@example.com".to_string(),
                phone_number: "0712345678".to_string(),
                delivery_address: "Moi Avenue 12, Nairobi".to_string(),
            },
            items: vec![],
            payment_method: "mpesa".to_string(),
            subtotal: 1500,
            shipping: 200,
            total: 1700,
            payment_status: OrderPaymentStatus::Paid,
            status: "pending".to_string(),
            payment_reference: Some("QK7XYZ".to_string()),
        }
    }

    #[tokio::test]
    async fn should_post_order_and_read_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(body_partial_json(json!({
                "orderNumber": "ORD-1700000000000-1234",
                "paymentStatus": "paid",
                "paymentReference": "QK7XYZ"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "orderId": "ord_9",
                "referenceNumber": "REF-9"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let confirmation = service(&server).submit(&draft()).await.unwrap();

        assert_eq!(
            confirmation,
            OrderConfirmation {
                order_id: "ord_9".to_string(),
                reference_number: "REF-9".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn should_read_wrapped_confirmation_with_numeric_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"_id": 77}
            })))
            .mount(&server)
            .await;

        let confirmation = service(&server).submit(&draft()).await.unwrap();

        assert_eq!(confirmation.order_id, "77");
        assert_eq!(confirmation.reference_number, "77");
    }

    #[tokio::test]
    async fn should_carry_rejection_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({"message": "Invalid address"})),
            )
            .mount(&server)
            .await;

        let result = service(&server).submit(&draft()).await;

        assert_eq!(
            result,
            Err(OrderError::Rejected {
                status: 422,
                message: Some("Invalid address".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn should_reject_confirmation_without_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let result = service(&server).submit(&draft()).await;

        assert_eq!(result, Err(OrderError::InvalidResponse));
    }
}
