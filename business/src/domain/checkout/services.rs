use async_trait::async_trait;

use super::errors::OrderError;
use super::model::{OrderConfirmation, OrderDraft};

/// Service port for the order backend.
#[async_trait]
pub trait OrderService: Send + Sync {
    async fn submit(&self, order: &OrderDraft) -> Result<OrderConfirmation, OrderError>;
}

/// Answers whether the current shopper is signed in.
pub trait AuthSession: Send + Sync {
    fn is_authenticated(&self) -> bool;
}
