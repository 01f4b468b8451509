use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CartError {
    #[error("cart.unresolvable_product")]
    UnresolvableProduct,
    #[error("cart.line_not_found")]
    LineNotFound(Uuid),
    #[error("cart.quantity_below_minimum")]
    QuantityBelowMinimum,
    #[error("repository.persistence")]
    Repository(#[from] crate::domain::errors::RepositoryError),
}

impl CartError {
    /// Code used in rejection events and notifications.
    pub fn code(&self) -> &'static str {
        match self {
            CartError::UnresolvableProduct => "cart.unresolvable_product",
            CartError::LineNotFound(_) => "cart.line_not_found",
            CartError::QuantityBelowMinimum => "cart.quantity_below_minimum",
            CartError::Repository(_) => "repository.persistence",
        }
    }
}
