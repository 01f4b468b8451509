use crate::domain::retry::Retryable;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog.unavailable")]
    Unavailable,
    #[error("catalog.invalid_response")]
    InvalidResponse,
    #[error("catalog.rejected")]
    Rejected { status: u16 },
}

impl Retryable for CatalogError {
    fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Unavailable => true,
            CatalogError::Rejected { status } => *status >= 500,
            CatalogError::InvalidResponse => false,
        }
    }
}

/// Why a catalog sync produced no refresh.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("catalog.sync_fetch_failed")]
    Fetch(#[from] CatalogError),
    #[error("catalog.sync_persist_failed")]
    Persist(#[from] crate::domain::cart::errors::CartError),
}
