/// Repository errors for domain layer.
/// Use code-style identifiers for all error variants for i18n compatibility.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository.persistence")]
    Persistence,
    #[error("repository.corrupted")]
    Corrupted,
    #[error("repository.storage_unavailable")]
    StorageUnavailable,
}

impl RepositoryError {
    pub fn persistence() -> Self {
        RepositoryError::Persistence
    }
    pub fn corrupted() -> Self {
        RepositoryError::Corrupted
    }
    pub fn storage_unavailable() -> Self {
        RepositoryError::StorageUnavailable
    }
}
