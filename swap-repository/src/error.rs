use thiserror::Error;

use swap_types::ErrorKind;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("failed to serialize swap: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("swap {0} not found")]
    NotFound(String),

    #[error("swap id is malformed: {0}")]
    InvalidId(String),
}

impl RepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::Database(_) => ErrorKind::TransientRpc,
            RepositoryError::Migration(_) | RepositoryError::Serialize(_) => ErrorKind::InvariantViolation,
            RepositoryError::NotFound(_) | RepositoryError::InvalidId(_) => ErrorKind::ValidationFailure,
        }
    }
}
