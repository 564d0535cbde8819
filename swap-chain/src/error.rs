use thiserror::Error;

use swap_types::ErrorKind;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain rpc call failed: {0}")]
    Rpc(String),

    #[error("block at height {0} not found")]
    BlockNotFound(u32),

    #[error("transaction {0} not found")]
    TransactionNotFound(bitcoin::Txid),

    #[error("connection to chain backend lost: {0}")]
    ConnectionLost(String),
}

impl ChainError {
    /// Maps to the abstract kind taxonomy spec §7 uses for dispatch:
    /// connection and generic RPC failures are worth retrying,
    /// not-found lookups are not.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChainError::Rpc(_) | ChainError::ConnectionLost(_) => ErrorKind::TransientRpc,
            ChainError::BlockNotFound(_) | ChainError::TransactionNotFound(_) => ErrorKind::PermanentRpc,
        }
    }
}
