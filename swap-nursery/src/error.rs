use thiserror::Error;

use swap_types::ErrorKind;

#[derive(Debug, Error)]
pub enum NurseryError {
    #[error("repository error: {0}")]
    Repository(#[from] swap_repository::RepositoryError),

    #[error("script builder error: {0}")]
    Script(#[from] swap_script::BuilderError),

    #[error("lightning adapter error: {0}")]
    Lightning(#[from] swap_lightning::LightningError),

    #[error("chain client error: {0}")]
    Chain(#[from] swap_chain::ChainError),

    #[error("invalid transition for swap {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: swap_types::SwapStatus,
        to: swap_types::SwapStatus,
    },

    #[error("swap {0} not found")]
    NotFound(String),

    #[error("no rate quoted for pair {0}")]
    NoRate(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NurseryError {
    /// The abstract kind spec §7's policy table dispatches on,
    /// regardless of which collaborator actually raised the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NurseryError::Repository(e) => e.kind(),
            NurseryError::Script(e) => e.kind(),
            NurseryError::Lightning(e) => e.kind(),
            NurseryError::Chain(e) => e.kind(),
            NurseryError::InvalidTransition { .. } => ErrorKind::InvariantViolation,
            NurseryError::NotFound(_) | NurseryError::NoRate(_) => ErrorKind::ValidationFailure,
            NurseryError::Other(_) => ErrorKind::PermanentRpc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_is_an_invariant_violation() {
        let err = NurseryError::InvalidTransition {
            id: "0123456789abcdef".to_string(),
            from: swap_types::SwapStatus::TransactionClaimed,
            to: swap_types::SwapStatus::SwapExpired,
        };
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    }

    #[test]
    fn collaborator_errors_delegate_to_their_own_kind() {
        let err = NurseryError::Chain(swap_chain::ChainError::ConnectionLost("reset".to_string()));
        assert_eq!(err.kind(), ErrorKind::TransientRpc);
    }
}
