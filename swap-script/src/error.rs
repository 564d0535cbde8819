//! Error conditions for script/transaction construction.

use swap_types::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("lockup output {available} sat is below the required {required} sat")]
    InsufficientAmount { available: u64, required: u64 },

    #[error("no lockup output matching a known script type was found")]
    ScriptTypeNotFound,

    #[error("redeem script is too large to embed directly in a P2SH scriptPubKey")]
    RedeemScriptTooLarge,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(#[from] bitcoin::key::FromSliceError),
}

impl BuilderError {
    /// All construction-time failures here are non-retryable: the
    /// inputs that produced them (amount, script, key material) don't
    /// change on a second attempt.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuilderError::InsufficientAmount { .. } => ErrorKind::ValidationFailure,
            BuilderError::ScriptTypeNotFound | BuilderError::RedeemScriptTooLarge | BuilderError::InvalidPublicKey(_) => {
                ErrorKind::ValidationFailure
            }
            BuilderError::Signing(_) => ErrorKind::PermanentRpc,
        }
    }
}
