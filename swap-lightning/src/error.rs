use thiserror::Error;

use swap_types::ErrorKind;

/// Terminal payment outcomes the nursery must distinguish: none of these
/// are worth retrying, each maps to a different follow-up state
/// transition or alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentFailureKind {
    NoRoute,
    Timeout,
    InvoiceAlreadyPaid,
    IncorrectPaymentDetails,
}

#[derive(Debug, Error)]
pub enum LightningError {
    #[error("payment failed: {0:?}")]
    PaymentFailed(PaymentFailureKind),

    /// Transient I/O against the node (connection reset, node busy).
    /// Worth retrying with backoff.
    #[error("lightning node rpc error: {0}")]
    Rpc(String),

    #[error("invoice for preimage hash {0} not found")]
    InvoiceNotFound(String),

    #[error("malformed invoice: {0}")]
    InvalidInvoice(String),
}

impl LightningError {
    /// Whether a retry could plausibly change the outcome. Terminal
    /// payment failures and malformed input never are.
    pub fn is_transient(&self) -> bool {
        matches!(self, LightningError::Rpc(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LightningError::Rpc(_) => ErrorKind::TransientRpc,
            LightningError::PaymentFailed(_) => ErrorKind::PaymentFailure,
            LightningError::InvoiceNotFound(_) | LightningError::InvalidInvoice(_) => ErrorKind::ValidationFailure,
        }
    }
}
