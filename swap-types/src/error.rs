//! Error-kind taxonomy. Every crate's leaf `thiserror` error carries one
//! of these kinds so the Nursery can dispatch on policy (retry, fail,
//! surface) without matching on concrete error types from every
//! collaborator.

use std::fmt;

/// Abstract error kind, independent of which collaborator raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// chain/lightning RPC I/O — retry with backoff; past budget, mark
    /// swap stuck and alert.
    TransientRpc,
    /// rejected broadcast, invalid script — transition to failure state.
    PermanentRpc,
    /// `NO_ROUTE`, `TIMEOUT` — mark `InvoiceFailedToPay`, refundable by
    /// the user.
    PaymentFailure,
    /// bad input at creation — surfaced to caller pre-persistence.
    ValidationFailure,
    /// state mismatch at load — abort, refuse to proceed.
    InvariantViolation,
    /// block height reached — normal expiry path.
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::TransientRpc => "transient_rpc",
            ErrorKind::PermanentRpc => "permanent_rpc",
            ErrorKind::PaymentFailure => "payment_failure",
            ErrorKind::ValidationFailure => "validation_failure",
            ErrorKind::InvariantViolation => "invariant_violation",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// `{code, message}` surface, domain-prefixed (`Swap`, `Wallet`, ...).
#[derive(Debug, thiserror::Error)]
#[error("{domain}#{code}: {message}")]
pub struct SwapError {
    pub domain: &'static str,
    pub code: u32,
    pub message: String,
    pub kind: ErrorKind,
}

impl SwapError {
    pub fn new(domain: &'static str, code: u32, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            domain,
            code,
            kind,
            message: message.into(),
        }
    }
}
