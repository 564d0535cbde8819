//! The swap state machine. `SwapStatus` is the union of both
//! directions' states; `SwapKind` picks which DAG edge set applies so a
//! single enum can be persisted, serialized over the event bus, and
//! validated against the right graph.

use std::fmt;

/// Which lifecycle DAG a status transition must be checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SwapKind {
    Submarine,
    Reverse,
}

/// Union of every state either swap direction can be in. Not every
/// variant is reachable from every `SwapKind` — see
/// [`SwapStatus::is_valid_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    SwapCreated,
    TransactionMempool,
    TransactionConfirmed,
    /// Submarine-only: service is attempting to pay the invoice.
    InvoicePending,
    /// Invoice paid (submarine) or the user's HTLC locked in (reverse).
    InvoicePaid,
    /// Reverse-only terminal success: service revealed the preimage and
    /// settled the hold-invoice after observing the user's claim.
    InvoiceSettled,
    /// Terminal failure: the Lightning payment could not be completed.
    InvoiceFailedToPay,
    /// Submarine-only terminal success: claim tx broadcast by the
    /// service after the invoice was paid.
    TransactionClaimed,
    /// Reverse-only: the service's lockup broadcast was rejected.
    TransactionFailed,
    /// Reverse-only terminal: service refunded its own lockup after
    /// expiry.
    TransactionRefunded,
    /// Expiry reached. Terminal for submarine (user self-refunds);
    /// an intermediate step for reverse, which proceeds to
    /// `TransactionRefunded`.
    SwapExpired,
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwapStatus::SwapCreated => "swap.created",
            SwapStatus::TransactionMempool => "transaction.mempool",
            SwapStatus::TransactionConfirmed => "transaction.confirmed",
            SwapStatus::InvoicePending => "invoice.pending",
            SwapStatus::InvoicePaid => "invoice.paid",
            SwapStatus::InvoiceSettled => "invoice.settled",
            SwapStatus::InvoiceFailedToPay => "invoice.failedToPay",
            SwapStatus::TransactionClaimed => "transaction.claimed",
            SwapStatus::TransactionFailed => "transaction.failed",
            SwapStatus::TransactionRefunded => "transaction.refunded",
            SwapStatus::SwapExpired => "swap.expired",
        };
        f.write_str(s)
    }
}

impl SwapStatus {
    /// Terminal states never transition further: monotone progression
    /// except the explicit `SwapExpired` override.
    pub fn is_terminal(self, kind: SwapKind) -> bool {
        match (kind, self) {
            (SwapKind::Submarine, SwapStatus::TransactionClaimed)
            | (SwapKind::Submarine, SwapStatus::InvoiceFailedToPay)
            | (SwapKind::Submarine, SwapStatus::SwapExpired)
            | (SwapKind::Reverse, SwapStatus::InvoiceSettled)
            | (SwapKind::Reverse, SwapStatus::TransactionFailed)
            | (SwapKind::Reverse, SwapStatus::TransactionRefunded) => true,
            _ => false,
        }
    }

    /// The allowed DAG edges. `SwapExpired` is reachable from any
    /// non-terminal state as an explicit override; every other edge is
    /// a forward step.
    pub fn is_valid_transition(kind: SwapKind, from: SwapStatus, to: SwapStatus) -> bool {
        use SwapStatus::*;
        if from == to {
            // Idempotent re-application of the same transition.
            return true;
        }
        if from.is_terminal(kind) {
            return false;
        }
        if to == SwapExpired {
            return from != SwapExpired;
        }
        match kind {
            SwapKind::Submarine => matches!(
                (from, to),
                (SwapCreated, TransactionMempool)
                    | (TransactionMempool, TransactionConfirmed)
                    | (TransactionConfirmed, InvoicePending)
                    | (InvoicePending, InvoicePaid)
                    | (InvoicePending, InvoiceFailedToPay)
                    | (InvoicePaid, TransactionClaimed)
            ),
            SwapKind::Reverse => matches!(
                (from, to),
                (SwapCreated, TransactionMempool)
                    | (SwapCreated, TransactionFailed)
                    | (TransactionMempool, TransactionConfirmed)
                    | (TransactionConfirmed, InvoicePaid)
                    | (InvoicePaid, InvoiceSettled)
                    | (SwapExpired, TransactionRefunded)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SwapStatus::*;

    #[test]
    fn submarine_happy_path_is_monotone() {
        let path = [
            SwapCreated,
            TransactionMempool,
            TransactionConfirmed,
            InvoicePending,
            InvoicePaid,
            TransactionClaimed,
        ];
        for pair in path.windows(2) {
            assert!(SwapStatus::is_valid_transition(
                SwapKind::Submarine,
                pair[0],
                pair[1]
            ));
        }
        assert!(TransactionClaimed.is_terminal(SwapKind::Submarine));
    }

    #[test]
    fn reverse_expiry_then_refund() {
        assert!(SwapStatus::is_valid_transition(
            SwapKind::Reverse,
            TransactionConfirmed,
            SwapExpired
        ));
        assert!(SwapStatus::is_valid_transition(
            SwapKind::Reverse,
            SwapExpired,
            TransactionRefunded
        ));
        assert!(TransactionRefunded.is_terminal(SwapKind::Reverse));
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        assert!(!SwapStatus::is_valid_transition(
            SwapKind::Submarine,
            TransactionClaimed,
            SwapExpired
        ));
    }

    #[test]
    fn repeated_transition_is_idempotent() {
        assert!(SwapStatus::is_valid_transition(
            SwapKind::Submarine,
            TransactionMempool,
            TransactionMempool
        ));
    }

    #[test]
    fn backward_transition_is_rejected() {
        assert!(!SwapStatus::is_valid_transition(
            SwapKind::Submarine,
            InvoicePaid,
            TransactionMempool
        ));
    }
}
