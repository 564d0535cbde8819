//! Zero-conf acceptance policy. Every condition must hold or the
//! funding waits for a confirmation like any other.

use bitcoin::Transaction;

/// `nSequence < 0xfffffffe` on any input signals willingness to RBF;
/// such a transaction is never accepted zero-conf even if everything
/// else checks out.
fn signals_rbf(tx: &Transaction) -> bool {
    tx.input.iter().any(|input| input.sequence.is_rbf())
}

pub struct ZeroConfDecision {
    pub accepted: bool,
    pub reason: Option<&'static str>,
}

/// `value`/`expected_amount` is the swap's own funding check;
/// `risk_cap_sat` and `required_fee_rate` come from the fee & rate
/// oracle.
pub fn evaluate(
    tx: &Transaction,
    value_sat: u64,
    expected_amount_sat: u64,
    accept_zero_conf: bool,
    risk_cap_sat: u64,
    tx_fee_rate_sat_per_vbyte: u64,
    required_fee_rate_sat_per_vbyte: u64,
) -> ZeroConfDecision {
    if !accept_zero_conf {
        return ZeroConfDecision {
            accepted: false,
            reason: Some("zero-conf not requested for this swap"),
        };
    }
    if value_sat < expected_amount_sat {
        return ZeroConfDecision {
            accepted: false,
            reason: Some("lockup value below expected amount"),
        };
    }
    if value_sat > risk_cap_sat {
        return ZeroConfDecision {
            accepted: false,
            reason: Some("lockup value exceeds zero-conf risk cap"),
        };
    }
    if tx_fee_rate_sat_per_vbyte < required_fee_rate_sat_per_vbyte {
        return ZeroConfDecision {
            accepted: false,
            reason: Some("fee rate below current estimator output"),
        };
    }
    if signals_rbf(tx) {
        return ZeroConfDecision {
            accepted: false,
            reason: Some("transaction signals RBF"),
        };
    }
    ZeroConfDecision { accepted: true, reason: None }
}
