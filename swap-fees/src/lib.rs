//! Fee & Rate Oracle interface.
//!
//! Fee-rate estimation heuristics are out of scope here: the nursery
//! only ever consumes a `RateProvider`/`FeeEstimator` as a black box.
//! This crate ships the trait seam plus a trivial in-memory
//! implementation for tests; a real deployment plugs in its own
//! pluggable strategy object rather than a hardcoded policy.

use std::collections::HashMap;

use swap_types::Pair;

/// Floor fee rate: until a better estimator is wired in, never quote
/// below this.
pub const MIN_SAT_PER_VBYTE: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeRate {
    pub sat_per_vbyte: u64,
}

impl FeeRate {
    pub fn new(sat_per_vbyte: u64) -> Self {
        Self {
            sat_per_vbyte: sat_per_vbyte.max(MIN_SAT_PER_VBYTE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairRate {
    pub rate: f64,
    pub base_fee_sat: u64,
    pub percentage_fee: f64,
    /// Risk cap for zero-conf acceptance: a zero-conf lockup above this
    /// value is never accepted regardless of confirmations.
    pub zero_conf_risk_cap_sat: u64,
}

/// Quote/base/rate and zero-conf policy data, consumed as a black box
/// by the nursery.
pub trait RateProvider: Send + Sync {
    fn quote(&self, pair: &Pair) -> Option<PairRate>;
}

/// Sat/vbyte fee estimation, consumed as a black box.
pub trait FeeEstimator: Send + Sync {
    fn sat_per_vbyte(&self, confirmation_target: u32) -> FeeRate;
}

/// Fixed-table implementation usable in tests and as a reference for
/// the real estimator's shape.
#[derive(Debug, Clone, Default)]
pub struct StaticRateProvider {
    rates: HashMap<Pair, PairRate>,
}

impl StaticRateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(mut self, pair: Pair, rate: PairRate) -> Self {
        self.rates.insert(pair, rate);
        self
    }
}

impl RateProvider for StaticRateProvider {
    fn quote(&self, pair: &Pair) -> Option<PairRate> {
        self.rates.get(pair).copied()
    }
}

/// Fixed sat/vbyte estimator, floor-clamped like a real estimator would
/// be. TODO: fall back to legacy `estimatefee` when `estimatesmartfee`
/// is unavailable on the node.
#[derive(Debug, Clone, Copy)]
pub struct StaticFeeEstimator {
    pub sat_per_vbyte: u64,
}

impl FeeEstimator for StaticFeeEstimator {
    fn sat_per_vbyte(&self, _confirmation_target: u32) -> FeeRate {
        FeeRate::new(self.sat_per_vbyte)
    }
}
