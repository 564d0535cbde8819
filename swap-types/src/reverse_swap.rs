//! The `ReverseSwap` entity: the service locks on-chain coins, the user
//! pays a Lightning hold-invoice.

use crate::ids::Preimage;
use crate::ids::PreimageHash;
use crate::ids::SwapId;
use crate::pair::OrderSide;
use crate::pair::Pair;
use crate::status::SwapStatus;
use crate::swap::OutputType;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReverseSwap {
    pub id: SwapId,
    pub pair: Pair,
    pub order_side: OrderSide,

    pub invoice: String,
    pub preimage_hash: PreimageHash,
    /// Revealed by the user's claim transaction; absent until then.
    pub preimage: Option<Preimage>,

    pub redeem_script: Vec<u8>,
    pub lockup_address: String,
    pub output_type: OutputType,
    pub key_index: u32,
    pub claim_public_key: Vec<u8>,

    pub onchain_amount: u64,
    pub invoice_amount: u64,
    pub timeout_block_height: u64,

    pub status: SwapStatus,

    pub transaction_id: Option<String>,
    pub miner_fee: Option<u64>,
    pub percentage_fee: u64,
}

impl ReverseSwap {
    /// `onchain_amount = floor(invoice_amount * rate) - (base_fee +
    /// percentage_fee) >= 1`.
    pub fn onchain_amount(
        invoice_amount: u64,
        rate: f64,
        base_fee: u64,
        percentage_fee: u64,
    ) -> Option<u64> {
        let converted = (invoice_amount as f64 * rate).floor() as u64;
        converted.checked_sub(base_fee + percentage_fee).filter(|v| *v >= 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onchain_amount_applies_rate_then_subtracts_fees() {
        assert_eq!(
            ReverseSwap::onchain_amount(200_000, 1.0, 1000, 1000),
            Some(198_000)
        );
    }

    #[test]
    fn onchain_amount_rejects_non_positive_result() {
        assert_eq!(ReverseSwap::onchain_amount(1000, 1.0, 900, 101), None);
    }
}
