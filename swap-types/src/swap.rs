//! The submarine `Swap` entity: user pays on-chain, the service pays a
//! Lightning invoice.

use crate::ids::PreimageHash;
use crate::ids::SwapId;
use crate::pair::OrderSide;
use crate::pair::Pair;
use crate::status::SwapStatus;

/// Lockup address script type. `P2shP2wsh` ("Compatibility") is the
/// default; `P2wsh`/`P2sh` are supported for callers that want native
/// segwit or legacy outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OutputType {
    P2sh,
    P2wsh,
    P2shP2wsh,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Swap {
    pub id: SwapId,
    pub pair: Pair,
    pub order_side: OrderSide,

    pub invoice: String,
    pub preimage_hash: PreimageHash,

    pub redeem_script: Vec<u8>,
    pub lockup_address: String,
    pub output_type: OutputType,
    pub key_index: u32,

    pub expected_amount: u64,
    pub accept_zero_conf: bool,
    pub timeout_block_height: u64,

    pub status: SwapStatus,

    pub lockup_transaction_id: Option<String>,
    pub lockup_vout: Option<u32>,
    pub onchain_amount: Option<u64>,

    pub miner_fee: Option<u64>,
    pub percentage_fee: u64,
}

impl Swap {
    /// `expected_amount = ceil(invoice_amount * rate) + base_fee +
    /// percentage_fee`.
    pub fn expected_amount(invoice_amount: u64, rate: f64, base_fee: u64, percentage_fee: u64) -> u64 {
        let converted = (invoice_amount as f64 * rate).ceil() as u64;
        converted + base_fee + percentage_fee
    }

    /// Whether a lockup of `value` satisfies this swap's minimum. The
    /// zero-conf policy never fires below `expected_amount`.
    pub fn covers_expected_amount(&self, value: u64) -> bool {
        value >= self.expected_amount
    }
}
