//! The wallet collaborator's interface. Mnemonic storage and the key
//! derivation scheme live elsewhere; this is only the seam the nursery
//! and script builder call through. Boxed futures keep the trait usable
//! behind `Arc<dyn Wallet>`, the same shape `ChainClient` uses.

use std::future::Future;
use std::pin::Pin;

use bitcoin::secp256k1::Keypair;
use bitcoin::Address;
use bitcoin::Amount;
use bitcoin::Transaction;

use swap_types::OutputType;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

pub trait Wallet: Send + Sync {
    /// Derive the keypair at `index` (refund key for a submarine swap,
    /// claim key for a reverse swap the service owns).
    fn derive_key(&self, index: u32) -> Keypair;

    /// A fresh destination address of the given output type, for claim
    /// and refund transaction outputs.
    fn get_new_address(&self, output_type: OutputType) -> BoxFuture<'_, Address>;

    /// Fund a reverse swap's lockup address.
    fn send_to_address(
        &self,
        address: Address,
        output_type: OutputType,
        is_sh: bool,
        amount: Amount,
        fee_rate_sat_per_vbyte: u64,
        send_all: bool,
    ) -> BoxFuture<'_, (Transaction, u32)>;

    fn get_balance(&self) -> BoxFuture<'_, Amount>;
}
