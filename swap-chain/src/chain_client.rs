//! Capability trait for the backing chain: boxed futures so the trait
//! stays object-safe behind `Arc<dyn ChainClient>`, since the nursery
//! and the observer both hold the same handle.

use std::future::Future;
use std::pin::Pin;

use bitcoin::{Address, Amount, Block, BlockHash, Transaction, Txid};

use crate::error::ChainError;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ChainError>> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockchainInfo {
    pub height: u32,
    pub best_block_hash: BlockHash,
    pub pruned: bool,
}

/// Everything the observer and the nursery need from the backing node,
/// mirroring the dialect a classic UTXO full node exposes (`getblock`,
/// `sendrawtransaction`, `estimatesmartfee`, ...). Chains that can push
/// ZMQ/websocket notifications set `supports_push_notifications`; those
/// that can't fall back to the observer's poll-driven rescan path.
pub trait ChainClient: Send + Sync {
    fn supports_push_notifications(&self) -> bool;

    /// Whether `get_block` returns full transaction bodies (`verbosity
    /// 2`) or only txids; an adapter answering `false` here must let the
    /// observer fetch each transaction individually.
    fn returns_verbose_blocks(&self) -> bool;

    fn get_blockchain_info(&self) -> BoxFuture<'_, BlockchainInfo>;

    fn get_block_hash(&self, height: u32) -> BoxFuture<'_, BlockHash>;

    fn get_block(&self, hash: BlockHash) -> BoxFuture<'_, Block>;

    fn get_raw_transaction(&self, txid: Txid) -> BoxFuture<'_, Transaction>;

    fn send_raw_transaction(&self, tx: Transaction) -> BoxFuture<'_, Txid>;

    fn estimate_smart_fee(&self, confirmation_target: u32) -> BoxFuture<'_, u64>;

    fn send_to_address(&self, address: Address, amount: Amount) -> BoxFuture<'_, Txid>;
}
