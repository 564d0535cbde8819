//! Relevance-filtered chain observer. Watches a process-wide set of
//! scriptPubKeys and outpoints and turns `rawtx`/`rawblock`/`hashblock`
//! notifications into a typed event stream the nursery subscribes to.

use std::collections::HashSet;
use std::sync::Arc;

use bitcoin::{Block, BlockHash, OutPoint, ScriptBuf, Transaction, Txid};
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::chain_client::ChainClient;
use crate::error::ChainError;

const CHANNEL_CAPACITY: usize = 4096;

#[derive(Debug, Clone)]
pub enum ChainEvent {
    /// A transaction touching a watched output or input entered the
    /// mempool or a block. `confirmed` distinguishes the two; the
    /// mempool sighting for a given txid is always published before
    /// its confirmed sighting, because `handle_block` only runs after
    /// the ingestion loop has already drained mempool notifications for
    /// the same tip.
    Transaction { tx: Transaction, confirmed: bool },
    Block { height: u32, hash: BlockHash },
}

pub struct ChainObserver {
    relevant_outputs: RwLock<HashSet<ScriptBuf>>,
    relevant_inputs: RwLock<HashSet<OutPoint>>,
    seen: Mutex<HashSet<(Txid, bool)>>,
    sender: broadcast::Sender<ChainEvent>,
    client: Arc<dyn ChainClient>,
}

impl ChainObserver {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            relevant_outputs: RwLock::new(HashSet::new()),
            relevant_inputs: RwLock::new(HashSet::new()),
            seen: Mutex::new(HashSet::new()),
            sender,
            client,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.sender.subscribe()
    }

    pub async fn watch_output(&self, script: ScriptBuf) {
        self.relevant_outputs.write().await.insert(script);
    }

    pub async fn unwatch_output(&self, script: &ScriptBuf) {
        self.relevant_outputs.write().await.remove(script);
    }

    pub async fn watch_input(&self, outpoint: OutPoint) {
        self.relevant_inputs.write().await.insert(outpoint);
    }

    pub async fn unwatch_input(&self, outpoint: &OutPoint) {
        self.relevant_inputs.write().await.remove(outpoint);
    }

    async fn is_relevant(&self, tx: &Transaction) -> bool {
        let outputs = self.relevant_outputs.read().await;
        if tx.output.iter().any(|o| outputs.contains(&o.script_pubkey)) {
            return true;
        }
        drop(outputs);

        let inputs = self.relevant_inputs.read().await;
        tx.input.iter().any(|i| inputs.contains(&i.previous_output))
    }

    /// Feeds a single transaction seen in the mempool or a block. A
    /// no-op for transactions that touch none of the watched outputs
    /// or inputs, and idempotent for a transaction already reported at
    /// the same confirmation state (a node may redeliver `rawtx`).
    pub async fn handle_transaction(&self, tx: Transaction, confirmed: bool) {
        if !self.is_relevant(&tx).await {
            return;
        }

        let txid = tx.compute_txid();
        {
            let mut seen = self.seen.lock().await;
            if !seen.insert((txid, confirmed)) {
                return;
            }
        }

        tracing::debug!(%txid, confirmed, "relevant transaction observed");
        let _ = self.sender.send(ChainEvent::Transaction { tx, confirmed });
    }

    /// Feeds a full block: every transaction is reported confirmed,
    /// then the block height itself is published so timeout-driven
    /// consumers (the nursery's expiry scheduler) can react to new
    /// height regardless of whether any swap output was touched.
    pub async fn handle_block(&self, block: Block, height: u32) {
        let hash = block.block_hash();
        for tx in block.txdata {
            self.handle_transaction(tx, true).await;
        }
        let _ = self.sender.send(ChainEvent::Block { height, hash });
    }

    /// Replays confirmed blocks from `start_height` up to the current
    /// tip, for a process that was down for some window and needs to
    /// catch up before serving live notifications. The live
    /// notification path must not be engaged
    /// until this returns, or a block could be double-processed.
    pub async fn rescan(&self, start_height: u32) -> Result<u32, ChainError> {
        let info = self.client.get_blockchain_info().await?;
        let mut height = start_height;
        while height <= info.height {
            let hash = self.client.get_block_hash(height).await?;
            let block = self.client.get_block(hash).await?;
            self.handle_block(block, height).await;
            height += 1;
        }
        Ok(info.height)
    }
}
