//! The Nursery itself: owns every collaborator, creates swaps, and
//! dispatches Chain Observer / Lightning Adapter events into the
//! submarine and reverse state machines. It is the authority that
//! *emits* swap statuses rather than reacting to someone else's.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bitcoin::{Address, Network, OutPoint, PublicKey, ScriptBuf, Transaction};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use swap_chain::{ChainClient, ChainEvent, ChainObserver};
use swap_events::EventBus;
use swap_fees::{FeeEstimator, RateProvider};
use swap_lightning::{LightningAdapter, LightningNotification};
use swap_repository::SwapRepository;
use swap_script::Wallet;
use swap_types::{OrderSide, Pair, Preimage, PreimageHash, ReverseSwap, Swap, SwapId, SwapKind, SwapStatus};

use crate::error::NurseryError;
use crate::locks::SwapLocks;
use crate::{reverse, submarine, timeout};

/// Lightning payment attempt timeout, absent a per-invoice expiry to
/// bound it against — the ideal bound is `min(invoice expiry, swap
/// timeout block ETA)`, but the invoice-expiry half needs a parser this
/// workspace doesn't carry, so only the fixed half is implemented; see
/// DESIGN.md.
const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Nursery {
    pub(crate) repository: SwapRepository,
    pub(crate) chain_observer: Arc<ChainObserver>,
    pub(crate) chain_client: Arc<dyn ChainClient>,
    pub(crate) lightning: Arc<dyn LightningAdapter>,
    pub(crate) events: EventBus,
    pub(crate) rates: Arc<dyn RateProvider>,
    pub(crate) fees: Arc<dyn FeeEstimator>,
    pub(crate) wallet: Arc<dyn Wallet>,
    pub(crate) locks: SwapLocks,
    pub(crate) network: Network,
    pub(crate) payment_timeout: Duration,
    pub(crate) cancellations: Mutex<HashMap<SwapId, CancellationToken>>,
}

impl Nursery {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: SwapRepository,
        chain_observer: Arc<ChainObserver>,
        chain_client: Arc<dyn ChainClient>,
        lightning: Arc<dyn LightningAdapter>,
        events: EventBus,
        rates: Arc<dyn RateProvider>,
        fees: Arc<dyn FeeEstimator>,
        wallet: Arc<dyn Wallet>,
        network: Network,
    ) -> Arc<Self> {
        Arc::new(Self {
            repository,
            chain_observer,
            chain_client,
            lightning,
            events,
            rates,
            fees,
            wallet,
            locks: SwapLocks::new(),
            network,
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
            cancellations: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_payment_timeout(mut self, payment_timeout: Duration) -> Self {
        self.payment_timeout = payment_timeout;
        self
    }

    /// Restart recovery: re-register every pending swap's lockup address
    /// and lockup transaction id into the Observer's filter sets, then
    /// rescan from the lowest block height any pending swap could
    /// plausibly have first appeared at. `Swap`/`ReverseSwap` have no
    /// stored creation height, so the floor used here is the current
    /// tip minus a generous lookback window rather than a precise
    /// per-swap value — see DESIGN.md's open-question resolution.
    pub async fn init(nursery: &Arc<Nursery>, rescan_lookback: u32) -> Result<(), NurseryError> {
        let pending = nursery.repository.pending_swaps().await?;
        for swap in &pending {
            if let Ok(address) = Address::from_str(&swap.lockup_address) {
                if let Ok(address) = address.require_network(nursery.network) {
                    nursery.chain_observer.watch_output(address.script_pubkey()).await;
                }
            }
            if let (Some(txid), Some(vout)) = (&swap.lockup_transaction_id, swap.lockup_vout) {
                if let Ok(txid) = bitcoin::Txid::from_str(txid) {
                    nursery.chain_observer.watch_input(OutPoint { txid, vout }).await;
                }
            }
        }

        let pending_reverse = nursery.repository.pending_reverse_swaps().await?;
        for reverse in &pending_reverse {
            if let Ok(address) = Address::from_str(&reverse.lockup_address) {
                if let Ok(address) = address.require_network(nursery.network) {
                    nursery.chain_observer.watch_output(address.script_pubkey()).await;
                }
            }
        }

        if pending.is_empty() && pending_reverse.is_empty() {
            return Ok(());
        }

        let info = nursery.chain_client.get_blockchain_info().await?;
        let start_height = info.height.saturating_sub(rescan_lookback);
        tracing::info!(start_height, pending = pending.len(), pending_reverse = pending_reverse.len(), "rescanning for swaps recovered on restart");
        nursery.chain_observer.rescan(start_height).await?;
        Ok(())
    }

    /// Cancels every in-flight Lightning payment attempt. No implicit
    /// teardown — callers must invoke this explicitly.
    pub async fn shutdown(nursery: &Arc<Nursery>) {
        let mut cancellations = nursery.cancellations.lock().await;
        for (_, token) in cancellations.drain() {
            token.cancel();
        }
    }

    /// Subscribes to the Chain Observer and Lightning Adapter and spawns
    /// the two dispatch loops that drive every swap's state machine.
    pub fn spawn_event_loops(nursery: &Arc<Nursery>) {
        let chain_nursery = Arc::clone(nursery);
        let mut chain_rx = nursery.chain_observer.subscribe();
        tokio::spawn(async move {
            loop {
                match chain_rx.recv().await {
                    Ok(event) => {
                        if let Err(err) = Nursery::handle_chain_event(&chain_nursery, event).await {
                            tracing::error!(%err, kind = %err.kind(), "error handling chain event");
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "chain event receiver lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let lightning_nursery = Arc::clone(nursery);
        let mut lightning_rx = nursery.lightning.subscribe();
        tokio::spawn(async move {
            loop {
                match lightning_rx.recv().await {
                    Ok(notification) => {
                        if let Err(err) = Nursery::handle_lightning_notification(&lightning_nursery, notification).await {
                            tracing::error!(%err, kind = %err.kind(), "error handling lightning notification");
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "lightning notification receiver lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    pub async fn handle_chain_event(nursery: &Arc<Nursery>, event: ChainEvent) -> Result<(), NurseryError> {
        match event {
            ChainEvent::Transaction { tx, confirmed } => Nursery::dispatch_transaction(nursery, tx, confirmed).await,
            ChainEvent::Block { height, .. } => timeout::on_block(nursery, height).await,
        }
    }

    async fn dispatch_transaction(nursery: &Arc<Nursery>, tx: Transaction, confirmed: bool) -> Result<(), NurseryError> {
        for (vout, output) in tx.output.iter().enumerate() {
            let Ok(address) = Address::from_script(&output.script_pubkey, nursery.network) else {
                continue;
            };
            let address = address.to_string();

            if let Some(swap) = nursery.repository.get_swap_by_lockup_address(&address).await? {
                submarine::on_funding_output(nursery, swap.id, tx.clone(), confirmed, vout as u32, output.value.to_sat()).await?;
            }
            if let Some(reverse_swap) = nursery.repository.get_reverse_swap_by_lockup_address(&address).await? {
                reverse::on_confirmation(nursery, reverse_swap.id, confirmed).await?;
            }
        }

        for input in &tx.input {
            let txid = input.previous_output.txid.to_string();
            if let Some(reverse_swap) = nursery.repository.get_reverse_swap_by_lockup_transaction_id(&txid).await? {
                reverse::on_claim_transaction(nursery, reverse_swap.id, tx.clone()).await?;
            }
        }

        Ok(())
    }

    pub async fn handle_lightning_notification(nursery: &Arc<Nursery>, notification: LightningNotification) -> Result<(), NurseryError> {
        match notification {
            LightningNotification::HtlcAccepted { preimage_hash, .. } => reverse::on_htlc_accepted(nursery, preimage_hash).await,
            LightningNotification::InvoiceSettled { .. }
            | LightningNotification::InvoicePaid { .. }
            | LightningNotification::InvoiceFailedToPay { .. }
            | LightningNotification::ChannelBackup { .. } => Ok(()),
        }
    }

    /// Builds the submarine HTLC, persists `SwapCreated`, and registers
    /// the lockup address with the Chain Observer. Funding, invoice
    /// payment, and claim all happen later, event-driven.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_submarine_swap(
        nursery: &Arc<Nursery>,
        id: SwapId,
        pair: Pair,
        order_side: OrderSide,
        invoice: String,
        preimage_hash: PreimageHash,
        refund_public_key: PublicKey,
        output_type: swap_types::OutputType,
        invoice_amount_sat: u64,
        key_index: u32,
        min_safety_delta: u64,
        accept_zero_conf: bool,
    ) -> Result<Swap, NurseryError> {
        let rate = nursery.rates.quote(&pair).ok_or_else(|| NurseryError::NoRate(pair.to_string()))?;
        let percentage_fee_sat = percentage_fee_sat(invoice_amount_sat, rate.percentage_fee);
        let expected_amount = Swap::expected_amount(invoice_amount_sat, rate.rate, rate.base_fee_sat, percentage_fee_sat);

        let claim_keypair = nursery.wallet.derive_key(key_index);
        let claim_public_key = PublicKey::new(claim_keypair.public_key());

        let info = nursery.chain_client.get_blockchain_info().await?;
        let timeout_block_height = info.height as u64 + min_safety_delta;
        let redeem_script = swap_script::redeem_script::submarine(&claim_public_key, &refund_public_key, &preimage_hash, timeout_block_height as u32);
        let lockup_address = swap_script::address::lockup_address(&redeem_script, output_type, nursery.network)?;

        let swap = Swap {
            id,
            pair,
            order_side,
            invoice,
            preimage_hash,
            redeem_script: redeem_script.to_bytes(),
            lockup_address: lockup_address.to_string(),
            output_type,
            key_index,
            expected_amount,
            accept_zero_conf,
            timeout_block_height,
            status: SwapStatus::SwapCreated,
            lockup_transaction_id: None,
            lockup_vout: None,
            onchain_amount: None,
            miner_fee: None,
            percentage_fee: percentage_fee_sat,
        };
        nursery.repository.upsert_swap(&swap).await?;
        nursery.chain_observer.watch_output(lockup_address.script_pubkey()).await;
        nursery.events.publish_update(swap_events::update_for(swap.id.clone(), SwapKind::Submarine, swap.status));
        Ok(swap)
    }

    /// Builds the reverse HTLC, persists it, then immediately broadcasts
    /// the service's own lockup funding transaction.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_reverse_swap(
        nursery: &Arc<Nursery>,
        id: SwapId,
        pair: Pair,
        order_side: OrderSide,
        invoice: String,
        preimage_hash: PreimageHash,
        claim_public_key: PublicKey,
        output_type: swap_types::OutputType,
        invoice_amount_sat: u64,
        key_index: u32,
        min_safety_delta: u64,
    ) -> Result<ReverseSwap, NurseryError> {
        let rate = nursery.rates.quote(&pair).ok_or_else(|| NurseryError::NoRate(pair.to_string()))?;
        let percentage_fee_sat = percentage_fee_sat(invoice_amount_sat, rate.percentage_fee);
        let onchain_amount = ReverseSwap::onchain_amount(invoice_amount_sat, rate.rate, rate.base_fee_sat, percentage_fee_sat)
            .ok_or_else(|| NurseryError::Other(anyhow::anyhow!("reverse swap amount is non-positive after fees")))?;

        let refund_keypair = nursery.wallet.derive_key(key_index);
        let refund_public_key = PublicKey::new(refund_keypair.public_key());

        let info = nursery.chain_client.get_blockchain_info().await?;
        let timeout_block_height = info.height as u64 + min_safety_delta;
        let redeem_script = swap_script::redeem_script::reverse(&claim_public_key, &refund_public_key, &preimage_hash, timeout_block_height as u32);
        let lockup_address = swap_script::address::lockup_address(&redeem_script, output_type, nursery.network)?;

        let mut reverse_swap = ReverseSwap {
            id,
            pair,
            order_side,
            invoice,
            preimage_hash,
            preimage: None,
            redeem_script: redeem_script.to_bytes(),
            lockup_address: lockup_address.to_string(),
            output_type,
            key_index,
            claim_public_key: claim_public_key.to_bytes(),
            onchain_amount,
            invoice_amount: invoice_amount_sat,
            timeout_block_height,
            status: SwapStatus::SwapCreated,
            transaction_id: None,
            miner_fee: None,
            percentage_fee: percentage_fee_sat,
        };
        nursery.repository.upsert_reverse_swap(&reverse_swap).await?;

        let fee_rate = nursery.fees.sat_per_vbyte(1).sat_per_vbyte;
        let (tx, vout) = nursery
            .wallet
            .send_to_address(lockup_address.clone(), output_type, false, bitcoin::Amount::from_sat(onchain_amount), fee_rate, false)
            .await?;

        match nursery.chain_client.send_raw_transaction(tx.clone()).await {
            Ok(_) => {
                reverse_swap.transaction_id = Some(tx.compute_txid().to_string());
                reverse_swap.status = SwapStatus::TransactionMempool;
                nursery.repository.upsert_reverse_swap(&reverse_swap).await?;
                nursery.chain_observer.watch_output(lockup_address.script_pubkey()).await;
                nursery.chain_observer.watch_input(OutPoint { txid: tx.compute_txid(), vout }).await;
                nursery.events.publish_update(swap_events::update_for(reverse_swap.id.clone(), SwapKind::Reverse, reverse_swap.status));
            }
            Err(err) => {
                reverse_swap.status = SwapStatus::TransactionFailed;
                nursery.repository.upsert_reverse_swap(&reverse_swap).await?;
                nursery.events.publish_outcome(swap_events::SwapOutcome::Failure {
                    id: reverse_swap.id.clone(),
                    is_reverse: true,
                    reason: err.to_string(),
                });
                return Err(err.into());
            }
        }

        Ok(reverse_swap)
    }

    pub(crate) async fn transition_submarine(&self, swap: &mut Swap, to: SwapStatus) -> Result<(), NurseryError> {
        if !SwapStatus::is_valid_transition(SwapKind::Submarine, swap.status, to) {
            return Err(NurseryError::InvalidTransition {
                id: swap.id.to_string(),
                from: swap.status,
                to,
            });
        }
        swap.status = to;
        self.repository.upsert_swap(swap).await?;
        tracing::info!(swap_id = %swap.id, status = %to, "submarine swap transitioned");
        self.events.publish_update(swap_events::update_for(swap.id.clone(), SwapKind::Submarine, to));
        Ok(())
    }

    pub(crate) async fn transition_reverse(&self, swap: &mut ReverseSwap, to: SwapStatus) -> Result<(), NurseryError> {
        if !SwapStatus::is_valid_transition(SwapKind::Reverse, swap.status, to) {
            return Err(NurseryError::InvalidTransition {
                id: swap.id.to_string(),
                from: swap.status,
                to,
            });
        }
        swap.status = to;
        self.repository.upsert_reverse_swap(swap).await?;
        tracing::info!(swap_id = %swap.id, status = %to, "reverse swap transitioned");
        self.events.publish_update(swap_events::update_for(swap.id.clone(), SwapKind::Reverse, to));
        Ok(())
    }
}

/// Converts the Fee & Rate Oracle's percentage (e.g. `0.005` for 0.5%)
/// into a flat satoshi amount over the invoice amount.
pub(crate) fn percentage_fee_sat(invoice_amount_sat: u64, percentage_fee: f64) -> u64 {
    (invoice_amount_sat as f64 * percentage_fee).round() as u64
}

pub(crate) fn find_vout(tx: &Transaction, script: &ScriptBuf) -> Option<u32> {
    tx.output.iter().position(|o| &o.script_pubkey == script).map(|i| i as u32)
}
