//! Submarine swap transitions: `SwapCreated` → `TransactionMempool` →
//! `TransactionConfirmed` → `InvoicePending` → `InvoicePaid` →
//! `TransactionClaimed`, with `InvoiceFailedToPay` and `SwapExpired` as
//! the failure branches.

use std::str::FromStr;
use std::sync::Arc;

use bitcoin::{Amount, OutPoint, ScriptBuf, Transaction, Txid};
use lightning::bolt11_invoice::Bolt11Invoice;
use tokio_util::sync::CancellationToken;

use swap_chain::ChainClient;
use swap_script::TransactionParams;
use swap_types::{Preimage, Swap, SwapId, SwapKind, SwapStatus};

use crate::error::NurseryError;
use crate::nursery::Nursery;
use crate::signer::KeypairSigner;
use crate::zero_conf;

/// Fired for every sighting of the lockup output, mempool or confirmed.
/// Idempotent: re-applying the same transition is a no-op.
pub(crate) async fn on_funding_output(
    nursery: &Arc<Nursery>,
    swap_id: SwapId,
    tx: Transaction,
    confirmed: bool,
    vout: u32,
    value_sat: u64,
) -> Result<(), NurseryError> {
    let _guard = nursery.locks.acquire_swap(&swap_id).await;
    let Some(mut swap) = nursery.repository.get_swap(&swap_id).await? else {
        return Ok(());
    };
    if swap.status.is_terminal(SwapKind::Submarine) {
        return Ok(());
    }

    swap.lockup_transaction_id = Some(tx.compute_txid().to_string());
    swap.lockup_vout = Some(vout);
    swap.onchain_amount = Some(value_sat);

    if swap.status == SwapStatus::SwapCreated {
        nursery.transition_submarine(&mut swap, SwapStatus::TransactionMempool).await?;
        nursery.chain_observer.watch_input(OutPoint { txid: tx.compute_txid(), vout }).await;
    } else {
        // Persist the (possibly updated) lockup fields without forcing a
        // status transition — re-sightings of the same mempool tx land here.
        nursery.repository.upsert_swap(&swap).await?;
    }

    if swap.status.is_terminal(SwapKind::Submarine) || swap.status == SwapStatus::TransactionConfirmed {
        return Ok(());
    }

    let accept_now = if confirmed {
        true
    } else if !swap.accept_zero_conf {
        false
    } else {
        let Some(rate) = nursery.rates.quote(&swap.pair) else {
            return Ok(());
        };
        let fee_rate = nursery.fees.sat_per_vbyte(1);
        let tx_fee_rate = funding_tx_fee_rate_sat_per_vbyte(nursery, &tx).await?;
        let decision = zero_conf::evaluate(
            &tx,
            value_sat,
            swap.expected_amount,
            swap.accept_zero_conf,
            rate.zero_conf_risk_cap_sat,
            tx_fee_rate,
            fee_rate.sat_per_vbyte,
        );
        if !decision.accepted {
            if let Some(reason) = decision.reason {
                tracing::debug!(swap_id = %swap.id, reason, "zero-conf not accepted for this sighting");
            }
        }
        decision.accepted
    };

    if !accept_now {
        return Ok(());
    }
    if !swap.covers_expected_amount(value_sat) {
        tracing::warn!(swap_id = %swap.id, value_sat, expected = swap.expected_amount, "lockup confirmed but underfunded, swap will expire");
        return Ok(());
    }

    nursery.transition_submarine(&mut swap, SwapStatus::TransactionConfirmed).await?;
    tokio::spawn(pay_and_claim(Arc::clone(nursery), swap));
    Ok(())
}

/// Pays the invoice and, on success, builds/signs/broadcasts the claim
/// transaction. Runs as its own task so the event-dispatch loop is
/// never blocked on a Lightning round trip — a short-lived task,
/// mutually excluded per swap id, not a long-lived per-swap worker.
async fn pay_and_claim(nursery: Arc<Nursery>, mut swap: Swap) {
    let id = swap.id.clone();
    if let Err(err) = pay_and_claim_inner(&nursery, &mut swap).await {
        tracing::error!(swap_id = %id, %err, kind = %err.kind(), "submarine payment/claim flow failed");
    }
}

async fn pay_and_claim_inner(nursery: &Arc<Nursery>, swap: &mut Swap) -> Result<(), NurseryError> {
    {
        let _guard = nursery.locks.acquire_swap(&swap.id).await;
        let Some(latest) = nursery.repository.get_swap(&swap.id).await? else {
            return Ok(());
        };
        *swap = latest;
        if swap.status != SwapStatus::TransactionConfirmed {
            return Ok(());
        }
        nursery.transition_submarine(swap, SwapStatus::InvoicePending).await?;
    }

    let invoice = Bolt11Invoice::from_str(&swap.invoice).map_err(|e| NurseryError::Other(anyhow::anyhow!("invalid invoice on swap {}: {e}", swap.id)))?;
    let token = CancellationToken::new();
    nursery.cancellations.lock().await.insert(swap.id.clone(), token.clone());
    let payment = nursery.lightning.pay_invoice(&invoice, nursery.payment_timeout, token).await;
    nursery.cancellations.lock().await.remove(&swap.id);

    let _guard = nursery.locks.acquire_swap(&swap.id).await;
    let Some(latest) = nursery.repository.get_swap(&swap.id).await? else {
        return Ok(());
    };
    *swap = latest;
    if swap.status.is_terminal(SwapKind::Submarine) {
        return Ok(());
    }

    match payment {
        Ok(result) => {
            nursery.transition_submarine(swap, SwapStatus::InvoicePaid).await?;
            claim(nursery, swap, result.preimage).await
        }
        Err(err) => {
            tracing::warn!(swap_id = %swap.id, %err, "invoice payment failed");
            nursery.transition_submarine(swap, SwapStatus::InvoiceFailedToPay).await?;
            nursery.events.publish_outcome(swap_events::SwapOutcome::Failure {
                id: swap.id.clone(),
                is_reverse: false,
                reason: err.to_string(),
            });
            Ok(())
        }
    }
}

/// Looks up every input's prevout to compute the funding transaction's
/// actual fee rate, rather than trusting the sender's own assertion.
async fn funding_tx_fee_rate_sat_per_vbyte(nursery: &Arc<Nursery>, tx: &Transaction) -> Result<u64, NurseryError> {
    let mut input_sum = 0u64;
    for input in &tx.input {
        let prev_tx = nursery.chain_client.get_raw_transaction(input.previous_output.txid).await?;
        let prevout = prev_tx.output.get(input.previous_output.vout as usize).ok_or_else(|| {
            NurseryError::Other(anyhow::anyhow!(
                "prevout {} missing from its own funding transaction",
                input.previous_output
            ))
        })?;
        input_sum += prevout.value.to_sat();
    }
    let output_sum: u64 = tx.output.iter().map(|o| o.value.to_sat()).sum();
    let fee = input_sum.saturating_sub(output_sum);
    let vsize = tx.vsize() as u64;
    Ok(if vsize == 0 { 0 } else { fee / vsize })
}

async fn claim(nursery: &Arc<Nursery>, swap: &mut Swap, preimage: Preimage) -> Result<(), NurseryError> {
    let txid_str = swap
        .lockup_transaction_id
        .clone()
        .ok_or_else(|| NurseryError::Other(anyhow::anyhow!("swap {} has no lockup transaction to claim", swap.id)))?;
    let txid = Txid::from_str(&txid_str).map_err(|e| NurseryError::Other(anyhow::anyhow!(e)))?;
    let vout = swap
        .lockup_vout
        .ok_or_else(|| NurseryError::Other(anyhow::anyhow!("swap {} has no lockup vout to claim", swap.id)))?;

    let redeem_script = ScriptBuf::from_bytes(swap.redeem_script.clone());
    let lockup_value = Amount::from_sat(swap.onchain_amount.unwrap_or(swap.expected_amount));
    let destination = nursery.wallet.get_new_address(swap.output_type).await?;
    let signer = KeypairSigner(nursery.wallet.derive_key(swap.key_index));
    let fee_rate = nursery.fees.sat_per_vbyte(1).sat_per_vbyte;

    let params = TransactionParams {
        lockup_outpoint: OutPoint { txid, vout },
        lockup_value,
        redeem_script: &redeem_script,
        destination: &destination,
        fee_rate_sat_per_vbyte: fee_rate,
        output_type: swap.output_type,
    };
    let claim_tx = swap_script::transaction::build_claim(&params, *preimage.as_bytes(), &signer)?;
    nursery.chain_client.send_raw_transaction(claim_tx.clone()).await?;

    swap.miner_fee = Some(lockup_value.to_sat().saturating_sub(claim_tx.output[0].value.to_sat()));
    nursery.transition_submarine(swap, SwapStatus::TransactionClaimed).await?;
    nursery.events.publish_outcome(swap_events::SwapOutcome::Success {
        id: swap.id.clone(),
        is_reverse: false,
    });
    Ok(())
}
