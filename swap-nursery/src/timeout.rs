//! Timeout scheduler: driven by the Chain Observer's `Block` events,
//! not by a per-swap sleeping task — persist intent, react on event
//! arrival, never hold a task suspended for hours.

use std::str::FromStr;
use std::sync::Arc;

use bitcoin::{Amount, OutPoint, ScriptBuf, Txid};

use swap_chain::ChainClient;
use swap_script::TransactionParams;
use swap_types::{ReverseSwap, Swap, SwapKind, SwapStatus};

use crate::error::NurseryError;
use crate::nursery::{find_vout, Nursery};
use crate::reverse::lockup_script;
use crate::signer::KeypairSigner;

pub(crate) async fn on_block(nursery: &Arc<Nursery>, height: u32) -> Result<(), NurseryError> {
    for swap in nursery.repository.pending_swaps().await? {
        if (height as u64) >= swap.timeout_block_height {
            expire_submarine(nursery, swap).await?;
        }
    }
    for reverse in nursery.repository.pending_reverse_swaps().await? {
        if (height as u64) >= reverse.timeout_block_height {
            expire_reverse(nursery, reverse).await?;
        }
    }
    Ok(())
}

/// Submarine expiry is purely advisory from the Nursery's perspective:
/// the user refunds themselves on-chain, so the only action here is
/// cancelling an in-flight payment attempt and recording the terminal
/// state.
async fn expire_submarine(nursery: &Arc<Nursery>, swap: Swap) -> Result<(), NurseryError> {
    let _guard = nursery.locks.acquire_swap(&swap.id).await;
    let Some(mut swap) = nursery.repository.get_swap(&swap.id).await? else {
        return Ok(());
    };
    if swap.status.is_terminal(SwapKind::Submarine) {
        return Ok(());
    }

    if let Some(token) = nursery.cancellations.lock().await.remove(&swap.id) {
        token.cancel();
    }

    nursery.transition_submarine(&mut swap, SwapStatus::SwapExpired).await?;
    nursery.events.publish_outcome(swap_events::SwapOutcome::Failure {
        id: swap.id.clone(),
        is_reverse: false,
        reason: "swap expired before funding was confirmed".to_string(),
    });
    Ok(())
}

/// Reverse expiry is active: the service refunds its own lockup.
async fn expire_reverse(nursery: &Arc<Nursery>, reverse: ReverseSwap) -> Result<(), NurseryError> {
    let _guard = nursery.locks.acquire_reverse_swap(&reverse.id).await;
    let Some(mut reverse) = nursery.repository.get_reverse_swap(&reverse.id).await? else {
        return Ok(());
    };
    if reverse.status.is_terminal(SwapKind::Reverse) {
        return Ok(());
    }

    nursery.transition_reverse(&mut reverse, SwapStatus::SwapExpired).await?;
    let _ = nursery.lightning.cancel_invoice(reverse.preimage_hash.clone()).await;

    let Some(txid_str) = reverse.transaction_id.clone() else {
        return Ok(());
    };
    let txid = Txid::from_str(&txid_str).map_err(|e| NurseryError::Other(anyhow::anyhow!(e)))?;
    let funding_tx = nursery.chain_client.get_raw_transaction(txid).await?;
    let script = lockup_script(&reverse, nursery.network)?;
    let vout = find_vout(&funding_tx, &script).ok_or_else(|| NurseryError::Other(anyhow::anyhow!("lockup output for swap {} not found in its own funding tx", reverse.id)))?;

    let redeem_script = ScriptBuf::from_bytes(reverse.redeem_script.clone());
    let destination = nursery.wallet.get_new_address(reverse.output_type).await?;
    let signer = KeypairSigner(nursery.wallet.derive_key(reverse.key_index));
    let fee_rate = nursery.fees.sat_per_vbyte(1).sat_per_vbyte;

    let params = TransactionParams {
        lockup_outpoint: OutPoint { txid, vout },
        lockup_value: Amount::from_sat(reverse.onchain_amount),
        redeem_script: &redeem_script,
        destination: &destination,
        fee_rate_sat_per_vbyte: fee_rate,
        output_type: reverse.output_type,
    };
    let refund_tx = swap_script::transaction::build_refund(&params, reverse.timeout_block_height as u32, &signer)?;
    nursery.chain_client.send_raw_transaction(refund_tx.clone()).await?;

    reverse.miner_fee = Some(params.lockup_value.to_sat().saturating_sub(refund_tx.output[0].value.to_sat()));
    nursery.transition_reverse(&mut reverse, SwapStatus::TransactionRefunded).await?;
    nursery.events.publish_outcome(swap_events::SwapOutcome::Failure {
        id: reverse.id.clone(),
        is_reverse: true,
        reason: "swap expired, lockup refunded".to_string(),
    });
    Ok(())
}
