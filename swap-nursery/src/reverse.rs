//! Reverse swap transitions: `SwapCreated` → `TransactionMempool` (the
//! service's own lockup, broadcast at creation) → `TransactionConfirmed`
//! → `InvoicePaid` (user's HTLC locked in, `htlc.accepted`) →
//! `InvoiceSettled` (preimage observed on the user's claim, hold-invoice
//! settled).

use std::str::FromStr;
use std::sync::Arc;

use bitcoin::{Address, Transaction};

use swap_types::{Preimage, PreimageHash, SwapId, SwapKind, SwapStatus};

use crate::error::NurseryError;
use crate::nursery::Nursery;

/// The service's own lockup transaction moved from mempool to a block.
pub(crate) async fn on_confirmation(nursery: &Arc<Nursery>, id: SwapId, confirmed: bool) -> Result<(), NurseryError> {
    if !confirmed {
        return Ok(());
    }
    let _guard = nursery.locks.acquire_reverse_swap(&id).await;
    let Some(mut reverse) = nursery.repository.get_reverse_swap(&id).await? else {
        return Ok(());
    };
    if reverse.status != SwapStatus::TransactionMempool {
        return Ok(());
    }
    nursery.transition_reverse(&mut reverse, SwapStatus::TransactionConfirmed).await
}

/// The payer's hold-invoice HTLC locked in; the invoice is deliberately
/// not settled yet — settlement waits for the on-chain claim to prove
/// the preimage was actually obtainable on-chain.
pub(crate) async fn on_htlc_accepted(nursery: &Arc<Nursery>, preimage_hash: PreimageHash) -> Result<(), NurseryError> {
    let Some(mut reverse) = nursery.repository.get_reverse_swap_by_preimage_hash(&preimage_hash.to_hex()).await? else {
        // An HTLC with no matching live swap is never acted on.
        return Ok(());
    };
    let _guard = nursery.locks.acquire_reverse_swap(&reverse.id).await;
    if reverse.status != SwapStatus::TransactionConfirmed {
        return Ok(());
    }
    nursery.transition_reverse(&mut reverse, SwapStatus::InvoicePaid).await
}

/// The user's claim transaction, spending the service's lockup output,
/// reveals the preimage in its witness: `<sig> <preimage> <redeemScript>`.
pub(crate) async fn on_claim_transaction(nursery: &Arc<Nursery>, id: SwapId, tx: Transaction) -> Result<(), NurseryError> {
    let _guard = nursery.locks.acquire_reverse_swap(&id).await;
    let Some(mut reverse) = nursery.repository.get_reverse_swap(&id).await? else {
        return Ok(());
    };
    if reverse.status.is_terminal(SwapKind::Reverse) {
        return Ok(());
    }

    let preimage_bytes = tx
        .input
        .iter()
        .find_map(|input| if input.witness.len() == 3 { input.witness.nth(1).map(|p| p.to_vec()) } else { None })
        .ok_or_else(|| NurseryError::Other(anyhow::anyhow!("claim transaction for swap {} has no preimage witness item", reverse.id)))?;
    if preimage_bytes.len() != 32 {
        return Err(NurseryError::Other(anyhow::anyhow!("claim witness preimage for swap {} is not 32 bytes", reverse.id)));
    }
    let mut preimage_arr = [0u8; 32];
    preimage_arr.copy_from_slice(&preimage_bytes);
    let preimage = Preimage::from_bytes(preimage_arr);

    reverse.preimage = Some(preimage.clone());
    if reverse.status == SwapStatus::TransactionConfirmed {
        nursery.transition_reverse(&mut reverse, SwapStatus::InvoicePaid).await?;
    }

    nursery.lightning.settle_invoice(preimage).await?;
    nursery.transition_reverse(&mut reverse, SwapStatus::InvoiceSettled).await?;
    nursery.events.publish_outcome(swap_events::SwapOutcome::Success {
        id: reverse.id.clone(),
        is_reverse: true,
    });
    Ok(())
}

/// Used by the timeout scheduler to resolve the lockup output's vout
/// when it wasn't retained from creation (e.g. after a restart).
pub(crate) fn lockup_script(reverse: &swap_types::ReverseSwap, network: bitcoin::Network) -> Result<bitcoin::ScriptBuf, NurseryError> {
    Ok(Address::from_str(&reverse.lockup_address)
        .map_err(|e| NurseryError::Other(anyhow::anyhow!(e)))?
        .require_network(network)
        .map_err(|e| NurseryError::Other(anyhow::anyhow!(e)))?
        .script_pubkey())
}
