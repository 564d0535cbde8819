//! Claim and refund transaction construction.
//!
//! Both transactions have a single input spending the lockup output and
//! a single output to a wallet-owned address. The only differences are
//! the witness stack's middle element (preimage for claim, `OP_0` for
//! refund), `nLockTime`/`nSequence`, and which signature a `Signer`
//! produces over the BIP143 sighash.

use bitcoin::absolute::LockTime;
use bitcoin::blockdata::script::Builder;
use bitcoin::blockdata::script::PushBytesBuf;
use bitcoin::ecdsa;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::Message;
use bitcoin::sighash::EcdsaSighashType;
use bitcoin::sighash::SighashCache;
use bitcoin::transaction::Version;
use bitcoin::Address;
use bitcoin::Amount;
use bitcoin::OutPoint;
use bitcoin::ScriptBuf;
use bitcoin::Sequence;
use bitcoin::Transaction;
use bitcoin::TxIn;
use bitcoin::TxOut;
use bitcoin::Witness;

use swap_types::OutputType;

use crate::error::BuilderError;

/// Minimum fee rate floor: never go below this regardless of what the
/// estimator reports.
pub const MIN_SAT_PER_VBYTE: u64 = 2;

/// Something that can produce an ECDSA signature over a sighash for the
/// refund/claim key. Kept abstract: the actual key material and
/// derivation live in the wallet collaborator, out of scope here.
pub trait Signer {
    fn sign_ecdsa(&self, sighash: [u8; 32]) -> Result<ecdsa::Signature, BuilderError>;
}

/// Rough weight of the spend data, used to size the fee before the real
/// signature is known (a DER signature is at most 72 bytes; we budget
/// for the worst case so the final, possibly-shorter signature never
/// leaves the tx underpaying). Only the native-segwit case gets the
/// witness discount; `P2shP2wsh` pays full weight for its scriptSig
/// wrapper and `P2sh` pays full weight for everything.
fn estimate_vsize(redeem_script: &ScriptBuf, has_preimage: bool, output_type: OutputType) -> u64 {
    let preimage_len = if has_preimage { 33 } else { 1 }; // push(32) vs OP_0
    let stack_weight = 1 // item count
        + 1 + 72 + 1 // signature push + sighash byte
        + preimage_len
        + 3 + redeem_script.len(); // redeem script push (len-prefixed)
    let base_weight = 4 * (
        4 // version
        + 1 + 36 + 4 // input count + outpoint + sequence
        + 1 + 8 + 1 + 34 // output count + value + scriptPubKey push
        + 4 // locktime
    );
    match output_type {
        OutputType::P2wsh => ((base_weight + stack_weight + 3) / 4) as u64,
        OutputType::P2shP2wsh => {
            let script_sig_weight = 4 * 35; // push of the 34-byte witness program
            ((base_weight + script_sig_weight + stack_weight + 3) / 4) as u64
        }
        OutputType::P2sh => {
            let script_sig_weight = 4 * stack_weight; // whole stack in scriptSig, no witness discount
            ((base_weight + script_sig_weight + 3) / 4) as u64
        }
    }
}

pub struct TransactionParams<'a> {
    pub lockup_outpoint: OutPoint,
    pub lockup_value: Amount,
    pub redeem_script: &'a ScriptBuf,
    pub destination: &'a Address,
    pub fee_rate_sat_per_vbyte: u64,
    pub output_type: OutputType,
}

fn build_unsigned(params: &TransactionParams<'_>, lock_time: LockTime, sequence: Sequence) -> (Transaction, u64) {
    let fee_rate = params.fee_rate_sat_per_vbyte.max(MIN_SAT_PER_VBYTE);
    let vsize = estimate_vsize(params.redeem_script, sequence == Sequence::MAX, params.output_type);
    let fee = vsize * fee_rate;
    let output_value = params.lockup_value.to_sat().saturating_sub(fee);

    let tx = Transaction {
        version: Version::TWO,
        lock_time,
        input: vec![TxIn {
            previous_output: params.lockup_outpoint,
            script_sig: ScriptBuf::new(),
            sequence,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(output_value),
            script_pubkey: params.destination.script_pubkey(),
        }],
    };
    (tx, fee)
}

/// Signs and finalizes the spend for a native or wrapped segwit output:
/// BIP143 sighash over the witness script, witness stack `<sig>
/// <preimage-or-empty> <redeemScript>`. For `P2shP2wsh` the scriptSig
/// additionally carries the sole push of the witness program, since
/// that is what makes the P2SH wrapper itself valid.
fn sign_and_finalize_segwit(
    mut tx: Transaction,
    params: &TransactionParams<'_>,
    preimage_or_zero: Option<[u8; 32]>,
    signer: &dyn Signer,
) -> Result<Transaction, BuilderError> {
    let mut cache = SighashCache::new(&tx);
    let sighash = cache
        .p2wsh_signature_hash(
            0,
            params.redeem_script,
            params.lockup_value,
            EcdsaSighashType::All,
        )
        .map_err(|e| BuilderError::Signing(e.to_string()))?;

    let signature = signer.sign_ecdsa(sighash.to_byte_array())?;
    let der_sig = ecdsa::Signature {
        signature: signature.signature,
        sighash_type: EcdsaSighashType::All,
    };

    let mut witness = Witness::new();
    witness.push(der_sig.to_vec());
    match preimage_or_zero {
        Some(preimage) => witness.push(preimage),
        None => witness.push(Vec::new()),
    }
    witness.push(params.redeem_script.as_bytes());
    tx.input[0].witness = witness;

    if params.output_type == OutputType::P2shP2wsh {
        let program = params.redeem_script.to_p2wsh();
        let push = PushBytesBuf::try_from(program.into_bytes()).expect("a 34-byte witness program fits a script push");
        tx.input[0].script_sig = Builder::new().push_slice(push).into_script();
    }
    Ok(tx)
}

/// Signs and finalizes the spend for a legacy `P2sh` output: sighash is
/// computed over the redeem script standing in as the legacy
/// `scriptCode`, and the whole stack (`<sig> <preimage-or-empty>
/// <redeemScript>`) lives in scriptSig. No witness.
fn sign_and_finalize_legacy(
    mut tx: Transaction,
    params: &TransactionParams<'_>,
    preimage_or_zero: Option<[u8; 32]>,
    signer: &dyn Signer,
) -> Result<Transaction, BuilderError> {
    let cache = SighashCache::new(&tx);
    let sighash = cache
        .legacy_signature_hash(0, params.redeem_script, EcdsaSighashType::All.to_u32())
        .map_err(|e| BuilderError::Signing(e.to_string()))?;

    let signature = signer.sign_ecdsa(sighash.to_byte_array())?;
    let der_sig = ecdsa::Signature {
        signature: signature.signature,
        sighash_type: EcdsaSighashType::All,
    };

    let preimage_push = match preimage_or_zero {
        Some(preimage) => PushBytesBuf::try_from(preimage.to_vec()).expect("a 32-byte preimage fits a script push"),
        None => PushBytesBuf::new(),
    };
    let script_sig = Builder::new()
        .push_slice(PushBytesBuf::try_from(der_sig.to_vec()).expect("a DER signature fits a script push"))
        .push_slice(preimage_push)
        .push_slice(PushBytesBuf::try_from(params.redeem_script.to_bytes()).expect("the redeem script fits a script push"))
        .into_script();

    tx.input[0].script_sig = script_sig;
    Ok(tx)
}

fn sign_and_finalize(
    tx: Transaction,
    params: &TransactionParams<'_>,
    preimage_or_zero: Option<[u8; 32]>,
    signer: &dyn Signer,
) -> Result<Transaction, BuilderError> {
    match params.output_type {
        OutputType::P2wsh | OutputType::P2shP2wsh => sign_and_finalize_segwit(tx, params, preimage_or_zero, signer),
        OutputType::P2sh => sign_and_finalize_legacy(tx, params, preimage_or_zero, signer),
    }
}

/// Claim transaction: `nLockTime = 0`, `nSequence = 0xffffffff`, witness
/// is `<sig> <preimage> <redeemScript>`.
pub fn build_claim(
    params: &TransactionParams<'_>,
    preimage: [u8; 32],
    signer: &dyn Signer,
) -> Result<Transaction, BuilderError> {
    if params.lockup_value.to_sat() == 0 {
        return Err(BuilderError::InsufficientAmount {
            available: 0,
            required: 1,
        });
    }
    let (tx, _fee) = build_unsigned(params, LockTime::ZERO, Sequence::MAX);
    sign_and_finalize(tx, params, Some(preimage), signer)
}

/// Refund transaction: `nLockTime = timeoutHeight`, `nSequence =
/// 0xfffffffe` (enables CLTV), witness is `<sig> OP_0 <redeemScript>`.
pub fn build_refund(
    params: &TransactionParams<'_>,
    timeout_block_height: u32,
    signer: &dyn Signer,
) -> Result<Transaction, BuilderError> {
    let lock_time = LockTime::from_height(timeout_block_height)
        .map_err(|e| BuilderError::Signing(e.to_string()))?;
    let (tx, _fee) = build_unsigned(params, lock_time, Sequence::ENABLE_LOCKTIME_NO_RBF);
    sign_and_finalize(tx, params, None, signer)
}
