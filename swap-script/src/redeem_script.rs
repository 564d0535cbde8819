//! HTLC redeem script construction.
//!
//! Submarine and reverse swaps share one shape — a hash-gated claim
//! branch and a CLTV-gated refund branch — but commit to different
//! hashes. The submarine script hashes the preimage the same way the
//! Lightning payment hash does (SHA256) and then RIPEMD160s it again
//! for script compactness; the reverse script's claim branch checks the
//! full SHA256 preimage directly, since the user reveals the 32-byte
//! secret itself to claim.

use bitcoin::blockdata::opcodes::all as op;
use bitcoin::blockdata::script::Builder;
use bitcoin::PublicKey;
use bitcoin::ScriptBuf;

use swap_types::PreimageHash;

/// `OP_HASH160 <ripemd160(sha256(preimage))> OP_EQUAL IF <claim> ELSE
/// <timeout> OP_CLTV OP_DROP <refund> ENDIF OP_CHECKSIG`.
pub fn submarine(
    claim_public_key: &PublicKey,
    refund_public_key: &PublicKey,
    preimage_hash: &PreimageHash,
    timeout_block_height: u32,
) -> ScriptBuf {
    Builder::new()
        .push_opcode(op::OP_HASH160)
        .push_slice(preimage_hash.script_hash())
        .push_opcode(op::OP_EQUAL)
        .push_opcode(op::OP_IF)
        .push_key(claim_public_key)
        .push_opcode(op::OP_ELSE)
        .push_int(timeout_block_height as i64)
        .push_opcode(op::OP_CLTV)
        .push_opcode(op::OP_DROP)
        .push_key(refund_public_key)
        .push_opcode(op::OP_ENDIF)
        .push_opcode(op::OP_CHECKSIG)
        .into_script()
}

/// `OP_SHA256 <sha256(preimage)> OP_EQUAL IF <claim> ELSE <timeout>
/// OP_CLTV OP_DROP <refund> ENDIF OP_CHECKSIG`.
pub fn reverse(
    claim_public_key: &PublicKey,
    refund_public_key: &PublicKey,
    preimage_hash: &PreimageHash,
    timeout_block_height: u32,
) -> ScriptBuf {
    Builder::new()
        .push_opcode(op::OP_SHA256)
        .push_slice(preimage_hash.sha256())
        .push_opcode(op::OP_EQUAL)
        .push_opcode(op::OP_IF)
        .push_key(claim_public_key)
        .push_opcode(op::OP_ELSE)
        .push_int(timeout_block_height as i64)
        .push_opcode(op::OP_CLTV)
        .push_opcode(op::OP_DROP)
        .push_key(refund_public_key)
        .push_opcode(op::OP_ENDIF)
        .push_opcode(op::OP_CHECKSIG)
        .into_script()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::secp256k1::Secp256k1;
    use bitcoin::secp256k1::SecretKey;

    fn test_keys() -> (PublicKey, PublicKey) {
        let secp = Secp256k1::new();
        let claim = SecretKey::from_slice(&[1u8; 32]).unwrap();
        let refund = SecretKey::from_slice(&[2u8; 32]).unwrap();
        (
            PublicKey::new(claim.public_key(&secp)),
            PublicKey::new(refund.public_key(&secp)),
        )
    }

    #[test]
    fn submarine_script_embeds_the_20_byte_script_hash() {
        let (claim, refund) = test_keys();
        let hash = PreimageHash::from_sha256_bytes([9u8; 32]);
        let script = submarine(&claim, &refund, &hash, 700_000);
        let bytes = script.to_bytes();
        let needle = hash.script_hash();
        assert!(bytes.windows(20).any(|w| w == needle));
    }

    #[test]
    fn reverse_script_embeds_the_32_byte_sha256_hash() {
        let (claim, refund) = test_keys();
        let hash = PreimageHash::from_sha256_bytes([9u8; 32]);
        let script = reverse(&claim, &refund, &hash, 700_000);
        let bytes = script.to_bytes();
        let needle = hash.sha256();
        assert!(bytes.windows(32).any(|w| w == needle));
    }
}
