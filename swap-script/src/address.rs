//! Lockup address derivation from a redeem script.
//!
//! The default output type is `Compatibility` (P2SH-wrapped P2WSH).
//! Native P2WSH and legacy P2SH are also supported; whichever one is
//! chosen is persisted on the swap so the claim/refund builder knows
//! how to spend it later.

use bitcoin::Address;
use bitcoin::Network;
use bitcoin::Script;

use swap_types::OutputType;

use crate::error::BuilderError;

pub fn lockup_address(
    redeem_script: &Script,
    output_type: OutputType,
    network: Network,
) -> Result<Address, BuilderError> {
    match output_type {
        OutputType::P2wsh => Ok(Address::p2wsh(redeem_script, network)),
        OutputType::P2shP2wsh => Ok(Address::p2shwsh(redeem_script, network)),
        OutputType::P2sh => {
            Address::p2sh(redeem_script, network).map_err(|_| BuilderError::RedeemScriptTooLarge)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redeem_script;
    use bitcoin::secp256k1::Secp256k1;
    use bitcoin::secp256k1::SecretKey;
    use bitcoin::PublicKey;
    use swap_types::PreimageHash;

    fn script() -> bitcoin::ScriptBuf {
        let secp = Secp256k1::new();
        let claim = PublicKey::new(SecretKey::from_slice(&[1u8; 32]).unwrap().public_key(&secp));
        let refund = PublicKey::new(SecretKey::from_slice(&[2u8; 32]).unwrap().public_key(&secp));
        let hash = PreimageHash::from_sha256_bytes([3u8; 32]);
        redeem_script::submarine(&claim, &refund, &hash, 700_000)
    }

    #[test]
    fn each_output_type_yields_a_distinct_address() {
        let script = script();
        let p2wsh = lockup_address(&script, OutputType::P2wsh, Network::Regtest).unwrap();
        let p2shwsh = lockup_address(&script, OutputType::P2shP2wsh, Network::Regtest).unwrap();
        let p2sh = lockup_address(&script, OutputType::P2sh, Network::Regtest).unwrap();
        assert_ne!(p2wsh.to_string(), p2shwsh.to_string());
        assert_ne!(p2shwsh.to_string(), p2sh.to_string());
    }
}
