//! Adapts a wallet-derived [`Keypair`] to [`swap_script::Signer`].

use bitcoin::ecdsa;
use bitcoin::secp256k1::{Keypair, Message, Secp256k1};
use bitcoin::sighash::EcdsaSighashType;
use swap_script::{BuilderError, Signer};

pub struct KeypairSigner(pub Keypair);

impl Signer for KeypairSigner {
    fn sign_ecdsa(&self, sighash: [u8; 32]) -> Result<ecdsa::Signature, BuilderError> {
        let secp = Secp256k1::new();
        let message = Message::from_digest(sighash);
        let signature = secp.sign_ecdsa(&message, &self.0.secret_key());
        Ok(ecdsa::Signature {
            signature,
            sighash_type: EcdsaSighashType::All,
        })
    }
}
