//! Opaque identifiers and the preimage / preimage-hash pair that links a
//! Lightning invoice to exactly one live swap.

use std::fmt;

use bitcoin::hashes::ripemd160;
use bitcoin::hashes::sha256;
use bitcoin::hashes::Hash;

/// 16-hex-char swap identifier. Unique across the `swap` and
/// `reverse_swap` tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SwapId(String);

impl SwapId {
    /// Builds an id from a caller-supplied 16-hex-char string, e.g. one
    /// already minted by an upstream request handler.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.len() != 16 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IdError::InvalidFormat(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdError {
    #[error("swap id `{0}` is not 16 hex characters")]
    InvalidFormat(String),
}

/// 32-byte Lightning payment preimage.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Preimage([u8; 32]);

impl Preimage {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The hash the Lightning invoice commits to: plain SHA256 of the
    /// 32-byte secret. This is *not* the hash used on-chain in the
    /// redeem script — see [`PreimageHash::script_hash`].
    pub fn payment_hash(&self) -> PreimageHash {
        PreimageHash::from_sha256(sha256::Hash::hash(&self.0))
    }
}

impl fmt::Debug for Preimage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Preimage({}...)", &hex::encode(self.0)[..8])
    }
}

/// The hash committing a swap. Keeps both representations a swap needs:
/// the full SHA256 the invoice's payment hash commits to, and the
/// RIPEMD160(SHA256(..)) used inside the redeem script for compactness.
/// Both sides must agree on which hash is which.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PreimageHash {
    sha256: [u8; 32],
}

impl PreimageHash {
    pub fn from_sha256(hash: sha256::Hash) -> Self {
        Self {
            sha256: hash.to_byte_array(),
        }
    }

    pub fn from_sha256_bytes(bytes: [u8; 32]) -> Self {
        Self { sha256: bytes }
    }

    /// The full 32-byte hash, as committed to by the Lightning invoice.
    pub fn sha256(&self) -> [u8; 32] {
        self.sha256
    }

    /// RIPEMD160(SHA256(preimage)) — the 20-byte hash embedded in the
    /// submarine redeem script's `OP_HASH160` check.
    pub fn script_hash(&self) -> [u8; 20] {
        ripemd160::Hash::hash(&self.sha256).to_byte_array()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.sha256)
    }
}

impl fmt::Display for PreimageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
