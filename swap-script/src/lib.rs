//! HTLC redeem scripts, lockup addresses, and claim/refund transaction
//! builders.

pub mod address;
pub mod error;
pub mod redeem_script;
pub mod transaction;
pub mod wallet;

pub use error::BuilderError;
pub use transaction::Signer;
pub use transaction::TransactionParams;
pub use transaction::MIN_SAT_PER_VBYTE;
pub use wallet::Wallet;
