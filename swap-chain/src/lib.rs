//! Chain Observer: a relevance filter over chain notifications,
//! decoupled from any particular node's RPC dialect via the
//! [`ChainClient`] capability trait.

mod chain_client;
mod error;
mod observer;

pub use chain_client::{BlockchainInfo, ChainClient};
pub use error::ChainError;
pub use observer::{ChainEvent, ChainObserver};
