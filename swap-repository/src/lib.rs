//! Swap Repository: durable storage for `Swap`/`ReverseSwap` entities
//! with the secondary indices the nursery needs for lookups that don't
//! go through the swap id (by preimage hash when a Lightning payment
//! arrives, by lockup address/txid when a chain notification arrives).

mod error;
mod repository;

pub use error::RepositoryError;
pub use repository::SwapRepository;
