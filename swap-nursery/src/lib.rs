//! Swap Nursery: the orchestrating state machine tying the Script &
//! Transaction Builder, Chain Observer, Lightning Adapter, Swap
//! Repository, and Event Bus together. The authority that owns and
//! emits swap statuses.

mod error;
mod locks;
mod nursery;
mod reverse;
mod signer;
mod submarine;
mod timeout;
mod zero_conf;

pub use error::NurseryError;
pub use locks::SwapLocks;
pub use nursery::Nursery;
pub use signer::KeypairSigner;
pub use zero_conf::{evaluate as evaluate_zero_conf, ZeroConfDecision};
