//! Shared data model for the swap nursery: the `Swap`/`ReverseSwap`
//! entities, their state machine, and the error-kind taxonomy every
//! other crate in the workspace converts into.

pub mod error;
pub mod ids;
pub mod pair;
pub mod reverse_swap;
pub mod status;
pub mod swap;

pub use error::ErrorKind;
pub use error::SwapError;
pub use ids::Preimage;
pub use ids::PreimageHash;
pub use ids::SwapId;
pub use pair::OrderSide;
pub use pair::Pair;
pub use reverse_swap::ReverseSwap;
pub use status::SwapKind;
pub use status::SwapStatus;
pub use swap::OutputType;
pub use swap::Swap;
