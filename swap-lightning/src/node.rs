//! The raw, single-attempt node capability, shaped for a node that
//! supports hold-invoices. A single attempt — retry policy lives one
//! layer up in [`crate::adapter::ManagedLightningAdapter`], keeping this
//! client dumb and pushing retry semantics into the caller.

use std::future::Future;
use std::pin::Pin;

use lightning::bolt11_invoice::Bolt11Invoice;
use swap_types::{Preimage, PreimageHash};
use tokio::sync::broadcast;

use crate::error::LightningError;
use crate::types::{LightningNotification, PaymentResult};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LightningError>> + Send + 'a>>;

pub trait LightningNode: Send + Sync {
    fn pay_invoice_once(&self, invoice: &Bolt11Invoice) -> BoxFuture<'_, PaymentResult>;

    fn add_hold_invoice(
        &self,
        preimage_hash: PreimageHash,
        amount_msat: u64,
        expiry_secs: u32,
        memo: &str,
    ) -> BoxFuture<'_, String>;

    fn settle_invoice(&self, preimage: Preimage) -> BoxFuture<'_, ()>;

    fn cancel_invoice(&self, preimage_hash: PreimageHash) -> BoxFuture<'_, ()>;

    /// A fresh receiver for the node's push notifications; every
    /// subscriber gets everything published from the moment it
    /// subscribes, matching `tokio::sync::broadcast`'s usual semantics.
    fn subscribe(&self) -> broadcast::Receiver<LightningNotification>;
}
