use swap_types::{Preimage, PreimageHash};

#[derive(Debug, Clone)]
pub struct PaymentResult {
    pub preimage: Preimage,
    pub routing_fee_msat: u64,
}

/// Inbound signals the adapter pushes to the nursery. Distinct from
/// [`swap_events::SwapEvent`]: this is the adapter's private channel into
/// the nursery, not the nursery's public output to the stream gateway —
/// the bus is write-only from the nursery's side, nothing calls back
/// into it.
#[derive(Debug, Clone)]
pub enum LightningNotification {
    InvoicePaid {
        preimage_hash: PreimageHash,
        preimage: Option<Preimage>,
    },
    InvoiceSettled {
        preimage_hash: PreimageHash,
        preimage: Preimage,
    },
    InvoiceFailedToPay {
        preimage_hash: PreimageHash,
        reason: String,
    },
    HtlcAccepted {
        preimage_hash: PreimageHash,
        amount_msat: u64,
        expiry: u32,
    },
    ChannelBackup {
        bytes: Vec<u8>,
    },
}
