//! The public Lightning Adapter interface the nursery drives, and a
//! retrying implementation layered over any [`LightningNode`] using
//! `backon` retry over a single fallible attempt.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use lightning::bolt11_invoice::Bolt11Invoice;
use swap_types::{Preimage, PreimageHash};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::LightningError;
use crate::node::LightningNode;
use crate::types::{LightningNotification, PaymentResult};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LightningError>> + Send + 'a>>;

/// Default retry budget for `pay_invoice`: retries transient path
/// failures this many times before giving up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

pub trait LightningAdapter: Send + Sync {
    /// `cancellation` is advisory: a payment that has already committed
    /// irrevocably ignores it and resolves normally rather than
    /// reporting a spurious failure.
    fn pay_invoice(
        &self,
        invoice: &Bolt11Invoice,
        timeout: Duration,
        cancellation: CancellationToken,
    ) -> BoxFuture<'_, PaymentResult>;

    fn add_hold_invoice(
        &self,
        preimage_hash: PreimageHash,
        amount_msat: u64,
        expiry_secs: u32,
        memo: &str,
    ) -> BoxFuture<'_, String>;

    fn settle_invoice(&self, preimage: Preimage) -> BoxFuture<'_, ()>;

    fn cancel_invoice(&self, preimage_hash: PreimageHash) -> BoxFuture<'_, ()>;

    fn subscribe(&self) -> broadcast::Receiver<LightningNotification>;
}

pub struct ManagedLightningAdapter<N> {
    node: Arc<N>,
    max_attempts: usize,
}

impl<N: LightningNode> ManagedLightningAdapter<N> {
    pub fn new(node: Arc<N>) -> Self {
        Self {
            node,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

impl<N: LightningNode> LightningAdapter for ManagedLightningAdapter<N> {
    fn pay_invoice(
        &self,
        invoice: &Bolt11Invoice,
        timeout: Duration,
        cancellation: CancellationToken,
    ) -> BoxFuture<'_, PaymentResult> {
        let invoice = invoice.clone();
        Box::pin(async move {
            let attempt = || async { self.node.pay_invoice_once(&invoice).await };

            let retrying = attempt
                .retry(ExponentialBuilder::default().with_max_times(self.max_attempts))
                .when(LightningError::is_transient)
                .notify(|err: &LightningError, dur: Duration| {
                    tracing::warn!(%err, ?dur, "retrying invoice payment after transient failure");
                });

            tokio::select! {
                result = tokio::time::timeout(timeout, retrying) => match result {
                    Ok(payment) => payment,
                    Err(_) => Err(LightningError::PaymentFailed(crate::error::PaymentFailureKind::Timeout)),
                },
                () = cancellation.cancelled() => {
                    Err(LightningError::PaymentFailed(crate::error::PaymentFailureKind::Timeout))
                }
            }
        })
    }

    fn add_hold_invoice(
        &self,
        preimage_hash: PreimageHash,
        amount_msat: u64,
        expiry_secs: u32,
        memo: &str,
    ) -> BoxFuture<'_, String> {
        let memo = memo.to_string();
        Box::pin(async move {
            self.node.add_hold_invoice(preimage_hash, amount_msat, expiry_secs, &memo).await
        })
    }

    fn settle_invoice(&self, preimage: Preimage) -> BoxFuture<'_, ()> {
        Box::pin(async move { self.node.settle_invoice(preimage).await })
    }

    fn cancel_invoice(&self, preimage_hash: PreimageHash) -> BoxFuture<'_, ()> {
        Box::pin(async move { self.node.cancel_invoice(preimage_hash).await })
    }

    fn subscribe(&self) -> broadcast::Receiver<LightningNotification> {
        self.node.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const SAMPLE_INVOICE: &str = "lnbcrt10u1p5d55pjpp56ms94rkev7tdrwqyus5a63lny2mqzq9vh2rq3u4ym3v4lxv6xl4qdql2djkuepqw3hjqs2jfvsxzerywfjhxuccqz95xqztfsp57x0nwf7nzsndjdrvsre570ehg0szw34l284hswdz6zpqvktq9mrs9qxpqysgqllgxhxeny0tvtnxuqgn4s0t2qamc6yqc4t3pe6p2x5lgs8v8r3vxzxp3a3ax9j7d2ta5cduddln8n9se7q0jgg7s0h8t2vhljlu3wkcps9k8xs";

    struct FlakyNode {
        attempts: AtomicUsize,
        fail_times: usize,
        notifications: broadcast::Sender<LightningNotification>,
        settled: Mutex<Vec<Preimage>>,
    }

    impl FlakyNode {
        fn new(fail_times: usize) -> Self {
            let (tx, _) = broadcast::channel(16);
            Self {
                attempts: AtomicUsize::new(0),
                fail_times,
                notifications: tx,
                settled: Mutex::new(Vec::new()),
            }
        }
    }

    impl LightningNode for FlakyNode {
        fn pay_invoice_once(&self, _invoice: &Bolt11Invoice) -> BoxFuture<'_, PaymentResult> {
            Box::pin(async move {
                let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
                if attempt < self.fail_times {
                    return Err(LightningError::Rpc("connection reset".into()));
                }
                Ok(PaymentResult {
                    preimage: Preimage::from_bytes([9u8; 32]),
                    routing_fee_msat: 100,
                })
            })
        }

        fn add_hold_invoice(
            &self,
            _preimage_hash: PreimageHash,
            _amount_msat: u64,
            _expiry_secs: u32,
            _memo: &str,
        ) -> BoxFuture<'_, String> {
            Box::pin(async move { Ok("lnbcrt...".to_string()) })
        }

        fn settle_invoice(&self, preimage: Preimage) -> BoxFuture<'_, ()> {
            Box::pin(async move {
                self.settled.lock().unwrap().push(preimage);
                Ok(())
            })
        }

        fn cancel_invoice(&self, _preimage_hash: PreimageHash) -> BoxFuture<'_, ()> {
            Box::pin(async move { Ok(()) })
        }

        fn subscribe(&self) -> broadcast::Receiver<LightningNotification> {
            self.notifications.subscribe()
        }
    }

    #[tokio::test]
    async fn pay_invoice_retries_transient_failures_and_succeeds() {
        let node = Arc::new(FlakyNode::new(2));
        let adapter = ManagedLightningAdapter::new(node);
        let invoice = Bolt11Invoice::from_str(SAMPLE_INVOICE).unwrap();

        let result = adapter
            .pay_invoice(&invoice, Duration::from_secs(5), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.routing_fee_msat, 100);
    }

    #[tokio::test]
    async fn pay_invoice_gives_up_after_exhausting_the_retry_budget() {
        let node = Arc::new(FlakyNode::new(10));
        let adapter = ManagedLightningAdapter::new(node).with_max_attempts(2);
        let invoice = Bolt11Invoice::from_str(SAMPLE_INVOICE).unwrap();

        let result = adapter
            .pay_invoice(&invoice, Duration::from_secs(5), CancellationToken::new())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn pay_invoice_is_cut_short_by_cancellation() {
        let node = Arc::new(FlakyNode::new(10));
        let adapter = ManagedLightningAdapter::new(node).with_max_attempts(10);
        let token = CancellationToken::new();
        token.cancel();
        let invoice = Bolt11Invoice::from_str(SAMPLE_INVOICE).unwrap();

        let result = adapter.pay_invoice(&invoice, Duration::from_secs(30), token).await;
        assert!(result.is_err());
    }
}
