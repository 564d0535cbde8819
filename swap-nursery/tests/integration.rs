#![allow(clippy::unwrap_used)]

//! End-to-end swap flows driven against hand-rolled fakes for the chain
//! backend, wallet, and Lightning node. Each test wires up a real
//! [`Nursery`] over a real (in-memory or on-disk) [`SwapRepository`] and
//! feeds it synthetic chain/Lightning events the way the live dispatch
//! loops would receive them, then asserts on the persisted swap state
//! and the fakes' recorded calls.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bitcoin::absolute::LockTime;
use bitcoin::block::Version as BlockVersion;
use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1::{Keypair, Secp256k1, SecretKey};
use bitcoin::transaction::Version as TxVersion;
use bitcoin::{
    Address, Amount, Block, BlockHash, CompactTarget, Network, OutPoint, PublicKey, ScriptBuf,
    Sequence, Transaction, TxIn, TxMerkleNode, TxOut, Txid, Witness,
};
use lightning::bolt11_invoice::Bolt11Invoice;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use swap_chain::{BlockchainInfo, ChainClient, ChainError, ChainObserver};
use swap_events::EventBus;
use swap_fees::{FeeEstimator, PairRate, RateProvider, StaticFeeEstimator, StaticRateProvider};
use swap_lightning::{LightningAdapter, LightningError, LightningNotification, PaymentFailureKind, PaymentResult};
use swap_nursery::Nursery;
use swap_repository::SwapRepository;
use swap_script::Wallet;
use swap_types::{OrderSide, OutputType, Pair, Preimage, PreimageHash, SwapId, SwapStatus};

type ChainFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ChainError>> + Send + 'a>>;
type WalletFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;
type LightningFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LightningError>> + Send + 'a>>;

// --- fakes -----------------------------------------------------------

struct FakeChainClient {
    height: AtomicU32,
    sent: Mutex<HashMap<Txid, Transaction>>,
    reject_next_broadcast: AtomicBool,
    blocks_by_height: Mutex<HashMap<u32, Block>>,
    blocks_by_hash: Mutex<HashMap<BlockHash, Block>>,
}

impl FakeChainClient {
    fn new(height: u32) -> Self {
        Self {
            height: AtomicU32::new(height),
            sent: Mutex::new(HashMap::new()),
            reject_next_broadcast: AtomicBool::new(false),
            blocks_by_height: Mutex::new(HashMap::new()),
            blocks_by_hash: Mutex::new(HashMap::new()),
        }
    }

    fn set_height(&self, height: u32) {
        self.height.store(height, Ordering::SeqCst);
    }

    fn reject_next_broadcast(&self) {
        self.reject_next_broadcast.store(true, Ordering::SeqCst);
    }

    fn set_block(&self, height: u32, block: Block) {
        self.blocks_by_height.lock().unwrap().insert(height, block);
    }

    fn sent_transaction(&self, txid: &Txid) -> Transaction {
        self.sent.lock().unwrap().get(txid).cloned().expect("transaction was never broadcast")
    }

    fn broadcast_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

fn synthetic_block(height: u32) -> Block {
    Block {
        header: bitcoin::block::Header {
            version: BlockVersion::from_consensus(1),
            prev_blockhash: BlockHash::all_zeros(),
            merkle_root: TxMerkleNode::all_zeros(),
            time: height,
            bits: CompactTarget::from_consensus(0x1d00ffff),
            nonce: height,
        },
        txdata: vec![],
    }
}

impl ChainClient for FakeChainClient {
    fn supports_push_notifications(&self) -> bool {
        true
    }

    fn returns_verbose_blocks(&self) -> bool {
        true
    }

    fn get_blockchain_info(&self) -> ChainFuture<'_, BlockchainInfo> {
        Box::pin(async move {
            Ok(BlockchainInfo {
                height: self.height.load(Ordering::SeqCst),
                best_block_hash: BlockHash::all_zeros(),
                pruned: false,
            })
        })
    }

    fn get_block_hash(&self, height: u32) -> ChainFuture<'_, BlockHash> {
        Box::pin(async move {
            let block = self.blocks_by_height.lock().unwrap().get(&height).cloned().unwrap_or_else(|| synthetic_block(height));
            let hash = block.block_hash();
            self.blocks_by_hash.lock().unwrap().insert(hash, block);
            Ok(hash)
        })
    }

    fn get_block(&self, hash: BlockHash) -> ChainFuture<'_, Block> {
        Box::pin(async move {
            self.blocks_by_hash
                .lock()
                .unwrap()
                .get(&hash)
                .cloned()
                .ok_or_else(|| ChainError::Rpc("unknown block hash".to_string()))
        })
    }

    fn get_raw_transaction(&self, txid: Txid) -> ChainFuture<'_, Transaction> {
        Box::pin(async move {
            self.sent.lock().unwrap().get(&txid).cloned().ok_or(ChainError::TransactionNotFound(txid))
        })
    }

    fn send_raw_transaction(&self, tx: Transaction) -> ChainFuture<'_, Txid> {
        Box::pin(async move {
            if self.reject_next_broadcast.swap(false, Ordering::SeqCst) {
                return Err(ChainError::Rpc("broadcast rejected by the test backend".to_string()));
            }
            let txid = tx.compute_txid();
            self.sent.lock().unwrap().insert(txid, tx);
            Ok(txid)
        })
    }

    fn estimate_smart_fee(&self, _confirmation_target: u32) -> ChainFuture<'_, u64> {
        Box::pin(async move { Ok(5) })
    }

    fn send_to_address(&self, _address: Address, _amount: Amount) -> ChainFuture<'_, Txid> {
        Box::pin(async move { Err(ChainError::Rpc("not exercised by these tests".to_string())) })
    }
}

/// A destination script every destination address resolves to, so the
/// claim/refund builder always has something to pay out to.
fn fake_destination_address() -> Address {
    Address::p2wsh(&ScriptBuf::from_bytes(vec![0x51]), Network::Regtest)
}

struct FakeWallet;

impl Wallet for FakeWallet {
    fn derive_key(&self, index: u32) -> Keypair {
        let secp = Secp256k1::new();
        let seed = sha256::Hash::hash(format!("fake-wallet-key-{index}").as_bytes()).to_byte_array();
        let secret = SecretKey::from_slice(&seed).expect("sha256 digest is a valid secp256k1 scalar");
        Keypair::from_secret_key(&secp, &secret)
    }

    fn get_new_address(&self, _output_type: OutputType) -> WalletFuture<'_, Address> {
        Box::pin(async move { Ok(fake_destination_address()) })
    }

    fn send_to_address(
        &self,
        address: Address,
        _output_type: OutputType,
        _is_sh: bool,
        amount: Amount,
        _fee_rate_sat_per_vbyte: u64,
        _send_all: bool,
    ) -> WalletFuture<'_, (Transaction, u32)> {
        Box::pin(async move {
            let tx = Transaction {
                version: TxVersion::TWO,
                lock_time: LockTime::ZERO,
                input: vec![TxIn {
                    previous_output: OutPoint {
                        txid: Txid::from_byte_array([0x77; 32]),
                        vout: 0,
                    },
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                }],
                output: vec![TxOut {
                    value: amount,
                    script_pubkey: address.script_pubkey(),
                }],
            };
            Ok((tx, 0))
        })
    }

    fn get_balance(&self) -> WalletFuture<'_, Amount> {
        Box::pin(async move { Ok(Amount::from_sat(10_000_000)) })
    }
}

#[derive(Clone)]
enum PayOutcome {
    Success(Preimage),
    Failure,
}

struct FakeLightningAdapter {
    outcome: Mutex<PayOutcome>,
    pay_attempts: AtomicUsize,
    settled: Mutex<Vec<Preimage>>,
    cancelled: Mutex<Vec<PreimageHash>>,
    notifications: broadcast::Sender<LightningNotification>,
}

impl FakeLightningAdapter {
    fn new(outcome: PayOutcome) -> Self {
        let (notifications, _) = broadcast::channel(64);
        Self {
            outcome: Mutex::new(outcome),
            pay_attempts: AtomicUsize::new(0),
            settled: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            notifications,
        }
    }

    fn notifier(&self) -> broadcast::Sender<LightningNotification> {
        self.notifications.clone()
    }

    fn pay_attempts(&self) -> usize {
        self.pay_attempts.load(Ordering::SeqCst)
    }

    fn settled_preimages(&self) -> Vec<Preimage> {
        self.settled.lock().unwrap().clone()
    }

    fn cancelled_hashes(&self) -> Vec<PreimageHash> {
        self.cancelled.lock().unwrap().clone()
    }
}

impl LightningAdapter for FakeLightningAdapter {
    fn pay_invoice(&self, _invoice: &Bolt11Invoice, _timeout: Duration, _cancellation: CancellationToken) -> LightningFuture<'_, PaymentResult> {
        Box::pin(async move {
            self.pay_attempts.fetch_add(1, Ordering::SeqCst);
            match &*self.outcome.lock().unwrap() {
                PayOutcome::Success(preimage) => Ok(PaymentResult {
                    preimage: preimage.clone(),
                    routing_fee_msat: 50,
                }),
                PayOutcome::Failure => Err(LightningError::PaymentFailed(PaymentFailureKind::NoRoute)),
            }
        })
    }

    fn add_hold_invoice(&self, _preimage_hash: PreimageHash, _amount_msat: u64, _expiry_secs: u32, _memo: &str) -> LightningFuture<'_, String> {
        Box::pin(async move { Ok("lnbcrt-hold-invoice-placeholder".to_string()) })
    }

    fn settle_invoice(&self, preimage: Preimage) -> LightningFuture<'_, ()> {
        Box::pin(async move {
            self.settled.lock().unwrap().push(preimage);
            Ok(())
        })
    }

    fn cancel_invoice(&self, preimage_hash: PreimageHash) -> LightningFuture<'_, ()> {
        Box::pin(async move {
            self.cancelled.lock().unwrap().push(preimage_hash);
            Ok(())
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<LightningNotification> {
        self.notifications.subscribe()
    }
}

// --- shared test scaffolding ------------------------------------------

const INVOICE_AMOUNT_SAT: u64 = 100_000;

/// A syntactically valid (but never actually payable) regtest bolt11
/// invoice, needed wherever a submarine swap's flow reaches the point
/// of parsing its stored invoice string before paying it.
const SAMPLE_INVOICE: &str = "lnbcrt10u1p5d55pjpp56ms94rkev7tdrwqyus5a63lny2mqzq9vh2rq3u4ym3v4lxv6xl4qdql2djkuepqw3hjqs2jfvsxzerywfjhxuccqz95xqztfsp57x0nwf7nzsndjdrvsre570ehg0szw34l284hswdz6zpqvktq9mrs9qxpqysgqllgxhxeny0tvtnxuqgn4s0t2qamc6yqc4t3pe6p2x5lgs8v8r3vxzxp3a3ax9j7d2ta5cduddln8n9se7q0jgg7s0h8t2vhljlu3wkcps9k8xs";

fn test_pair() -> Pair {
    Pair::new("LTC", "BTC")
}

fn rate_provider() -> StaticRateProvider {
    StaticRateProvider::new().with_pair(
        test_pair(),
        PairRate {
            rate: 1.0,
            base_fee_sat: 500,
            percentage_fee: 0.01,
            zero_conf_risk_cap_sat: 1_000_000,
        },
    )
}

fn fee_estimator() -> StaticFeeEstimator {
    StaticFeeEstimator { sat_per_vbyte: 5 }
}

fn test_public_key(byte: u8) -> PublicKey {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(&[byte; 32]).unwrap();
    PublicKey::new(secret.public_key(&secp))
}

struct Harness {
    nursery: Arc<Nursery>,
    observer: Arc<ChainObserver>,
    chain: Arc<FakeChainClient>,
    lightning: Arc<FakeLightningAdapter>,
    repository: SwapRepository,
}

async fn build_harness(repository: SwapRepository, chain_height: u32, pay_outcome: PayOutcome) -> Harness {
    let chain = Arc::new(FakeChainClient::new(chain_height));
    let lightning = Arc::new(FakeLightningAdapter::new(pay_outcome));
    let observer = Arc::new(ChainObserver::new(chain.clone() as Arc<dyn ChainClient>));
    let rates: Arc<dyn RateProvider> = Arc::new(rate_provider());
    let fees: Arc<dyn FeeEstimator> = Arc::new(fee_estimator());
    let wallet: Arc<dyn Wallet> = Arc::new(FakeWallet);

    let nursery = Nursery::new(
        repository.clone(),
        observer.clone(),
        chain.clone() as Arc<dyn ChainClient>,
        lightning.clone() as Arc<dyn LightningAdapter>,
        EventBus::new(),
        rates,
        fees,
        wallet,
        Network::Regtest,
    );
    Nursery::spawn_event_loops(&nursery);

    Harness {
        nursery,
        observer,
        chain,
        lightning,
        repository,
    }
}

async fn wait_for_submarine_status(repository: &SwapRepository, id: &SwapId, status: SwapStatus) {
    for _ in 0..300 {
        if let Some(swap) = repository.get_swap(id).await.unwrap() {
            if swap.status == status {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("submarine swap {id} never reached {status}");
}

async fn wait_for_reverse_status(repository: &SwapRepository, id: &SwapId, status: SwapStatus) {
    for _ in 0..300 {
        if let Some(swap) = repository.get_reverse_swap(id).await.unwrap() {
            if swap.status == status {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("reverse swap {id} never reached {status}");
}

fn funding_tx(address: &Address, value_sat: u64, marker: u8) -> Transaction {
    Transaction {
        version: TxVersion::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: Txid::from_byte_array([marker; 32]),
                vout: 0,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(value_sat),
            script_pubkey: address.script_pubkey(),
        }],
    }
}

fn lockup_address_of(raw: &str) -> Address {
    Address::from_str(raw).unwrap().require_network(Network::Regtest).unwrap()
}

// --- submarine swaps ---------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn happy_path_submarine_swap_completes_to_claimed() {
    let preimage = Preimage::from_bytes([7u8; 32]);
    let harness = build_harness(
        SwapRepository::connect_in_memory().await.unwrap(),
        100,
        PayOutcome::Success(preimage),
    )
    .await;

    let id = SwapId::new("a000000000000001").unwrap();
    let swap = Nursery::create_submarine_swap(
        &harness.nursery,
        id.clone(),
        test_pair(),
        OrderSide::Sell,
        SAMPLE_INVOICE.to_string(),
        PreimageHash::from_sha256_bytes([7u8; 32]),
        test_public_key(1),
        OutputType::P2wsh,
        INVOICE_AMOUNT_SAT,
        0,
        10,
        false,
    )
    .await
    .unwrap();
    assert_eq!(swap.status, SwapStatus::SwapCreated);
    assert_eq!(swap.expected_amount, 101_500);

    let address = lockup_address_of(&swap.lockup_address);
    let tx = funding_tx(&address, swap.expected_amount, 1);

    harness.observer.handle_transaction(tx.clone(), false).await;
    wait_for_submarine_status(&harness.repository, &id, SwapStatus::TransactionMempool).await;

    harness.observer.handle_transaction(tx, true).await;
    wait_for_submarine_status(&harness.repository, &id, SwapStatus::TransactionClaimed).await;

    let claimed = harness.repository.get_swap(&id).await.unwrap().unwrap();
    assert!(claimed.miner_fee.is_some());
    assert_eq!(harness.chain.broadcast_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn underfunded_submarine_swap_expires_without_paying_the_invoice() {
    let harness = build_harness(
        SwapRepository::connect_in_memory().await.unwrap(),
        0,
        PayOutcome::Success(Preimage::from_bytes([1u8; 32])),
    )
    .await;

    let id = SwapId::new("a000000000000002").unwrap();
    let swap = Nursery::create_submarine_swap(
        &harness.nursery,
        id.clone(),
        test_pair(),
        OrderSide::Sell,
        "lnbcrt-submarine-invoice".to_string(),
        PreimageHash::from_sha256_bytes([8u8; 32]),
        test_public_key(2),
        OutputType::P2wsh,
        INVOICE_AMOUNT_SAT,
        0,
        5,
        false,
    )
    .await
    .unwrap();

    let address = lockup_address_of(&swap.lockup_address);
    let underfunded = funding_tx(&address, swap.expected_amount - 1, 2);
    harness.observer.handle_transaction(underfunded, true).await;
    wait_for_submarine_status(&harness.repository, &id, SwapStatus::TransactionMempool).await;

    harness.observer.handle_block(synthetic_block(swap.timeout_block_height as u32), swap.timeout_block_height as u32).await;
    wait_for_submarine_status(&harness.repository, &id, SwapStatus::SwapExpired).await;

    assert_eq!(harness.lightning.pay_attempts(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn zero_conf_funding_is_accepted_without_waiting_for_a_confirmation() {
    let preimage = Preimage::from_bytes([9u8; 32]);
    let harness = build_harness(
        SwapRepository::connect_in_memory().await.unwrap(),
        0,
        PayOutcome::Success(preimage),
    )
    .await;

    let id = SwapId::new("a000000000000003").unwrap();
    let swap = Nursery::create_submarine_swap(
        &harness.nursery,
        id.clone(),
        test_pair(),
        OrderSide::Sell,
        SAMPLE_INVOICE.to_string(),
        PreimageHash::from_sha256_bytes([9u8; 32]),
        test_public_key(3),
        OutputType::P2wsh,
        INVOICE_AMOUNT_SAT,
        0,
        10,
        true,
    )
    .await
    .unwrap();

    let address = lockup_address_of(&swap.lockup_address);
    let tx = funding_tx(&address, swap.expected_amount, 3);

    // The zero-conf fee check looks up the funding tx's own prevout to
    // compute its real fee rate, so the fake backend needs to know about
    // a plausible parent paying comfortably above the 5 sat/vB floor.
    let prevout_txid = tx.input[0].previous_output.txid;
    let prevout_tx = funding_tx(&fake_destination_address(), swap.expected_amount + 1000, 0x30);
    harness.chain.sent.lock().unwrap().insert(prevout_txid, prevout_tx);

    harness.observer.handle_transaction(tx, false).await;

    wait_for_submarine_status(&harness.repository, &id, SwapStatus::TransactionClaimed).await;
}

// --- reverse swaps ------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reverse_swap_settles_the_invoice_after_the_users_claim_reveals_the_preimage() {
    let preimage_bytes = [11u8; 32];
    let preimage_hash = PreimageHash::from_sha256(sha256::Hash::hash(&preimage_bytes));
    let harness = build_harness(
        SwapRepository::connect_in_memory().await.unwrap(),
        0,
        PayOutcome::Success(Preimage::from_bytes(preimage_bytes)),
    )
    .await;

    let id = SwapId::new("b000000000000001").unwrap();
    let reverse = Nursery::create_reverse_swap(
        &harness.nursery,
        id.clone(),
        test_pair(),
        OrderSide::Buy,
        "lnbcrt-reverse-invoice".to_string(),
        preimage_hash,
        test_public_key(4),
        OutputType::P2wsh,
        INVOICE_AMOUNT_SAT,
        0,
        10,
    )
    .await
    .unwrap();
    assert_eq!(reverse.status, SwapStatus::TransactionMempool);

    let lockup_txid = Txid::from_str(reverse.transaction_id.as_ref().unwrap()).unwrap();
    let lockup_tx = harness.chain.sent_transaction(&lockup_txid);

    harness.observer.handle_transaction(lockup_tx.clone(), true).await;
    wait_for_reverse_status(&harness.repository, &id, SwapStatus::TransactionConfirmed).await;

    harness
        .lightning
        .notifier()
        .send(LightningNotification::HtlcAccepted {
            preimage_hash: reverse.preimage_hash.clone(),
            amount_msat: INVOICE_AMOUNT_SAT * 1000,
            expiry: 3600,
        })
        .unwrap();
    wait_for_reverse_status(&harness.repository, &id, SwapStatus::InvoicePaid).await;

    let claim_tx = Transaction {
        version: TxVersion::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint { txid: lockup_txid, vout: 0 },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::from_slice(&[vec![0u8; 71], preimage_bytes.to_vec(), reverse.redeem_script.clone()]),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(reverse.onchain_amount - 1_000),
            script_pubkey: fake_destination_address().script_pubkey(),
        }],
    };
    harness.observer.handle_transaction(claim_tx, true).await;

    wait_for_reverse_status(&harness.repository, &id, SwapStatus::InvoiceSettled).await;
    let settled = harness.lightning.settled_preimages();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].as_bytes(), &preimage_bytes);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reverse_swap_refunds_its_own_lockup_after_expiry() {
    let harness = build_harness(
        SwapRepository::connect_in_memory().await.unwrap(),
        0,
        PayOutcome::Success(Preimage::from_bytes([2u8; 32])),
    )
    .await;

    let id = SwapId::new("b000000000000002").unwrap();
    let preimage_hash = PreimageHash::from_sha256_bytes([12u8; 32]);
    let reverse = Nursery::create_reverse_swap(
        &harness.nursery,
        id.clone(),
        test_pair(),
        OrderSide::Buy,
        "lnbcrt-reverse-invoice".to_string(),
        preimage_hash.clone(),
        test_public_key(5),
        OutputType::P2wsh,
        INVOICE_AMOUNT_SAT,
        0,
        5,
    )
    .await
    .unwrap();
    assert_eq!(reverse.status, SwapStatus::TransactionMempool);

    harness.observer
        .handle_block(synthetic_block(reverse.timeout_block_height as u32), reverse.timeout_block_height as u32)
        .await;

    wait_for_reverse_status(&harness.repository, &id, SwapStatus::TransactionRefunded).await;

    assert_eq!(harness.lightning.cancelled_hashes(), vec![preimage_hash]);
    // One broadcast for the original lockup, one for the refund.
    assert_eq!(harness.chain.broadcast_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reverse_swap_creation_fails_when_the_lockup_broadcast_is_rejected() {
    let harness = build_harness(
        SwapRepository::connect_in_memory().await.unwrap(),
        0,
        PayOutcome::Success(Preimage::from_bytes([3u8; 32])),
    )
    .await;
    harness.chain.reject_next_broadcast();

    let id = SwapId::new("b000000000000003").unwrap();
    let result = Nursery::create_reverse_swap(
        &harness.nursery,
        id.clone(),
        test_pair(),
        OrderSide::Buy,
        "lnbcrt-reverse-invoice".to_string(),
        PreimageHash::from_sha256_bytes([13u8; 32]),
        test_public_key(6),
        OutputType::P2wsh,
        INVOICE_AMOUNT_SAT,
        0,
        10,
    )
    .await;
    assert!(result.is_err());

    let stored = harness.repository.get_reverse_swap(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, SwapStatus::TransactionFailed);
}

// --- restart recovery ----------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_pending_swap_is_recovered_and_completed_after_a_simulated_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nursery.sqlite");

    let id = SwapId::new("c000000000000001").unwrap();
    let created_swap = {
        let repository = SwapRepository::connect(&db_path).await.unwrap();
        let harness = build_harness(repository, 0, PayOutcome::Success(Preimage::from_bytes([4u8; 32]))).await;
        Nursery::create_submarine_swap(
            &harness.nursery,
            id.clone(),
            test_pair(),
            OrderSide::Sell,
            SAMPLE_INVOICE.to_string(),
            PreimageHash::from_sha256_bytes([14u8; 32]),
            test_public_key(7),
            OutputType::P2wsh,
            INVOICE_AMOUNT_SAT,
            0,
            100,
            false,
        )
        .await
        .unwrap()
        // The process is imagined to crash here, before any funding was observed.
    };
    assert_eq!(created_swap.status, SwapStatus::SwapCreated);

    // Restart: a fresh repository handle onto the same file, a fresh
    // chain client that has since confirmed the lockup a few blocks back,
    // and a fresh nursery that must rediscover the swap on its own.
    let repository = SwapRepository::connect(&db_path).await.unwrap();
    let preimage = Preimage::from_bytes([4u8; 32]);
    let harness = build_harness(repository, 5, PayOutcome::Success(preimage)).await;

    let address = lockup_address_of(&created_swap.lockup_address);
    let tx = funding_tx(&address, created_swap.expected_amount, 5);
    let mut block = synthetic_block(3);
    block.txdata.push(tx);
    harness.chain.set_block(3, block);

    Nursery::init(&harness.nursery, 50).await.unwrap();

    wait_for_submarine_status(&harness.repository, &id, SwapStatus::TransactionClaimed).await;
}
