//! End-to-end integration tests for the SOFA client core.
//!
//! These tests exercise the full client lifecycle across module boundaries:
//! seed-derived keychains, envelope parse/serialize round trips, the init
//! handshake, and the payment pipeline driven through the lifecycle ledger
//! with counting stub collaborators.
//!
//! Each test stands alone with its own keychain, ledger, and stubs. No
//! shared state, no test ordering dependencies, no flaky failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use sofa_protocol::config::DEFAULT_LOCALE;
use sofa_protocol::envelope::{Envelope, PaymentRequestFields, PaymentStatus, SofaType};
use sofa_protocol::identity::{Address, KeyRole, Keychain};
use sofa_protocol::payment::{
    PaymentCoordinator, PaymentError, PaymentLedger, PaymentStage, PaymentState, Wei,
};
use sofa_protocol::rpc::{
    ChainClient, Directory, IncomingMessage, RpcError, SecretStore, SendError, SubmitReceipt,
    ThreadHandle, TransactionSkeleton, Transport,
};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const TEST_WORDS: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// Route state-transition and pipeline logs through the test harness when
/// `RUST_LOG` asks for them. Safe to call from every test.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A chain backend that counts every call and can be told to fail at either
/// network step. The submit counter is the heart of these tests: it proves
/// the at-most-once property end to end.
#[derive(Default)]
struct CountingChain {
    creates: AtomicUsize,
    submits: AtomicUsize,
    fail_create: bool,
    fail_submit: bool,
}

#[async_trait]
impl ChainClient for CountingChain {
    async fn create_unsigned_transaction(
        &self,
        _from: &Address,
        _to: &Address,
        _value: Wei,
    ) -> Result<TransactionSkeleton, RpcError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(RpcError::Status {
                status: 503,
                message: "node is having a day".into(),
            });
        }
        Ok(TransactionSkeleton {
            tx: "0xf86b808504a817c800825208".into(),
            gas: Some("0x5208".into()),
            gas_price: Some("0x4a817c800".into()),
        })
    }

    async fn submit_signed_transaction(
        &self,
        _original_tx: &str,
        signature: &str,
    ) -> Result<SubmitReceipt, RpcError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        // The signature must be the 0x-hex form the backend expects.
        assert!(signature.starts_with("0x"));
        assert_eq!(signature.len(), 130);
        if self.fail_submit {
            return Err(RpcError::Transport("connection reset".into()));
        }
        Ok(SubmitReceipt {
            tx_hash: "0x9f0e1a2b3c".into(),
        })
    }

    async fn fresh_balance(&self, _address: &Address) -> Result<Wei, RpcError> {
        Ok(Wei::new(1_000_000))
    }

    fn cached_balance(&self, _address: &Address) -> Option<Wei> {
        None
    }
}

struct EmptyDirectory;

#[async_trait]
impl Directory for EmptyDirectory {
    async fn resolve_address(&self, _username: &str) -> Result<Option<Address>, RpcError> {
        Ok(None)
    }
}

/// A transport that records outgoing bodies and replays a fixed inbox.
#[derive(Default)]
struct RecordingTransport {
    sent: std::sync::Mutex<Vec<(ThreadHandle, String)>>,
    inbox: Vec<IncomingMessage>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, body: &str, thread: &ThreadHandle) -> Result<(), SendError> {
        self.sent
            .lock()
            .unwrap()
            .push((thread.clone(), body.to_string()));
        Ok(())
    }

    fn incoming(&self, _thread: &ThreadHandle) -> BoxStream<'static, IncomingMessage> {
        futures::stream::iter(self.inbox.clone()).boxed()
    }
}

/// A secret store with a fixed phrase already persisted.
struct FixedSeedStore;

impl SecretStore for FixedSeedStore {
    fn load_or_create_seed(&self) -> String {
        TEST_WORDS.to_string()
    }
}

fn coordinator(chain: CountingChain) -> PaymentCoordinator<CountingChain, EmptyDirectory> {
    let keychain = Arc::new(Keychain::from_mnemonic(TEST_WORDS).expect("test mnemonic"));
    PaymentCoordinator::new(chain, EmptyDirectory, keychain)
}

fn destination() -> String {
    format!("0x{}", "5e".repeat(20))
}

fn lunch_request() -> PaymentRequestFields {
    PaymentRequestFields {
        body: "Lunch. You owe me.".into(),
        value: "0xde0b6b3a7640000".into(),
        destination_address: Some(destination()),
    }
}

// ---------------------------------------------------------------------------
// Envelope round trips across a simulated wire
// ---------------------------------------------------------------------------

#[test]
fn payment_request_survives_the_wire() {
    let outgoing = Envelope::PaymentRequest(lunch_request());
    let body = outgoing.to_wire().expect("non-empty envelope");
    assert!(body.starts_with("SOFA::PaymentRequest:"));

    // The receiving client sees only the string and reconstructs the exact
    // same envelope.
    let incoming = Envelope::from_wire(&body);
    assert_eq!(incoming, outgoing);
    assert_eq!(incoming.sofa_type(), SofaType::PaymentRequest);
}

#[test]
fn foreign_chat_traffic_is_not_an_envelope() {
    for raw in ["hey, lunch?", "", "SOFA::Lunch:{}", "{\"body\":\"no tag\"}"] {
        assert_eq!(Envelope::from_wire(raw), Envelope::None);
    }
}

// ---------------------------------------------------------------------------
// Keychain determinism
// ---------------------------------------------------------------------------

#[test]
fn same_seed_same_identity_on_every_device() {
    let a = Keychain::from_mnemonic(TEST_WORDS).unwrap();
    let b = Keychain::from_mnemonic(TEST_WORDS).unwrap();

    assert_eq!(a.address(KeyRole::Identity), b.address(KeyRole::Identity));
    assert_eq!(a.address(KeyRole::Payment), b.address(KeyRole::Payment));
    // One seed, two distinct keys: chat identity never equals wallet.
    assert_ne!(a.address(KeyRole::Identity), a.address(KeyRole::Payment));

    // A signature from one device verifies on the other.
    let sig = a.sign(KeyRole::Identity, b"hello from device a");
    assert!(b.verify(KeyRole::Identity, b"hello from device a", &sig));
}

#[test]
fn generated_seed_restores_the_same_keychain() {
    let (keychain, words) = Keychain::generate();
    let restored = Keychain::from_mnemonic(&words).unwrap();
    assert_eq!(
        keychain.address(KeyRole::Payment),
        restored.address(KeyRole::Payment)
    );
}

// ---------------------------------------------------------------------------
// Init handshake
// ---------------------------------------------------------------------------

#[test]
fn init_handshake_reports_live_payment_address() {
    let keychain = Keychain::from_mnemonic(TEST_WORDS).unwrap();

    // A bot asks who we are.
    let raw = r#"SOFA::InitRequest:{"values":["paymentAddress","language","favoriteColor"]}"#;
    let request = match Envelope::from_wire(raw) {
        Envelope::InitRequest(fields) => fields,
        other => panic!("expected InitRequest, got {other:?}"),
    };

    let response = request.respond(keychain.address(KeyRole::Payment), DEFAULT_LOCALE);
    let body = Envelope::InitResponse(response).to_wire().unwrap();
    assert!(body.starts_with("SOFA::Init:"));

    // The response carries only fields we know how to answer, with values
    // read from the live keychain rather than any cache.
    let parsed = match Envelope::from_wire(&body) {
        Envelope::InitResponse(fields) => fields,
        other => panic!("expected InitResponse, got {other:?}"),
    };
    assert_eq!(
        parsed.fields.get("paymentAddress").map(String::as_str),
        Some(keychain.address(KeyRole::Payment).as_str())
    );
    assert_eq!(parsed.fields.get("language").map(String::as_str), Some("en"));
    assert!(!parsed.fields.contains_key("favoriteColor"));
}

// ---------------------------------------------------------------------------
// The full payment flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approved_request_submits_once_and_announces() {
    init_tracing();
    let coordinator = coordinator(CountingChain::default());
    let ledger = PaymentLedger::new();

    // An incoming request arrives over the wire.
    let raw = Envelope::PaymentRequest(lunch_request()).to_wire().unwrap();
    let request = match Envelope::from_wire(&raw) {
        Envelope::PaymentRequest(fields) => fields,
        other => panic!("expected PaymentRequest, got {other:?}"),
    };

    // The user taps approve.
    let receipt = coordinator
        .approve_request(&ledger, "msg-7", &request)
        .await
        .expect("payment should go through");

    assert_eq!(ledger.state("msg-7"), PaymentState::Approved);
    assert_eq!(receipt.tx_hash, "0x9f0e1a2b3c");

    // Exactly one broadcast hit the network.
    assert_eq!(coordinator.chain().submits.load(Ordering::SeqCst), 1);

    // The outgoing announcement is a parseable unconfirmed Payment naming
    // the hash, amount, and both endpoints.
    match Envelope::from_wire(&receipt.body) {
        Envelope::Payment(fields) => {
            assert_eq!(fields.status, PaymentStatus::Unconfirmed);
            assert_eq!(fields.tx_hash, "0x9f0e1a2b3c");
            assert_eq!(fields.value, "0xde0b6b3a7640000");
            assert_eq!(fields.to_address.as_deref(), Some(destination().as_str()));
            assert_eq!(
                fields.from_address.as_deref(),
                Some(coordinator.payment_address().as_str())
            );
        }
        other => panic!("expected Payment, got {other:?}"),
    }
}

#[tokio::test]
async fn backend_failure_before_signing_submits_nothing() {
    let coordinator = coordinator(CountingChain {
        fail_create: true,
        ..CountingChain::default()
    });
    let ledger = PaymentLedger::new();

    let err = coordinator
        .approve_request(&ledger, "msg-8", &lunch_request())
        .await
        .unwrap_err();

    // The error names the stage, no submission happened, and the message
    // lands in the recoverable Failed state.
    match err {
        sofa_protocol::payment::ApprovalError::Payment(ref e) => {
            assert_eq!(e.stage(), PaymentStage::Build);
            assert!(!e.transaction_submitted());
        }
        other => panic!("expected pipeline error, got {other:?}"),
    }
    assert_eq!(coordinator.chain().submits.load(Ordering::SeqCst), 0);
    assert_eq!(ledger.state("msg-8"), PaymentState::Failed);

    // Retry with a healthy backend succeeds from Failed.
    let retry = self::coordinator(CountingChain::default());
    retry
        .approve_request(&ledger, "msg-8", &lunch_request())
        .await
        .expect("retry should succeed");
    assert_eq!(ledger.state("msg-8"), PaymentState::Approved);
}

#[tokio::test]
async fn broadcast_failure_is_never_retried() {
    let coordinator = coordinator(CountingChain {
        fail_submit: true,
        ..CountingChain::default()
    });
    let err = coordinator
        .send_payment(&destination(), Wei::new(100))
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::SubmissionFailed(_)));
    // One attempt, zero retries. The user decides what happens next.
    assert_eq!(coordinator.chain().submits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_request_touches_nothing() {
    let coordinator = coordinator(CountingChain::default());
    let ledger = PaymentLedger::new();

    ledger.reject("msg-9").unwrap();
    assert_eq!(ledger.state("msg-9"), PaymentState::Rejected);

    // A later stray approval of the rejected request is refused before any
    // network call.
    let err = coordinator
        .approve_request(&ledger, "msg-9", &lunch_request())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        sofa_protocol::payment::ApprovalError::Transition(_)
    ));
    assert_eq!(coordinator.chain().creates.load(Ordering::SeqCst), 0);
    assert_eq!(coordinator.chain().submits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn announcement_travels_the_transport_verbatim() {
    let coordinator = coordinator(CountingChain::default());
    let transport = RecordingTransport::default();
    let thread = ThreadHandle("thread-42".to_string());

    let receipt = coordinator
        .send_payment(&destination(), Wei::new(100))
        .await
        .unwrap();
    transport.send(&receipt.body, &thread).await.unwrap();

    // What the peer receives is byte-for-byte what the codec produced, and
    // it parses back to the same envelope.
    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, thread);
    assert_eq!(sent[0].1, receipt.body);
    assert_eq!(Envelope::from_wire(&sent[0].1), receipt.envelope);
}

#[tokio::test]
async fn incoming_stream_mixes_chat_and_envelopes() {
    let now = chrono::Utc::now();
    let transport = RecordingTransport {
        inbox: vec![
            IncomingMessage {
                body: "hey, lunch?".into(),
                sender_id: "alice".into(),
                timestamp: now,
            },
            IncomingMessage {
                body: Envelope::PaymentRequest(lunch_request()).to_wire().unwrap(),
                sender_id: "alice".into(),
                timestamp: now,
            },
        ],
        ..RecordingTransport::default()
    };

    let thread = ThreadHandle("thread-1".to_string());
    let parsed: Vec<Envelope> = transport
        .incoming(&thread)
        .map(|m| Envelope::from_wire(&m.body))
        .collect()
        .await;

    // Plain chat flows through as None; the structured request comes out
    // typed. Nothing in the stream can fail the consumer.
    assert_eq!(parsed[0], Envelope::None);
    assert_eq!(parsed[1], Envelope::PaymentRequest(lunch_request()));
}

#[test]
fn keychain_bootstraps_from_the_secret_store() {
    // Startup path: the store hands back the persisted phrase and the
    // keychain derives from it, identical on every launch.
    let store = FixedSeedStore;
    let a = Keychain::from_mnemonic(&store.load_or_create_seed()).unwrap();
    let b = Keychain::from_mnemonic(&store.load_or_create_seed()).unwrap();
    assert_eq!(a.address(KeyRole::Payment), b.address(KeyRole::Payment));
}

#[tokio::test]
async fn fee_estimate_makes_no_submission() {
    let coordinator = coordinator(CountingChain::default());
    let to = Address::parse(&destination()).unwrap();

    let estimate = coordinator.estimate_fees(&to, Wei::new(100)).await.unwrap();
    assert_eq!(estimate.gas, Wei::new(21_000));
    assert_eq!(
        estimate.total,
        Wei::new(21_000).checked_mul(estimate.gas_price).unwrap()
    );
    assert_eq!(coordinator.chain().creates.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.chain().submits.load(Ordering::SeqCst), 0);
}
