//! Shared in-memory collaborators for integration tests
//!
//! `MockLedger` simulates the marketplace contract: requests get sequential
//! ids, a `MockWorker` places an order for each request and, once the order
//! is approved, executes it the way an enclave would (opening the client
//! challenge, signing with the derived key, sealing the output).

#![allow(dead_code)]

use alloy_primitives::{keccak256, Address, TxHash, U256};
use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use task_runner::codec;
use task_runner::crypto::{sha256_hex, X25519Crypto};
use task_runner::ledger::{
    ImageDetails, ImageRegistry, Ledger, LedgerError, LedgerEvent, LedgerResult, Order,
    OrderStatus, ParsedTransaction, ReceiptStatus, RequestSubmission, TransactionReceipt,
    TransactionSummary, TxHandle,
};
use task_runner::storage::{ContentStore, MemoryContentStore, StorageError, StorageResult};
use task_runner::verifier::VerificationInput;
use task_runner::wallet::WalletProvider;
use task_runner::{Collaborators, LifecycleCoordinator, LocalWallet, ResourceConfig, RunnerConfig};
use tokio::sync::broadcast;
use x25519_dalek::StaticSecret;

pub const RUNTIME: &str = "etny-pynithy-testnet";
pub const IMAGE_HASH: &str = "QmEnclaveImage";
pub const COMPOSE_HASH: &str = "QmEnclaveCompose";
pub const WORKER_OUTPUT: &str = "42\n";

// ============================================================================
// WORKER
// ============================================================================

/// Ways a worker can misbehave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tamper {
    None,
    /// Report a different enclave challenge than the one it signed with
    EnclaveChallenge,
    /// Report a checksum that does not match the output
    Checksum,
    /// Sign with an unrelated key
    Signer,
    /// Close the order without publishing a result
    EmptyResult,
}

#[derive(Debug, Clone)]
pub struct WorkerBehavior {
    pub task_code: String,
    pub output: String,
    pub tamper: Tamper,
}

impl Default for WorkerBehavior {
    fn default() -> Self {
        Self {
            task_code: "0".to_string(),
            output: WORKER_OUTPUT.to_string(),
            tamper: Tamper::None,
        }
    }
}

/// What a worker publishes when it finishes an order
#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    pub envelope: String,
    pub tx_bytes: String,
    pub tx_hash: TxHash,
    pub parsed: ParsedTransaction,
}

pub struct MockWorker {
    pub address: Address,
    secret: StaticSecret,
    store: Arc<MemoryContentStore>,
    pub behavior: Mutex<WorkerBehavior>,
    pub executions: AtomicU32,
}

impl MockWorker {
    pub fn new(store: Arc<MemoryContentStore>) -> Self {
        Self {
            address: Address::repeat_byte(0x77),
            secret: StaticSecret::random_from_rng(rand::rngs::OsRng),
            store,
            behavior: Mutex::new(WorkerBehavior::default()),
            executions: AtomicU32::new(0),
        }
    }

    /// Enclave encryption key published in the image registry
    pub fn public_key(&self) -> String {
        X25519Crypto::public_key_hex(&self.secret)
    }

    pub async fn execute(&self, submission: &RequestSubmission) -> WorkerOutcome {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().clone();

        let image: Vec<&str> = submission.image_metadata.split(':').collect();
        let code: Vec<&str> = submission.code_metadata.split(':').collect();
        assert_eq!(image.len(), 6, "image descriptor: {}", submission.image_metadata);
        assert_eq!(code.len(), 3, "code descriptor: {}", submission.code_metadata);

        let client_challenge = self.open(image[4]).await;
        let _source = self.open(code[1]).await;

        let enclave_challenge = "5eed0fenc1a7e".to_string();
        let signer = codec::derive_verification_signer(&client_challenge, &enclave_challenge)
            .expect("derived key");

        let mut from = signer.address();
        let mut reported_challenge = enclave_challenge;
        let mut checksum = sha256_hex(behavior.output.as_bytes());
        match behavior.tamper {
            Tamper::EnclaveChallenge => reported_challenge = "0ther0enc1a7e".to_string(),
            Tamper::Checksum => checksum = sha256_hex(b"forged output"),
            Tamper::Signer => from = Address::repeat_byte(0x66),
            Tamper::None | Tamper::EmptyResult => {}
        }

        let result_hash = if behavior.tamper == Tamper::EmptyResult {
            String::new()
        } else {
            let sealed = X25519Crypto::seal(behavior.output.as_bytes(), image[5]).expect("seal");
            self.store.insert(sealed.into_bytes())
        };

        let payload = format!(
            "v3:{}:{}:{}",
            behavior.task_code, checksum, reported_challenge
        );
        let raw = payload.as_bytes();

        WorkerOutcome {
            // stored without the 0x prefix, as some workers do
            envelope: format!("v3:{}:{}", hex::encode(raw), result_hash),
            tx_bytes: format!("0x{}", hex::encode(raw)),
            tx_hash: keccak256(raw),
            parsed: ParsedTransaction {
                from,
                result: payload,
            },
        }
    }

    async fn open(&self, hash: &str) -> String {
        let blob = self.store.get(hash).await.expect("blob published");
        let envelope = String::from_utf8(blob).expect("hex envelope");
        let plaintext = X25519Crypto::open(&envelope, &self.secret).expect("sealed for enclave");
        String::from_utf8(plaintext).expect("utf8")
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// Delivery order of the events emitted when a request is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrder {
    RequestFirst,
    OrderFirst,
}

pub struct LedgerState {
    pub requester: Address,
    pub balances: HashMap<Address, U256>,
    pub allowances: HashMap<Address, U256>,
    pub node_operators: HashSet<Address>,
    pub request_count: u64,
    pub submissions: Vec<RequestSubmission>,
    pub orders: Vec<Order>,
    pub results: HashMap<u64, String>,
    pub parsed: HashMap<String, ParsedTransaction>,
    pub receipts: HashMap<TxHash, TransactionReceipt>,
    pub revert_reasons: HashMap<TxHash, String>,
    pub timestamps: HashMap<TxHash, u64>,
    pub recent: Vec<TransactionSummary>,
    /// Labels of every transaction sent, in order
    pub sent: Vec<String>,

    /// `None` receipts returned for each new transaction before it is mined
    pub receipt_delay_polls: u32,
    receipt_delays: HashMap<TxHash, u32>,
    /// Transient errors returned by the next receipt reads
    pub receipt_errors: u32,
    /// Next transaction reverts with this reason
    pub revert_next: Option<String>,
    /// Transient errors returned by the next result reads
    pub result_errors: u32,
    /// Transient errors returned by the next order count reads
    pub order_count_errors: u32,
    /// Transient errors returned by reads of specific orders
    pub order_read_errors: HashMap<u64, u32>,
    /// Orders appended on the next order read
    pub growth_on_read: Vec<Order>,

    /// Place an order for each new request
    pub auto_place: bool,
    pub event_order: EventOrder,
    /// Orders for other requesters placed just before ours
    pub foreign_orders: u64,
    /// Order reads after execution before the order is closed
    pub close_after_polls: u32,
    /// Status an executed order ends in
    pub final_status: OrderStatus,
    closing: HashMap<u64, u32>,

    pub faucet_amount: U256,
    nonce: u64,
    block: u64,
}

impl LedgerState {
    fn new(requester: Address) -> Self {
        Self {
            requester,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            node_operators: HashSet::new(),
            request_count: 0,
            submissions: Vec::new(),
            orders: Vec::new(),
            results: HashMap::new(),
            parsed: HashMap::new(),
            receipts: HashMap::new(),
            revert_reasons: HashMap::new(),
            timestamps: HashMap::new(),
            recent: Vec::new(),
            sent: Vec::new(),
            receipt_delay_polls: 0,
            receipt_delays: HashMap::new(),
            receipt_errors: 0,
            revert_next: None,
            result_errors: 0,
            order_count_errors: 0,
            order_read_errors: HashMap::new(),
            growth_on_read: Vec::new(),
            auto_place: true,
            event_order: EventOrder::RequestFirst,
            foreign_orders: 0,
            close_after_polls: 2,
            final_status: OrderStatus::Closed,
            closing: HashMap::new(),
            faucet_amount: U256::from(1_000u64),
            nonce: 0,
            block: 1_000,
        }
    }

    /// Mine a transaction emitting `events`. Returns its hash and whether it reverted.
    fn mine(&mut self, label: impl Into<String>, events: Vec<LedgerEvent>) -> (TxHash, bool) {
        self.nonce += 1;
        self.block += 1;
        let hash = keccak256(self.nonce.to_be_bytes());

        let reverted = if let Some(reason) = self.revert_next.take() {
            self.revert_reasons.insert(hash, reason);
            true
        } else {
            false
        };

        self.receipts.insert(
            hash,
            TransactionReceipt {
                hash,
                block_number: self.block,
                status: if reverted {
                    ReceiptStatus::Reverted
                } else {
                    ReceiptStatus::Confirmed
                },
                events: if reverted { Vec::new() } else { events },
            },
        );
        self.receipt_delays.insert(hash, self.receipt_delay_polls);
        self.timestamps.insert(hash, 1_700_000_000 + self.block * 5);
        self.sent.push(label.into());

        (hash, reverted)
    }

    pub fn push_order(&mut self, requester: Address, requester_request: u64, status: OrderStatus) -> u64 {
        let id = self.orders.len() as u64;
        self.orders.push(Order {
            id,
            requester,
            worker: Address::repeat_byte(0x77),
            requester_request,
            worker_request: 5_000 + id,
            status,
        });
        id
    }

    fn record_result(&mut self, order_id: u64, outcome: WorkerOutcome) {
        self.block += 1;
        self.results.insert(order_id, outcome.envelope);
        self.parsed.insert(outcome.tx_bytes, outcome.parsed);
        self.timestamps
            .insert(outcome.tx_hash, 1_700_000_000 + self.block * 5);
        self.recent.insert(
            0,
            TransactionSummary {
                hash: outcome.tx_hash,
                block_number: self.block,
                timestamp: 1_700_000_000 + self.block * 5,
            },
        );
    }

    pub fn sent_count(&self, prefix: &str) -> usize {
        self.sent.iter().filter(|label| label.starts_with(prefix)).count()
    }
}

pub struct MockLedger {
    contract: Address,
    events: broadcast::Sender<LedgerEvent>,
    state: Mutex<LedgerState>,
    worker: Option<Arc<MockWorker>>,
}

impl MockLedger {
    pub fn new(requester: Address, worker: Option<Arc<MockWorker>>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            contract: Address::repeat_byte(0xc0),
            events,
            state: Mutex::new(LedgerState::new(requester)),
            worker,
        }
    }

    pub fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock()
    }

    pub fn emit(&self, event: LedgerEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn record_result(&self, order_id: u64, outcome: WorkerOutcome) {
        self.state.lock().record_result(order_id, outcome);
    }

    async fn execute_order(&self, order_id: u64, submission: RequestSubmission) {
        let Some(worker) = &self.worker else {
            return;
        };
        let outcome = worker.execute(&submission).await;

        let mut state = self.state.lock();
        state.record_result(order_id, outcome);
        let polls = state.close_after_polls;
        state.closing.insert(order_id, polls);
    }
}

#[async_trait]
impl Ledger for MockLedger {
    fn contract_address(&self) -> Address {
        self.contract
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    async fn balance_of(&self, account: Address) -> LedgerResult<U256> {
        Ok(self.state.lock().balances.get(&account).copied().unwrap_or_default())
    }

    async fn allowance(&self, owner: Address) -> LedgerResult<U256> {
        Ok(self.state.lock().allowances.get(&owner).copied().unwrap_or_default())
    }

    async fn is_node_operator(&self, account: Address) -> LedgerResult<bool> {
        Ok(self.state.lock().node_operators.contains(&account))
    }

    async fn request_count(&self) -> LedgerResult<u64> {
        Ok(self.state.lock().request_count)
    }

    async fn order_count(&self) -> LedgerResult<u64> {
        let mut state = self.state.lock();
        if state.order_count_errors > 0 {
            state.order_count_errors -= 1;
            return Err(LedgerError::Transient("order count unavailable".to_string()));
        }
        Ok(state.orders.len() as u64)
    }

    async fn order(&self, index: u64) -> LedgerResult<Order> {
        let mut state = self.state.lock();

        if let Some(remaining) = state.order_read_errors.get_mut(&index) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(LedgerError::Transient(format!("order {} unavailable", index)));
            }
        }

        let growth = std::mem::take(&mut state.growth_on_read);
        for order in growth {
            let id = state.orders.len() as u64;
            state.orders.push(Order { id, ..order });
        }

        let mut close = false;
        if let Some(remaining) = state.closing.get_mut(&index) {
            if *remaining == 0 {
                close = true;
            } else {
                *remaining -= 1;
            }
        }
        if close {
            state.closing.remove(&index);
            let status = state.final_status;
            if let Some(order) = state.orders.get_mut(index as usize) {
                order.status = status;
            }
        }

        state
            .orders
            .get(index as usize)
            .cloned()
            .ok_or_else(|| LedgerError::Decode(format!("no order {}", index)))
    }

    async fn result_for_order(&self, order_id: u64) -> LedgerResult<String> {
        let mut state = self.state.lock();
        if state.result_errors > 0 {
            state.result_errors -= 1;
            return Err(LedgerError::Transient("rpc timeout".to_string()));
        }
        Ok(state.results.get(&order_id).cloned().unwrap_or_default())
    }

    async fn add_request(&self, request: &RequestSubmission) -> LedgerResult<TxHandle> {
        let mut events = Vec::new();
        let mut execute = None;

        let hash = {
            let mut state = self.state.lock();
            let request_id = state.request_count;
            let requester = state.requester;
            let request_event = LedgerEvent::RequestAdded {
                from: requester,
                request_id,
            };

            let (hash, reverted) = state.mine("add_request", vec![request_event.clone()]);
            if reverted {
                return Ok(TxHandle::new(hash));
            }
            state.request_count += 1;
            state.submissions.push(request.clone());

            let mut order_events = Vec::new();
            if state.auto_place {
                for i in 0..state.foreign_orders {
                    let foreign_request = 10_000 + i;
                    let id = state.push_order(Address::repeat_byte(0x99), foreign_request, OrderStatus::Pending);
                    order_events.push(LedgerEvent::OrderPlaced {
                        order_id: id,
                        request_id: foreign_request,
                    });
                }

                let preferred = request.preferred_worker.is_some();
                let status = if preferred {
                    OrderStatus::Approved
                } else {
                    OrderStatus::Pending
                };
                let order_id = state.push_order(requester, request_id, status);
                order_events.push(LedgerEvent::OrderPlaced {
                    order_id,
                    request_id,
                });
                if preferred {
                    execute = Some(order_id);
                }
            }

            match state.event_order {
                EventOrder::RequestFirst => {
                    events.push(request_event);
                    events.extend(order_events);
                }
                EventOrder::OrderFirst => {
                    events.extend(order_events);
                    events.push(request_event);
                }
            }
            hash
        };

        for event in events {
            self.emit(event);
        }
        if let Some(order_id) = execute {
            self.execute_order(order_id, request.clone()).await;
        }

        Ok(TxHandle::new(hash))
    }

    async fn approve_order(&self, order_id: u64) -> LedgerResult<TxHandle> {
        let (hash, submission) = {
            let mut state = self.state.lock();
            let event = LedgerEvent::OrderApproved { order_id };
            let (hash, reverted) = state.mine(format!("approve_order:{}", order_id), vec![event]);
            if reverted {
                return Ok(TxHandle::new(hash));
            }

            let order = state
                .orders
                .get_mut(order_id as usize)
                .ok_or_else(|| LedgerError::Rejected(format!("no order {}", order_id)))?;
            order.status = OrderStatus::Approved;
            let request_id = order.requester_request;
            (hash, state.submissions.get(request_id as usize).cloned())
        };

        self.emit(LedgerEvent::OrderApproved { order_id });
        if let Some(submission) = submission {
            self.execute_order(order_id, submission).await;
        }
        Ok(TxHandle::new(hash))
    }

    async fn approve_spending(&self, amount: U256) -> LedgerResult<TxHandle> {
        let mut state = self.state.lock();
        let owner = state.requester;
        let (hash, reverted) = state.mine(
            "approve_spending",
            vec![LedgerEvent::SpendingApproved { owner, amount }],
        );
        if !reverted {
            state.allowances.insert(owner, amount);
        }
        Ok(TxHandle::new(hash))
    }

    async fn request_faucet(&self, account: Address) -> LedgerResult<TxHandle> {
        let mut state = self.state.lock();
        let amount = state.faucet_amount;
        let (hash, reverted) = state.mine(
            "request_faucet",
            vec![LedgerEvent::FaucetFunded { account, amount }],
        );
        if !reverted {
            *state.balances.entry(account).or_default() += amount;
        }
        Ok(TxHandle::new(hash))
    }

    async fn transaction_receipt(&self, hash: TxHash) -> LedgerResult<Option<TransactionReceipt>> {
        let mut state = self.state.lock();
        if state.receipt_errors > 0 {
            state.receipt_errors -= 1;
            return Err(LedgerError::Transient("provider timeout".to_string()));
        }
        if let Some(remaining) = state.receipt_delays.get_mut(&hash) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
        }
        Ok(state.receipts.get(&hash).cloned())
    }

    async fn revert_reason(&self, hash: TxHash) -> LedgerResult<Option<String>> {
        Ok(self.state.lock().revert_reasons.get(&hash).cloned())
    }

    async fn transaction_timestamp(&self, hash: TxHash) -> LedgerResult<Option<u64>> {
        Ok(self.state.lock().timestamps.get(&hash).copied())
    }

    async fn recent_contract_transactions(
        &self,
        depth: u64,
    ) -> LedgerResult<Vec<TransactionSummary>> {
        let state = self.state.lock();
        let oldest = state.block.saturating_sub(depth);
        Ok(state
            .recent
            .iter()
            .filter(|tx| tx.block_number > oldest)
            .cloned()
            .collect())
    }

    fn parse_transaction_bytes(&self, bytes: &str) -> LedgerResult<ParsedTransaction> {
        self.state
            .lock()
            .parsed
            .get(bytes)
            .cloned()
            .ok_or_else(|| LedgerError::Decode(format!("unknown transaction {}", bytes)))
    }
}

// ============================================================================
// REGISTRY AND STORE
// ============================================================================

pub struct MockRegistry {
    pub image: Mutex<Option<ImageDetails>>,
}

#[async_trait]
impl ImageRegistry for MockRegistry {
    async fn image_details(
        &self,
        runtime: &str,
        version: &str,
    ) -> LedgerResult<Option<ImageDetails>> {
        if runtime != RUNTIME || version != "v3" {
            return Ok(None);
        }
        Ok(self.image.lock().clone())
    }
}

/// Content store failing a configurable number of calls before delegating
pub struct FlakyStore {
    pub inner: Arc<MemoryContentStore>,
    get_failures: AtomicU32,
    put_failures: AtomicU32,
    pub get_calls: AtomicU32,
    pub put_calls: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryContentStore>) -> Self {
        Self {
            inner,
            get_failures: AtomicU32::new(0),
            put_failures: AtomicU32::new(0),
            get_calls: AtomicU32::new(0),
            put_calls: AtomicU32::new(0),
        }
    }

    pub fn fail_next_gets(&self, count: u32) {
        self.get_failures.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_puts(&self, count: u32) {
        self.put_failures.store(count, Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ContentStore for FlakyStore {
    async fn put(&self, data: Vec<u8>) -> StorageResult<String> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.put_failures) {
            return Err(StorageError::Request("gateway timeout".to_string()));
        }
        self.inner.put(data).await
    }

    async fn get(&self, hash: &str) -> StorageResult<Vec<u8>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.get_failures) {
            return Err(StorageError::Request("gateway timeout".to_string()));
        }
        self.inner.get(hash).await
    }
}

// ============================================================================
// HARNESS
// ============================================================================

pub struct Harness {
    pub ledger: Arc<MockLedger>,
    pub registry: Arc<MockRegistry>,
    pub store: Arc<FlakyStore>,
    pub crypto: Arc<X25519Crypto>,
    pub wallet: Arc<LocalWallet>,
    pub worker: Arc<MockWorker>,
}

impl Harness {
    pub fn new() -> Self {
        let memory = Arc::new(MemoryContentStore::new());
        let worker = Arc::new(MockWorker::new(memory.clone()));

        let wallet = Arc::new(LocalWallet::random());
        let crypto = Arc::new(X25519Crypto::new());
        wallet.register_with(&crypto);

        let ledger = Arc::new(MockLedger::new(wallet.address(), Some(worker.clone())));
        ledger
            .state()
            .balances
            .insert(wallet.address(), U256::from(1_000u64));

        let registry = Arc::new(MockRegistry {
            image: Mutex::new(Some(ImageDetails {
                image_hash: IMAGE_HASH.to_string(),
                public_key: worker.public_key(),
                compose_hash: COMPOSE_HASH.to_string(),
            })),
        });

        Self {
            ledger,
            registry,
            store: Arc::new(FlakyStore::new(memory)),
            crypto,
            wallet,
            worker,
        }
    }

    pub fn requester(&self) -> Address {
        self.wallet.address()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            ledger: self.ledger.clone(),
            registry: self.registry.clone(),
            store: self.store.clone(),
            crypto: self.crypto.clone(),
            wallet: self.wallet.clone(),
        }
    }

    pub fn coordinator(&self, config: RunnerConfig) -> LifecycleCoordinator {
        LifecycleCoordinator::new(self.collaborators(), config).expect("valid config")
    }

    /// Publish a finished order `order_id` as if the worker had executed a
    /// request carrying `client_challenge`
    pub async fn stage_result(&self, order_id: u64, client_challenge: &str) -> VerificationInput {
        let enclave_key = self.worker.public_key();
        let challenge_hash = self.store.inner.insert(
            X25519Crypto::seal(client_challenge.as_bytes(), &enclave_key)
                .unwrap()
                .into_bytes(),
        );
        let code_hash = self
            .store
            .inner
            .insert(X25519Crypto::seal(b"print(42)", &enclave_key).unwrap().into_bytes());
        let result_key = self
            .wallet
            .encryption_public_key(self.requester())
            .await
            .unwrap();

        let submission = RequestSubmission {
            resources: ResourceConfig::default().to_request(),
            image_metadata: codec::encode_image_descriptor(
                IMAGE_HASH,
                RUNTIME,
                COMPOSE_HASH,
                &challenge_hash,
                &result_key,
            ),
            code_metadata: codec::encode_code_descriptor(&code_hash, "0xsig"),
            input_metadata: codec::encode_input_descriptor("0xsig"),
            preferred_worker: None,
        };

        let outcome = self.worker.execute(&submission).await;
        self.ledger.record_result(order_id, outcome);

        VerificationInput {
            order_id,
            client_challenge: client_challenge.to_string(),
            account: self.requester(),
            input_tx_hash: TxHash::ZERO,
            image_reference: format!("{}:{}", IMAGE_HASH, RUNTIME),
            code_hash,
            input_hash: challenge_hash,
        }
    }
}

/// Default configuration with the faucet off
pub fn test_config() -> RunnerConfig {
    let mut config = RunnerConfig::default();
    config.network.faucet_enabled = false;
    config
}
