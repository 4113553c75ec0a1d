//! Task lifecycle coordinator
//!
//! Drives one task from submission to a verified result:
//! 1. Check the requester can pay (requesting faucet tokens on testnets)
//! 2. Verify the preferred worker, if one was named
//! 3. Resolve the trusted worker image from the registry
//! 4. Connect the wallet and make sure the contract may spend the price
//! 5. Encrypt and publish code and client challenge, submit the request
//! 6. Find the order a worker placed for the request
//! 7. Approve it (unless a preferred worker was named)
//! 8. Poll the order until it closes
//! 9. Verify and decrypt the result
//!
//! Every phase change and every failure is published on the progress
//! channel before `run` returns.

use crate::codec;
use crate::config::{MatchStrategy, RunnerConfig, WatchdogPolicy};
use crate::crypto::{CryptoProvider, ZERO_CHECKSUM};
use crate::error::{RunnerError, RunnerResult};
use crate::ledger::{
    Confirmation, EventKind, EventRaceResolver, ImageDetails, ImageRegistry, Ledger,
    LedgerEvent, LedgerSubscription, MatchedOrder, Order, OrderStatus, OrderTracker,
    RequestSubmission, TransactionWaiter,
};
use crate::lifecycle::{Phase, ProgressEvent, ProgressStatus};
use crate::storage::ContentStore;
use crate::verifier::{Proof, ResultVerifier, VerificationInput};
use crate::wallet::WalletProvider;
use alloy_primitives::{Address, TxHash, U256};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Status polls between two "still processing" notifications
const PROCESSING_NOTICE_POLLS: u32 = 6;

/// A task to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    /// Source code executed by the worker
    pub code: String,
    /// Address of the node that should run the task
    pub preferred_worker: Option<String>,
}

impl TaskRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            preferred_worker: None,
        }
    }

    pub fn with_preferred_worker(mut self, address: impl Into<String>) -> Self {
        self.preferred_worker = Some(address.into());
        self
    }
}

/// External capabilities the coordinator drives
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn Ledger>,
    pub registry: Arc<dyn ImageRegistry>,
    pub store: Arc<dyn ContentStore>,
    pub crypto: Arc<dyn CryptoProvider>,
    pub wallet: Arc<dyn WalletProvider>,
}

/// State of the session in progress
#[derive(Default)]
struct Session {
    id: Option<Uuid>,
    phase: Phase,
    account: Option<Address>,
    preferred_worker: Option<Address>,
    client_challenge: String,
    image: Option<ImageDetails>,
    code_hash: String,
    challenge_hash: String,
    request_id: Option<u64>,
    input_tx_hash: Option<TxHash>,
    order_id: Option<u64>,
    order_status: Option<OrderStatus>,
    worker: Option<Address>,
    publish_attempts: u32,
    status_polls: u32,
    subscription: Option<LedgerSubscription>,
}

/// Runs task sessions, one at a time
pub struct LifecycleCoordinator {
    ledger: Arc<dyn Ledger>,
    registry: Arc<dyn ImageRegistry>,
    store: Arc<dyn ContentStore>,
    crypto: Arc<dyn CryptoProvider>,
    wallet: Arc<dyn WalletProvider>,
    config: RunnerConfig,
    progress: broadcast::Sender<ProgressEvent>,
    session: Session,
}

impl LifecycleCoordinator {
    pub fn new(collaborators: Collaborators, config: RunnerConfig) -> RunnerResult<Self> {
        config.validate()?;
        let (progress, _) = broadcast::channel(config.timing.progress_channel_capacity);

        Ok(Self {
            ledger: collaborators.ledger,
            registry: collaborators.registry,
            store: collaborators.store,
            crypto: collaborators.crypto,
            wallet: collaborators.wallet,
            config,
            progress,
            session: Session::default(),
        })
    }

    /// Receive progress notifications of subsequent sessions
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress.subscribe()
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.id
    }

    pub fn request_id(&self) -> Option<u64> {
        self.session.request_id
    }

    pub fn order_id(&self) -> Option<u64> {
        self.session.order_id
    }

    /// Worker that accepted the order, once known
    pub fn worker(&self) -> Option<Address> {
        self.session.worker
    }

    /// Whether the session holds a ledger event subscription
    pub fn is_subscribed(&self) -> bool {
        self.session.subscription.is_some()
    }

    /// Forget the current session and release its event subscription
    pub fn reset(&mut self) {
        if self.session.subscription.is_some() {
            debug!("Detaching ledger event subscription");
        }
        self.session = Session::default();
    }

    /// Run one task to completion
    pub async fn run(&mut self, request: TaskRequest) -> RunnerResult<Proof> {
        self.reset();

        let session_id = Uuid::new_v4();
        self.session.id = Some(session_id);
        let span = info_span!("session", id = %session_id);

        let outcome = self.execute(request).instrument(span.clone()).await;
        // No listener outlives the session
        self.session.subscription = None;

        match outcome {
            Ok(proof) => Ok(proof),
            Err(err) => {
                let _entered = span.enter();
                self.fail(&err);
                Err(err)
            }
        }
    }

    async fn execute(&mut self, request: TaskRequest) -> RunnerResult<Proof> {
        info!(
            "Starting task session on {} ({} bytes of code)",
            self.config.network.name,
            request.code.len()
        );

        self.check_balance().await?;
        self.verify_node(request.preferred_worker.as_deref()).await?;
        let image = self.resolve_image().await?;
        self.connect_wallet().await?;
        self.ensure_allowance().await?;
        let since = self.submit_request(&request.code, &image).await?;
        let order = self.match_order(since).await?;
        self.approve(order).await?;
        self.await_completion().await?;
        self.verify_result().await
    }

    // ========================================================================
    // Phases
    // ========================================================================

    async fn check_balance(&mut self) -> RunnerResult<()> {
        let account = self
            .wallet
            .current_account()
            .await?
            .ok_or_else(|| RunnerError::WalletUnavailable("no account selected".to_string()))?;
        self.session.account = Some(account);

        let price = self.config.resources.task_price();
        let mut balance = self.ledger.balance_of(account).await?;

        if self.config.network.faucet_available()
            && balance <= U256::from(self.config.network.faucet_threshold)
        {
            balance = self.top_up(account, balance).await?;
        }

        if balance < price {
            return Err(RunnerError::InsufficientFunds {
                balance,
                required: price,
            });
        }

        self.advance(
            Phase::BalanceChecked,
            format!("Balance {} covers task price {}", balance, price),
        );
        Ok(())
    }

    /// Request faucet tokens. A failed request is not fatal: the balance
    /// check decides.
    async fn top_up(&self, account: Address, balance: U256) -> RunnerResult<U256> {
        self.notify(
            format!("Balance {} is low, requesting faucet tokens", balance),
            ProgressStatus::Running,
        );

        let funded: RunnerResult<Confirmation> = async {
            let tx = self.ledger.request_faucet(account).await?;
            self.waiter()
                .submit_and_confirm(tx, EventKind::FaucetFunded)
                .await
        }
        .await;

        match funded {
            Ok(confirmation) => {
                info!("Faucet funded {} in {}", account, confirmation.hash);
                Ok(self.ledger.balance_of(account).await?)
            }
            Err(e) => {
                warn!("Faucet request failed: {}", e);
                Ok(balance)
            }
        }
    }

    async fn verify_node(&mut self, preferred: Option<&str>) -> RunnerResult<()> {
        let message = match preferred {
            None => "No preferred worker, any node may take the task".to_string(),
            Some(raw) => {
                let address: Address = raw
                    .trim()
                    .parse()
                    .map_err(|_| RunnerError::InvalidNodeOperator(raw.to_string()))?;

                if !self.ledger.is_node_operator(address).await? {
                    return Err(RunnerError::InvalidNodeOperator(address.to_string()));
                }

                self.session.preferred_worker = Some(address);
                format!("Node {} is a registered operator", address)
            }
        };

        self.advance(Phase::NodeVerified, message);
        Ok(())
    }

    async fn resolve_image(&mut self) -> RunnerResult<ImageDetails> {
        let runtime = self.config.image.runtime.clone();
        let version = self.config.image.registry_version.clone();

        let image = self
            .registry
            .image_details(&runtime, &version)
            .await?
            .ok_or_else(|| RunnerError::ImageNotFound(format!("{} ({})", runtime, version)))?;

        self.session.image = Some(image.clone());
        self.advance(
            Phase::RegistryResolved,
            format!(
                "Enclave image {} (compose {}, public key {})",
                image.image_hash, image.compose_hash, image.public_key
            ),
        );
        Ok(image)
    }

    async fn connect_wallet(&mut self) -> RunnerResult<()> {
        let account = self.wallet.connect().await?;

        if let Some(checked) = self.session.account {
            if checked != account {
                return Err(RunnerError::WalletUnavailable(format!(
                    "wallet switched from {} to {} during the session",
                    checked, account
                )));
            }
        }

        self.session.account = Some(account);
        self.advance(Phase::Connected, format!("Connected as {}", account));
        Ok(())
    }

    async fn ensure_allowance(&mut self) -> RunnerResult<()> {
        if !self.config.network.require_allowance {
            self.advance(Phase::AllowanceChecked, "No spending allowance required");
            return Ok(());
        }

        let account = self.account()?;
        let price = self.config.resources.task_price();

        let approved: RunnerResult<bool> = async {
            if self.ledger.allowance(account).await? >= price {
                return Ok(false);
            }

            self.notify(
                format!("Approving the contract to spend {}", price),
                ProgressStatus::Running,
            );
            let tx = self.ledger.approve_spending(price).await?;
            self.waiter()
                .submit_and_confirm(tx, EventKind::SpendingApproved)
                .await?;
            Ok::<bool, RunnerError>(true)
        }
        .await;

        let approved = approved.map_err(|e| RunnerError::AllowanceFailure(e.to_string()))?;
        let message = if approved {
            format!("Contract approved to spend {}", price)
        } else {
            format!("Existing allowance covers {}", price)
        };

        self.advance(Phase::AllowanceChecked, message);
        Ok(())
    }

    /// Publish the task and submit the request. Returns the order count
    /// observed before submission.
    async fn submit_request(&mut self, code: &str, image: &ImageDetails) -> RunnerResult<u64> {
        let challenge = codec::generate_client_challenge();
        self.session.client_challenge = challenge.clone();

        let sealed_challenge = self
            .crypto
            .encrypt_for_public_key(challenge.as_bytes(), &image.public_key)
            .await?;
        let challenge_hash = self.publish(sealed_challenge.into_bytes()).await?;

        let sealed_code = self
            .crypto
            .encrypt_for_public_key(code.as_bytes(), &image.public_key)
            .await?;
        let code_hash = self.publish(sealed_code.into_bytes()).await?;

        let code_checksum = self
            .wallet
            .sign_message(&self.crypto.hash(code.as_bytes()))
            .await?;
        let input_checksum = self.wallet.sign_message(ZERO_CHECKSUM).await?;

        // The worker seals the result for this key
        let account = self.account()?;
        let result_key = self.wallet.encryption_public_key(account).await?;

        let submission = RequestSubmission {
            resources: self.config.resources.to_request(),
            image_metadata: codec::encode_image_descriptor(
                &image.image_hash,
                &self.config.image.runtime,
                &image.compose_hash,
                &challenge_hash,
                &result_key,
            ),
            code_metadata: codec::encode_code_descriptor(&code_hash, &code_checksum),
            input_metadata: codec::encode_input_descriptor(&input_checksum),
            preferred_worker: self.session.preferred_worker,
        };

        self.session.code_hash = code_hash;
        self.session.challenge_hash = challenge_hash;

        let since = self.ledger.order_count().await?;
        if self.config.match_strategy == MatchStrategy::Events {
            self.session.subscription = Some(LedgerSubscription::new(self.ledger.as_ref()));
        }

        let tx = self.ledger.add_request(&submission).await?;
        let confirmation = self
            .waiter()
            .submit_and_confirm(tx, EventKind::RequestAdded)
            .await?;

        let LedgerEvent::RequestAdded { request_id, .. } = confirmation.event else {
            return Err(RunnerError::ProtocolViolation(format!(
                "request transaction {} did not report a request id",
                confirmation.hash
            )));
        };

        self.session.request_id = Some(request_id);
        self.session.input_tx_hash = Some(confirmation.hash);
        self.advance(
            Phase::Submitted,
            format!("Request {} submitted in {}", request_id, confirmation.hash),
        );
        Ok(since)
    }

    async fn match_order(&mut self, since: u64) -> RunnerResult<Order> {
        let request_id = self.request_id_or_err()?;
        let account = self.account()?;
        let watchdog = self.config.timing.match_watchdog();

        let tracker = OrderTracker::new(
            self.ledger.clone(),
            self.config.timing.order_scan_interval(),
        );
        let mut resolver = EventRaceResolver::new(account);
        resolver.on_request_accepted(account, request_id);
        let mut subscription = self.session.subscription.take();

        let order_id = {
            let matching = async {
                if let Some(subscription) = subscription.as_mut() {
                    if let Some(matched) = wait_for_match(subscription, &mut resolver).await {
                        return matched.order_id;
                    }
                    warn!("Falling back to scanning orders for request {}", request_id);
                }
                tracker.find_order_for_request(request_id, since).await.id
            };
            tokio::pin!(matching);

            match tokio::time::timeout(watchdog, &mut matching).await {
                Ok(order_id) => order_id,
                Err(_) => {
                    let waited_secs = watchdog.as_secs();
                    if self.config.watchdog_policy == WatchdogPolicy::Fail {
                        return Err(RunnerError::MatchTimeout {
                            request_id,
                            waited_secs,
                        });
                    }
                    self.notify(
                        format!(
                            "No worker picked up request {} within {}s, the network may be congested",
                            request_id, waited_secs
                        ),
                        ProgressStatus::Running,
                    );
                    matching.await
                }
            }
        };
        if subscription.take().is_some() {
            debug!("Detaching ledger event subscription for request {}", request_id);
        }

        let order = self.read_order(order_id).await?;
        if order.requester_request != request_id {
            return Err(RunnerError::ProtocolViolation(format!(
                "order {} belongs to request {}, expected {}",
                order.id, order.requester_request, request_id
            )));
        }
        if order.status == OrderStatus::Invalidated {
            return Err(RunnerError::OrderInvalidated(order.id));
        }

        self.session.order_id = Some(order.id);
        self.session.order_status = Some(order.status);
        self.advance(
            Phase::Matched,
            format!("Order {} placed for request {}", order.id, request_id),
        );
        Ok(order)
    }

    async fn approve(&mut self, order: Order) -> RunnerResult<()> {
        if self.session.preferred_worker.is_some() {
            info!(
                "Order {} was placed for our preferred worker, no approval needed",
                order.id
            );
        } else if order.status == OrderStatus::Pending {
            self.notify(
                format!("Approving order {}", order.id),
                ProgressStatus::Running,
            );
            let tx = self.ledger.approve_order(order.id).await?;
            self.waiter()
                .submit_and_confirm(tx, EventKind::OrderApproved)
                .await?;
        }

        let order = self.read_order(order.id).await?;
        if order.status == OrderStatus::Invalidated {
            return Err(RunnerError::OrderInvalidated(order.id));
        }

        self.session.worker = Some(order.worker);
        self.session.order_status = Some(order.status);
        self.advance(
            Phase::Approved,
            format!("Order {} approved, worker {}", order.id, order.worker),
        );
        Ok(())
    }

    async fn await_completion(&mut self) -> RunnerResult<()> {
        let order_id = self.order_id_or_err()?;
        let interval = self.config.timing.status_poll_interval();
        let mut last = self.session.order_status.unwrap_or(OrderStatus::Approved);

        self.advance(
            Phase::Processing,
            format!("Waiting for order {} to be processed", order_id),
        );

        loop {
            self.session.status_polls += 1;

            match self.ledger.order(order_id).await {
                Ok(order) => {
                    if !last.can_reach(order.status) {
                        return Err(RunnerError::ProtocolViolation(format!(
                            "order {} went from {} to {}",
                            order_id, last, order.status
                        )));
                    }
                    if order.status != last {
                        debug!("Order {} is now {}", order_id, order.status);
                        last = order.status;
                        self.session.order_status = Some(last);
                    }

                    match order.status {
                        OrderStatus::Closed => break,
                        OrderStatus::Invalidated => {
                            return Err(RunnerError::OrderInvalidated(order_id))
                        }
                        _ => {}
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to poll order {}: {} (poll {})",
                        order_id, e, self.session.status_polls
                    );
                }
            }

            if self.session.status_polls % PROCESSING_NOTICE_POLLS == 0 {
                let worker = self
                    .session
                    .worker
                    .map(|w| w.to_string())
                    .unwrap_or_else(|| "the network".to_string());
                self.notify(
                    format!("Waiting for the task to be processed by {}", worker),
                    ProgressStatus::Running,
                );
            }

            tokio::time::sleep(interval).await;
        }

        self.advance(
            Phase::ResultFetched,
            format!(
                "Order {} closed after {} polls",
                order_id, self.session.status_polls
            ),
        );
        Ok(())
    }

    async fn verify_result(&mut self) -> RunnerResult<Proof> {
        let image = self
            .session
            .image
            .as_ref()
            .ok_or_else(|| RunnerError::ProtocolViolation("no image resolved".to_string()))?;
        let input_tx_hash = self.session.input_tx_hash.ok_or_else(|| {
            RunnerError::ProtocolViolation("no request transaction".to_string())
        })?;

        let input = VerificationInput {
            order_id: self.order_id_or_err()?,
            client_challenge: self.session.client_challenge.clone(),
            account: self.account()?,
            input_tx_hash,
            image_reference: format!("{}:{}", image.image_hash, self.config.image.runtime),
            code_hash: self.session.code_hash.clone(),
            input_hash: self.session.challenge_hash.clone(),
        };

        let verifier = ResultVerifier::new(
            self.ledger.clone(),
            self.store.clone(),
            self.crypto.clone(),
            self.config.timing.storage_retry_budget,
            self.config.timing.storage_retry_delay(),
        )
        .with_recent_blocks(self.config.timing.recent_blocks);

        let proof = verifier.verify(&input).await?;

        if !proof.task_code.is_success() {
            return Err(RunnerError::TaskFailed {
                code: proof.task_code.to_string(),
                detail: proof.result,
            });
        }

        self.advance(
            Phase::Succeeded,
            format!("Result {} verified", proof.result_hash),
        );
        Ok(proof)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn waiter(&self) -> TransactionWaiter {
        TransactionWaiter::new(self.ledger.clone(), self.config.timing.tx_poll_interval())
    }

    /// Store a blob, retrying within the storage budget
    async fn publish(&mut self, data: Vec<u8>) -> RunnerResult<String> {
        let budget = self.config.timing.storage_retry_budget;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            self.session.publish_attempts += 1;

            match self.store.put(data.clone()).await {
                Ok(hash) => {
                    debug!("Published {} bytes as {}", data.len(), hash);
                    return Ok(hash);
                }
                Err(e) if attempts >= budget => {
                    return Err(RunnerError::StorageUnavailable {
                        attempts,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Upload failed: {} (attempt {}/{})", e, attempts, budget);
                }
            }

            tokio::time::sleep(self.config.timing.storage_retry_delay()).await;
        }
    }

    /// Read an order, retrying transient ledger errors
    async fn read_order(&self, order_id: u64) -> RunnerResult<Order> {
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            match self.ledger.order(order_id).await {
                Ok(order) => return Ok(order),
                Err(e) if e.is_transient() => {
                    warn!("Failed to read order {}: {} (attempt {})", order_id, e, attempts);
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(self.config.timing.status_poll_interval()).await;
        }
    }

    fn account(&self) -> RunnerResult<Address> {
        self.session
            .account
            .ok_or_else(|| RunnerError::WalletUnavailable("no account selected".to_string()))
    }

    fn request_id_or_err(&self) -> RunnerResult<u64> {
        self.session
            .request_id
            .ok_or_else(|| RunnerError::ProtocolViolation("no request id".to_string()))
    }

    fn order_id_or_err(&self) -> RunnerResult<u64> {
        self.session
            .order_id
            .ok_or_else(|| RunnerError::ProtocolViolation("no order id".to_string()))
    }

    fn advance(&mut self, next: Phase, message: impl Into<String>) {
        let current = self.session.phase;
        debug_assert!(
            Phase::is_valid_transition(current, next),
            "invalid phase transition {} -> {}",
            current,
            next
        );

        self.session.phase = next;
        let status = if next == Phase::Succeeded {
            ProgressStatus::Success
        } else {
            ProgressStatus::Running
        };
        self.emit(next, message.into(), status);
    }

    fn fail(&mut self, err: &RunnerError) {
        if Phase::is_valid_transition(self.session.phase, Phase::Failed) {
            self.session.phase = Phase::Failed;
        }
        self.emit(Phase::Failed, err.to_string(), ProgressStatus::Error);
    }

    /// Progress message within the current phase
    fn notify(&self, message: String, status: ProgressStatus) {
        self.emit(self.session.phase, message, status);
    }

    fn emit(&self, phase: Phase, message: String, status: ProgressStatus) {
        match status {
            ProgressStatus::Error => error!("[{}] {}", phase, message),
            _ => info!("[{}] {}", phase, message),
        }
        // No receivers is fine
        let _ = self.progress.send(ProgressEvent::new(phase, message, status));
    }
}

/// Feed ledger events to the resolver until it fires. `None` if the stream
/// broke, in which case the caller scans instead.
async fn wait_for_match(
    subscription: &mut LedgerSubscription,
    resolver: &mut EventRaceResolver,
) -> Option<MatchedOrder> {
    loop {
        match subscription.recv().await {
            Ok(event) => {
                if let Some(matched) = resolver.on_event(&event) {
                    return Some(matched);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Ledger event stream skipped {} events", skipped);
                return None;
            }
            Err(RecvError::Closed) => {
                warn!("Ledger event stream closed");
                return None;
            }
        }
    }
}
