//! Ledger integration
//!
//! The ledger (protocol contract + image registry) is an external
//! collaborator. This module defines the capability interface the runner
//! consumes and the protocol logic layered on top of it:
//! - `waiter`: transaction confirmation and receipt event extraction
//! - `tracker`: order discovery by scanning the order list
//! - `events`: reconciliation of out-of-order request/order events

pub mod events;
pub mod tracker;
pub mod types;
pub mod waiter;

pub use events::{EventRaceResolver, LedgerSubscription, MatchedOrder};
pub use tracker::OrderTracker;
pub use types::{
    EventKind, ImageDetails, LedgerEvent, Order, OrderStatus, ParsedTransaction, ReceiptStatus,
    RequestSubmission, ResourceRequest, TransactionReceipt, TransactionSummary, TxHandle,
};
pub use waiter::{Confirmation, TransactionWaiter};

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

/// Result type for ledger calls
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors reported by the ledger collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Provider hiccup, retrying the same call may succeed
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// The transaction was mined and reverted
    #[error("Transaction {hash} reverted: {reason}")]
    Reverted { hash: TxHash, reason: String },

    /// The call was refused before reaching the chain (signature denied, bad args)
    #[error("Call rejected: {0}")]
    Rejected(String),

    /// The ledger returned data that cannot be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl LedgerError {
    /// Whether the failed call should be retried after a delay
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transient(_))
    }
}

/// Protocol contract capabilities used by the runner
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Address of the protocol contract
    fn contract_address(&self) -> Address;

    /// Subscribe to contract events. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent>;

    // ==================== Views ====================

    async fn balance_of(&self, account: Address) -> LedgerResult<U256>;
    async fn allowance(&self, owner: Address) -> LedgerResult<U256>;
    async fn is_node_operator(&self, account: Address) -> LedgerResult<bool>;
    async fn request_count(&self) -> LedgerResult<u64>;
    async fn order_count(&self) -> LedgerResult<u64>;
    async fn order(&self, index: u64) -> LedgerResult<Order>;
    async fn result_for_order(&self, order_id: u64) -> LedgerResult<String>;

    // ==================== Transactions ====================

    async fn add_request(&self, request: &RequestSubmission) -> LedgerResult<TxHandle>;
    async fn approve_order(&self, order_id: u64) -> LedgerResult<TxHandle>;
    async fn approve_spending(&self, amount: U256) -> LedgerResult<TxHandle>;
    async fn request_faucet(&self, account: Address) -> LedgerResult<TxHandle>;

    /// `Ok(None)` while the transaction is not mined yet
    async fn transaction_receipt(&self, hash: TxHash) -> LedgerResult<Option<TransactionReceipt>>;
    async fn revert_reason(&self, hash: TxHash) -> LedgerResult<Option<String>>;
    async fn transaction_timestamp(&self, hash: TxHash) -> LedgerResult<Option<u64>>;

    /// Transactions sent to the contract in the last `depth` blocks, newest first
    async fn recent_contract_transactions(
        &self,
        depth: u64,
    ) -> LedgerResult<Vec<TransactionSummary>>;

    /// Decode raw signed transaction bytes into sender + result argument
    fn parse_transaction_bytes(&self, bytes: &str) -> LedgerResult<ParsedTransaction>;
}

/// Registry of trusted worker images
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Latest trusted image for `runtime` published under `version`
    async fn image_details(
        &self,
        runtime: &str,
        version: &str,
    ) -> LedgerResult<Option<ImageDetails>>;
}
