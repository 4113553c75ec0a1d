//! Error types for the task runner
//!
//! `RunnerError` is the terminal failure taxonomy of a session. Collaborator
//! errors (ledger, storage, crypto, wallet) are converted into it at the
//! boundary where their meaning becomes clear.

use crate::crypto::CryptoError;
use crate::ledger::LedgerError;
use crate::storage::StorageError;
use crate::wallet::WalletError;
use alloy_primitives::{TxHash, U256};
use thiserror::Error;

/// Result type for runner operations
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Terminal failures of a task session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    #[error("Insufficient funds: balance {balance}, task price {required}")]
    InsufficientFunds { balance: U256, required: U256 },

    #[error("Invalid node operator: {0}")]
    InvalidNodeOperator(String),

    #[error("Worker image not found: {0}")]
    ImageNotFound(String),

    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    #[error("Allowance failure: {0}")]
    AllowanceFailure(String),

    #[error("Transaction {hash} reverted: {reason}")]
    TransactionReverted { hash: TxHash, reason: String },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Malformed result: {0}")]
    MalformedResult(String),

    #[error("Integrity failure: {0}")]
    IntegrityFailure(String),

    #[error("Storage unavailable after {attempts} attempts: {message}")]
    StorageUnavailable { attempts: u32, message: String },

    #[error("Task failed ({code}): {detail}")]
    TaskFailed { code: String, detail: String },

    #[error("Order {0} was invalidated")]
    OrderInvalidated(u64),

    #[error("No worker matched request {request_id} within {waited_secs}s")]
    MatchTimeout { request_id: u64, waited_secs: u64 },

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RunnerError {
    /// Integrity failures point at a potentially adversarial worker
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, RunnerError::IntegrityFailure(_))
    }

    /// Whether retrying the same operation could change the outcome
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RunnerError::StorageUnavailable { .. } | RunnerError::Ledger(_)
        )
    }
}

impl From<LedgerError> for RunnerError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Reverted { hash, reason } => {
                RunnerError::TransactionReverted { hash, reason }
            }
            other => RunnerError::Ledger(other.to_string()),
        }
    }
}

impl From<CryptoError> for RunnerError {
    fn from(err: CryptoError) -> Self {
        RunnerError::Encryption(err.to_string())
    }
}

impl From<WalletError> for RunnerError {
    fn from(err: WalletError) -> Self {
        RunnerError::WalletUnavailable(err.to_string())
    }
}

impl From<StorageError> for RunnerError {
    fn from(err: StorageError) -> Self {
        RunnerError::StorageUnavailable {
            attempts: 1,
            message: err.to_string(),
        }
    }
}
