//! Transaction confirmation
//!
//! Polls the receipt of a submitted transaction until it is mined, then
//! extracts the event the protocol requires the call to emit.
//!
//! Policy:
//! - not mined yet / transient provider error: retry after a fixed delay, forever
//! - reverted: fail immediately, with the revert reason fetched from the ledger
//! - mined without the expected event: protocol violation

use super::{EventKind, Ledger, LedgerError, LedgerEvent, ReceiptStatus, TxHandle};
use crate::error::{RunnerError, RunnerResult};
use alloy_primitives::TxHash;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub hash: TxHash,
    pub block_number: u64,
    /// The expected event, decoded from the receipt
    pub event: LedgerEvent,
    /// Number of receipt polls it took
    pub polls: u32,
}

/// Waits for transactions to be mined
pub struct TransactionWaiter {
    ledger: Arc<dyn Ledger>,
    poll_interval: Duration,
}

impl TransactionWaiter {
    pub fn new(ledger: Arc<dyn Ledger>, poll_interval: Duration) -> Self {
        Self {
            ledger,
            poll_interval,
        }
    }

    /// Wait until `tx` is mined and return the `expected` event it emitted
    pub async fn submit_and_confirm(
        &self,
        tx: TxHandle,
        expected: EventKind,
    ) -> RunnerResult<Confirmation> {
        let mut polls = 0u32;

        loop {
            polls += 1;

            match self.ledger.transaction_receipt(tx.hash).await {
                Ok(Some(receipt)) => {
                    if receipt.status == ReceiptStatus::Reverted {
                        return Err(self.reverted(tx.hash, None).await);
                    }

                    let Some(event) = receipt.find_event(expected).cloned() else {
                        return Err(RunnerError::ProtocolViolation(format!(
                            "transaction {} was confirmed without a {} event",
                            tx.hash, expected
                        )));
                    };

                    info!(
                        "Transaction {} confirmed in block {} after {} polls",
                        tx.hash, receipt.block_number, polls
                    );

                    return Ok(Confirmation {
                        hash: tx.hash,
                        block_number: receipt.block_number,
                        event,
                        polls,
                    });
                }
                Ok(None) => {
                    debug!("Transaction {} not mined yet (poll {})", tx.hash, polls);
                }
                Err(LedgerError::Reverted { hash, reason }) => {
                    return Err(self.reverted(hash, Some(reason)).await);
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        "Failed to read receipt of {}: {} (attempt {})",
                        tx.hash, e, polls
                    );
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Build the revert error, asking the ledger for a readable reason when needed
    async fn reverted(&self, hash: TxHash, known_reason: Option<String>) -> RunnerError {
        let reason = match known_reason.filter(|r| !r.is_empty()) {
            Some(reason) => reason,
            None => match self.ledger.revert_reason(hash).await {
                Ok(Some(reason)) => reason,
                Ok(None) => "unknown reason".to_string(),
                Err(e) => {
                    warn!("Failed to fetch revert reason of {}: {}", hash, e);
                    "unknown reason".to_string()
                }
            },
        };

        warn!("Transaction {} reverted: {}", hash, reason);
        RunnerError::TransactionReverted { hash, reason }
    }
}
