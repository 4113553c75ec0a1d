//! Result verification
//!
//! A closed order carries a result envelope: the raw transaction the worker
//! used to publish its result, plus the content hash of the encrypted
//! output. Verification flow:
//! 1. Decode the envelope stored on the order
//! 2. Parse the embedded transaction and decode its payload
//! 3. Check that the transaction was signed by the key derived from our
//!    client challenge and the worker's enclave challenge
//! 4. Fetch the encrypted output within the retry budget
//! 5. Decrypt it with the requester's key
//! 6. Compare its checksum with the one in the payload
//! 7. Assemble the proof
//!
//! The signer check runs before anything is fetched or decrypted. Transient
//! ledger errors on the first read are retried without limit.

use crate::codec::{self, ResultPayload, TaskStatusCode};
use crate::crypto::CryptoProvider;
use crate::error::{RunnerError, RunnerResult};
use crate::ledger::Ledger;
use crate::storage::ContentStore;
use alloy_primitives::{keccak256, Address, TxHash};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What the verifier needs to know about the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationInput {
    pub order_id: u64,
    pub client_challenge: String,
    /// Requester account the result was encrypted for
    pub account: Address,
    /// Transaction that created the request
    pub input_tx_hash: TxHash,
    /// `<image_hash>:<runtime>`
    pub image_reference: String,
    pub code_hash: String,
    /// Content hash of the encrypted challenge
    pub input_hash: String,
}

/// Verified outcome of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub contract_address: Address,
    pub order_id: u64,
    pub input_transaction_hash: TxHash,
    /// Hash of the worker's result transaction
    pub output_transaction_hash: TxHash,
    pub image_hash: String,
    pub code_hash: String,
    pub input_hash: String,
    pub result_hash: String,
    pub task_code: TaskStatusCode,
    /// Decrypted task output
    pub result: String,
    /// Block timestamp of the request transaction
    pub public_timestamp: Option<u64>,
    /// Block timestamp of the result transaction
    pub result_timestamp: Option<u64>,
}

/// Verifies and decrypts order results
pub struct ResultVerifier {
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn ContentStore>,
    crypto: Arc<dyn CryptoProvider>,
    retry_budget: u32,
    retry_delay: Duration,
    recent_blocks: u64,
}

impl ResultVerifier {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn ContentStore>,
        crypto: Arc<dyn CryptoProvider>,
        retry_budget: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            ledger,
            store,
            crypto,
            retry_budget: retry_budget.max(1),
            retry_delay,
            recent_blocks: 20,
        }
    }

    /// Depth of the recent-transaction search for the result timestamp
    pub fn with_recent_blocks(mut self, depth: u64) -> Self {
        self.recent_blocks = depth;
        self
    }

    pub async fn verify(&self, input: &VerificationInput) -> RunnerResult<Proof> {
        // 1. Envelope
        let raw = self.read_result(input.order_id).await?;
        let envelope = codec::decode_result_envelope(&raw)
            .map_err(|e| RunnerError::MalformedResult(e.to_string()))?;

        if envelope.result_hash.is_empty() {
            return Err(RunnerError::TaskFailed {
                code: "NO_RESULT".to_string(),
                detail: format!("order {} closed without a result", input.order_id),
            });
        }

        // 2. Payload
        let parsed = self
            .ledger
            .parse_transaction_bytes(&envelope.tx_bytes)
            .map_err(|e| RunnerError::ProtocolViolation(format!("result transaction: {}", e)))?;
        let payload = codec::decode_result_payload(&parsed)
            .map_err(|e| RunnerError::ProtocolViolation(e.to_string()))?;
        let output_transaction_hash = transaction_hash(&envelope.tx_bytes)?;

        // 3. Provenance
        self.check_signer(&input.client_challenge, &payload)?;
        debug!(
            "Result of order {} signed by expected enclave key {}",
            input.order_id, payload.from
        );

        // 4. Fetch
        let blob = self.fetch_with_retry(&envelope.result_hash).await?;

        // 5. Decrypt
        let sealed = String::from_utf8(blob)
            .map_err(|e| RunnerError::IntegrityFailure(format!("decrypt failed: {}", e)))?;
        let plaintext = self
            .crypto
            .decrypt_with_private_key(&sealed, input.account)
            .await
            .map_err(|e| RunnerError::IntegrityFailure(format!("decrypt failed: {}", e)))?;

        // 6. Checksum
        let checksum = self.crypto.hash(&plaintext);
        if !checksum.eq_ignore_ascii_case(payload.checksum.trim_start_matches("0x")) {
            warn!(
                "Checksum mismatch on order {}: computed {}, reported {}",
                input.order_id, checksum, payload.checksum
            );
            return Err(RunnerError::IntegrityFailure("checksum mismatch".to_string()));
        }

        // 7. Proof
        let public_timestamp = self.timestamp_of(input.input_tx_hash).await;
        let result_timestamp = self.result_timestamp(output_transaction_hash).await;

        info!(
            "Verified result of order {} ({})",
            input.order_id, payload.task_code
        );

        Ok(Proof {
            contract_address: self.ledger.contract_address(),
            order_id: input.order_id,
            input_transaction_hash: input.input_tx_hash,
            output_transaction_hash,
            image_hash: input.image_reference.clone(),
            code_hash: input.code_hash.clone(),
            input_hash: input.input_hash.clone(),
            result_hash: envelope.result_hash,
            task_code: payload.task_code,
            result: String::from_utf8_lossy(&plaintext).into_owned(),
            public_timestamp,
            result_timestamp,
        })
    }

    /// Read the result string of a closed order, retrying transient ledger errors
    async fn read_result(&self, order_id: u64) -> RunnerResult<String> {
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            match self.ledger.result_for_order(order_id).await {
                Ok(raw) => return Ok(raw),
                Err(e) if e.is_transient() => {
                    warn!(
                        "Failed to read result of order {}: {} (attempt {})",
                        order_id, e, attempts
                    );
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(self.retry_delay).await;
        }
    }

    fn check_signer(&self, client_challenge: &str, payload: &ResultPayload) -> RunnerResult<()> {
        let expected =
            codec::derive_verification_address(client_challenge, &payload.enclave_challenge)
                .map_err(|e| RunnerError::IntegrityFailure(e.to_string()))?;

        if expected != payload.from {
            warn!(
                "Result signed by {}, expected {}",
                payload.from, expected
            );
            return Err(RunnerError::IntegrityFailure("signer mismatch".to_string()));
        }
        Ok(())
    }

    async fn fetch_with_retry(&self, hash: &str) -> RunnerResult<Vec<u8>> {
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            match self.store.get(hash).await {
                Ok(blob) => {
                    if attempts > 1 {
                        info!("Fetched result {} after {} attempts", hash, attempts);
                    }
                    return Ok(blob);
                }
                Err(e) if attempts >= self.retry_budget => {
                    warn!("Giving up on result {} after {} attempts: {}", hash, attempts, e);
                    return Err(RunnerError::StorageUnavailable {
                        attempts,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    debug!(
                        "Result {} not available yet: {} (attempt {}/{})",
                        hash, e, attempts, self.retry_budget
                    );
                }
            }

            tokio::time::sleep(self.retry_delay).await;
        }
    }

    async fn timestamp_of(&self, hash: TxHash) -> Option<u64> {
        match self.ledger.transaction_timestamp(hash).await {
            Ok(timestamp) => timestamp,
            Err(e) => {
                warn!("Failed to read timestamp of {}: {}", hash, e);
                None
            }
        }
    }

    /// Look for the result transaction among recent contract transactions,
    /// falling back to a direct lookup
    async fn result_timestamp(&self, hash: TxHash) -> Option<u64> {
        match self
            .ledger
            .recent_contract_transactions(self.recent_blocks)
            .await
        {
            Ok(recent) => {
                if let Some(tx) = recent.iter().find(|tx| tx.hash == hash) {
                    return Some(tx.timestamp);
                }
                debug!(
                    "Result transaction {} not in the last {} blocks",
                    hash, self.recent_blocks
                );
            }
            Err(e) => warn!("Failed to list recent transactions: {}", e),
        }
        self.timestamp_of(hash).await
    }
}

/// Hash of a raw signed transaction
fn transaction_hash(tx_bytes: &str) -> RunnerResult<TxHash> {
    let bytes = hex::decode(tx_bytes.trim_start_matches("0x"))
        .map_err(|e| RunnerError::ProtocolViolation(format!("result transaction bytes: {}", e)))?;
    Ok(keccak256(bytes))
}
