//! Challenge codec
//!
//! Builds and parses the colon-delimited metadata strings exchanged with the
//! ledger, and derives the verification address from a challenge pair.
//!
//! Formats (all version-prefixed with `v3`):
//! - image:  `v3:<image_hash>:<runtime>:<compose_hash>:<challenge_ref>:<public_key>`
//! - code:   `v3:<code_hash>:<code_checksum>`
//! - input:  `v3::<input_checksum>` (empty slot kept for an input hash)
//! - result: `<version>:<tx_bytes>:<result_hash>`
//! - result transaction argument: `<version>:<task_code>:<checksum>:<enclave_challenge>`
//!
//! The image descriptor's `<public_key>` is the requester's encryption key,
//! which the worker seals the result for. Fields are opaque hashes and
//! identifiers and are never escaped.

use crate::ledger::ParsedTransaction;
use alloy_primitives::{Address, B256};
use alloy_signer_local::PrivateKeySigner;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Descriptor format version written by this runner
pub const DESCRIPTOR_VERSION: &str = "v3";

/// Length of the client challenge, in hex characters
pub const CLIENT_CHALLENGE_LEN: usize = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed {what}: expected at least {expected} fields, got {got}")]
    TooFewFields {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("challenge pair does not derive a valid key: {0}")]
    InvalidChallenge(String),
}

// ============================================================================
// Descriptors
// ============================================================================

pub fn encode_image_descriptor(
    image_hash: &str,
    runtime: &str,
    compose_hash: &str,
    challenge_ref: &str,
    public_key: &str,
) -> String {
    format!(
        "{}:{}:{}:{}:{}:{}",
        DESCRIPTOR_VERSION, image_hash, runtime, compose_hash, challenge_ref, public_key
    )
}

pub fn encode_code_descriptor(code_hash: &str, code_checksum: &str) -> String {
    format!("{}:{}:{}", DESCRIPTOR_VERSION, code_hash, code_checksum)
}

pub fn encode_input_descriptor(input_checksum: &str) -> String {
    format!("{}::{}", DESCRIPTOR_VERSION, input_checksum)
}

// ============================================================================
// Results
// ============================================================================

/// Result string stored on a closed order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub version: String,
    /// Raw result transaction, always `0x` prefixed
    pub tx_bytes: String,
    /// Content hash of the encrypted result; empty when the worker produced none
    pub result_hash: String,
}

pub fn decode_result_envelope(raw: &str) -> Result<ResultEnvelope, CodecError> {
    let fields: Vec<&str> = raw.trim().split(':').collect();
    if fields.len() < 3 {
        return Err(CodecError::TooFewFields {
            what: "result envelope",
            expected: 3,
            got: fields.len(),
        });
    }

    let tx_bytes = if fields[1].starts_with("0x") {
        fields[1].to_string()
    } else {
        format!("0x{}", fields[1])
    };

    Ok(ResultEnvelope {
        version: fields[0].to_string(),
        tx_bytes,
        result_hash: fields[2].to_string(),
    })
}

/// Status code reported by the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatusCode {
    Success,
    SystemError,
    KeyError,
    SyntaxWarning,
    BaseException,
    PayloadNotDefined,
    PayloadChecksumError,
    InputChecksumError,
    Unknown(String),
}

impl TaskStatusCode {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "0" => TaskStatusCode::Success,
            "1" => TaskStatusCode::SystemError,
            "2" => TaskStatusCode::KeyError,
            "3" => TaskStatusCode::SyntaxWarning,
            "4" => TaskStatusCode::BaseException,
            "5" => TaskStatusCode::PayloadNotDefined,
            "6" => TaskStatusCode::PayloadChecksumError,
            "7" => TaskStatusCode::InputChecksumError,
            other => TaskStatusCode::Unknown(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatusCode::Success)
    }
}

impl fmt::Display for TaskStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatusCode::Success => f.write_str("SUCCESS"),
            TaskStatusCode::SystemError => f.write_str("SYSTEM_ERROR"),
            TaskStatusCode::KeyError => f.write_str("KEY_ERROR"),
            TaskStatusCode::SyntaxWarning => f.write_str("SYNTAX_WARNING"),
            TaskStatusCode::BaseException => f.write_str("BASE_EXCEPTION"),
            TaskStatusCode::PayloadNotDefined => f.write_str("PAYLOAD_NOT_DEFINED"),
            TaskStatusCode::PayloadChecksumError => f.write_str("PAYLOAD_CHECKSUM_ERROR"),
            TaskStatusCode::InputChecksumError => f.write_str("INPUT_CHECKSUM_ERROR"),
            TaskStatusCode::Unknown(code) => write!(f, "UNKNOWN({})", code),
        }
    }
}

/// Payload the worker embedded in its result transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub version: String,
    /// Account that authored the result transaction
    pub from: Address,
    pub task_code: TaskStatusCode,
    pub checksum: String,
    pub enclave_challenge: String,
}

pub fn decode_result_payload(parsed: &ParsedTransaction) -> Result<ResultPayload, CodecError> {
    let fields: Vec<&str> = parsed.result.trim().split(':').collect();
    if fields.len() < 4 {
        return Err(CodecError::TooFewFields {
            what: "result payload",
            expected: 4,
            got: fields.len(),
        });
    }

    Ok(ResultPayload {
        version: fields[0].to_string(),
        from: parsed.from,
        task_code: TaskStatusCode::from_code(fields[1]),
        checksum: fields[2].to_string(),
        enclave_challenge: fields[3].to_string(),
    })
}

// ============================================================================
// Challenge pair
// ============================================================================

/// Random lowercase hex nonce
pub fn generate_client_challenge() -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..CLIENT_CHALLENGE_LEN)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect()
}

/// Key derived from `SHA-256(SHA-256(client ++ enclave))`.
///
/// The worker signs its result transaction with this key, which binds the
/// result to the enclave that saw our client challenge.
pub fn derive_verification_signer(
    client_challenge: &str,
    enclave_challenge: &str,
) -> Result<PrivateKeySigner, CodecError> {
    let mut hasher = Sha256::new();
    hasher.update(client_challenge.as_bytes());
    hasher.update(enclave_challenge.as_bytes());
    let first = hasher.finalize();

    let mut key = [0u8; 32];
    key.copy_from_slice(&Sha256::digest(first));

    PrivateKeySigner::from_bytes(&B256::from(key))
        .map_err(|e| CodecError::InvalidChallenge(e.to_string()))
}

/// Address the result transaction must come from
pub fn derive_verification_address(
    client_challenge: &str,
    enclave_challenge: &str,
) -> Result<Address, CodecError> {
    Ok(derive_verification_signer(client_challenge, enclave_challenge)?.address())
}
