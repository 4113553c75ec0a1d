//! Cryptographic capabilities.
//!
//! The runner never touches key material directly: payloads are encrypted
//! for the worker's public key and results are decrypted on behalf of the
//! requester account through a `CryptoProvider`.

pub mod sealed;

pub use sealed::X25519Crypto;

use alloy_primitives::Address;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// SHA-256 of the empty string, used as the checksum of an empty input set
pub const ZERO_CHECKSUM: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("No decryption key for account {0}")]
    UnknownAccount(Address),
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Encryption, decryption and hashing used by the runner
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    /// Encrypt `plaintext` so only the holder of `public_key` can read it
    async fn encrypt_for_public_key(
        &self,
        plaintext: &[u8],
        public_key: &str,
    ) -> CryptoResult<String>;

    /// Decrypt an envelope addressed to `account`
    async fn decrypt_with_private_key(
        &self,
        envelope: &str,
        account: Address,
    ) -> CryptoResult<Vec<u8>>;

    /// Checksum of `data`, lowercase hex
    fn hash(&self, data: &[u8]) -> String {
        sha256_hex(data)
    }
}

/// Lowercase hex SHA-256
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
