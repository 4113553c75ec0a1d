//! Wallet provider
//!
//! The requester's wallet discovers the account, signs checksums placed in
//! task descriptors and exposes the encryption public key results are
//! sealed for. `LocalWallet` keeps both keys in process.

use crate::crypto::X25519Crypto;
use alloy_primitives::Address;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use rand::rngs::OsRng;
use thiserror::Error;
use x25519_dalek::StaticSecret;

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("No account available")]
    NoAccount,
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),
    #[error("Signing failed: {0}")]
    SigningFailed(String),
    #[error("Public key unavailable: {0}")]
    PublicKeyUnavailable(String),
}

/// Requester wallet capabilities
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Establish a session and return the active account
    async fn connect(&self) -> WalletResult<Address>;

    /// Active account without prompting, if any
    async fn current_account(&self) -> WalletResult<Option<Address>>;

    /// Sign a message, returning the hex signature
    async fn sign_message(&self, message: &str) -> WalletResult<String>;

    /// Hex encryption public key of `account`
    async fn encryption_public_key(&self, account: Address) -> WalletResult<String>;
}

/// Wallet holding a secp256k1 signing key and an X25519 encryption key
pub struct LocalWallet {
    signer: PrivateKeySigner,
    encryption_secret: StaticSecret,
}

impl LocalWallet {
    pub fn new(signer: PrivateKeySigner, encryption_secret: StaticSecret) -> Self {
        Self {
            signer,
            encryption_secret,
        }
    }

    /// Fresh random keys
    pub fn random() -> Self {
        Self::new(
            PrivateKeySigner::random(),
            StaticSecret::random_from_rng(OsRng),
        )
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Register this wallet's decryption key with a crypto provider
    pub fn register_with(&self, crypto: &X25519Crypto) {
        crypto.register_account(self.address(), self.encryption_secret.clone());
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn connect(&self) -> WalletResult<Address> {
        Ok(self.address())
    }

    async fn current_account(&self) -> WalletResult<Option<Address>> {
        Ok(Some(self.address()))
    }

    async fn sign_message(&self, message: &str) -> WalletResult<String> {
        let signature = self
            .signer
            .sign_message_sync(message.as_bytes())
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }

    async fn encryption_public_key(&self, account: Address) -> WalletResult<String> {
        if account != self.address() {
            return Err(WalletError::PublicKeyUnavailable(format!(
                "unknown account {}",
                account
            )));
        }
        Ok(X25519Crypto::public_key_hex(&self.encryption_secret))
    }
}
