//! Sealed-box encryption over X25519
//!
//! Envelope layout (hex encoded):
//! `ephemeral_public_key (32) || nonce (24) || XChaCha20-Poly1305 ciphertext`
//!
//! The symmetric key is SHA-256 over a domain label and the X25519 shared
//! secret between the ephemeral key and the recipient key.

use super::{CryptoError, CryptoProvider, CryptoResult};
use alloy_primitives::Address;
use async_trait::async_trait;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

const KEY_LABEL: &[u8] = b"task-runner-sealed-v1";
const PUBLIC_KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 24;

/// X25519 crypto provider holding the decryption keys of local accounts
#[derive(Default)]
pub struct X25519Crypto {
    secrets: RwLock<HashMap<Address, StaticSecret>>,
}

impl X25519Crypto {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `account` able to decrypt envelopes sealed for `secret`'s public key
    pub fn register_account(&self, account: Address, secret: StaticSecret) {
        self.secrets.write().insert(account, secret);
    }

    /// Hex public key matching `secret`
    pub fn public_key_hex(secret: &StaticSecret) -> String {
        hex::encode(PublicKey::from(secret).as_bytes())
    }

    /// Seal `plaintext` for the hex encoded X25519 `public_key`
    #[allow(deprecated)]
    pub fn seal(plaintext: &[u8], public_key: &str) -> CryptoResult<String> {
        let recipient = parse_public_key(public_key)?;

        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(&recipient);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let cipher = XChaCha20Poly1305::new_from_slice(&derive_key(shared.as_bytes()))
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut envelope = Vec::with_capacity(PUBLIC_KEY_SIZE + NONCE_SIZE + ciphertext.len());
        envelope.extend_from_slice(ephemeral_public.as_bytes());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);

        Ok(hex::encode(envelope))
    }

    /// Open an envelope with the recipient's secret
    #[allow(deprecated)]
    pub fn open(envelope: &str, secret: &StaticSecret) -> CryptoResult<Vec<u8>> {
        let data = hex::decode(envelope.trim().trim_start_matches("0x"))
            .map_err(|e| CryptoError::InvalidEnvelope(e.to_string()))?;

        if data.len() < PUBLIC_KEY_SIZE + NONCE_SIZE {
            return Err(CryptoError::InvalidEnvelope(format!(
                "envelope too short: {} bytes",
                data.len()
            )));
        }

        let (ephemeral, rest) = data.split_at(PUBLIC_KEY_SIZE);
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

        let ephemeral: [u8; PUBLIC_KEY_SIZE] = ephemeral
            .try_into()
            .map_err(|_| CryptoError::InvalidEnvelope("bad ephemeral key".to_string()))?;
        let shared = secret.diffie_hellman(&PublicKey::from(ephemeral));

        let cipher = XChaCha20Poly1305::new_from_slice(&derive_key(shared.as_bytes()))
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

        cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed("Authentication failed".to_string()))
    }
}

#[async_trait]
impl CryptoProvider for X25519Crypto {
    async fn encrypt_for_public_key(
        &self,
        plaintext: &[u8],
        public_key: &str,
    ) -> CryptoResult<String> {
        Self::seal(plaintext, public_key)
    }

    async fn decrypt_with_private_key(
        &self,
        envelope: &str,
        account: Address,
    ) -> CryptoResult<Vec<u8>> {
        let secret = self
            .secrets
            .read()
            .get(&account)
            .cloned()
            .ok_or(CryptoError::UnknownAccount(account))?;

        Self::open(envelope, &secret)
    }
}

fn derive_key(shared: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(KEY_LABEL);
    hasher.update(shared);

    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}

fn parse_public_key(public_key: &str) -> CryptoResult<PublicKey> {
    let bytes = hex::decode(public_key.trim().trim_start_matches("0x"))
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    let bytes: [u8; PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
        CryptoError::InvalidPublicKey(format!("expected 32 bytes, got {}", b.len()))
    })?;
    Ok(PublicKey::from(bytes))
}
