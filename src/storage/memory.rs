//! In-process content store

use super::{ContentStore, StorageError, StorageResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Content store keyed by the SHA-256 of each blob
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Content hash a blob would be stored under
    pub fn content_hash(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Store `data` without going through the async interface
    pub fn insert(&self, data: Vec<u8>) -> String {
        let hash = Self::content_hash(&data);
        self.blobs.write().insert(hash.clone(), data);
        hash
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, data: Vec<u8>) -> StorageResult<String> {
        Ok(self.insert(data))
    }

    async fn get(&self, hash: &str) -> StorageResult<Vec<u8>> {
        self.blobs
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(hash.to_string()))
    }
}
