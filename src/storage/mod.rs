//! Content-addressed storage
//!
//! Encrypted code, challenges and results travel out-of-band from the
//! ledger through a content-addressed store. Both operations may fail
//! transiently; callers own the retry policy.

pub mod ipfs;
pub mod memory;

pub use ipfs::{IpfsClient, IpfsConfig};
pub use memory::MemoryContentStore;

use async_trait::async_trait;
use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("content not found: {0}")]
    NotFound(String),
    #[error("storage request failed: {0}")]
    Request(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Put/get blobs by content hash
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `data`, returning its content hash
    async fn put(&self, data: Vec<u8>) -> StorageResult<String>;

    /// Fetch the blob stored under `hash`
    async fn get(&self, hash: &str) -> StorageResult<Vec<u8>>;
}
