//! Task Runner for decentralized confidential compute
//!
//! Submits encrypted tasks to an untrusted worker network through a
//! marketplace contract, follows the resulting order until a worker closes
//! it, and proves the returned result came from the enclave that accepted
//! the order before decrypting it.
//!
//! ## Module Structure
//!
//! - `coordinator`: the task lifecycle state machine
//! - `verifier`: result provenance and integrity checks
//! - `codec`: metadata descriptors and the challenge pair
//! - `ledger/`: contract interface, confirmation, order discovery, events
//! - `storage/`: content-addressed stores (IPFS, in-memory)
//! - `crypto/`: payload encryption
//! - `wallet`: requester account and signing
//! - `config`, `error`, `lifecycle`, `telemetry`: plumbing

// ============================================================================
// CORE
// ============================================================================

/// Task lifecycle coordinator
pub mod coordinator;

/// Result verification
pub mod verifier;

/// Metadata descriptors and challenge derivation
pub mod codec;

/// Session phases and progress notifications
pub mod lifecycle;

// ============================================================================
// COLLABORATORS
// ============================================================================

/// Ledger interface and protocol helpers
pub mod ledger;

/// Content-addressed storage
pub mod storage;

/// Payload encryption
pub mod crypto;

/// Requester wallet
pub mod wallet;

// ============================================================================
// PLUMBING
// ============================================================================

pub mod config;
pub mod error;
pub mod telemetry;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use codec::{ResultEnvelope, ResultPayload, TaskStatusCode};
pub use config::{
    ImageConfig, MatchStrategy, NetworkConfig, ResourceConfig, RunnerConfig, TimingConfig,
    WatchdogPolicy,
};
pub use coordinator::{Collaborators, LifecycleCoordinator, TaskRequest};
pub use crypto::{CryptoProvider, X25519Crypto};
pub use error::{RunnerError, RunnerResult};
pub use ledger::{ImageRegistry, Ledger, LedgerError, LedgerEvent, Order, OrderStatus};
pub use lifecycle::{Phase, ProgressEvent, ProgressStatus};
pub use storage::{ContentStore, IpfsClient, IpfsConfig, MemoryContentStore};
pub use verifier::{Proof, ResultVerifier, VerificationInput};
pub use wallet::{LocalWallet, WalletProvider};
