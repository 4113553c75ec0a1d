//! Ledger data types
//!
//! Typed views of the protocol contract's requests, orders, events and
//! receipts. Wire encoding is the ledger collaborator's business.

use alloy_primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle returned when a transaction is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle {
    pub hash: TxHash,
}

impl TxHandle {
    pub fn new(hash: TxHash) -> Self {
        Self { hash }
    }
}

// ============================================================================
// Requests and orders
// ============================================================================

/// Resources declared by a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub cpu: u64,
    pub memory: u64,
    pub storage: u64,
    pub bandwidth: u64,
    pub duration: u64,
    /// Number of instances (validators) wanted
    pub instances: u64,
    /// Upper price bound, in token units
    pub task_price: U256,
}

/// Everything the `add request` transaction carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSubmission {
    pub resources: ResourceRequest,
    pub image_metadata: String,
    pub code_metadata: String,
    pub input_metadata: String,
    /// Preferred worker; orders naming one are approved by convention
    pub preferred_worker: Option<Address>,
}

/// Status of an order on the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, waiting for requester approval
    Pending,
    /// Worker may execute
    Approved,
    /// Result available
    Closed,
    /// Abandoned or expired
    Invalidated,
}

impl OrderStatus {
    /// Map the contract's numeric status
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(OrderStatus::Pending),
            1 => Some(OrderStatus::Approved),
            2 => Some(OrderStatus::Closed),
            3 => Some(OrderStatus::Invalidated),
            _ => None,
        }
    }

    pub fn code(&self) -> u64 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Approved => 1,
            OrderStatus::Closed => 2,
            OrderStatus::Invalidated => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Closed | OrderStatus::Invalidated)
    }

    /// Orders only move forward: pending -> approved -> closed, or to invalidated
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Approved)
                | (OrderStatus::Approved, OrderStatus::Closed)
                | (OrderStatus::Pending, OrderStatus::Invalidated)
                | (OrderStatus::Approved, OrderStatus::Invalidated)
        )
    }

    /// Whether `next` can be observed after `self`, allowing skipped steps
    /// between two polls
    pub fn can_reach(&self, next: OrderStatus) -> bool {
        *self == next
            || self.can_transition_to(next)
            || (*self == OrderStatus::Pending && next == OrderStatus::Closed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Closed => "closed",
            OrderStatus::Invalidated => "invalidated",
        };
        f.write_str(s)
    }
}

/// Pairing of one requester request with one worker request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Ledger-assigned sequential index
    pub id: u64,
    pub requester: Address,
    pub worker: Address,
    pub requester_request: u64,
    pub worker_request: u64,
    pub status: OrderStatus,
}

/// Worker image published in the image registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDetails {
    pub image_hash: String,
    /// Encryption public key of the enclave
    pub public_key: String,
    pub compose_hash: String,
}

// ============================================================================
// Events and receipts
// ============================================================================

/// Event names the runner listens for or expects in receipts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RequestAdded,
    OrderPlaced,
    OrderApproved,
    OrderClosed,
    OrderInvalidated,
    SpendingApproved,
    FaucetFunded,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::RequestAdded => "_addDORequestEV",
            EventKind::OrderPlaced => "_orderPlacedEV",
            EventKind::OrderApproved => "_orderApprovedEV",
            EventKind::OrderClosed => "_orderClosedEV",
            EventKind::OrderInvalidated => "_orderInvalidatedEV",
            EventKind::SpendingApproved => "Approval",
            EventKind::FaucetFunded => "Transfer",
        };
        f.write_str(s)
    }
}

/// Decoded contract event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    RequestAdded { from: Address, request_id: u64 },
    OrderPlaced { order_id: u64, request_id: u64 },
    OrderApproved { order_id: u64 },
    OrderClosed { order_id: u64 },
    OrderInvalidated { order_id: u64 },
    SpendingApproved { owner: Address, amount: U256 },
    FaucetFunded { account: Address, amount: U256 },
}

impl LedgerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LedgerEvent::RequestAdded { .. } => EventKind::RequestAdded,
            LedgerEvent::OrderPlaced { .. } => EventKind::OrderPlaced,
            LedgerEvent::OrderApproved { .. } => EventKind::OrderApproved,
            LedgerEvent::OrderClosed { .. } => EventKind::OrderClosed,
            LedgerEvent::OrderInvalidated { .. } => EventKind::OrderInvalidated,
            LedgerEvent::SpendingApproved { .. } => EventKind::SpendingApproved,
            LedgerEvent::FaucetFunded { .. } => EventKind::FaucetFunded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Confirmed,
    Reverted,
}

/// Receipt of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub hash: TxHash,
    pub block_number: u64,
    pub status: ReceiptStatus,
    pub events: Vec<LedgerEvent>,
}

impl TransactionReceipt {
    /// First emitted event of the given kind
    pub fn find_event(&self, kind: EventKind) -> Option<&LedgerEvent> {
        self.events.iter().find(|event| event.kind() == kind)
    }
}

/// Sender and result argument of a raw result transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub from: Address,
    pub result: String,
}

/// A transaction sent to the protocol contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub hash: TxHash,
    pub block_number: u64,
    pub timestamp: u64,
}
