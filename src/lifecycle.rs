//! Session lifecycle
//!
//! Phases of one task session, in order:
//! Idle -> BalanceChecked -> NodeVerified -> RegistryResolved -> Connected
//! -> AllowanceChecked -> Submitted -> Matched -> Approved -> Processing
//! -> ResultFetched -> Succeeded
//!
//! Any non-terminal phase may move to Failed. Terminal phases only go back
//! to Idle through a reset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a task session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No session in progress
    #[default]
    Idle,
    /// Requester can pay for the task
    BalanceChecked,
    /// Preferred worker (if any) is a registered node operator
    NodeVerified,
    /// Trusted worker image resolved from the registry
    RegistryResolved,
    /// Wallet session established
    Connected,
    /// Contract may spend the task price
    AllowanceChecked,
    /// Request confirmed on the ledger
    Submitted,
    /// A worker order was matched to the request
    Matched,
    /// Order approved, worker may execute
    Approved,
    /// Waiting for the order to close
    Processing,
    /// Order closed, result available
    ResultFetched,
    /// Result verified and decrypted
    Succeeded,
    /// Session ended with an error
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }

    /// Check if a phase transition is valid
    pub fn is_valid_transition(from: Phase, to: Phase) -> bool {
        match (from, to) {
            // Happy path
            (Phase::Idle, Phase::BalanceChecked) => true,
            (Phase::BalanceChecked, Phase::NodeVerified) => true,
            (Phase::NodeVerified, Phase::RegistryResolved) => true,
            (Phase::RegistryResolved, Phase::Connected) => true,
            (Phase::Connected, Phase::AllowanceChecked) => true,
            (Phase::AllowanceChecked, Phase::Submitted) => true,
            (Phase::Submitted, Phase::Matched) => true,
            (Phase::Matched, Phase::Approved) => true,
            (Phase::Approved, Phase::Processing) => true,
            (Phase::Processing, Phase::ResultFetched) => true,
            (Phase::ResultFetched, Phase::Succeeded) => true,

            // Reset
            (Phase::Succeeded, Phase::Idle) => true,
            (Phase::Failed, Phase::Idle) => true,

            // Any live phase can fail
            (from, Phase::Failed) => !from.is_terminal(),

            _ => false,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::BalanceChecked => "balance_checked",
            Phase::NodeVerified => "node_verified",
            Phase::RegistryResolved => "registry_resolved",
            Phase::Connected => "connected",
            Phase::AllowanceChecked => "allowance_checked",
            Phase::Submitted => "submitted",
            Phase::Matched => "matched",
            Phase::Approved => "approved",
            Phase::Processing => "processing",
            Phase::ResultFetched => "result_fetched",
            Phase::Succeeded => "succeeded",
            Phase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Status attached to a progress notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Running,
    Success,
    Error,
}

/// Notification emitted on the progress channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub message: String,
    pub status: ProgressStatus,
    pub at: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(phase: Phase, message: impl Into<String>, status: ProgressStatus) -> Self {
        Self {
            phase,
            message: message.into(),
            status,
            at: Utc::now(),
        }
    }
}
