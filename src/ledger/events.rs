//! Ledger event handling
//!
//! Two event streams matter to a session: "request added" (our request got
//! its id) and "order placed" (a worker was matched to some request). The
//! ledger may deliver them in either order. `EventRaceResolver` turns the
//! interleaving into a single "order matched" signal that fires at most once.

use super::{Ledger, LedgerEvent};
use alloy_primitives::Address;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::debug;

/// Order matched to the session's request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchedOrder {
    pub order_id: u64,
    pub request_id: u64,
}

/// Reconciles request/order events delivered in any order
#[derive(Debug)]
pub struct EventRaceResolver {
    requester: Address,
    request_id: Option<u64>,
    /// Orders placed before our request id was known, keyed by request id
    early_orders: HashMap<u64, u64>,
    fired: bool,
}

impl EventRaceResolver {
    pub fn new(requester: Address) -> Self {
        Self {
            requester,
            request_id: None,
            early_orders: HashMap::new(),
            fired: false,
        }
    }

    /// Request id learned so far
    pub fn request_id(&self) -> Option<u64> {
        self.request_id
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Feed any ledger event; unrelated kinds are ignored
    pub fn on_event(&mut self, event: &LedgerEvent) -> Option<MatchedOrder> {
        match *event {
            LedgerEvent::RequestAdded { from, request_id } => {
                self.on_request_accepted(from, request_id)
            }
            LedgerEvent::OrderPlaced {
                order_id,
                request_id,
            } => self.on_order_placed(order_id, request_id),
            _ => None,
        }
    }

    /// A request was accepted onto the ledger
    pub fn on_request_accepted(&mut self, from: Address, request_id: u64) -> Option<MatchedOrder> {
        if from != self.requester || self.request_id.is_some() {
            return None;
        }

        debug!("Request {} accepted for {}", request_id, from);
        self.request_id = Some(request_id);

        let order_id = self.early_orders.remove(&request_id)?;
        self.fire(order_id, request_id)
    }

    /// An order was placed for some request
    pub fn on_order_placed(&mut self, order_id: u64, request_id: u64) -> Option<MatchedOrder> {
        if self.fired {
            return None;
        }

        match self.request_id {
            Some(ours) if ours == request_id => self.fire(order_id, request_id),
            Some(_) => None,
            None => {
                self.early_orders.entry(request_id).or_insert(order_id);
                None
            }
        }
    }

    fn fire(&mut self, order_id: u64, request_id: u64) -> Option<MatchedOrder> {
        if self.fired {
            return None;
        }
        self.fired = true;
        self.early_orders.clear();
        Some(MatchedOrder {
            order_id,
            request_id,
        })
    }
}

/// Scoped subscription to ledger events, released on drop
pub struct LedgerSubscription {
    receiver: broadcast::Receiver<LedgerEvent>,
}

impl LedgerSubscription {
    pub fn new(ledger: &dyn Ledger) -> Self {
        Self {
            receiver: ledger.subscribe(),
        }
    }

    /// Next event in delivery order
    pub async fn recv(&mut self) -> Result<LedgerEvent, broadcast::error::RecvError> {
        self.receiver.recv().await
    }
}

impl Drop for LedgerSubscription {
    fn drop(&mut self) {
        debug!("Ledger event subscription released");
    }
}
