//! Order discovery
//!
//! The order index is assigned by the ledger when a worker is matched, and
//! is not returned to the requester. The tracker finds it by scanning the
//! order list newest-first for an order whose requester request is ours.
//!
//! Each round re-reads the order count, so orders appended while a scan is
//! running are picked up by the next round. Indices that were read
//! successfully are never scanned twice; indices whose read failed are.

use super::{Ledger, Order};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Finds the order created for a request
pub struct OrderTracker {
    ledger: Arc<dyn Ledger>,
    poll_interval: Duration,
}

impl OrderTracker {
    pub fn new(ledger: Arc<dyn Ledger>, poll_interval: Duration) -> Self {
        Self {
            ledger,
            poll_interval,
        }
    }

    /// Wait for the order pairing `request_id`, scanning indices `>= since`.
    ///
    /// Has no timeout of its own; wrap in `tokio::time::timeout` for a bounded wait.
    pub async fn find_order_for_request(&self, request_id: u64, since: u64) -> Order {
        let mut low = since;
        let mut round = 0u32;

        loop {
            round += 1;

            match self.ledger.order_count().await {
                Ok(count) => {
                    let (found, clean) = self.scan(request_id, low, count).await;
                    if let Some(order) = found {
                        info!(
                            "Found order {} for request {} (round {})",
                            order.id, request_id, round
                        );
                        return order;
                    }
                    if clean && count > low {
                        low = count;
                    }
                    debug!(
                        "No order for request {} yet (count={}, round {})",
                        request_id, count, round
                    );
                }
                Err(e) => {
                    warn!("Failed to read order count: {} (round {})", e, round);
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Scan `[low, count)` from the top. Returns the match and whether every read succeeded.
    async fn scan(&self, request_id: u64, low: u64, count: u64) -> (Option<Order>, bool) {
        let mut clean = true;

        for index in (low..count).rev() {
            match self.ledger.order(index).await {
                Ok(order) if order.requester_request == request_id => {
                    return (Some(order), clean);
                }
                Ok(_) => {}
                Err(e) => {
                    clean = false;
                    warn!("Failed to read order {}: {}", index, e);
                }
            }
        }

        (None, clean)
    }
}
