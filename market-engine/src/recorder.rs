//! Best-effort history recording.
//!
//! History is an audit trail, not part of the business transaction: a
//! failed append never rolls back the operation that produced it. The
//! recorder retries a few times and then drops the event with a warning.

use market_domain::{HistoryEvent, ListingId};
use market_store::{Store, StoreError};
use std::sync::Arc;
use std::time::Duration;

const APPEND_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Appends history events with bounded retry.
pub struct HistoryRecorder {
    store: Arc<dyn Store>,
}

impl HistoryRecorder {
    /// Create a recorder over the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record an event, best effort.
    ///
    /// Retries transient failures; on final failure logs the full event
    /// at `warn` and returns. Callers never see an error.
    pub async fn record(&self, event: HistoryEvent) {
        let mut last_err: Option<StoreError> = None;
        for attempt in 1..=APPEND_ATTEMPTS {
            match self.store.history().append(&event).await {
                Ok(seq) => {
                    tracing::debug!(
                        listing_id = %event.listing_id,
                        action = %event.action,
                        seq,
                        "Recorded history event"
                    );
                    return;
                },
                Err(err) => {
                    last_err = Some(err);
                    if attempt < APPEND_ATTEMPTS {
                        tokio::time::sleep(RETRY_BACKOFF).await;
                    }
                },
            }
        }
        tracing::warn!(
            listing_id = %event.listing_id,
            action = %event.action,
            error = %last_err.map(|e| e.to_string()).unwrap_or_default(),
            "Dropping history event after retries"
        );
    }

    /// Full history for a listing, in append order.
    pub async fn history(&self, listing_id: ListingId) -> Result<Vec<HistoryEvent>, StoreError> {
        self.store.history().find_by_listing(listing_id).await
    }
}

// =============================================================================
// Tests
// =============================================================================
