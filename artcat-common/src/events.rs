//! Catalog event types and EventBus
//!
//! Drivers in `artcat-ingest` report progress, leniencies and review
//! decisions here. Consumers (audit log, admin surfaces) subscribe without
//! the drivers knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Kind of permissively accepted input oddity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeniencyKind {
    /// Input ended inside a quoted field; the field was flushed as-is
    UnterminatedQuote,
    /// Row with an empty grouping key was skipped
    EmptyGroupKey,
    /// Variant with a malformed SKU was dropped under the skip policy
    SkippedMalformedSku,
    /// SKU repeated within one product; the first occurrence was kept
    DuplicateSku,
    /// SKU listed under a second grouping key was dropped under the skip policy
    CrossProductSku,
}

/// Catalog event types
///
/// Serialized with a `type` tag so they can be forwarded as JSON unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CatalogEvent {
    /// An ingestion pass started
    IngestStarted {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// An input oddity was accepted instead of failing the pass
    IngestLeniency {
        session_id: Uuid,
        kind: LeniencyKind,
        /// Row number (1-based, header is row 1) when known
        row: Option<usize>,
        /// Offending raw value, if any
        detail: String,
        timestamp: DateTime<Utc>,
    },

    /// An ingestion pass finished and all products were handed to the store
    IngestCompleted {
        session_id: Uuid,
        products_persisted: usize,
        variants_persisted: usize,
        timestamp: DateTime<Utc>,
    },

    /// An ingestion pass stopped on request; its output is not complete
    IngestCancelled {
        session_id: Uuid,
        products_persisted: usize,
        timestamp: DateTime<Utc>,
    },

    /// Filenames were matched and candidates queued for review
    MatchesProposed {
        session_id: Uuid,
        candidates: usize,
        unrecognized_files: usize,
        timestamp: DateTime<Utc>,
    },

    /// A candidate was approved and an assignment created
    CandidateApproved {
        candidate_id: Uuid,
        assignment_id: Uuid,
        sku: String,
        timestamp: DateTime<Utc>,
    },

    /// A candidate was rejected
    CandidateRejected {
        candidate_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

/// Central event distribution bus
///
/// Uses `tokio::broadcast` internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use artcat_common::events::{CatalogEvent, EventBus};
///
/// let event_bus = EventBus::new(100);
/// let _rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(CatalogEvent::CandidateRejected {
///     candidate_id: uuid::Uuid::new_v4(),
///     timestamp: chrono::Utc::now(),
/// });
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CatalogEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CatalogEvent,
    ) -> Result<usize, broadcast::error::SendError<CatalogEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CatalogEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let candidate_id = Uuid::new_v4();

        bus.emit(CatalogEvent::CandidateRejected {
            candidate_id,
            timestamp: Utc::now(),
        })
        .unwrap();

        match rx.recv().await.unwrap() {
            CatalogEvent::CandidateRejected { candidate_id: id, .. } => {
                assert_eq!(id, candidate_id)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus
            .emit(CatalogEvent::CandidateRejected {
                candidate_id: Uuid::new_v4(),
                timestamp: Utc::now(),
            })
            .is_err());
        // lossy variant must not panic
        bus.emit_lossy(CatalogEvent::CandidateRejected {
            candidate_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn test_leniency_event_serializes_with_type_tag() {
        let event = CatalogEvent::IngestLeniency {
            session_id: Uuid::nil(),
            kind: LeniencyKind::EmptyGroupKey,
            row: Some(4),
            detail: String::new(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "IngestLeniency");
        assert_eq!(json["kind"], "empty_group_key");
        assert_eq!(json["row"], 4);
    }
}
