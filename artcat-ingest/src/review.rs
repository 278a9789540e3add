//! Review queue
//!
//! Holds match candidates between automatic matching and a human decision.
//!
//! ```text
//! Proposed ──approve──► Approved   (terminal, yields one Assignment)
//!    │
//!    └─────reject─────► Rejected   (terminal)
//! ```
//!
//! Decisions are serialized by a single writer lock. Approving a candidate
//! twice returns the same [`Assignment`]; when a store is attached the
//! assignment is persisted before the state changes, so a persistence failure
//! leaves the candidate `Proposed`.

use crate::ident::CompositeSku;
use crate::matching::{MatchCandidate, MatchTier};
use crate::store::{CatalogStore, StoreError};
use artcat_common::events::{CatalogEvent, EventBus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Review errors
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Unknown candidate: {0}")]
    UnknownCandidate(Uuid),

    /// Candidate already reached the opposite terminal state
    #[error("Candidate {candidate_id} is already {state}")]
    AlreadyDecided {
        candidate_id: Uuid,
        state: ReviewState,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Candidate lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Proposed,
    Approved,
    Rejected,
}

impl ReviewState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewState::Proposed => "proposed",
            ReviewState::Approved => "approved",
            ReviewState::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ReviewState::Proposed)
    }
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confirmed file → variant assignment
///
/// Created on approval; the originating candidate is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub source_filename: String,
    pub target: CompositeSku,
    pub tier: MatchTier,
    pub confidence: u8,
    pub approved_at: DateTime<Utc>,
}

impl Assignment {
    fn from_candidate(candidate: &MatchCandidate) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id: candidate.id,
            source_filename: candidate.source_filename.clone(),
            target: candidate.target.clone(),
            tier: candidate.tier,
            confidence: candidate.confidence,
            approved_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
enum Decision {
    Proposed,
    Approved(Assignment),
    Rejected,
}

impl Decision {
    fn state(&self) -> ReviewState {
        match self {
            Decision::Proposed => ReviewState::Proposed,
            Decision::Approved(_) => ReviewState::Approved,
            Decision::Rejected => ReviewState::Rejected,
        }
    }
}

#[derive(Debug)]
struct Entry {
    candidate: MatchCandidate,
    decision: Decision,
}

#[derive(Debug, Default)]
struct QueueState {
    entries: HashMap<Uuid, Entry>,
    /// Candidate ids in enqueue order
    order: Vec<Uuid>,
}

/// Pending-decision holding area
pub struct ReviewQueue {
    state: Mutex<QueueState>,
    store: Option<Arc<dyn CatalogStore>>,
    events: Option<EventBus>,
}

impl Default for ReviewQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewQueue {
    /// In-memory queue; approvals are not persisted
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            store: None,
            events: None,
        }
    }

    /// Persist every approval through `store`
    pub fn with_store(mut self, store: Arc<dyn CatalogStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Broadcast decisions on `events`
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Add a candidate in `Proposed` state
    ///
    /// Returns false if the id is already known; a decided candidate never
    /// returns to `Proposed`.
    pub async fn enqueue(&self, candidate: MatchCandidate) -> bool {
        let mut state = self.state.lock().await;
        if state.entries.contains_key(&candidate.id) {
            debug!(candidate_id = %candidate.id, "Candidate already queued");
            return false;
        }

        let id = candidate.id;
        state.entries.insert(
            id,
            Entry {
                candidate,
                decision: Decision::Proposed,
            },
        );
        state.order.push(id);
        true
    }

    /// Enqueue many; returns how many were new
    pub async fn enqueue_all<I>(&self, candidates: I) -> usize
    where
        I: IntoIterator<Item = MatchCandidate>,
    {
        let mut added = 0;
        for candidate in candidates {
            if self.enqueue(candidate).await {
                added += 1;
            }
        }
        added
    }

    /// Approve a candidate, producing its assignment
    ///
    /// Idempotent: a second approval returns the first assignment unchanged.
    pub async fn approve(&self, candidate_id: Uuid) -> Result<Assignment, ReviewError> {
        let mut state = self.state.lock().await;
        let entry = state
            .entries
            .get_mut(&candidate_id)
            .ok_or(ReviewError::UnknownCandidate(candidate_id))?;

        match &entry.decision {
            Decision::Approved(assignment) => return Ok(assignment.clone()),
            Decision::Rejected => {
                return Err(ReviewError::AlreadyDecided {
                    candidate_id,
                    state: ReviewState::Rejected,
                })
            }
            Decision::Proposed => {}
        }

        let assignment = Assignment::from_candidate(&entry.candidate);

        // lock still held: no second writer can race this persist
        if let Some(store) = &self.store {
            if let Err(e) = store.persist_assignment(&assignment).await {
                warn!(%candidate_id, error = %e, "Failed to persist assignment; candidate stays proposed");
                return Err(e.into());
            }
        }

        entry.decision = Decision::Approved(assignment.clone());

        info!(
            %candidate_id,
            assignment_id = %assignment.id,
            sku = %assignment.target,
            file = %assignment.source_filename,
            "Candidate approved"
        );

        if let Some(events) = &self.events {
            events.emit_lossy(CatalogEvent::CandidateApproved {
                candidate_id,
                assignment_id: assignment.id,
                sku: assignment.target.to_string(),
                timestamp: assignment.approved_at,
            });
        }

        Ok(assignment)
    }

    /// Reject a candidate (idempotent)
    pub async fn reject(&self, candidate_id: Uuid) -> Result<(), ReviewError> {
        let mut state = self.state.lock().await;
        let entry = state
            .entries
            .get_mut(&candidate_id)
            .ok_or(ReviewError::UnknownCandidate(candidate_id))?;

        match entry.decision {
            Decision::Rejected => return Ok(()),
            Decision::Approved(_) => {
                return Err(ReviewError::AlreadyDecided {
                    candidate_id,
                    state: ReviewState::Approved,
                })
            }
            Decision::Proposed => {}
        }
        entry.decision = Decision::Rejected;

        info!(%candidate_id, file = %entry.candidate.source_filename, "Candidate rejected");

        if let Some(events) = &self.events {
            events.emit_lossy(CatalogEvent::CandidateRejected {
                candidate_id,
                timestamp: Utc::now(),
            });
        }

        Ok(())
    }

    /// Approve each id independently; one failure does not undo the others
    pub async fn approve_many(
        &self,
        candidate_ids: &[Uuid],
    ) -> Vec<(Uuid, Result<Assignment, ReviewError>)> {
        let mut results = Vec::with_capacity(candidate_ids.len());
        for &id in candidate_ids {
            results.push((id, self.approve(id).await));
        }
        results
    }

    /// Reject each id independently
    pub async fn reject_many(&self, candidate_ids: &[Uuid]) -> Vec<(Uuid, Result<(), ReviewError>)> {
        let mut results = Vec::with_capacity(candidate_ids.len());
        for &id in candidate_ids {
            results.push((id, self.reject(id).await));
        }
        results
    }

    pub async fn state(&self, candidate_id: Uuid) -> Option<ReviewState> {
        let state = self.state.lock().await;
        state
            .entries
            .get(&candidate_id)
            .map(|entry| entry.decision.state())
    }

    pub async fn candidate(&self, candidate_id: Uuid) -> Option<MatchCandidate> {
        let state = self.state.lock().await;
        state
            .entries
            .get(&candidate_id)
            .map(|entry| entry.candidate.clone())
    }

    /// Assignment of an approved candidate
    pub async fn assignment(&self, candidate_id: Uuid) -> Option<Assignment> {
        let state = self.state.lock().await;
        match &state.entries.get(&candidate_id)?.decision {
            Decision::Approved(assignment) => Some(assignment.clone()),
            _ => None,
        }
    }

    /// Undecided candidates in enqueue order
    pub async fn pending(&self) -> Vec<MatchCandidate> {
        let state = self.state.lock().await;
        state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id))
            .filter(|entry| matches!(entry.decision, Decision::Proposed))
            .map(|entry| entry.candidate.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
