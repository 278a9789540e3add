//! Matching session
//!
//! Turns a batch of asset filenames into review-queue candidates. The catalog
//! slice of every artwork named in the batch is loaded from the store once,
//! then the whole batch goes through [`Matcher::match_files`].

use super::MatchReport;
use crate::ident::ArtworkCode;
use crate::matching::{FilenameExtractor, MatchError, Matcher};
use crate::review::ReviewQueue;
use crate::store::CatalogStore;
use artcat_common::config::CatalogSettings;
use artcat_common::events::{CatalogEvent, EventBus};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Proposes filename → variant matches for review
pub struct MatchingSession {
    store: Arc<dyn CatalogStore>,
    queue: Arc<ReviewQueue>,
    matcher: Matcher,
    events: Option<EventBus>,
}

impl MatchingSession {
    pub fn new(store: Arc<dyn CatalogStore>, queue: Arc<ReviewQueue>) -> Self {
        Self {
            store,
            queue,
            matcher: Matcher::default(),
            events: None,
        }
    }

    pub fn from_settings(
        store: Arc<dyn CatalogStore>,
        queue: Arc<ReviewQueue>,
        settings: &CatalogSettings,
    ) -> Self {
        Self {
            matcher: Matcher::new(FilenameExtractor::new(settings.filename_suffix_separator)),
            ..Self::new(store, queue)
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn queue(&self) -> &Arc<ReviewQueue> {
        &self.queue
    }

    /// Match filenames and enqueue every candidate
    ///
    /// Checks `cancel` between files. Candidates reach the queue only after
    /// the whole batch is matched; a cancelled session enqueues nothing.
    pub async fn propose<S: AsRef<str>>(
        &self,
        filenames: &[S],
        cancel: &CancellationToken,
    ) -> Result<MatchReport, MatchError> {
        let session_id = Uuid::new_v4();
        let filenames: Vec<&str> = filenames.iter().map(|filename| filename.as_ref()).collect();

        let artworks: BTreeSet<ArtworkCode> = filenames
            .iter()
            .filter_map(|filename| self.matcher.extractor().extract(filename))
            .map(|pattern| pattern.artwork().clone())
            .collect();

        let mut catalog = BTreeSet::new();
        for artwork in &artworks {
            if cancel.is_cancelled() {
                info!(%session_id, files_processed = 0, "Matching cancelled");
                return Err(MatchError::Cancelled { files_processed: 0 });
            }
            let skus = self.store.list_skus_for_artwork(artwork).await?;
            debug!(%artwork, skus = skus.len(), "Loaded catalog slice");
            catalog.extend(skus);
        }

        let batch = self
            .matcher
            .match_files(filenames.iter().copied(), &catalog, cancel)?;
        let report = MatchReport::from_batch(session_id, batch);

        let enqueued = self.queue.enqueue_all(report.candidates.iter().cloned()).await;

        info!(
            %session_id,
            files = filenames.len(),
            candidates = enqueued,
            unrecognized = report.unrecognized.len(),
            unmatched = report.unmatched.len(),
            "Matches proposed"
        );

        if let Some(events) = &self.events {
            events.emit_lossy(CatalogEvent::MatchesProposed {
                session_id,
                candidates: report.candidates.len(),
                unrecognized_files: report.unrecognized.len(),
                timestamp: Utc::now(),
            });
        }

        Ok(report)
    }
}
