//! Catalog workflows
//!
//! Drivers that wire the pure components to a [`CatalogStore`](crate::store::CatalogStore):
//! - [`IngestionPipeline`]: delimited export → persisted products
//! - [`MatchingSession`]: asset filenames → review-queue candidates

pub mod ingestion;
pub mod session;

pub use ingestion::IngestionPipeline;
pub use session::MatchingSession;

use crate::ingest::SkuConflict;
use crate::matching::{BatchMatch, MatchCandidate};
use crate::store::ProductId;
use artcat_common::events::LeniencyKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Accepted oddity in the input, reported next to the result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leniency {
    pub kind: LeniencyKind,
    /// Source row (header is row 1), when the oddity belongs to one row
    pub row: Option<usize>,
    pub detail: String,
}

/// Outcome of a completed ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub session_id: Uuid,
    /// Data rows read (header excluded)
    pub rows_read: usize,
    pub products_persisted: usize,
    /// Variant rows written; repeats of an already kept SKU are not counted
    pub variants_persisted: usize,
    /// Persisted product ids, input order
    pub product_ids: Vec<ProductId>,
    pub leniencies: Vec<Leniency>,
    /// `(row, raw SKU)` dropped under the skip-and-report policy
    pub skipped_skus: Vec<(usize, String)>,
    /// `(row, raw SKU)` repeated within one product
    pub duplicate_skus: Vec<(usize, String)>,
    /// SKUs dropped because an earlier product of the run listed them
    pub conflicting_skus: Vec<SkuConflict>,
}

impl IngestReport {
    fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            rows_read: 0,
            products_persisted: 0,
            variants_persisted: 0,
            product_ids: Vec::new(),
            leniencies: Vec::new(),
            skipped_skus: Vec::new(),
            duplicate_skus: Vec::new(),
            conflicting_skus: Vec::new(),
        }
    }

    /// Leniencies of one kind
    pub fn leniencies_of(&self, kind: LeniencyKind) -> impl Iterator<Item = &Leniency> {
        self.leniencies.iter().filter(move |l| l.kind == kind)
    }
}

/// Outcome of a matching session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub session_id: Uuid,
    /// Candidates handed to the review queue
    pub candidates: Vec<MatchCandidate>,
    /// Filenames without an identifier prefix
    pub unrecognized: Vec<String>,
    /// Filenames whose pattern matched nothing in the catalog
    pub unmatched: Vec<String>,
}

impl MatchReport {
    fn from_batch(session_id: Uuid, batch: BatchMatch) -> Self {
        Self {
            session_id,
            candidates: batch.candidates,
            unrecognized: batch.unrecognized,
            unmatched: batch.unmatched,
        }
    }
}
