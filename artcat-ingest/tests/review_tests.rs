//! Integration tests for the review queue
//!
//! Exactly-once approval under concurrency, persistence of assignments and
//! behaviour when the store fails.

mod helpers;

use artcat_ingest::ident::{ArtworkCode, CompositeSku, Ordinal};
use artcat_ingest::ingest::AggregatedProduct;
use artcat_ingest::matching::{extract, match_pattern, MatchCandidate};
use artcat_ingest::review::{Assignment, ReviewError, ReviewQueue, ReviewState};
use artcat_ingest::store::{CatalogStore, ProductId, StoreError};
use async_trait::async_trait;
use helpers::{memory_catalog, TEE_EXPORT};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

async fn count_assignments(pool: &sqlx::SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM match_assignments")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_concurrent_approvals_create_one_assignment() {
    let catalog = memory_catalog().await.unwrap();
    catalog
        .ingestion()
        .run(TEE_EXPORT, &CancellationToken::new())
        .await
        .unwrap();
    let report = catalog
        .matching()
        .propose(&["10A001-UTS-00-02_front.jpg"], &CancellationToken::new())
        .await
        .unwrap();
    let candidate_id = report.candidates[0].id;

    let mut join_set = JoinSet::new();
    for _ in 0..16 {
        let queue = Arc::clone(&catalog.queue);
        join_set.spawn(async move { queue.approve(candidate_id).await.unwrap() });
    }

    let mut assignment_ids = BTreeSet::new();
    while let Some(result) = join_set.join_next().await {
        assignment_ids.insert(result.unwrap().id);
    }

    assert_eq!(assignment_ids.len(), 1, "every approval must see the same assignment");
    assert_eq!(count_assignments(catalog.store.pool()).await, 1);

    let stored = catalog
        .store
        .load_assignment(candidate_id)
        .await
        .unwrap()
        .unwrap();
    assert!(assignment_ids.contains(&stored.id));
    assert_eq!(stored.target.to_compact_string(), "10A001-UTS-00-02");
}

#[tokio::test]
async fn test_batch_approval_is_per_item() {
    let catalog = memory_catalog().await.unwrap();
    catalog
        .ingestion()
        .run(TEE_EXPORT, &CancellationToken::new())
        .await
        .unwrap();
    let report = catalog
        .matching()
        .propose(&["10A001-UTS_front.jpg"], &CancellationToken::new())
        .await
        .unwrap();
    let ids: Vec<Uuid> = report.candidates.iter().map(|c| c.id).collect();

    let rejected = catalog.queue.reject_many(&ids[..1]).await;
    assert!(rejected[0].1.is_ok());

    let results = catalog.queue.approve_many(&ids).await;
    assert!(results[0].1.is_err());
    assert!(results[1..].iter().all(|(_, r)| r.is_ok()));
    assert_eq!(count_assignments(catalog.store.pool()).await, 2);
}

// ============================================================================
// Store failure
// ============================================================================

struct OfflineStore;

#[async_trait]
impl CatalogStore for OfflineStore {
    async fn get_next_ordinal(&self) -> Result<Ordinal, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }

    async fn sku_exists(&self, _sku: &CompositeSku) -> Result<bool, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }

    async fn list_skus_for_artwork(
        &self,
        _artwork: &ArtworkCode,
    ) -> Result<BTreeSet<CompositeSku>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }

    async fn persist_product(&self, _product: &AggregatedProduct) -> Result<ProductId, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }

    async fn persist_assignment(&self, _assignment: &Assignment) -> Result<(), StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }
}

fn candidate() -> MatchCandidate {
    let catalog: BTreeSet<CompositeSku> = [CompositeSku::parse("10A001-UTS-00-01").unwrap()]
        .into_iter()
        .collect();
    let pattern = extract("10A001-UTS-00-01.jpg").unwrap();
    match_pattern("10A001-UTS-00-01.jpg", &pattern, &catalog)
        .pop()
        .unwrap()
}

#[tokio::test]
async fn test_failed_persist_leaves_candidate_proposed() {
    let queue = ReviewQueue::new().with_store(Arc::new(OfflineStore));
    let candidate = candidate();
    queue.enqueue(candidate.clone()).await;

    let err = queue.approve(candidate.id).await.unwrap_err();
    assert!(matches!(err, ReviewError::Store(_)));
    assert_eq!(queue.state(candidate.id).await, Some(ReviewState::Proposed));
    assert!(queue.assignment(candidate.id).await.is_none());

    // still decidable afterwards
    queue.reject(candidate.id).await.unwrap();
    assert_eq!(queue.state(candidate.id).await, Some(ReviewState::Rejected));
}

#[tokio::test]
async fn test_unreachable_store_fails_matching_session() {
    let queue = Arc::new(ReviewQueue::new());
    let session = artcat_ingest::workflow::MatchingSession::new(Arc::new(OfflineStore), queue);

    let err = session
        .propose(&["10A001-UTS_front.jpg"], &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, artcat_ingest::matching::MatchError::Store(_)));
}
