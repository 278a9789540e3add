//! Persistence collaborator
//!
//! The core never talks to a database directly; drivers and the review queue
//! go through [`CatalogStore`]. [`sqlite::SqliteCatalogStore`] is the bundled
//! implementation.

pub mod sqlite;

pub use sqlite::SqliteCatalogStore;

use crate::ident::{ArtworkCode, CompositeSku, Ordinal};
use crate::ingest::AggregatedProduct;
use crate::review::Assignment;
use async_trait::async_trait;
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

/// Persisted product identifier
pub type ProductId = Uuid;

/// Persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A value handed to or read from the store is not a valid identifier
    #[error("Invalid SKU '{sku}': {reason}")]
    InvalidSku { sku: String, reason: String },

    /// Stored counter is outside the ordinal range
    #[error("Sequence '{name}' holds invalid value {value}")]
    CorruptSequence { name: String, value: i64 },
}

/// Storage operations the catalog core depends on
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Atomically increment and return the artwork sequence
    async fn get_next_ordinal(&self) -> Result<Ordinal, StoreError>;

    async fn sku_exists(&self, sku: &CompositeSku) -> Result<bool, StoreError>;

    /// Every variant SKU recorded under one artwork
    async fn list_skus_for_artwork(
        &self,
        artwork: &ArtworkCode,
    ) -> Result<BTreeSet<CompositeSku>, StoreError>;

    /// Insert or update a product with its variants and media
    ///
    /// Products are keyed by grouping key; re-ingesting the same key returns
    /// the same id.
    async fn persist_product(&self, product: &AggregatedProduct) -> Result<ProductId, StoreError>;

    /// Record an approved assignment; repeating it for one candidate is a no-op
    async fn persist_assignment(&self, assignment: &Assignment) -> Result<(), StoreError>;
}
