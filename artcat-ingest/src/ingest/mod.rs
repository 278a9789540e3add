//! Bulk catalog ingestion
//!
//! raw text → [`tokenizer`] rows → [`aggregator`] products. Both stages are
//! pure over their inputs and safe to run in parallel across batches.

pub mod aggregator;
pub mod tokenizer;

pub use aggregator::{
    aggregate, AggregatedProduct, AggregatedVariant, Aggregation, Aggregator, ColumnMapping,
    SkuConflict,
};
pub use tokenizer::{tokenize, Row, Tokenizer, DEFAULT_DELIMITER};

use crate::ident::SkuError;
use crate::store::StoreError;
use thiserror::Error;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestError {
    /// Configured grouping column is not in the header
    #[error("Missing required column '{column}' in header {header:?}")]
    MissingRequiredColumn { column: String, header: Vec<String> },

    /// Variant SKU failed to parse (abort policy)
    #[error("Row {row}: {source}")]
    MalformedSku {
        row: usize,
        #[source]
        source: SkuError,
    },

    /// Same SKU listed under two grouping keys (abort policy)
    #[error("Row {row}: SKU '{sku}' under '{group_key}' is already listed under '{owner}'")]
    ConflictingSku {
        row: usize,
        sku: String,
        owner: String,
        group_key: String,
    },

    /// Pass stopped on request; nothing it produced should be treated as complete
    #[error("Ingestion cancelled after {rows_processed} rows ({products_persisted} products persisted)")]
    Cancelled {
        rows_processed: usize,
        products_persisted: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
