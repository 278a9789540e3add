//! Crate-level error
//!
//! Component operations return their own error enums; [`CatalogError`] wraps
//! them for callers driving whole workflows through [`Catalog`](crate::Catalog).

use crate::ident::{AuthorityError, CodeError, SkuError};
use crate::ingest::IngestError;
use crate::matching::MatchError;
use crate::review::ReviewError;
use crate::store::StoreError;
use thiserror::Error;

/// Any catalog failure
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error(transparent)]
    Code(#[from] CodeError),

    #[error(transparent)]
    Sku(#[from] SkuError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration or database setup
    #[error("Common error: {0}")]
    Common(#[from] artcat_common::Error),
}

impl CatalogError {
    /// True for input the operator has to correct
    pub fn is_input_malformed(&self) -> bool {
        matches!(
            self,
            CatalogError::Sku(_)
                | CatalogError::Ingest(IngestError::MalformedSku { .. })
                | CatalogError::Ingest(IngestError::MissingRequiredColumn { .. })
                | CatalogError::Ingest(IngestError::ConflictingSku { .. })
                | CatalogError::Common(artcat_common::Error::InvalidSetting { .. })
        )
    }

    /// True when retrying later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::Authority(AuthorityError::Unavailable(_))
                | CatalogError::Code(CodeError::Authority(AuthorityError::Unavailable(_)))
                | CatalogError::Store(StoreError::Database(_))
                | CatalogError::Ingest(IngestError::Store(StoreError::Database(_)))
                | CatalogError::Review(ReviewError::Store(StoreError::Database(_)))
        )
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
