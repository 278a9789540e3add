//! Sequence authority
//!
//! Issues strictly increasing ordinals for artwork code generation. The
//! counter lives in whatever store can increment it atomically; this module
//! only defines the contract plus a single-process implementation.
//!
//! Callers must never substitute a guessed ordinal when the authority is
//! unavailable. No retry happens here; retry with backoff is up to the
//! caller.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Ordinal issued by a sequence authority
pub type Ordinal = u64;

/// Sequence authority errors
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// Underlying counter store could not be reached or refused the increment
    #[error("Sequence authority unavailable: {0}")]
    Unavailable(String),
}

/// Source of unique, strictly increasing ordinals
#[async_trait]
pub trait SequenceAuthority: Send + Sync {
    /// Next ordinal; no two calls ever observe the same value
    async fn next(&self) -> Result<Ordinal, AuthorityError>;
}

/// In-process authority backed by an atomic counter
///
/// Only valid when a single process owns the sequence. Multi-process
/// deployments use a store-backed authority such as
/// [`crate::store::SqliteCatalogStore`].
#[derive(Debug, Default)]
pub struct AtomicSequenceAuthority {
    last: AtomicU64,
}

impl AtomicSequenceAuthority {
    /// First call to `next()` returns 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume after an already issued ordinal
    pub fn starting_after(last: Ordinal) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }
}

#[async_trait]
impl SequenceAuthority for AtomicSequenceAuthority {
    async fn next(&self) -> Result<Ordinal, AuthorityError> {
        self.last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_add(1))
            .map(|previous| previous + 1)
            .map_err(|_| AuthorityError::Unavailable("ordinal space exhausted".to_string()))
    }
}
