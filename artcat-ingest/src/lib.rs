//! artcat-ingest: artwork identifiers, catalog ingestion and asset matching
//!
//! - [`ident`]: sequence authority, artwork codes, composite SKUs
//! - [`ingest`]: delimited-text tokenizer and row aggregator
//! - [`matching`]: filename patterns and the hierarchical matcher
//! - [`review`]: approve/reject queue for match candidates
//! - [`store`]: persistence collaborator and its SQLite implementation
//! - [`workflow`]: ingestion and matching drivers
//!
//! [`Catalog`] bundles a store, review queue and event bus for callers that
//! want the whole stack.

pub mod error;
pub mod ident;
pub mod ingest;
pub mod matching;
pub mod review;
pub mod store;
pub mod workflow;

pub use crate::error::{CatalogError, CatalogResult};

use artcat_common::config::CatalogSettings;
use artcat_common::db::{init_database, init_memory_database};
use artcat_common::events::EventBus;
use ident::{ArtworkCode, CodeGenerator};
use review::ReviewQueue;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use store::{CatalogStore, SqliteCatalogStore};
use tracing::info;
use workflow::{IngestionPipeline, MatchingSession};

/// Database file inside the root folder
pub const DB_FILENAME: &str = "artcat.db";

/// Shared catalog state
#[derive(Clone)]
pub struct Catalog {
    pub store: Arc<SqliteCatalogStore>,
    pub queue: Arc<ReviewQueue>,
    pub events: EventBus,
    pub settings: CatalogSettings,
}

impl Catalog {
    /// Open (or create) the catalog database under `root_folder`
    pub async fn open(root_folder: &Path, settings: CatalogSettings) -> CatalogResult<Self> {
        settings.validate()?;
        let db_path = root_folder.join(DB_FILENAME);
        let pool = init_database(&db_path).await?;
        info!("Catalog opened at {}", db_path.display());
        Ok(Self::from_pool(pool, settings))
    }

    /// Private in-memory catalog
    pub async fn in_memory(settings: CatalogSettings) -> CatalogResult<Self> {
        settings.validate()?;
        let pool = init_memory_database().await?;
        Ok(Self::from_pool(pool, settings))
    }

    fn from_pool(pool: SqlitePool, settings: CatalogSettings) -> Self {
        let store = Arc::new(SqliteCatalogStore::with_sequence(
            pool,
            settings.sequence_name.clone(),
        ));
        let events = EventBus::new(settings.event_capacity);
        let queue = Arc::new(
            ReviewQueue::new()
                .with_store(store.clone())
                .with_events(events.clone()),
        );

        Self {
            store,
            queue,
            events,
            settings,
        }
    }

    fn dyn_store(&self) -> Arc<dyn CatalogStore> {
        self.store.clone()
    }

    pub fn code_generator(&self) -> CodeGenerator {
        CodeGenerator::from_settings(&self.settings)
    }

    /// Draw the next ordinal and turn it into an artwork code
    pub async fn mint_artwork_code(&self) -> CatalogResult<ArtworkCode> {
        Ok(self.code_generator().mint(self.store.as_ref()).await?)
    }

    pub fn ingestion(&self) -> IngestionPipeline {
        IngestionPipeline::new(self.dyn_store(), &self.settings).with_events(self.events.clone())
    }

    pub fn matching(&self) -> MatchingSession {
        MatchingSession::from_settings(self.dyn_store(), self.queue.clone(), &self.settings)
            .with_events(self.events.clone())
    }
}
