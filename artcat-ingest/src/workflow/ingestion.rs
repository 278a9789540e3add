//! Ingestion pipeline
//!
//! raw text → rows → products → SKU validation → store.
//!
//! All SKUs are validated before the first product is written, so the abort
//! policy never leaves a half-ingested batch behind. Cancellation is checked
//! per row during aggregation and per product while persisting.
//!
//! Within one run a SKU belongs to the first product that lists it, compared
//! in normalized form (`10A001-DIG` and `10A001-DIG-99-99-99` are one SKU).
//! Repeats never reach the store, so every persisted variant is one row.

use super::{IngestReport, Leniency};
use crate::ident::CompositeSku;
use crate::ingest::{
    AggregatedProduct, Aggregator, ColumnMapping, IngestError, SkuConflict, Tokenizer,
    DEFAULT_DELIMITER,
};
use crate::store::CatalogStore;
use artcat_common::config::{CatalogSettings, MalformedSkuPolicy};
use artcat_common::events::{CatalogEvent, EventBus, LeniencyKind};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Bulk product import driver
pub struct IngestionPipeline {
    store: Arc<dyn CatalogStore>,
    aggregator: Aggregator,
    policy: MalformedSkuPolicy,
    delimiter: char,
    events: Option<EventBus>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn CatalogStore>, settings: &CatalogSettings) -> Self {
        Self {
            store,
            aggregator: Aggregator::new(ColumnMapping::from_settings(settings)),
            policy: settings.malformed_sku_policy,
            delimiter: DEFAULT_DELIMITER,
            events: None,
        }
    }

    /// Broadcast progress on `events`
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Use a field delimiter other than `,`
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn emit(&self, event: CatalogEvent) {
        if let Some(events) = &self.events {
            events.emit_lossy(event);
        }
    }

    fn record(&self, report: &mut IngestReport, leniency: Leniency) {
        self.emit(CatalogEvent::IngestLeniency {
            session_id: report.session_id,
            kind: leniency.kind,
            row: leniency.row,
            detail: leniency.detail.clone(),
            timestamp: Utc::now(),
        });
        report.leniencies.push(leniency);
    }

    fn cancelled(
        &self,
        session_id: Uuid,
        rows_processed: usize,
        products_persisted: usize,
    ) -> IngestError {
        info!(%session_id, rows_processed, products_persisted, "Ingestion cancelled");
        self.emit(CatalogEvent::IngestCancelled {
            session_id,
            products_persisted,
            timestamp: Utc::now(),
        });
        IngestError::Cancelled {
            rows_processed,
            products_persisted,
        }
    }

    /// Ingest one delimited-text export
    ///
    /// A cancelled run returns [`IngestError::Cancelled`]; products already
    /// written stay in the store but no completion is reported.
    pub async fn run(
        &self,
        raw_text: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, IngestError> {
        let session_id = Uuid::new_v4();
        info!(%session_id, bytes = raw_text.len(), "Ingestion started");
        self.emit(CatalogEvent::IngestStarted {
            session_id,
            timestamp: Utc::now(),
        });

        let mut tokenizer = Tokenizer::with_delimiter(raw_text, self.delimiter);
        let aggregation = match self.aggregator.aggregate_with_header(tokenizer.by_ref(), cancel) {
            Ok(aggregation) => aggregation,
            Err(IngestError::Cancelled { rows_processed, .. }) => {
                return Err(self.cancelled(session_id, rows_processed, 0))
            }
            Err(e) => return Err(e),
        };

        let mut report = IngestReport::new(session_id);
        report.rows_read = aggregation.rows_read;

        if tokenizer.ended_in_open_quote() {
            let row = tokenizer.rows_emitted();
            self.record(
                &mut report,
                Leniency {
                    kind: LeniencyKind::UnterminatedQuote,
                    row: Some(row),
                    detail: "Input ended inside a quoted field; last field kept as-is".to_string(),
                },
            );
        }

        for row in aggregation.skipped_rows {
            self.record(
                &mut report,
                Leniency {
                    kind: LeniencyKind::EmptyGroupKey,
                    row: Some(row),
                    detail: "Row has an empty grouping key".to_string(),
                },
            );
        }

        for (row, sku) in aggregation.duplicate_skus {
            self.duplicate(&mut report, row, sku);
        }
        for conflict in aggregation.conflicting_skus {
            self.conflict(&mut report, conflict)?;
        }

        let mut owners = HashMap::new();
        let mut products = Vec::with_capacity(aggregation.products.len());
        for product in aggregation.products {
            products.push(self.validate(product, &mut owners, &mut report)?);
        }

        for product in &products {
            if cancel.is_cancelled() {
                return Err(self.cancelled(
                    session_id,
                    report.rows_read,
                    report.products_persisted,
                ));
            }

            let product_id = self.store.persist_product(product).await?;
            report.product_ids.push(product_id);
            report.products_persisted += 1;
            report.variants_persisted += product.variants.len();
        }

        info!(
            %session_id,
            rows = report.rows_read,
            products = report.products_persisted,
            variants = report.variants_persisted,
            leniencies = report.leniencies.len(),
            skipped_skus = report.skipped_skus.len(),
            conflicting_skus = report.conflicting_skus.len(),
            "Ingestion completed"
        );
        self.emit(CatalogEvent::IngestCompleted {
            session_id,
            products_persisted: report.products_persisted,
            variants_persisted: report.variants_persisted,
            timestamp: Utc::now(),
        });

        Ok(report)
    }

    fn duplicate(&self, report: &mut IngestReport, row: usize, sku: String) {
        self.record(
            report,
            Leniency {
                kind: LeniencyKind::DuplicateSku,
                row: Some(row),
                detail: sku.clone(),
            },
        );
        report.duplicate_skus.push((row, sku));
    }

    /// Apply the malformed-SKU policy to a SKU claimed by two products
    fn conflict(&self, report: &mut IngestReport, conflict: SkuConflict) -> Result<(), IngestError> {
        match self.policy {
            MalformedSkuPolicy::Abort => {
                warn!(
                    row = conflict.row,
                    sku = %conflict.sku,
                    owner = %conflict.owner,
                    group_key = %conflict.group_key,
                    "SKU listed under two grouping keys; aborting batch"
                );
                Err(IngestError::ConflictingSku {
                    row: conflict.row,
                    sku: conflict.sku,
                    owner: conflict.owner,
                    group_key: conflict.group_key,
                })
            }
            MalformedSkuPolicy::SkipAndReport => {
                self.record(
                    report,
                    Leniency {
                        kind: LeniencyKind::CrossProductSku,
                        row: Some(conflict.row),
                        detail: format!(
                            "{} under '{}' already listed under '{}'",
                            conflict.sku, conflict.group_key, conflict.owner
                        ),
                    },
                );
                report.conflicting_skus.push(conflict);
                Ok(())
            }
        }
    }

    /// Drop or reject variants whose SKU does not parse or is already owned
    ///
    /// `owners` maps normalized SKUs to the grouping key that kept them.
    fn validate(
        &self,
        mut product: AggregatedProduct,
        owners: &mut HashMap<CompositeSku, String>,
        report: &mut IngestReport,
    ) -> Result<AggregatedProduct, IngestError> {
        let mut kept = Vec::with_capacity(product.variants.len());

        for variant in product.variants {
            let parsed = match CompositeSku::parse(&variant.sku) {
                Ok(parsed) => parsed,
                Err(source) => match self.policy {
                    MalformedSkuPolicy::Abort => {
                        warn!(row = variant.row, sku = %variant.sku, "Malformed SKU; aborting batch");
                        return Err(IngestError::MalformedSku {
                            row: variant.row,
                            source,
                        });
                    }
                    MalformedSkuPolicy::SkipAndReport => {
                        warn!(
                            leniency = "skipped_malformed_sku",
                            row = variant.row,
                            sku = %variant.sku,
                            "Skipping malformed SKU"
                        );
                        self.record(
                            report,
                            Leniency {
                                kind: LeniencyKind::SkippedMalformedSku,
                                row: Some(variant.row),
                                detail: source.to_string(),
                            },
                        );
                        report.skipped_skus.push((variant.row, variant.sku));
                        continue;
                    }
                },
            };

            match owners.get(&parsed) {
                None => {
                    owners.insert(parsed, product.group_key.clone());
                    kept.push(variant);
                }
                Some(owner) if *owner == product.group_key => {
                    warn!(
                        leniency = "duplicate_sku",
                        row = variant.row,
                        sku = %variant.sku,
                        normalized = %parsed,
                        "Equivalent SKU repeated within product; keeping first occurrence"
                    );
                    self.duplicate(report, variant.row, variant.sku);
                }
                Some(owner) => {
                    warn!(
                        leniency = "cross_product_sku",
                        row = variant.row,
                        sku = %variant.sku,
                        normalized = %parsed,
                        owner = %owner,
                        "Equivalent SKU already listed under another grouping key"
                    );
                    let conflict = SkuConflict {
                        row: variant.row,
                        sku: variant.sku,
                        owner: owner.clone(),
                        group_key: product.group_key.clone(),
                    };
                    self.conflict(report, conflict)?;
                }
            }
        }

        debug!(
            group_key = %product.group_key,
            variants = kept.len(),
            "Validated product"
        );
        product.variants = kept;
        Ok(product)
    }
}
