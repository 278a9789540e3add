//! Row aggregation
//!
//! Folds tokenized rows into product records. Rows sharing a grouping-key
//! value (e.g. a `Handle`) become one [`AggregatedProduct`] with:
//! - shared fields: first non-empty value seen per column
//! - one [`AggregatedVariant`] per row with a non-empty SKU column
//! - media URLs in first-seen order without duplicates
//!
//! Products keep the order in which their key first appeared; variants keep
//! row order. Rows with an empty grouping key are skipped (logged with
//! `leniency = "empty_group_key"` and listed in [`Aggregation::skipped_rows`]).
//!
//! A SKU belongs to the first grouping key that lists it. A repeat under the
//! same key lands in [`Aggregation::duplicate_skus`]; a repeat under another
//! key lands in [`Aggregation::conflicting_skus`]. Neither becomes a variant.

use super::tokenizer::Row;
use super::IngestError;
use artcat_common::config::CatalogSettings;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Configured column names (exact, case- and whitespace-sensitive)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Required: rows are grouped by this column
    pub group_key: String,
    /// Optional: SKU-bearing column
    pub sku: String,
    /// Optional: media URL column
    pub media_url: String,
}

impl ColumnMapping {
    pub fn from_settings(settings: &CatalogSettings) -> Self {
        Self {
            group_key: settings.group_key_column.clone(),
            sku: settings.sku_column.clone(),
            media_url: settings.media_column.clone(),
        }
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::from_settings(&CatalogSettings::default())
    }
}

/// One SKU-bearing row of a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedVariant {
    /// Raw SKU text as it appeared in the input
    pub sku: String,
    /// Source row number (header is row 1)
    pub row: usize,
    /// Non-empty values of this row, keyed by column name
    pub fields: BTreeMap<String, String>,
}

/// All rows sharing one grouping-key value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedProduct {
    pub group_key: String,
    /// First non-empty value per column across the product's rows
    pub fields: BTreeMap<String, String>,
    pub variants: Vec<AggregatedVariant>,
    /// Distinct media URLs, first-seen order
    pub media: Vec<String>,
}

impl AggregatedProduct {
    fn new(group_key: String) -> Self {
        Self {
            group_key,
            fields: BTreeMap::new(),
            variants: Vec::new(),
            media: Vec::new(),
        }
    }
}

/// A SKU listed under a second grouping key in one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuConflict {
    pub row: usize,
    pub sku: String,
    /// Grouping key that listed the SKU first and keeps it
    pub owner: String,
    /// Grouping key of the dropped repeat
    pub group_key: String,
}

/// Result of one aggregation pass
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub products: Vec<AggregatedProduct>,
    /// Data rows consumed (header excluded)
    pub rows_read: usize,
    /// Row numbers skipped because the grouping key was empty
    pub skipped_rows: Vec<usize>,
    /// `(row, sku)` pairs dropped because the same product already had that SKU
    pub duplicate_skus: Vec<(usize, String)>,
    /// Repeats dropped because another product already had that SKU
    pub conflicting_skus: Vec<SkuConflict>,
}

/// Column name → index resolved from the header row
struct HeaderIndex<'h> {
    names: &'h [String],
    group_key: usize,
    sku: Option<usize>,
    media_url: Option<usize>,
}

impl<'h> HeaderIndex<'h> {
    fn resolve(header: &'h Row, columns: &ColumnMapping) -> Result<Self, IngestError> {
        // first occurrence wins for duplicated header names
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        for (index, name) in header.iter().enumerate() {
            by_name.entry(name.as_str()).or_insert(index);
        }

        let group_key = *by_name.get(columns.group_key.as_str()).ok_or_else(|| {
            IngestError::MissingRequiredColumn {
                column: columns.group_key.clone(),
                header: header.clone(),
            }
        })?;

        Ok(Self {
            names: header,
            group_key,
            sku: by_name.get(columns.sku.as_str()).copied(),
            media_url: by_name.get(columns.media_url.as_str()).copied(),
        })
    }
}

fn cell(row: &Row, index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Folds rows into products using a [`ColumnMapping`]
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    columns: ColumnMapping,
}

impl Aggregator {
    pub fn new(columns: ColumnMapping) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    /// Aggregate rows whose first row is the header
    ///
    /// Empty input has no header and therefore no grouping column.
    pub fn aggregate_with_header<I>(
        &self,
        rows: I,
        cancel: &CancellationToken,
    ) -> Result<Aggregation, IngestError>
    where
        I: IntoIterator<Item = Row>,
    {
        let mut rows = rows.into_iter();
        let header = rows.next().unwrap_or_default();
        self.aggregate(rows, &header, cancel)
    }

    /// Aggregate data rows against an already separated header
    ///
    /// Checks `cancel` before every row; a cancelled pass returns
    /// [`IngestError::Cancelled`] and no products.
    pub fn aggregate<I>(
        &self,
        rows: I,
        header: &Row,
        cancel: &CancellationToken,
    ) -> Result<Aggregation, IngestError>
    where
        I: IntoIterator<Item = Row>,
    {
        let index = HeaderIndex::resolve(header, &self.columns)?;

        let mut aggregation = Aggregation::default();
        let mut product_slots: HashMap<String, usize> = HashMap::new();
        // sku -> grouping key that listed it first
        let mut sku_owners: HashMap<String, String> = HashMap::new();

        for (offset, row) in rows.into_iter().enumerate() {
            if cancel.is_cancelled() {
                info!(rows_processed = offset, "Aggregation cancelled");
                return Err(IngestError::Cancelled {
                    rows_processed: offset,
                    products_persisted: 0,
                });
            }

            // header is row 1
            let row_number = offset + 2;
            aggregation.rows_read += 1;

            let key = cell(&row, index.group_key);
            if key.is_empty() {
                warn!(
                    leniency = "empty_group_key",
                    row = row_number,
                    "Skipping row with empty grouping key"
                );
                aggregation.skipped_rows.push(row_number);
                continue;
            }

            let slot = match product_slots.get(key) {
                Some(slot) => *slot,
                None => {
                    aggregation
                        .products
                        .push(AggregatedProduct::new(key.to_string()));
                    let slot = aggregation.products.len() - 1;
                    product_slots.insert(key.to_string(), slot);
                    slot
                }
            };
            let product = &mut aggregation.products[slot];

            for (column, name) in index.names.iter().enumerate() {
                let value = cell(&row, column);
                if !value.is_empty() && !product.fields.contains_key(name) {
                    product.fields.insert(name.clone(), value.to_string());
                }
            }

            if let Some(sku_column) = index.sku {
                let sku = cell(&row, sku_column);
                if !sku.is_empty() {
                    match sku_owners.get(sku) {
                        Some(owner) if owner == key => {
                            warn!(
                                leniency = "duplicate_sku",
                                row = row_number,
                                sku,
                                group_key = key,
                                "Duplicate SKU within product; keeping first occurrence"
                            );
                            aggregation
                                .duplicate_skus
                                .push((row_number, sku.to_string()));
                        }
                        Some(owner) => {
                            warn!(
                                leniency = "cross_product_sku",
                                row = row_number,
                                sku,
                                owner = %owner,
                                group_key = key,
                                "SKU already listed under another grouping key"
                            );
                            aggregation.conflicting_skus.push(SkuConflict {
                                row: row_number,
                                sku: sku.to_string(),
                                owner: owner.clone(),
                                group_key: key.to_string(),
                            });
                        }
                        None => {
                            sku_owners.insert(sku.to_string(), key.to_string());
                            let fields = index
                                .names
                                .iter()
                                .enumerate()
                                .filter(|(column, _)| *column != index.group_key)
                                .filter_map(|(column, name)| {
                                    let value = cell(&row, column);
                                    (!value.is_empty())
                                        .then(|| (name.clone(), value.to_string()))
                                })
                                .collect();

                            product.variants.push(AggregatedVariant {
                                sku: sku.to_string(),
                                row: row_number,
                                fields,
                            });
                        }
                    }
                }
            }

            if let Some(media_column) = index.media_url {
                let url = cell(&row, media_column);
                if !url.is_empty() && !product.media.iter().any(|m| m == url) {
                    product.media.push(url.to_string());
                }
            }
        }

        debug!(
            rows = aggregation.rows_read,
            products = aggregation.products.len(),
            skipped = aggregation.skipped_rows.len(),
            conflicts = aggregation.conflicting_skus.len(),
            "Aggregation finished"
        );

        Ok(aggregation)
    }
}

/// Aggregate with default column names except for the grouping key
pub fn aggregate<I>(
    rows: I,
    header: &Row,
    group_key_column: &str,
    cancel: &CancellationToken,
) -> Result<Aggregation, IngestError>
where
    I: IntoIterator<Item = Row>,
{
    let columns = ColumnMapping {
        group_key: group_key_column.to_string(),
        ..ColumnMapping::default()
    };
    Aggregator::new(columns).aggregate(rows, header, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::tokenizer::tokenize;

    const EXPORT: &str = "Handle,Title,Variant SKU,Image Src\n\
        sku-demo,Demo Print,10A001-UTS-00-01,https://cdn/a.jpg\n\
        sku-demo,,10A001-UTS-00-02,https://cdn/a.jpg\n\
        ,,,https://cdn/orphan.jpg\n\
        other,\"Other, framed\",10A002-UTS,https://cdn/b.jpg\n\
        sku-demo,,,https://cdn/c.jpg\n";

    fn run(text: &str) -> Aggregation {
        Aggregator::default()
            .aggregate_with_header(tokenize(text), &CancellationToken::new())
            .unwrap()
    }

    #[test]
    fn test_rows_with_shared_key_fold_into_one_product() {
        let aggregation = run(EXPORT);
        assert_eq!(aggregation.products.len(), 2);

        let demo = &aggregation.products[0];
        assert_eq!(demo.group_key, "sku-demo");
        let skus: Vec<&str> = demo.variants.iter().map(|v| v.sku.as_str()).collect();
        assert_eq!(skus, vec!["10A001-UTS-00-01", "10A001-UTS-00-02"]);
        assert_eq!(demo.variants[0].row, 2);
        assert_eq!(demo.variants[1].row, 3);
    }

    #[test]
    fn test_media_deduplicated_in_first_seen_order() {
        let aggregation = run(EXPORT);
        assert_eq!(
            aggregation.products[0].media,
            vec!["https://cdn/a.jpg".to_string(), "https://cdn/c.jpg".to_string()]
        );
    }

    #[test]
    fn test_shared_fields_take_first_non_empty_value() {
        let aggregation = run(EXPORT);
        assert_eq!(aggregation.products[0].fields["Title"], "Demo Print");
        assert_eq!(aggregation.products[1].fields["Title"], "Other, framed");
    }

    #[test]
    fn test_empty_group_key_rows_skipped_and_reported() {
        let aggregation = run(EXPORT);
        assert_eq!(aggregation.skipped_rows, vec![4]);
        assert_eq!(aggregation.rows_read, 5);
        assert!(aggregation
            .products
            .iter()
            .all(|p| !p.media.contains(&"https://cdn/orphan.jpg".to_string())));
    }

    #[test]
    fn test_missing_group_column_is_fatal() {
        let err = Aggregator::default()
            .aggregate_with_header(tokenize("handle,Variant SKU\nx,y\n"), &CancellationToken::new())
            .unwrap_err();
        match err {
            IngestError::MissingRequiredColumn { column, .. } => assert_eq!(column, "Handle"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_optional_columns_may_be_absent() {
        let aggregation = run("Handle,Title\np1,Only title\n");
        assert_eq!(aggregation.products.len(), 1);
        assert!(aggregation.products[0].variants.is_empty());
        assert!(aggregation.products[0].media.is_empty());
    }

    #[test]
    fn test_short_rows_treated_as_empty_cells() {
        let aggregation = run("Handle,Variant SKU,Image Src\np1\np1,10A001-DIG\n");
        assert_eq!(aggregation.products[0].variants.len(), 1);
    }

    #[test]
    fn test_duplicate_sku_within_product_kept_once() {
        let aggregation = run("Handle,Variant SKU\np1,10A001-DIG\np1,10A001-DIG\n");
        assert_eq!(aggregation.products[0].variants.len(), 1);
        assert_eq!(aggregation.duplicate_skus, vec![(3, "10A001-DIG".to_string())]);
    }

    #[test]
    fn test_sku_under_second_group_key_stays_with_first_owner() {
        let aggregation = run("Handle,Variant SKU\nposter-a,10A001-UTS-00\nposter-b,10A001-UTS-00\n");

        assert_eq!(aggregation.products.len(), 2);
        assert_eq!(aggregation.products[0].variants.len(), 1);
        assert!(aggregation.products[1].variants.is_empty());
        assert!(aggregation.duplicate_skus.is_empty());
        assert_eq!(
            aggregation.conflicting_skus,
            vec![SkuConflict {
                row: 3,
                sku: "10A001-UTS-00".to_string(),
                owner: "poster-a".to_string(),
                group_key: "poster-b".to_string(),
            }]
        );
    }

    #[test]
    fn test_variant_fields_exclude_group_key() {
        let aggregation = run("Handle,Variant SKU,Option1 Value\np1,10A001-DIG,Large\n");
        let fields = &aggregation.products[0].variants[0].fields;
        assert_eq!(fields.get("Option1 Value").map(String::as_str), Some("Large"));
        assert!(!fields.contains_key("Handle"));
    }

    #[test]
    fn test_free_function_uses_given_group_column() {
        let header: Row = vec!["slug".into(), "Variant SKU".into()];
        let rows = vec![vec!["a".to_string(), "10A001-DIG".to_string()]];
        let aggregation = aggregate(rows, &header, "slug", &CancellationToken::new()).unwrap();
        assert_eq!(aggregation.products[0].group_key, "a");
    }

    #[test]
    fn test_cancelled_pass_publishes_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = Aggregator::default()
            .aggregate_with_header(tokenize(EXPORT), &cancel)
            .unwrap_err();
        assert!(matches!(err, IngestError::Cancelled { rows_processed: 0, .. }));
    }
}
