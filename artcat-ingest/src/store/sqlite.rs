//! SQLite catalog store
//!
//! Tables are created by `artcat_common::db::init_database`. Identifiers are
//! stored in full five-segment form so `10A001-DIG` and `10A001-DIG-99-99-99`
//! occupy the same row.

use super::{CatalogStore, ProductId, StoreError};
use crate::ident::{ArtworkCode, AuthorityError, CompositeSku, Ordinal, SequenceAuthority};
use crate::ingest::AggregatedProduct;
use crate::matching::MatchTier;
use crate::review::Assignment;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Default sequence row for artwork ordinals
pub const DEFAULT_SEQUENCE: &str = "artwork";

/// [`CatalogStore`] over a SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteCatalogStore {
    db: SqlitePool,
    sequence_name: String,
}

impl SqliteCatalogStore {
    pub fn new(db: SqlitePool) -> Self {
        Self::with_sequence(db, DEFAULT_SEQUENCE)
    }

    /// Use a named counter other than the default
    pub fn with_sequence(db: SqlitePool, sequence_name: impl Into<String>) -> Self {
        Self {
            db,
            sequence_name: sequence_name.into(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    pub fn sequence_name(&self) -> &str {
        &self.sequence_name
    }

    /// Load the assignment recorded for a candidate
    pub async fn load_assignment(
        &self,
        candidate_id: Uuid,
    ) -> Result<Option<Assignment>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT guid, candidate_id, source_filename, sku, tier, confidence, approved_at
            FROM match_assignments
            WHERE candidate_id = ?
            "#,
        )
        .bind(candidate_id.to_string())
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let sku: String = row.get("sku");
        let tier: String = row.get("tier");
        let confidence: i64 = row.get("confidence");
        let approved_at: DateTime<Utc> = row.get("approved_at");

        Ok(Some(Assignment {
            id: parse_uuid(row.get("guid"))?,
            candidate_id: parse_uuid(row.get("candidate_id"))?,
            source_filename: row.get("source_filename"),
            target: parse_stored_sku(&sku)?,
            tier: parse_tier(&tier)?,
            confidence: u8::try_from(confidence).map_err(|_| StoreError::InvalidSku {
                sku: sku.clone(),
                reason: format!("confidence {} out of range", confidence),
            })?,
            approved_at,
        }))
    }
}

fn parse_stored_sku(raw: &str) -> Result<CompositeSku, StoreError> {
    CompositeSku::parse(raw).map_err(|e| StoreError::InvalidSku {
        sku: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_uuid(raw: String) -> Result<Uuid, StoreError> {
    Uuid::parse_str(&raw).map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

fn parse_tier(raw: &str) -> Result<MatchTier, StoreError> {
    match raw {
        "exact" => Ok(MatchTier::Exact),
        "hierarchical" => Ok(MatchTier::Hierarchical),
        "product_level" => Ok(MatchTier::ProductLevel),
        other => Err(StoreError::Database(sqlx::Error::Decode(
            format!("unknown match tier '{}'", other).into(),
        ))),
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn get_next_ordinal(&self) -> Result<Ordinal, StoreError> {
        // single statement: concurrent callers serialize on the row
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sequences (name, value) VALUES (?, 1)
            ON CONFLICT(name) DO UPDATE SET
                value = value + 1,
                updated_at = CURRENT_TIMESTAMP
            RETURNING value
            "#,
        )
        .bind(&self.sequence_name)
        .fetch_one(&self.db)
        .await?;

        Ordinal::try_from(value).map_err(|_| StoreError::CorruptSequence {
            name: self.sequence_name.clone(),
            value,
        })
    }

    async fn sku_exists(&self, sku: &CompositeSku) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM product_variants WHERE sku = ?)")
                .bind(sku.to_string())
                .fetch_one(&self.db)
                .await?;

        Ok(exists)
    }

    async fn list_skus_for_artwork(
        &self,
        artwork: &ArtworkCode,
    ) -> Result<BTreeSet<CompositeSku>, StoreError> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT sku FROM product_variants WHERE artwork_code = ?")
                .bind(artwork.as_str())
                .fetch_all(&self.db)
                .await?;

        rows.iter().map(|raw| parse_stored_sku(raw)).collect()
    }

    async fn persist_product(&self, product: &AggregatedProduct) -> Result<ProductId, StoreError> {
        // validate everything before touching the database
        let variants = product
            .variants
            .iter()
            .map(|variant| {
                let sku = parse_stored_sku(&variant.sku)?;
                let fields = serde_json::to_string(&variant.fields)?;
                Ok((sku, fields))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        let fields = serde_json::to_string(&product.fields)?;

        let mut tx = self.db.begin().await?;

        let guid: String = sqlx::query_scalar(
            r#"
            INSERT INTO products (guid, group_key, fields) VALUES (?, ?, ?)
            ON CONFLICT(group_key) DO UPDATE SET
                fields = excluded.fields,
                updated_at = CURRENT_TIMESTAMP
            RETURNING guid
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&product.group_key)
        .bind(&fields)
        .fetch_one(&mut *tx)
        .await?;

        for (position, (sku, fields)) in variants.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO product_variants (guid, product_guid, sku, artwork_code, position, fields)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(sku) DO UPDATE SET
                    product_guid = excluded.product_guid,
                    position = excluded.position,
                    fields = excluded.fields
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&guid)
            .bind(sku.to_string())
            .bind(sku.artwork().as_str())
            .bind(position as i64)
            .bind(fields)
            .execute(&mut *tx)
            .await?;
        }

        for (position, url) in product.media.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO product_media (product_guid, url, position) VALUES (?, ?, ?)
                ON CONFLICT(product_guid, url) DO UPDATE SET position = excluded.position
                "#,
            )
            .bind(&guid)
            .bind(url)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            group_key = %product.group_key,
            product_guid = %guid,
            variants = variants.len(),
            media = product.media.len(),
            "Persisted product"
        );

        parse_uuid(guid)
    }

    async fn persist_assignment(&self, assignment: &Assignment) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO match_assignments (
                guid, candidate_id, source_filename, sku, tier, confidence, approved_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(candidate_id) DO NOTHING
            "#,
        )
        .bind(assignment.id.to_string())
        .bind(assignment.candidate_id.to_string())
        .bind(&assignment.source_filename)
        .bind(assignment.target.to_string())
        .bind(assignment.tier.as_str())
        .bind(i64::from(assignment.confidence))
        .bind(assignment.approved_at)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            debug!(candidate_id = %assignment.candidate_id, "Assignment already recorded");
        } else {
            info!(
                candidate_id = %assignment.candidate_id,
                sku = %assignment.target,
                tier = assignment.tier.as_str(),
                "Recorded assignment"
            );
        }

        Ok(())
    }
}

#[async_trait]
impl SequenceAuthority for SqliteCatalogStore {
    async fn next(&self) -> Result<Ordinal, AuthorityError> {
        self.get_next_ordinal()
            .await
            .map_err(|e| AuthorityError::Unavailable(e.to_string()))
    }
}
