//! Test Helper Utilities
//!
//! Shared fixtures for artcat-ingest integration tests

#![allow(dead_code)]

use anyhow::Result;
use artcat_common::config::{CatalogSettings, MalformedSkuPolicy};
use artcat_ingest::Catalog;
use tempfile::TempDir;

/// Storefront export: two products, one continuation row, quoted fields
pub const EXPORT: &str = "Handle,Title,Body,Variant SKU,Image Src\r\n\
    sku-demo,Demo Print,\"Giclée, archival\",10A001-UTS-00-01,https://cdn/demo-front.jpg\r\n\
    sku-demo,,,10A001-UTS-00-02,https://cdn/demo-front.jpg\r\n\
    ,,,,https://cdn/stray.jpg\r\n\
    sku-poster,Poster,\"He said \"\"hi\"\"\",10A002-PST-01,https://cdn/poster.jpg\r\n\
    sku-poster,,,10A002-PST-02,https://cdn/poster-alt.jpg\r\n";

/// Catalog skeleton used by the matching tests
pub const TEE_EXPORT: &str = "Handle,Variant SKU\n\
    tee,10A001-UTS-00-01\n\
    tee,10A001-UTS-00-02\n\
    tee,10A001-UTS-01-00\n\
    digital,10A001-DIG\n";

/// Route tracing output through the test harness (idempotent)
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

pub fn settings(policy: MalformedSkuPolicy) -> CatalogSettings {
    CatalogSettings {
        malformed_sku_policy: policy,
        ..CatalogSettings::default()
    }
}

pub async fn memory_catalog() -> Result<Catalog> {
    Ok(Catalog::in_memory(CatalogSettings::default()).await?)
}

/// File-backed catalog; keep the `TempDir` alive for the test's duration
pub async fn file_catalog() -> Result<(TempDir, Catalog)> {
    let temp_dir = TempDir::new()?;
    let catalog = Catalog::open(temp_dir.path(), CatalogSettings::default()).await?;
    Ok((temp_dir, catalog))
}
