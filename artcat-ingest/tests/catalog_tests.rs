//! Integration tests for artwork code minting against a shared database
//!
//! Several stores on one database file must never hand out the same ordinal.

mod helpers;

use artcat_common::config::{CatalogSettings, WraparoundPolicy};
use artcat_common::db::init_database;
use artcat_ingest::ident::{CodeGenerator, SequenceAuthority};
use artcat_ingest::store::{CatalogStore, SqliteCatalogStore};
use artcat_ingest::{Catalog, CatalogError};
use helpers::file_catalog;
use std::collections::HashSet;
use tempfile::TempDir;
use tokio::task::JoinSet;

#[tokio::test]
async fn test_mint_uses_store_sequence() {
    let (_dir, catalog) = file_catalog().await.unwrap();

    let first = catalog.mint_artwork_code().await.unwrap();
    let second = catalog.mint_artwork_code().await.unwrap();

    assert_eq!(first.block_letter(), 'A');
    assert_eq!(first.sequence_in_block(), "001");
    assert_eq!(second.sequence_in_block(), "002");
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_sequence_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();

    let catalog = Catalog::open(temp_dir.path(), CatalogSettings::default())
        .await
        .unwrap();
    catalog.mint_artwork_code().await.unwrap();
    catalog.store.pool().close().await;
    drop(catalog);

    let reopened = Catalog::open(temp_dir.path(), CatalogSettings::default())
        .await
        .unwrap();
    assert_eq!(reopened.store.get_next_ordinal().await.unwrap(), 2);
}

#[tokio::test]
async fn test_independent_pools_never_share_ordinals() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("shared.db");

    let mut stores = Vec::new();
    for _ in 0..2 {
        let pool = init_database(&db_path).await.unwrap();
        stores.push(SqliteCatalogStore::new(pool));
    }

    let mut join_set = JoinSet::new();
    for task in 0..4 {
        let store = stores[task % 2].clone();
        join_set.spawn(async move {
            let mut drawn = Vec::new();
            for _ in 0..25 {
                drawn.push(store.next().await.unwrap());
            }
            drawn
        });
    }

    let mut seen = HashSet::new();
    while let Some(result) = join_set.join_next().await {
        for ordinal in result.unwrap() {
            assert!(seen.insert(ordinal), "ordinal {} handed out twice", ordinal);
        }
    }

    assert_eq!(seen.len(), 100);
    assert_eq!(seen.iter().max(), Some(&100));
}

#[tokio::test]
async fn test_exhausted_block_space_fails_by_default() {
    let (_dir, catalog) = file_catalog().await.unwrap();
    sqlx::query("INSERT INTO sequences (name, value) VALUES ('artwork', 25999)")
        .execute(catalog.store.pool())
        .await
        .unwrap();

    let err = catalog.mint_artwork_code().await.unwrap_err();
    assert!(matches!(err, CatalogError::Code(_)));

    // reuse policy accepts the wrapped code
    let reusing = CodeGenerator::new(2020, WraparoundPolicy::Reuse);
    let code = reusing.mint(catalog.store.as_ref()).await.unwrap();
    assert_eq!(code.block_letter(), 'A');
}

#[tokio::test]
async fn test_unusable_settings_refused_at_open() {
    let settings = CatalogSettings {
        sequence_name: "  ".to_string(),
        ..CatalogSettings::default()
    };

    let err = Catalog::in_memory(settings).await.err().unwrap();
    assert!(matches!(
        err,
        CatalogError::Common(artcat_common::Error::InvalidSetting {
            key: "sequence_name",
            ..
        })
    ));
    assert!(err.is_input_malformed());
}
