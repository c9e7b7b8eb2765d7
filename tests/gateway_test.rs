//! Data gateway tests: upsert branching, sparse updates, explicit not-found,
//! and connection failure reporting. Row-level operations run against a
//! temp-file SQLite database brought up by the migration.

use anyhow::Result;
use sea_orm::{Database, DatabaseConnection};
use tempfile::NamedTempFile;

use printhistory::config::PrinterPatch;
use printhistory::database::setup_database;
use printhistory::errors::GatewayError;
use printhistory::gateway::{
    select_printer_row, upsert_printer_row, ConnectionSettings, DataGateway,
};

async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

#[tokio::test]
async fn zero_identifier_always_inserts() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    let patch = PrinterPatch {
        name: Some("Voron 2.4".to_string()),
        brand: Some("Voron".to_string()),
        ..PrinterPatch::default()
    };
    let outcome = upsert_printer_row(&db, 0, &patch).await?;
    assert!(outcome.inserted);
    assert!(!outcome.updated);
    assert!(outcome.printer_id > 0);

    // Second call with the assigned identifier updates instead.
    let rename = PrinterPatch {
        name: Some("Voron 2.4 R2".to_string()),
        ..PrinterPatch::default()
    };
    let second = upsert_printer_row(&db, outcome.printer_id, &rename).await?;
    assert!(!second.inserted);
    assert!(second.updated);
    assert_eq!(second.printer_id, outcome.printer_id);
    Ok(())
}

#[tokio::test]
async fn sparse_update_preserves_unmentioned_fields() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    let initial = PrinterPatch {
        name: Some("Prusa MK4".to_string()),
        brand: Some("Prusa".to_string()),
        power_consumption: Some(120.0),
        purchase_price: Some(1099.0),
        ..PrinterPatch::default()
    };
    let outcome = upsert_printer_row(&db, 0, &initial).await?;

    let price_only = PrinterPatch {
        purchase_price: Some(899.0),
        ..PrinterPatch::default()
    };
    upsert_printer_row(&db, outcome.printer_id, &price_only).await?;

    let row = select_printer_row(&db, outcome.printer_id).await?.unwrap();
    assert_eq!(row.name.as_deref(), Some("Prusa MK4"));
    assert_eq!(row.brand.as_deref(), Some("Prusa"));
    assert_eq!(row.power_consumption, Some(120.0));
    assert_eq!(row.purchase_price, Some(899.0));
    assert_eq!(row.estimated_lifespan, None);
    Ok(())
}

#[tokio::test]
async fn stale_identifier_falls_back_to_insert() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    let patch = PrinterPatch {
        name: Some("Ender 3".to_string()),
        ..PrinterPatch::default()
    };
    let outcome = upsert_printer_row(&db, 999, &patch).await?;
    assert!(outcome.inserted);
    assert!(outcome.printer_id > 0);
    Ok(())
}

#[tokio::test]
async fn empty_patch_cannot_insert() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    let err = upsert_printer_row(&db, 0, &PrinterPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Configuration(_)));
    Ok(())
}

#[tokio::test]
async fn empty_patch_on_existing_row_is_a_no_op() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    let outcome = upsert_printer_row(
        &db,
        0,
        &PrinterPatch {
            name: Some("Bambu X1C".to_string()),
            ..PrinterPatch::default()
        },
    )
    .await?;

    let second = upsert_printer_row(&db, outcome.printer_id, &PrinterPatch::default()).await?;
    assert!(!second.inserted);
    assert!(!second.updated);

    let row = select_printer_row(&db, outcome.printer_id).await?.unwrap();
    assert_eq!(row.name.as_deref(), Some("Bambu X1C"));
    Ok(())
}

#[tokio::test]
async fn select_missing_row_is_not_an_error() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    assert!(select_printer_row(&db, 42).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn unconfigured_gateway_reports_not_configured() {
    let gateway = DataGateway::new();
    let err = gateway.select_printer(1).await.unwrap_err();
    assert!(matches!(err, GatewayError::NotConfigured));
}

#[tokio::test]
async fn test_connection_against_unreachable_host_reports_message() {
    let candidate = ConnectionSettings {
        host: "127.0.0.1".to_string(),
        user: "u".to_string(),
        password: "p".to_string(),
        database: "printfarm".to_string(),
        // Discard port: nothing listens there, connect fails fast.
        port: 9,
    };
    let err = DataGateway::test_connection(&candidate).await.unwrap_err();
    match err {
        GatewayError::Connectivity(message) => assert!(!message.is_empty()),
        other => panic!("expected connectivity error, got {other:?}"),
    }
}
