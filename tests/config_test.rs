//! Configuration store tests: sealed-at-rest password, merge-write
//! semantics, and key regeneration behavior.

use anyhow::Result;
use serde_json::Value;
use tempfile::TempDir;

use printhistory::config::{ConfigStore, PrinterPatch, SettingsPatch};
use printhistory::crypto::SALT_FILE;

fn db_settings_patch() -> SettingsPatch {
    SettingsPatch {
        db_host: Some("db1".to_string()),
        db_user: Some("u".to_string()),
        db_password: Some("secret".to_string()),
        db_port: Some(3306),
        db_database: Some("printfarm".to_string()),
        ..SettingsPatch::default()
    }
}

#[test]
fn password_is_ciphertext_on_disk_and_plaintext_on_load() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ConfigStore::open(dir.path());

    store.update(&db_settings_patch(), &PrinterPatch::default(), None)?;

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(store.config_path())?)?;
    let stored_password = raw["db_password"].as_str().unwrap();
    assert_ne!(stored_password, "secret");
    assert!(!stored_password.is_empty());
    assert_eq!(raw["db_host"], "db1");
    assert_eq!(raw["db_port"], 3306);

    let loaded = store.load();
    assert_eq!(loaded.db_password, "secret");
    assert_eq!(loaded.db_host, "db1");
    Ok(())
}

#[test]
fn update_is_a_merge_not_a_replace() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ConfigStore::open(dir.path());

    store.update(&db_settings_patch(), &PrinterPatch::default(), None)?;

    let currency_only = SettingsPatch {
        currency: Some("$".to_string()),
        ..SettingsPatch::default()
    };
    let printer_only = PrinterPatch {
        name: Some("Voron 2.4".to_string()),
        ..PrinterPatch::default()
    };
    store.update(&currency_only, &printer_only, Some(7))?;

    let loaded = store.load();
    assert_eq!(loaded.db_host, "db1");
    assert_eq!(loaded.db_password, "secret");
    assert_eq!(loaded.currency, "$");
    assert_eq!(loaded.printer_name, "Voron 2.4");
    assert_eq!(loaded.printer_id, 7);
    Ok(())
}

#[test]
fn absent_password_field_keeps_stored_ciphertext() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ConfigStore::open(dir.path());

    store.update(&db_settings_patch(), &PrinterPatch::default(), None)?;
    let before: Value = serde_json::from_str(&std::fs::read_to_string(store.config_path())?)?;

    let no_password = SettingsPatch {
        db_user: Some("v".to_string()),
        ..SettingsPatch::default()
    };
    store.update(&no_password, &PrinterPatch::default(), None)?;

    let after: Value = serde_json::from_str(&std::fs::read_to_string(store.config_path())?)?;
    assert_eq!(before["db_password"], after["db_password"]);
    assert_eq!(store.load().db_password, "secret");
    Ok(())
}

#[test]
fn missing_file_yields_full_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ConfigStore::open(dir.path());

    let config = store.load();
    assert_eq!(config.db_port, 3306);
    assert_eq!(config.printer_id, 0);
    assert!(config.plugin_dependency_check);
    assert!(config.db_password.is_empty());
    Ok(())
}

#[test]
fn key_regeneration_invalidates_sealed_password() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let store = ConfigStore::open(dir.path());
        store.update(&db_settings_patch(), &PrinterPatch::default(), None)?;
    }

    // A lost salt file forces a fresh key pair; the old ciphertext must
    // degrade to an empty password, not a crash or garbage plaintext.
    std::fs::remove_file(dir.path().join(SALT_FILE))?;
    let reopened = ConfigStore::open(dir.path());
    let loaded = reopened.load();
    assert_eq!(loaded.db_password, "");
    assert_eq!(loaded.db_host, "db1");
    Ok(())
}

#[test]
fn no_temp_file_left_behind() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ConfigStore::open(dir.path());
    store.update(&db_settings_patch(), &PrinterPatch::default(), None)?;

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
    Ok(())
}
