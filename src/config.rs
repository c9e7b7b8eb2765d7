//! Local configuration mirror and settings-save merging.
//!
//! The plugin keeps a flat JSON file (`config.json`) in its data directory
//! holding the database connection parameters, cost settings, and the cached
//! printer attributes. The password field is stored sealed (see `crypto`)
//! and only decrypted transiently after a load. Incoming settings-save maps
//! from the host are split against an explicit allow-list into a database
//! patch and a printer patch; unknown keys are ignored, never persisted.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::crypto::{KeyMaterial, SecretBox};
use crate::errors::ConfigError;

pub const CONFIG_FILE: &str = "config.json";

/// The full configuration record. All keys are always present; absent keys
/// in the stored file fall back to first-run defaults on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub db_host: String,
    pub db_user: String,
    /// Sealed at rest, plaintext only in records returned by `ConfigStore::load`
    pub db_password: String,
    pub db_port: u16,
    pub db_database: String,
    pub printer_id: i32,
    pub currency: String,
    pub electricity_cost: f64,
    pub plugin_dependency_check: bool,
    pub printer_name: String,
    pub printer_brand: String,
    pub printer_model: String,
    pub printer_power_consumption: f64,
    pub printer_purchase_price: f64,
    pub printer_estimated_lifespan: f64,
    pub printer_maintenance_costs: f64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            db_host: String::new(),
            db_user: String::new(),
            db_password: String::new(),
            db_port: 3306,
            db_database: String::new(),
            printer_id: 0,
            currency: "\u{20ac}".to_string(),
            electricity_cost: 0.0,
            plugin_dependency_check: true,
            printer_name: String::new(),
            printer_brand: String::new(),
            printer_model: String::new(),
            printer_power_consumption: 0.0,
            printer_purchase_price: 0.0,
            printer_estimated_lifespan: 0.0,
            printer_maintenance_costs: 0.0,
        }
    }
}

/// Sparse update of the database/settings fields. `printer_id` is absent on
/// purpose: the identifier is only written back by the upsert flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub db_host: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_port: Option<u16>,
    pub db_database: Option<String>,
    pub currency: Option<String>,
    pub electricity_cost: Option<f64>,
    pub plugin_dependency_check: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay the supplied fields onto `config`, leaving the rest untouched.
    pub fn apply_to(&self, config: &mut PluginConfig) {
        if let Some(v) = &self.db_host {
            config.db_host = v.clone();
        }
        if let Some(v) = &self.db_user {
            config.db_user = v.clone();
        }
        if let Some(v) = &self.db_password {
            config.db_password = v.clone();
        }
        if let Some(v) = self.db_port {
            config.db_port = v;
        }
        if let Some(v) = &self.db_database {
            config.db_database = v.clone();
        }
        if let Some(v) = &self.currency {
            config.currency = v.clone();
        }
        if let Some(v) = self.electricity_cost {
            config.electricity_cost = v;
        }
        if let Some(v) = self.plugin_dependency_check {
            config.plugin_dependency_check = v;
        }
    }
}

/// Sparse update of the printer attributes. Only supplied fields reach the
/// database row; the local mirror is overlaid the same way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrinterPatch {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub power_consumption: Option<f64>,
    pub purchase_price: Option<f64>,
    pub estimated_lifespan: Option<f64>,
    pub maintenance_costs: Option<f64>,
}

impl PrinterPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, config: &mut PluginConfig) {
        if let Some(v) = &self.name {
            config.printer_name = v.clone();
        }
        if let Some(v) = &self.brand {
            config.printer_brand = v.clone();
        }
        if let Some(v) = &self.model {
            config.printer_model = v.clone();
        }
        if let Some(v) = self.power_consumption {
            config.printer_power_consumption = v;
        }
        if let Some(v) = self.purchase_price {
            config.printer_purchase_price = v;
        }
        if let Some(v) = self.estimated_lifespan {
            config.printer_estimated_lifespan = v;
        }
        if let Some(v) = self.maintenance_costs {
            config.printer_maintenance_costs = v;
        }
    }
}

/// Split an incoming settings-save map into the database/settings subset and
/// the printer subset. Keys outside the two allow-lists are dropped.
pub fn split_settings_map(data: &Map<String, Value>) -> (SettingsPatch, PrinterPatch) {
    let mut settings = SettingsPatch::default();
    let mut printer = PrinterPatch::default();

    for (key, value) in data {
        match key.as_str() {
            "db_host" => settings.db_host = value_as_string(value),
            "db_user" => settings.db_user = value_as_string(value),
            "db_password" => settings.db_password = value_as_string(value),
            "db_port" => settings.db_port = value_as_port(value),
            "db_database" => settings.db_database = value_as_string(value),
            "currency" => settings.currency = value_as_string(value),
            "electricity_cost" => settings.electricity_cost = value_as_f64(value),
            "plugin_dependency_check" => settings.plugin_dependency_check = value_as_bool(value),
            "printer_name" => printer.name = value_as_string(value),
            "printer_brand" => printer.brand = value_as_string(value),
            "printer_model" => printer.model = value_as_string(value),
            "printer_power_consumption" => printer.power_consumption = value_as_f64(value),
            "printer_purchase_price" => printer.purchase_price = value_as_f64(value),
            "printer_estimated_lifespan" => printer.estimated_lifespan = value_as_f64(value),
            "printer_maintenance_costs" => printer.maintenance_costs = value_as_f64(value),
            other => debug!("ignoring unknown settings key: {other}"),
        }
    }

    (settings, printer)
}

pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => {
            warn!("expected string value, got {value}");
            None
        }
    }
}

/// The host settings form submits numbers as strings; accept both.
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("cannot interpret {s:?} as a number");
                None
            }
        },
        _ => {
            warn!("expected numeric value, got {value}");
            None
        }
    }
}

pub(crate) fn value_as_port(value: &Value) -> Option<u16> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match parsed {
        Some(p) if p > 0 && p <= u16::MAX as u64 => Some(p as u16),
        _ => {
            warn!("cannot interpret {value} as a port number");
            None
        }
    }
}

fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_u64().map(|v| v != 0),
        _ => None,
    }
}

/// Durable store for the configuration mirror and key material.
///
/// If the key/salt pair cannot be initialized the store keeps working
/// without sealing; passwords are then dropped from the persisted record
/// rather than written in plaintext.
pub struct ConfigStore {
    config_path: PathBuf,
    tmp_path: PathBuf,
    secret: Option<SecretBox>,
}

impl ConfigStore {
    /// Open the store in `data_dir`, creating the directory and the key/salt
    /// pair as needed.
    pub fn open(data_dir: &Path) -> Self {
        if let Err(err) = fs::create_dir_all(data_dir) {
            error!("cannot create data directory {}: {err}", data_dir.display());
        }
        let secret = match KeyMaterial::load_or_generate(data_dir) {
            Ok(material) => Some(SecretBox::new(material)),
            Err(err) => {
                error!("password sealing unavailable: {err}");
                None
            }
        };
        Self {
            config_path: data_dir.join(CONFIG_FILE),
            tmp_path: data_dir.join(format!("{CONFIG_FILE}.tmp")),
            secret,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration record with the password decrypted.
    ///
    /// A missing or unreadable file yields first-run defaults. A password
    /// that cannot be unsealed (for example after the key pair was
    /// regenerated) degrades to empty.
    pub fn load(&self) -> PluginConfig {
        let mut config = self.load_raw();
        if config.db_password.is_empty() {
            return config;
        }
        config.db_password = match &self.secret {
            Some(secret) => match secret.decrypt(&config.db_password) {
                Ok(plaintext) => plaintext,
                Err(err) => {
                    warn!("stored password cannot be decrypted, treating as unset: {err}");
                    String::new()
                }
            },
            None => {
                warn!("no key material available, stored password is unusable");
                String::new()
            }
        };
        config
    }

    /// Merge-write the supplied patches into the persisted record.
    ///
    /// A newly supplied non-empty password is re-sealed before hitting disk;
    /// an absent password field leaves the stored ciphertext untouched. The
    /// write goes through a temp file and rename so the previous record
    /// survives a failure mid-write. Returns the persisted record (password
    /// still sealed).
    pub fn update(
        &self,
        settings: &SettingsPatch,
        printer: &PrinterPatch,
        printer_id: Option<i32>,
    ) -> Result<PluginConfig, ConfigError> {
        let mut stored = self.load_raw();

        let mut sealed_settings = settings.clone();
        if let Some(password) = &settings.db_password {
            sealed_settings.db_password = Some(self.seal_password(password));
        }
        sealed_settings.apply_to(&mut stored);
        printer.apply_to(&mut stored);
        if let Some(id) = printer_id {
            stored.printer_id = id;
        }

        self.write(&stored)?;
        Ok(stored)
    }

    fn seal_password(&self, plaintext: &str) -> String {
        if plaintext.is_empty() {
            return String::new();
        }
        match &self.secret {
            Some(secret) => match secret.encrypt(plaintext) {
                Ok(token) => token,
                Err(err) => {
                    error!("cannot seal password, dropping it from the record: {err}");
                    String::new()
                }
            },
            None => {
                error!("no key material available, password not persisted");
                String::new()
            }
        }
    }

    fn load_raw(&self) -> PluginConfig {
        match fs::read_to_string(&self.config_path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => config,
                Err(err) => {
                    error!("configuration file is corrupt, using defaults: {err}");
                    PluginConfig::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => PluginConfig::default(),
            Err(err) => {
                error!("cannot read configuration, using defaults: {err}");
                PluginConfig::default()
            }
        }
    }

    fn write(&self, config: &PluginConfig) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(config)?;
        fs::write(&self.tmp_path, text).map_err(|source| ConfigError::Write {
            path: self.tmp_path.clone(),
            source,
        })?;
        fs::rename(&self.tmp_path, &self.config_path).map_err(|source| ConfigError::Write {
            path: self.config_path.clone(),
            source,
        })
    }
}
