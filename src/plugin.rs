//! Plugin orchestration: wires the config store to the data gateway and
//! exposes the narrow surface the host calls into.
//!
//! The host is an external collaborator: it loads settings at startup, hands
//! over a field map on every settings-save, and delivers print lifecycle
//! events as name + payload. This module only reads those payloads; it never
//! drives the host's dispatch.

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::api::{ConnectionTestResult, SelectPrinterResult, UpdatePrinterResult};
use crate::config::{
    split_settings_map, ConfigStore, PluginConfig, PrinterPatch, SettingsPatch,
};
use crate::gateway::{ConnectionSettings, DataGateway};

/// The narrow host callback surface: settings load, settings save, events.
#[async_trait]
pub trait HostPlugin {
    async fn on_load_settings(&self) -> PluginConfig;
    async fn on_save_settings(&mut self, data: &Map<String, Value>) -> ConnectionTestResult;
    fn on_event(&self, name: &str, payload: &Map<String, Value>);
}

/// Print lifecycle events the plugin reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterEvent {
    PrintStarted,
    PrintDone,
    PrintFailed,
    MetadataUpdated,
}

impl PrinterEvent {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "print-started" => Some(Self::PrintStarted),
            "print-done" => Some(Self::PrintDone),
            "print-failed" => Some(Self::PrintFailed),
            "metadata-updated" => Some(Self::MetadataUpdated),
            _ => None,
        }
    }
}

/// Fields of interest lifted from a print event payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrintParameters {
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub start_time: Option<f64>,
    pub print_time: Option<f64>,
    pub printer_state: Option<String>,
}

/// Lift the print parameters out of an event payload. Absent keys stay
/// `None`; the payload is never mutated.
pub fn extract_print_parameters(payload: &Map<String, Value>) -> PrintParameters {
    let string = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_owned);
    let number = |key: &str| payload.get(key).and_then(Value::as_f64);
    PrintParameters {
        file_name: string("name"),
        file_path: string("path"),
        start_time: number("time"),
        print_time: number("printTime"),
        printer_state: string("state"),
    }
}

/// The plugin core: encrypted settings mirror plus printer reconciliation.
pub struct PrintHistoryPlugin {
    config_store: ConfigStore,
    gateway: DataGateway,
}

impl PrintHistoryPlugin {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            config_store: ConfigStore::open(data_dir),
            gateway: DataGateway::new(),
        }
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config_store
    }

    /// Load the stored configuration, configure the gateway from it, and if
    /// a printer identifier is already known, prefetch its row to confirm
    /// the database is reachable.
    pub async fn startup(&mut self) -> PluginConfig {
        let config = self.config_store.load();
        match ConnectionSettings::from_config(&config) {
            Ok(settings) => {
                self.gateway.set_connection_settings(settings);
                if config.printer_id > 0 {
                    match self.gateway.select_printer(config.printer_id).await {
                        Ok(Some(row)) => {
                            info!(
                                "loaded printer record {} ({})",
                                config.printer_id,
                                row.name.as_deref().unwrap_or("unnamed")
                            );
                        }
                        Ok(None) => {
                            warn!(
                                "configured printer {} has no matching database row",
                                config.printer_id
                            );
                        }
                        Err(err) => warn!("cannot load printer record at startup: {err}"),
                    }
                }
            }
            Err(err) => debug!("database connection not configured yet: {err}"),
        }
        config
    }

    /// Settings-save flow: split the incoming map, verify the resulting
    /// connection settings actually work, reconcile the printer row, then
    /// persist the merged configuration. On any failure the stored
    /// configuration is left untouched.
    pub async fn save_settings(&mut self, data: &Map<String, Value>) -> ConnectionTestResult {
        let (settings_patch, printer_patch) = split_settings_map(data);

        let mut candidate = self.config_store.load();
        settings_patch.apply_to(&mut candidate);

        let connection_settings = match ConnectionSettings::from_config(&candidate) {
            Ok(settings) => settings,
            Err(err) => {
                error!("error saving data: {err}");
                return ConnectionTestResult::err(err.to_string());
            }
        };
        if let Err(err) = DataGateway::test_connection(&connection_settings).await {
            error!("error saving data: {err}");
            return ConnectionTestResult::err(err.to_string());
        }
        self.gateway.set_connection_settings(connection_settings);

        // A printer row is first minted once printer attributes arrive;
        // saving pure database settings must not attempt an empty insert.
        let minted_id = if printer_patch.is_empty() && candidate.printer_id == 0 {
            None
        } else {
            match self
                .gateway
                .upsert_printer(candidate.printer_id, &printer_patch)
                .await
            {
                Ok(outcome) => Some(outcome.printer_id),
                Err(err) => {
                    error!("error saving data: {err}");
                    return ConnectionTestResult::err(err.to_string());
                }
            }
        };

        match self
            .config_store
            .update(&settings_patch, &printer_patch, minted_id)
        {
            Ok(_) => ConnectionTestResult::ok("Data was updated"),
            Err(err) => {
                error!("failed to persist configuration: {err}");
                ConnectionTestResult::err(err.to_string())
            }
        }
    }

    /// Validate reachability of the supplied parameters without touching the
    /// gateway's active settings.
    pub async fn test_connection(&self, data: &Map<String, Value>) -> ConnectionTestResult {
        let candidate = match ConnectionSettings::from_map(data) {
            Ok(settings) => settings,
            Err(err) => return ConnectionTestResult::err(err.to_string()),
        };
        match DataGateway::test_connection(&candidate).await {
            Ok(()) => ConnectionTestResult::ok("Connection successful"),
            Err(err) => ConnectionTestResult::err(err.to_string()),
        }
    }

    pub async fn select_printer(&self, printer_id: i32) -> SelectPrinterResult {
        match self.gateway.select_printer(printer_id).await {
            Ok(Some(row)) => SelectPrinterResult::found(row),
            Ok(None) => SelectPrinterResult::not_found(),
            Err(err) => {
                error!("error selecting printer configuration: {err}");
                SelectPrinterResult::err(err.to_string())
            }
        }
    }

    /// Upsert from a raw field map. A freshly assigned identifier is written
    /// back into the configuration mirror.
    pub async fn update_printer(&self, data: &Map<String, Value>) -> UpdatePrinterResult {
        let (_, printer_patch) = split_settings_map(data);
        let printer_id = data
            .get("printer_id")
            .and_then(value_as_i32)
            .unwrap_or_else(|| self.config_store.load().printer_id);

        match self.gateway.upsert_printer(printer_id, &printer_patch).await {
            Ok(outcome) => {
                if outcome.inserted {
                    if let Err(err) = self.config_store.update(
                        &SettingsPatch::default(),
                        &PrinterPatch::default(),
                        Some(outcome.printer_id),
                    ) {
                        error!("cannot record new printer identifier: {err}");
                    }
                }
                UpdatePrinterResult::from_outcome(outcome)
            }
            Err(err) => {
                error!("error updating/inserting printer configuration: {err}");
                UpdatePrinterResult::err(printer_id, err.to_string())
            }
        }
    }

    /// Clear the dependency-check flag and persist it.
    pub fn deactivate_plugin_check(&self) -> ConnectionTestResult {
        let patch = SettingsPatch {
            plugin_dependency_check: Some(false),
            ..SettingsPatch::default()
        };
        match self
            .config_store
            .update(&patch, &PrinterPatch::default(), None)
        {
            Ok(_) => ConnectionTestResult::ok("Plugin check deactivated"),
            Err(err) => {
                error!("cannot persist plugin check flag: {err}");
                ConnectionTestResult::err(err.to_string())
            }
        }
    }

    /// React to a host event. Payloads are only read, never answered.
    pub fn handle_event(&self, name: &str, payload: &Map<String, Value>) {
        let Some(event) = PrinterEvent::from_name(name) else {
            debug!("ignoring event {name}");
            return;
        };
        match event {
            PrinterEvent::PrintStarted => {
                let params = extract_print_parameters(payload);
                info!(
                    "print started: {}",
                    params.file_name.as_deref().unwrap_or("unknown file")
                );
                debug!("print parameters: {params:?}");
            }
            PrinterEvent::PrintDone => {
                let params = extract_print_parameters(payload);
                info!(
                    "print done: {} after {}s",
                    params.file_name.as_deref().unwrap_or("unknown file"),
                    params.print_time.unwrap_or(0.0)
                );
            }
            PrinterEvent::PrintFailed => {
                let params = extract_print_parameters(payload);
                warn!(
                    "print failed: {} (state {})",
                    params.file_name.as_deref().unwrap_or("unknown file"),
                    params.printer_state.as_deref().unwrap_or("unknown")
                );
            }
            PrinterEvent::MetadataUpdated => {
                let statistics = payload.get("statistics").and_then(Value::as_object);
                let print_time = statistics
                    .and_then(|s| s.get("print_time"))
                    .and_then(Value::as_f64);
                let filament_length = statistics
                    .and_then(|s| s.get("filament_length"))
                    .and_then(Value::as_f64);
                info!("metadata statistics updated: print_time={print_time:?} filament_length={filament_length:?}");
            }
        }
    }
}

#[async_trait]
impl HostPlugin for PrintHistoryPlugin {
    async fn on_load_settings(&self) -> PluginConfig {
        self.config_store.load()
    }

    async fn on_save_settings(&mut self, data: &Map<String, Value>) -> ConnectionTestResult {
        self.save_settings(data).await
    }

    fn on_event(&self, name: &str, payload: &Map<String, Value>) {
        self.handle_event(name, payload);
    }
}

fn value_as_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_names_map_to_variants() {
        assert_eq!(
            PrinterEvent::from_name("print-started"),
            Some(PrinterEvent::PrintStarted)
        );
        assert_eq!(
            PrinterEvent::from_name("print-done"),
            Some(PrinterEvent::PrintDone)
        );
        assert_eq!(
            PrinterEvent::from_name("print-failed"),
            Some(PrinterEvent::PrintFailed)
        );
        assert_eq!(
            PrinterEvent::from_name("metadata-updated"),
            Some(PrinterEvent::MetadataUpdated)
        );
        assert_eq!(PrinterEvent::from_name("client-opened"), None);
    }

    #[test]
    fn print_parameters_are_read_only_lifts() {
        let payload = json!({
            "name": "benchy.gcode",
            "path": "prints/benchy.gcode",
            "time": 1724764800.0,
            "printTime": 5400.5,
            "state": "Operational",
            "origin": "local"
        });
        let params = extract_print_parameters(payload.as_object().unwrap());
        assert_eq!(params.file_name.as_deref(), Some("benchy.gcode"));
        assert_eq!(params.file_path.as_deref(), Some("prints/benchy.gcode"));
        assert_eq!(params.print_time, Some(5400.5));
        assert_eq!(params.printer_state.as_deref(), Some("Operational"));
    }

    #[test]
    fn absent_payload_keys_stay_unset() {
        let payload = json!({"origin": "sdcard"});
        let params = extract_print_parameters(payload.as_object().unwrap());
        assert_eq!(params, PrintParameters::default());
    }
}
