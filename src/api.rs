//! JSON-serializable result payloads exposed to the host.
//!
//! Every host-facing operation answers with one of these shapes, each
//! carrying a uniform `error` flag. Raw gateway or crypto errors never cross
//! this boundary; they arrive here already flattened to a message.

use serde::{Deserialize, Serialize};

use crate::database::entities::printer;
use crate::gateway::UpsertOutcome;

/// Response for test-connection and other message-only operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub error: bool,
    pub message: String,
}

impl ConnectionTestResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }
}

/// Response for select-printer. A missing row is not an error: `error` stays
/// false and `message` explains the absence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectPrinterResult {
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printer_data: Option<printer::Model>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SelectPrinterResult {
    pub fn found(row: printer::Model) -> Self {
        Self {
            error: false,
            printer_data: Some(row),
            message: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            error: false,
            printer_data: None,
            message: Some("Printer data not found".to_string()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            error: true,
            printer_data: None,
            message: Some(message.into()),
        }
    }
}

/// Response for update-printer: the identifier (freshly assigned on insert)
/// and which branch ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePrinterResult {
    pub error: bool,
    pub printer_id: i32,
    pub insert: bool,
    pub update: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UpdatePrinterResult {
    pub fn from_outcome(outcome: UpsertOutcome) -> Self {
        Self {
            error: false,
            printer_id: outcome.printer_id,
            insert: outcome.inserted,
            update: outcome.updated,
            message: None,
        }
    }

    pub fn err(printer_id: i32, message: impl Into<String>) -> Self {
        Self {
            error: true,
            printer_id,
            insert: false,
            update: false,
            message: Some(message.into()),
        }
    }
}
