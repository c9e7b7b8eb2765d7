//! Error types for the configuration store and the database gateway.
//!
//! Public plugin operations never surface these directly to the host; they
//! are mapped into result payloads with an explicit `error` flag (see
//! `api`). The enums here exist so internal code can branch on the failure
//! kind instead of string-matching driver messages.

use std::path::PathBuf;

use thiserror::Error;

/// Failures in key derivation or password sealing.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key/salt files could not be read or written
    #[error("key material unavailable: {0}")]
    KeyUnavailable(String),

    /// Key derivation failed
    #[error("key derivation failed: {0}")]
    DerivationFailed(String),

    /// Encryption failed
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Tag mismatch or cipher-level decryption failure
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Token is not valid base64 or is too short to carry a nonce and tag
    #[error("malformed token: {0}")]
    MalformedToken(String),
}

/// Failures while reading or writing the local configuration mirror.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write configuration at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("configuration is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures in the relational data gateway, per operation category.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing or malformed connection parameters; reported, never retried
    #[error("invalid connection settings: {0}")]
    Configuration(String),

    /// Driver-level connect or ping failure; reported with message, no retry
    #[error("database connection failed: {0}")]
    Connectivity(String),

    /// Statement execution failure; triggers rollback before reporting
    #[error("query failed: {0}")]
    Query(#[from] sea_orm::DbErr),

    /// A data operation was attempted before `set_connection_settings`
    #[error("database connection settings are not set")]
    NotConfigured,
}
