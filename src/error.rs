// src/error.rs

//! Error types shared by the script store, the sync engine and the device layer.

use std::path::PathBuf;
use buttplug::client::ButtplugClientError;
use thiserror::Error;

/// Errors raised while reading or validating a funscript document.
#[derive(Error, Debug)]
pub enum ScriptError {
    /// The file could not be read
    #[error("Failed to read funscript {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed JSON
    #[error("Malformed funscript: {0}")]
    Format(String),

    /// The document parsed but is semantically invalid
    #[error("Invalid funscript: {0}")]
    Validation(String),
}

impl ScriptError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<serde_json::Error> for ScriptError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;
        match err.classify() {
            // Missing fields and wrong value types are data errors: the
            // document itself was readable.
            Category::Data => Self::Validation(err.to_string()),
            Category::Syntax | Category::Eof | Category::Io => Self::Format(err.to_string()),
        }
    }
}

/// Errors reported by a `DeviceCommander`.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Device not connected")]
    NotConnected,

    #[error("No device found on the Intiface server")]
    NoDevice,

    #[error("Buttplug transport error: {0}")]
    Transport(#[from] ButtplugClientError),
}

/// Errors returned by the sync engine operations.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("No funscript loaded")]
    NoScriptLoaded,

    #[error("Device not ready")]
    DeviceNotReady,

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Errors raised while reading settings from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}
