// src/handlers/types.rs

use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use crate::sync::SyncEngine;

/// Shared application state handed to every handler
pub struct AppState {
    pub engine: SyncEngine,
    /// Directory funscripts are resolved against
    pub funscript_dir: PathBuf,
}

/// Request to load the funscript belonging to a video
#[derive(Deserialize, Debug)]
pub struct LoadScriptRequest {
    /// Video or funscript path; only the file name is used
    pub path: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayRequest {
    #[serde(default)]
    pub start_time: u64,
}

/// Used for both seeks and reference position reports
#[derive(Deserialize, Debug)]
pub struct TimeRequest {
    pub time: u64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LatencyRequest {
    pub offset_ms: i64,
}

#[derive(Serialize, Debug)]
pub struct TimeResponse {
    pub time: u64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LatencyResponse {
    pub offset_ms: u64,
}

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl ToString) -> Self {
        Self { error: error.to_string() }
    }
}
