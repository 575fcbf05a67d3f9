// src/funscript.rs

//! Funscript loading and validation
//!
//! A funscript is a JSON document holding a `version` and an ordered list of
//! `{at, pos}` actions. This module turns raw bytes into an immutable
//! [`MotionScript`]. It checks field presence and value ranges only; the
//! ordering of timestamps is checked by the sync engine when the script is
//! handed to it.

use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use crate::error::ScriptError;

/// Highest actuator position accepted in a script.
pub const MAX_POSITION: u8 = 100;

/// One scripted actuator position at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Action {
    /// Milliseconds from the start of the video
    pub at: u64,
    /// Target position, 0-100
    pub pos: u8,
}

/// A parsed funscript. Never mutated after loading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionScript {
    pub version: String,
    pub inverted: bool,
    pub actions: Vec<Action>,
}

impl MotionScript {
    /// Timestamp of the last action, or 0 for an empty script.
    pub fn duration_ms(&self) -> u64 {
        self.actions.last().map_or(0, |a| a.at)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

// Wire format. Numbers are read as f64 since editors write both
// integer and fractional values.
#[derive(Deserialize)]
struct RawAction {
    at: f64,
    pos: f64,
}

#[derive(Deserialize)]
struct RawScript {
    version: String,
    #[serde(default)]
    inverted: bool,
    actions: Vec<RawAction>,
}

/// Parses and validates a funscript document.
///
/// # Returns
/// * `Ok(MotionScript)` - The validated script, with `inverted` already applied
/// * `Err(ScriptError::Format)` - The bytes are not well-formed JSON
/// * `Err(ScriptError::Validation)` - A field is missing, mistyped or out of range
pub fn load(bytes: &[u8]) -> Result<MotionScript, ScriptError> {
    let raw: RawScript = serde_json::from_slice(bytes)?;

    if raw.version.trim().is_empty() {
        return Err(ScriptError::validation("version must not be empty"));
    }

    let actions = raw
        .actions
        .iter()
        .enumerate()
        .map(|(index, action)| convert_action(index, action, raw.inverted))
        .collect::<Result<Vec<_>, _>>()?;
    check_rounding(&raw.actions, &actions)?;

    debug!("Parsed funscript v{} with {} actions", raw.version, actions.len());

    Ok(MotionScript {
        version: raw.version,
        inverted: raw.inverted,
        actions,
    })
}

/// Reads a funscript file from disk and validates it
pub async fn load_file(path: &Path) -> Result<MotionScript, ScriptError> {
    let content = fs::read(path).await.map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load(&content)
}

fn convert_action(index: usize, raw: &RawAction, inverted: bool) -> Result<Action, ScriptError> {
    if !raw.at.is_finite() || raw.at < 0.0 {
        return Err(ScriptError::validation(format!(
            "action {index}: `at` must be a non-negative number, got {}",
            raw.at
        )));
    }
    if !raw.pos.is_finite() || raw.pos < 0.0 || raw.pos > f64::from(MAX_POSITION) {
        return Err(ScriptError::validation(format!(
            "action {index}: `pos` must be within 0-100, got {}",
            raw.pos
        )));
    }

    let pos = raw.pos.round() as u8;
    Ok(Action {
        at: raw.at.round() as u64,
        pos: if inverted { MAX_POSITION - pos } else { pos },
    })
}

// Timestamps are kept in whole milliseconds. Distinct fractional stamps
// that round onto the same millisecond cannot be represented.
fn check_rounding(raw: &[RawAction], actions: &[Action]) -> Result<(), ScriptError> {
    let collapsed = (1..actions.len())
        .find(|&i| actions[i].at == actions[i - 1].at && raw[i].at != raw[i - 1].at);
    match collapsed {
        Some(i) => Err(ScriptError::validation(format!(
            "actions {} and {} ({}ms and {}ms) round to the same millisecond",
            i - 1,
            i,
            raw[i - 1].at,
            raw[i].at
        ))),
        None => Ok(()),
    }
}
