// src/sync/events.rs

use serde::Serialize;

/// Notifications published by the sync engine.
///
/// These are observational: hosts use them for display and logging, never
/// for control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SyncEvent {
    ScriptLoaded { action_count: usize, duration_ms: u64 },
    PlaybackStarted { start_time: u64 },
    ActionDispatched { at: u64, pos: u8, speed: u8, index: usize },
    /// A dispatched command was not delivered; playback carries on
    ActionFailed { index: usize, at: u64, error: String },
    PlaybackPaused { time: u64 },
    Seeked { time: u64 },
    PlaybackStopped,
}
