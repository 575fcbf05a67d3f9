// src/sync/state.rs

//! Playback state machine
//!
//! [`EngineState`] holds everything the engine knows about the current
//! session and performs the state transitions. It does no I/O and takes the
//! current instant as an argument, so the engine can drive it under a single
//! lock and tests can drive it with made-up instants.

use std::sync::Arc;
use serde::Serialize;
use tokio::time::Instant;
use crate::{
    error::{ScriptError, SyncError},
    funscript::{Action, MotionScript},
};
use super::speed::action_speed;

/// Upper bound of the latency compensation, in milliseconds.
pub const MAX_LATENCY_OFFSET_MS: u64 = 200;
pub const DEFAULT_LATENCY_OFFSET_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Snapshot of the engine state reported to hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub phase: Phase,
    pub current_time: u64,
    pub video_position: u64,
    pub action_cursor: usize,
    pub total_actions: usize,
    pub duration_ms: u64,
    pub latency_offset_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSummary {
    pub action_count: usize,
    pub duration_ms: u64,
}

/// An action that became due during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub index: usize,
    pub at: u64,
    pub pos: u8,
    pub speed: u8,
}

// One uninterrupted stretch of playback. Every play, resume and reseek
// while playing starts a new segment with a fresh id.
#[derive(Debug, Clone, Copy)]
struct Segment {
    id: u64,
    started_at: Instant,
    start_position: u64,
}

#[derive(Debug)]
pub(crate) struct EngineState {
    script: Option<Arc<MotionScript>>,
    phase: Phase,
    current_time: u64,
    video_position: u64,
    cursor: usize,
    latency_offset_ms: u64,
    segment: Option<Segment>,
    next_segment_id: u64,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_OFFSET_MS as i64)
    }
}

impl EngineState {
    pub fn new(latency_offset_ms: i64) -> Self {
        Self {
            script: None,
            phase: Phase::Stopped,
            current_time: 0,
            video_position: 0,
            cursor: 0,
            latency_offset_ms: clamp_latency(latency_offset_ms),
            segment: None,
            next_segment_id: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    pub fn video_position(&self) -> u64 {
        self.video_position
    }

    pub fn has_script(&self) -> bool {
        self.script.is_some()
    }

    /// Replaces the script after checking its timeline.
    ///
    /// On error nothing is touched, so the previous script stays active.
    /// On success the engine is left stopped with the cursor at 0.
    pub fn load(&mut self, script: Arc<MotionScript>) -> Result<ScriptSummary, ScriptError> {
        check_timeline(&script.actions)?;

        let summary = ScriptSummary {
            action_count: script.len(),
            duration_ms: script.duration_ms(),
        };
        self.script = Some(script);
        self.phase = Phase::Stopped;
        self.segment = None;
        self.cursor = 0;
        Ok(summary)
    }

    /// Enters `Playing` at `start_time` and opens a new segment.
    pub fn begin(&mut self, start_time: u64, now: Instant) -> Result<u64, SyncError> {
        if self.script.is_none() {
            return Err(SyncError::NoScriptLoaded);
        }

        self.phase = Phase::Playing;
        self.current_time = start_time;
        self.video_position = start_time;
        self.cursor = self.locate(start_time);
        Ok(self.open_segment(now))
    }

    /// Leaves `Playing` for `Paused`, freezing the current time.
    ///
    /// Returns the frozen time, or `None` if the engine was not playing.
    pub fn halt(&mut self) -> Option<u64> {
        if self.phase != Phase::Playing {
            return None;
        }
        self.phase = Phase::Paused;
        self.segment = None;
        Some(self.current_time)
    }

    /// Moves both clocks and the cursor to `time`, keeping the phase.
    ///
    /// Returns the id of the new segment when playback continues.
    pub fn seek(&mut self, time: u64, now: Instant) -> Option<u64> {
        self.current_time = time;
        self.video_position = time;
        self.cursor = self.locate(time);

        match self.phase {
            Phase::Playing => Some(self.open_segment(now)),
            Phase::Paused | Phase::Stopped => None,
        }
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Stopped;
        self.segment = None;
        self.current_time = 0;
        self.video_position = 0;
        self.cursor = 0;
    }

    pub fn set_video_position(&mut self, time: u64) {
        self.video_position = time;
    }

    /// Clamps and stores the latency offset; returns the stored value.
    pub fn set_latency_offset(&mut self, offset_ms: i64) -> u64 {
        self.latency_offset_ms = clamp_latency(offset_ms);
        self.latency_offset_ms
    }

    /// Advances the virtual clock to `now` and collects every action that
    /// became due, moving the cursor past them.
    ///
    /// Returns `None` when `segment_id` is no longer the active segment; the
    /// caller's ticker must then exit.
    pub fn advance(&mut self, segment_id: u64, now: Instant) -> Option<Vec<Dispatch>> {
        let segment = self.segment.filter(|s| s.id == segment_id && self.phase == Phase::Playing)?;

        let elapsed = now.saturating_duration_since(segment.started_at).as_millis() as u64;
        self.current_time = segment
            .start_position
            .saturating_add(elapsed)
            .saturating_add(self.latency_offset_ms);

        let actions = self.script.as_deref().map_or(&[][..], |s| s.actions.as_slice());
        let mut due = Vec::new();
        while let Some(action) = actions.get(self.cursor).filter(|a| a.at <= self.current_time) {
            due.push(Dispatch {
                index: self.cursor,
                at: action.at,
                pos: action.pos,
                speed: action_speed(actions, self.cursor),
            });
            self.cursor += 1;
        }
        Some(due)
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            phase: self.phase,
            current_time: self.current_time,
            video_position: self.video_position,
            action_cursor: self.cursor,
            total_actions: self.script.as_ref().map_or(0, |s| s.len()),
            duration_ms: self.script.as_ref().map_or(0, |s| s.duration_ms()),
            latency_offset_ms: self.latency_offset_ms,
        }
    }

    // First action at or after `time`; the script length when none is.
    fn locate(&self, time: u64) -> usize {
        self.script
            .as_ref()
            .map_or(0, |s| s.actions.partition_point(|a| a.at < time))
    }

    fn open_segment(&mut self, now: Instant) -> u64 {
        let id = self.next_segment_id;
        self.next_segment_id += 1;
        self.segment = Some(Segment {
            id,
            started_at: now,
            start_position: self.current_time,
        });
        id
    }
}

fn clamp_latency(offset_ms: i64) -> u64 {
    offset_ms.clamp(0, MAX_LATENCY_OFFSET_MS as i64) as u64
}

/// Rejects timelines whose timestamps are not strictly increasing.
///
/// Equal timestamps are rejected as well: the speed model divides by the gap
/// between consecutive actions.
pub fn check_timeline(actions: &[Action]) -> Result<(), ScriptError> {
    match actions.windows(2).position(|w| w[1].at <= w[0].at) {
        Some(i) => Err(ScriptError::validation(format!(
            "action {} at {}ms does not come after action {} at {}ms",
            i + 1,
            actions[i + 1].at,
            i,
            actions[i].at
        ))),
        None => Ok(()),
    }
}
