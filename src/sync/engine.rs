// src/sync/engine.rs

//! The sync engine
//!
//! [`SyncEngine`] is a cheap, cloneable handle around one [`EngineState`]
//! behind a mutex. Every public operation and every dispatch tick runs under
//! that mutex, which gives the ordering guarantees the host relies on:
//!
//! - a tick never observes a half-applied operation, and vice versa;
//! - once `pause`, `stop` or `seek` returns, the old segment's ticker can no
//!   longer dispatch anything;
//! - once `pause` or `stop` returns, commands still in flight are aborted, and
//!   `stop` only contacts the device after that.
//!
//! The ticker is one tokio task per playing segment. It holds a weak
//! reference to the engine, so dropping the last handle tears playback down.
//! Device commands run on their own tasks in a [`JoinSet`] owned by the engine.
//!
//! All operations that may start a ticker must be called from within a tokio
//! runtime.

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use log::{debug, info, warn};
use tokio::{
    sync::broadcast,
    task::{JoinHandle, JoinSet},
    time::{self, Instant, MissedTickBehavior},
};
use crate::{
    device::{DeviceCommander, PositionCommand},
    error::SyncError,
    funscript::{self, MotionScript},
};
use super::{
    drift::{Drift, DriftCorrector, DEFAULT_DRIFT_THRESHOLD_MS},
    events::SyncEvent,
    state::{Dispatch, EngineState, EngineStatus, Phase, ScriptSummary, DEFAULT_LATENCY_OFFSET_MS},
};

/// Dispatch period, roughly one 60 Hz frame.
pub const TICK_PERIOD: Duration = Duration::from_millis(16);

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Initial latency compensation; clamped to 0-200ms
    pub latency_offset_ms: i64,
    pub drift_threshold_ms: u64,
    pub tick_period: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            latency_offset_ms: DEFAULT_LATENCY_OFFSET_MS as i64,
            drift_threshold_ms: DEFAULT_DRIFT_THRESHOLD_MS,
            tick_period: TICK_PERIOD,
        }
    }
}

#[derive(Clone)]
pub struct SyncEngine {
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
    device: Arc<dyn DeviceCommander>,
    events: broadcast::Sender<SyncEvent>,
    drift: DriftCorrector,
    tick_period: Duration,
}

struct Inner {
    state: EngineState,
    ticker: Option<JoinHandle<()>>,
    commands: JoinSet<()>,
}

impl Inner {
    fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn cancel_commands(&mut self) {
        if !self.commands.is_empty() {
            debug!("Aborting {} in-flight device commands", self.commands.len());
        }
        self.commands.abort_all();
    }
}

impl SyncEngine {
    pub fn new(device: Arc<dyn DeviceCommander>, options: EngineOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: EngineState::new(options.latency_offset_ms),
                    ticker: None,
                    commands: JoinSet::new(),
                }),
                device,
                events,
                drift: DriftCorrector::new(options.drift_threshold_ms),
                tick_period: options.tick_period,
            }),
        }
    }

    /// Subscribes to the event stream. Slow receivers may miss events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    pub fn status(&self) -> EngineStatus {
        self.shared.lock().state.status()
    }

    /// Replaces the current script.
    ///
    /// The timeline must be strictly increasing. A rejected script leaves the
    /// previous one, and the playback state, untouched. An accepted one halts
    /// any playback and leaves the engine stopped with the cursor at 0.
    pub fn load_script(&self, script: MotionScript) -> Result<ScriptSummary, SyncError> {
        let mut inner = self.shared.lock();
        let previous_phase = inner.state.phase();
        let script = Arc::new(script);
        let summary = inner.state.load(Arc::clone(&script))?;
        inner.cancel_ticker();
        inner.cancel_commands();

        if previous_phase != Phase::Stopped {
            info!("Playback halted to load a new funscript");
        }
        info!(
            "Loaded funscript with {} actions ({}ms)",
            summary.action_count, summary.duration_ms
        );
        if script.is_empty() {
            warn!("Funscript has no actions, playback will not move the device");
        }
        self.shared.emit(SyncEvent::ScriptLoaded {
            action_count: summary.action_count,
            duration_ms: summary.duration_ms,
        });
        Ok(summary)
    }

    /// Reads a funscript file and loads it.
    pub async fn load_script_file(&self, path: &Path) -> Result<ScriptSummary, SyncError> {
        let script = funscript::load_file(path).await?;
        self.load_script(script)
    }

    /// Starts playback at `start_time`.
    ///
    /// Fails with `NoScriptLoaded` or `DeviceNotReady` without changing state.
    /// Calling it while playing restarts playback at the new position.
    pub fn play(&self, start_time: u64) -> Result<(), SyncError> {
        let mut inner = self.shared.lock();
        self.start_segment(&mut inner, start_time)
    }

    /// Pauses playback and returns the frozen time.
    ///
    /// Does nothing unless the engine is playing.
    pub fn pause(&self) -> u64 {
        let mut inner = self.shared.lock();
        match inner.state.halt() {
            Some(time) => {
                inner.cancel_ticker();
                inner.cancel_commands();
                info!("Playback paused at {}ms", time);
                self.shared.emit(SyncEvent::PlaybackPaused { time });
                time
            }
            None => inner.state.current_time(),
        }
    }

    /// Continues playback from the frozen time; a no-op while playing.
    pub fn resume(&self) -> Result<(), SyncError> {
        let mut inner = self.shared.lock();
        if inner.state.phase() == Phase::Playing {
            return Ok(());
        }
        let time = inner.state.current_time();
        self.start_segment(&mut inner, time)
    }

    /// Moves playback to `time`, keeping the current phase.
    pub fn seek(&self, time: u64) {
        let mut inner = self.shared.lock();
        self.seek_locked(&mut inner, time);
    }

    /// Stops playback, resets the clocks and the cursor, and stops the device.
    ///
    /// State is reset and in-flight commands are aborted before the device is
    /// contacted; a device error is returned after the reset has taken effect.
    pub async fn stop(&self) -> Result<(), SyncError> {
        let device_stop = {
            let mut inner = self.shared.lock();
            inner.cancel_ticker();
            inner.cancel_commands();
            inner.state.reset();
            self.shared.device.stop()
        };

        let result = device_stop.await;
        info!("Playback stopped");
        self.shared.emit(SyncEvent::PlaybackStopped);

        result.map_err(|err| {
            warn!("Device stop failed: {}", err);
            SyncError::from(err)
        })
    }

    /// Sets the latency compensation, clamped to 0-200ms.
    ///
    /// Takes effect on the next tick. Actions already dispatched are not
    /// revisited and the cursor is not relocated.
    pub fn set_latency_offset(&self, offset_ms: i64) -> u64 {
        let applied = self.shared.lock().state.set_latency_offset(offset_ms);
        info!("Latency offset set to {}ms", applied);
        applied
    }

    /// Feeds the external reference clock (the video player) into the engine.
    ///
    /// Reseeks when the reported position drifted past the threshold from the
    /// last reported one; otherwise only records it.
    pub fn update_reference_position(&self, time: u64) -> Drift {
        let mut inner = self.shared.lock();
        let drift = self.shared.drift.assess(inner.state.video_position(), time);
        match drift {
            Drift::Reseeked { diff_ms } => {
                info!("Reference drifted {}ms, reseeking to {}ms", diff_ms, time);
                self.seek_locked(&mut inner, time);
            }
            Drift::Tracked { .. } => inner.state.set_video_position(time),
        }
        drift
    }

    fn start_segment(&self, inner: &mut Inner, start_time: u64) -> Result<(), SyncError> {
        if !inner.state.has_script() {
            return Err(SyncError::NoScriptLoaded);
        }
        if !self.shared.device.is_connected() {
            return Err(SyncError::DeviceNotReady);
        }

        let segment = inner.state.begin(start_time, Instant::now())?;
        self.restart_ticker(inner, segment);
        info!("Playback started at {}ms", start_time);
        self.shared.emit(SyncEvent::PlaybackStarted { start_time });
        Ok(())
    }

    fn seek_locked(&self, inner: &mut Inner, time: u64) {
        let segment = inner.state.seek(time, Instant::now());
        debug!("Seeked to {}ms", time);
        self.shared.emit(SyncEvent::Seeked { time });

        if let Some(segment) = segment {
            self.restart_ticker(inner, segment);
            self.shared.emit(SyncEvent::PlaybackStarted { start_time: time });
        }
    }

    fn restart_ticker(&self, inner: &mut Inner, segment: u64) {
        inner.cancel_ticker();
        inner.ticker = Some(spawn_ticker(&self.shared, segment));
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SyncEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    /// Runs one tick of `segment`. Returns false once the segment is over.
    fn tick(&self, segment: u64) -> bool {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let Some(due) = inner.state.advance(segment, Instant::now()) else {
            return false;
        };
        // reap commands that already completed
        while inner.commands.try_join_next().is_some() {}
        for dispatch in due {
            self.dispatch(&mut inner.commands, dispatch);
        }
        true
    }

    // Fire and observe: the command runs on its own task and a failure
    // only produces an event.
    fn dispatch(&self, commands: &mut JoinSet<()>, dispatch: Dispatch) {
        let Dispatch { index, at, pos, speed } = dispatch;
        debug!("Dispatching action {} (at {}ms, pos {}, speed {})", index, at, pos, speed);

        let command = self.device.send_command(PositionCommand::new(pos, speed));
        self.emit(SyncEvent::ActionDispatched { at, pos, speed, index });

        let events = self.events.clone();
        commands.spawn(async move {
            if let Err(err) = command.await {
                warn!("Command for action {} at {}ms failed: {}", index, at, err);
                let _ = events.send(SyncEvent::ActionFailed {
                    index,
                    at,
                    error: err.to_string(),
                });
            }
        });
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.inner
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel_ticker();
    }
}

fn spawn_ticker(shared: &Arc<Shared>, segment: u64) -> JoinHandle<()> {
    let weak = Arc::downgrade(shared);
    let period = shared.tick_period;

    tokio::spawn(async move {
        let mut interval = time::interval(period);
        // A slow tick delays the next one instead of queueing a burst.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let Some(shared) = weak.upgrade() else {
                break;
            };
            if !shared.tick(segment) {
                break;
            }
        }
        debug!("Ticker for segment {} finished", segment);
    })
}
