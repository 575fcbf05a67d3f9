// src/sync/mod.rs

//! Funscript synchronization
//!
//! Owns playback time for a loaded script, walks its actions as the virtual
//! clock advances and turns each due action into a device command.
//!
//! - `state`: the playback state machine and virtual clock
//! - `speed`: per-action speed model
//! - `drift`: drift detection against the video player's clock
//! - `events`: notifications published to hosts
//! - `engine`: the shared, ticking engine handle

pub mod drift;
pub mod engine;
pub mod events;
pub mod speed;
pub mod state;

pub use drift::{Drift, DriftCorrector};
pub use engine::{EngineOptions, SyncEngine, TICK_PERIOD};
pub use events::SyncEvent;
pub use state::{EngineStatus, Phase, ScriptSummary};
