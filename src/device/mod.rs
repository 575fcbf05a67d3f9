// src/device/mod.rs

//! Device command interface
//!
//! The sync engine talks to the actuator only through [`DeviceCommander`].
//! Commands return boxed futures so the engine can hand them to the runtime
//! and keep ticking without waiting for the transport.

pub mod intiface;

use futures::future::{self, BoxFuture, FutureExt};
use crate::error::DeviceError;

pub use intiface::{DeviceMode, IntifaceDevice};

/// Highest value accepted for either command parameter
pub const MAX_COMMAND_VALUE: u8 = 100;

/// A bounded position + speed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionCommand {
    pub position: u8,
    pub speed: u8,
}

impl PositionCommand {
    /// Builds a command, clamping both parameters to 0-100.
    pub fn new(position: u8, speed: u8) -> Self {
        Self {
            position: position.min(MAX_COMMAND_VALUE),
            speed: speed.min(MAX_COMMAND_VALUE),
        }
    }
}

/// The actuator transport consumed by the sync engine.
///
/// Implementations must return quickly from every method; any waiting on the
/// device belongs inside the returned future.
pub trait DeviceCommander: Send + Sync + 'static {
    fn is_connected(&self) -> bool;

    fn send_command(&self, command: PositionCommand) -> BoxFuture<'static, Result<(), DeviceError>>;

    fn stop(&self) -> BoxFuture<'static, Result<(), DeviceError>>;
}

/// Stand-in used when no Intiface server could be reached at startup.
#[derive(Debug, Default, Clone, Copy)]
pub struct Disconnected;

impl DeviceCommander for Disconnected {
    fn is_connected(&self) -> bool {
        false
    }

    fn send_command(&self, _command: PositionCommand) -> BoxFuture<'static, Result<(), DeviceError>> {
        future::ready(Err(DeviceError::NotConnected)).boxed()
    }

    fn stop(&self) -> BoxFuture<'static, Result<(), DeviceError>> {
        future::ready(Ok(())).boxed()
    }
}
