// src/device/intiface.rs

//! Intiface (buttplug) implementation of the device command interface

use std::{
    str::FromStr,
    sync::{atomic::Ordering, Arc, PoisonError, RwLock},
    time::Duration,
};
use atomic_float::AtomicF64;
use buttplug::{
    client::{
        device::{LinearCommand, ScalarValueCommand},
        ButtplugClient, ButtplugClientDevice, ButtplugClientEvent,
    },
    core::connector::new_json_ws_client_connector,
};
use futures::{future::{self, BoxFuture}, FutureExt, StreamExt, TryFutureExt};
use log::{error, info, warn};
use super::{DeviceCommander, PositionCommand, MAX_COMMAND_VALUE};
use crate::error::{ConfigError, DeviceError};

const CLIENT_NAME: &str = "Funscript Sync Client";

/// Shortest stroke duration sent to a linear device, in milliseconds.
const MIN_STROKE_MS: u32 = 20;

type DeviceSlot = Arc<RwLock<Option<Arc<ButtplugClientDevice>>>>;

/// How position commands are translated into buttplug messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceMode {
    /// Stroker-style devices: move to the position over a speed-derived duration
    #[default]
    Linear,
    /// Oscillating machines: run at `speed` and ignore the position
    Oscillate,
}

impl FromStr for DeviceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "oscillate" => Ok(Self::Oscillate),
            _ => Err(ConfigError::Invalid {
                key: "DEVICE_MODE",
                value: s.to_string(),
            }),
        }
    }
}

/// A connection to an Intiface server driving the first device it reports.
pub struct IntifaceDevice {
    client: ButtplugClient,
    device: DeviceSlot,
    mode: DeviceMode,
    last_position: AtomicF64,
}

impl IntifaceDevice {
    /// Connects to the Intiface server and scans for devices.
    ///
    /// Devices that show up later are picked up from the client event
    /// stream, so an empty scan is not an error.
    pub async fn connect(url: &str, mode: DeviceMode, scan_duration: Duration) -> Result<Self, DeviceError> {
        let connector = new_json_ws_client_connector(url);
        let client = ButtplugClient::new(CLIENT_NAME);

        if let Err(err) = client.connect(connector).await {
            error!("Failed to connect to the Buttplug server at {}: {}", url, err);
            return Err(err.into());
        }

        let device: DeviceSlot = Arc::new(RwLock::new(None));
        let mut events = client.event_stream();
        let slot = device.clone();

        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    ButtplugClientEvent::DeviceAdded(added) => {
                        info!("Device {} connected", added.name());
                        let mut current = slot.write().unwrap_or_else(PoisonError::into_inner);
                        if current.is_none() {
                            *current = Some(added);
                        }
                    }
                    ButtplugClientEvent::DeviceRemoved(removed) => {
                        warn!("Device {} removed", removed.name());
                        let mut current = slot.write().unwrap_or_else(PoisonError::into_inner);
                        if current.as_ref().is_some_and(|d| d.index() == removed.index()) {
                            *current = None;
                        }
                    }
                    ButtplugClientEvent::ScanningFinished => {
                        info!("Device scanning is finished");
                    }
                    ButtplugClientEvent::ServerDisconnect => {
                        warn!("Intiface server disconnected");
                        slot.write().unwrap_or_else(PoisonError::into_inner).take();
                    }
                    _ => {}
                }
            }
        });

        client.start_scanning().await?;
        tokio::time::sleep(scan_duration).await;
        client.stop_scanning().await?;

        let devices = client.devices();
        if devices.is_empty() {
            warn!("No devices found yet, waiting for one to be added");
        } else {
            for found in &devices {
                info!("Found device: {}", found.name());
            }
            let mut current = device.write().unwrap_or_else(PoisonError::into_inner);
            if current.is_none() {
                *current = devices.first().cloned();
            }
        }

        Ok(Self {
            client,
            device,
            mode,
            last_position: AtomicF64::new(0.0),
        })
    }

    pub async fn disconnect(&self) -> Result<(), DeviceError> {
        if self.client.connected() {
            self.client.disconnect().await?;
        }
        Ok(())
    }

    fn current_device(&self) -> Option<Arc<ButtplugClientDevice>> {
        self.device.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl DeviceCommander for IntifaceDevice {
    fn is_connected(&self) -> bool {
        self.client.connected() && self.current_device().is_some()
    }

    fn send_command(&self, command: PositionCommand) -> BoxFuture<'static, Result<(), DeviceError>> {
        let Some(device) = self.current_device() else {
            return future::ready(Err(DeviceError::NoDevice)).boxed();
        };

        match self.mode {
            DeviceMode::Linear => {
                let target = f64::from(command.position);
                let from = self.last_position.swap(target, Ordering::Relaxed);
                let duration = stroke_duration_ms(from, target, command.speed);
                let position = target / f64::from(MAX_COMMAND_VALUE);
                device
                    .linear(&LinearCommand::Linear(duration, position))
                    .map_err(DeviceError::from)
                    .boxed()
            }
            DeviceMode::Oscillate => {
                let value = f64::from(command.speed) / f64::from(MAX_COMMAND_VALUE);
                device
                    .oscillate(&ScalarValueCommand::ScalarValue(value))
                    .map_err(DeviceError::from)
                    .boxed()
            }
        }
    }

    fn stop(&self) -> BoxFuture<'static, Result<(), DeviceError>> {
        match self.current_device() {
            Some(device) => device.stop().map_err(DeviceError::from).boxed(),
            None => future::ready(Ok(())).boxed(),
        }
    }
}

/// Inverse of the sync engine's speed model: the time a stroke of
/// `|to - from|` takes at `speed`.
fn stroke_duration_ms(from: f64, to: f64, speed: u8) -> u32 {
    let speed = f64::from(speed.max(1));
    let duration = ((to - from).abs() * 100.0 / speed).round() as u32;
    duration.max(MIN_STROKE_MS)
}
