#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use funscript_sync::{
    device::{DeviceCommander, PositionCommand},
    error::DeviceError,
    funscript::{Action, MotionScript},
    sync::{EngineOptions, SyncEngine, SyncEvent},
};
use futures::future::{self, BoxFuture, FutureExt};
use tokio::sync::broadcast;

/// Records every command it is handed, and separately every command that
/// actually reached it once the returned future ran to completion.
#[derive(Default)]
pub struct MockDevice {
    connected: AtomicBool,
    failing: AtomicBool,
    hanging: AtomicBool,
    delay: Mutex<Option<Duration>>,
    commands: Mutex<Vec<PositionCommand>>,
    delivered: Arc<Mutex<Vec<PositionCommand>>>,
    stops: AtomicUsize,
}

impl MockDevice {
    pub fn connected() -> Arc<Self> {
        let device = Self::default();
        device.connected.store(true, Ordering::SeqCst);
        Arc::new(device)
    }

    pub fn disconnected() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_commands(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Command futures never complete.
    pub fn hang_commands(&self, hanging: bool) {
        self.hanging.store(hanging, Ordering::SeqCst);
    }

    /// Command futures take `delay` to reach the device.
    pub fn delay_commands(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn delivered(&self) -> Vec<(u8, u8)> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|c| (c.position, c.speed))
            .collect()
    }

    pub fn commands(&self) -> Vec<(u8, u8)> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(|c| (c.position, c.speed))
            .collect()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl DeviceCommander for MockDevice {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn send_command(&self, command: PositionCommand) -> BoxFuture<'static, Result<(), DeviceError>> {
        self.commands.lock().unwrap().push(command);
        let failing = self.failing.load(Ordering::SeqCst);
        let hanging = self.hanging.load(Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        let delivered = Arc::clone(&self.delivered);

        async move {
            if hanging {
                future::pending::<()>().await;
            }
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if failing {
                return Err(DeviceError::NotConnected);
            }
            delivered.lock().unwrap().push(command);
            Ok(())
        }
        .boxed()
    }

    fn stop(&self) -> BoxFuture<'static, Result<(), DeviceError>> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        future::ready(Ok(())).boxed()
    }
}

pub fn script(points: &[(u64, u8)]) -> MotionScript {
    MotionScript {
        version: "1.0".to_string(),
        inverted: false,
        actions: points.iter().map(|&(at, pos)| Action { at, pos }).collect(),
    }
}

/// The three-action script used throughout the engine tests.
pub fn three_actions() -> MotionScript {
    script(&[(0, 0), (100, 50), (300, 100)])
}

/// Engine without latency compensation so dispatch times are exact.
pub fn engine_with(device: Arc<MockDevice>) -> SyncEngine {
    SyncEngine::new(
        device,
        EngineOptions {
            latency_offset_ms: 0,
            ..EngineOptions::default()
        },
    )
}

pub fn drain(rx: &mut broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
