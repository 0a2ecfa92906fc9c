/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Tokio wiring for a [`Device`].
//!
//! Every running device owns one task that consumes [`DeviceEvent`]s from an
//! unbounded channel.  The byte source and the watchdog only ever post
//! events, so decoding, setup and operation state are touched by that task
//! alone.

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::schedule::ReminderTimer;

use super::{Device, DeviceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Data(Vec<u8>),
    SourceFailed(String),
    Timeout,
    Stop,
}

/// Posting side of a device's event channel, handed to its byte source.
#[derive(Debug, Clone)]
pub struct SourceEvents {
    tx: UnboundedSender<DeviceEvent>,
}

impl SourceEvents {
    /// Returns `false` once the device task is gone.
    pub fn data(&self, bytes: impl Into<Vec<u8>>) -> bool {
        self.tx.send(DeviceEvent::Data(bytes.into())).is_ok()
    }

    pub fn failed(&self, reason: impl Into<String>) -> bool {
        self.tx.send(DeviceEvent::SourceFailed(reason.into())).is_ok()
    }
}

/// Delivers raw bytes to a device (serial port, TCP stream, …).
pub trait ByteSource: Send {
    fn start(&mut self, events: SourceEvents);
    fn stop(&mut self);
}

/// A device running on its own task.
pub struct DeviceHandle {
    name: String,
    events: UnboundedSender<DeviceEvent>,
    source: Box<dyn ByteSource>,
    watchdog: ReminderTimer,
    task: Option<JoinHandle<Device>>,
}

impl DeviceHandle {
    /// Starts the device task, the watchdog and the byte source, in that
    /// order.  Must be called from within a tokio runtime.
    pub fn spawn(
        mut device: Device,
        mut source: Box<dyn ByteSource>,
        watchdog_timeout: Duration,
    ) -> Result<Self, DeviceError> {
        let name = device.name().to_string();
        let mut watchdog = ReminderTimer::new(name.as_str(), watchdog_timeout)
            .ok_or(DeviceError::InvalidTimeout(watchdog_timeout))?;

        let (tx, rx) = mpsc::unbounded_channel();
        device.set_watchdog(watchdog.feeder());
        let task = tokio::spawn(run(device, rx));

        let timeout_tx = tx.clone();
        watchdog.start(move || {
            // Ignored once the device task has finished.
            let _ = timeout_tx.send(DeviceEvent::Timeout);
        });

        source.start(SourceEvents { tx: tx.clone() });
        info!(device = %name, "device started");

        Ok(Self {
            name,
            events: tx,
            source,
            watchdog,
            task: Some(task),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Events posted here are handled like source events.
    pub fn events(&self) -> SourceEvents {
        SourceEvents {
            tx: self.events.clone(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops the source, then the watchdog, then the device task, and
    /// returns the device in its final state.  `None` if the task panicked.
    pub async fn stop(mut self) -> Option<Device> {
        self.source.stop();
        self.watchdog.cancel_and_wait().await;
        // The task may already be gone; the join below covers both cases.
        let _ = self.events.send(DeviceEvent::Stop);

        let task = self.task.take()?;
        match task.await {
            Ok(device) => {
                info!(device = %self.name, status = %device.status(), "device stopped");
                Some(device)
            }
            Err(err) => {
                error!(device = %self.name, "device task failed: {err}");
                None
            }
        }
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("name", &self.name)
            .field("watchdog", &self.watchdog)
            .finish_non_exhaustive()
    }
}

impl Drop for DeviceHandle {
    /// A handle dropped without [`DeviceHandle::stop`] still stops its
    /// source and aborts the device task.
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!(device = %self.name, "handle dropped, aborting device task");
            self.source.stop();
            task.abort();
        }
    }
}

async fn run(mut device: Device, mut events: UnboundedReceiver<DeviceEvent>) -> Device {
    while let Some(event) = events.recv().await {
        match event {
            DeviceEvent::Data(bytes) => device.on_source_data(&bytes),
            DeviceEvent::SourceFailed(reason) => device.on_source_failed(&reason),
            DeviceEvent::Timeout => device.on_timeout(),
            DeviceEvent::Stop => {
                debug!(device = %device.name(), "stop requested");
                device.shutdown();
                break;
            }
        }
    }
    device
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::Settings;
    use crate::device::decoder::testing::ScriptedDecoder;
    use crate::device::{DecoderGroup, DeviceStatus, StatusBoard};
    use crate::frame::{Frame, FrameEntry};
    use crate::operation::testing::wall;
    use crate::sink::MemorySink;

    #[derive(Default, Clone)]
    struct ManualSource {
        events: Arc<Mutex<Option<SourceEvents>>>,
        stopped: Arc<Mutex<bool>>,
    }

    impl ByteSource for ManualSource {
        fn start(&mut self, events: SourceEvents) {
            *self.events.lock().unwrap() = Some(events);
        }

        fn stop(&mut self) {
            *self.stopped.lock().unwrap() = true;
        }
    }

    fn frame() -> Frame {
        Frame::at(
            0.0,
            wall(),
            [
                ("0100000009ff".to_string(), FrameEntry::text("m1")),
                ("0100100700ff".to_string(), FrameEntry::number(10.0)),
            ],
        )
    }

    fn spawn(board: &StatusBoard) -> (DeviceHandle, ManualSource) {
        let decoder = DecoderGroup::new(vec![Box::new(ScriptedDecoder::new(
            "x25",
            vec![Ok(frame())],
        ))]);
        let device = Device::new(
            "meter",
            Arc::new(Settings::default()),
            decoder,
            Arc::new(MemorySink::new()),
        )
        .with_status_board(board.clone());

        let source = ManualSource::default();
        let handle =
            DeviceHandle::spawn(device, Box::new(source.clone()), Duration::from_secs(1)).unwrap();
        (handle, source)
    }

    #[tokio::test(start_paused = true)]
    async fn processes_data_and_times_out() {
        let board = StatusBoard::new();
        let (handle, source) = spawn(&board);

        let events = source.events.lock().unwrap().clone().unwrap();
        assert!(events.data(b"bytes".to_vec()));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(board.status("meter"), Some(DeviceStatus::Ok));

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(board.status("meter"), Some(DeviceStatus::MsgTimeout));

        let device = handle.stop().await.unwrap();
        assert!(*source.stopped.lock().unwrap());
        assert_eq!(device.status(), DeviceStatus::Shutdown);
        assert_eq!(device.device_id(), Some("m1"));
    }

    #[tokio::test(start_paused = true)]
    async fn source_failure_requests_shutdown() {
        let board = StatusBoard::new();
        let (handle, _source) = spawn(&board);

        handle.events().failed("unplugged");
        board.wait_for_shutdown().await;
        assert_eq!(board.status("meter"), Some(DeviceStatus::SourceFailed));

        let device = handle.stop().await.unwrap();
        assert_eq!(device.status(), DeviceStatus::SourceFailed);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_aborts_the_device_task() {
        let board = StatusBoard::new();
        let (handle, source) = spawn(&board);
        let events = source.events.lock().unwrap().clone().unwrap();
        assert!(events.data(b"bytes".to_vec()));
        tokio::time::sleep(Duration::from_millis(10)).await;

        drop(handle);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(*source.stopped.lock().unwrap());
        assert!(!events.data(b"more".to_vec()));
    }

    #[tokio::test]
    async fn failed_spawn_leaves_no_board_entry() {
        let board = StatusBoard::new();
        let device = Device::new(
            "meter",
            Arc::new(Settings::default()),
            DecoderGroup::new(vec![]),
            Arc::new(MemorySink::new()),
        )
        .with_status_board(board.clone());
        let result = DeviceHandle::spawn(
            device,
            Box::new(ManualSource::default()),
            Duration::from_millis(10),
        );
        assert!(result.is_err());
        assert_eq!(board.status("meter"), None);

        board.register("other");
        board.report("other", DeviceStatus::Error);
        assert!(board.shutdown_requested());
    }

    #[tokio::test]
    async fn rejects_short_watchdog_timeout() {
        let decoder = DecoderGroup::new(vec![]);
        let device = Device::new(
            "meter",
            Arc::new(Settings::default()),
            decoder,
            Arc::new(MemorySink::new()),
        );
        let err = DeviceHandle::spawn(
            device,
            Box::new(ManualSource::default()),
            Duration::from_millis(10),
        )
        .unwrap_err();
        assert_eq!(err, DeviceError::InvalidTimeout(Duration::from_millis(10)));
    }
}
