/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Aggregate status of all devices and the shutdown decision.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{info, warn};

use super::error::DeviceSetError;
use super::runtime::DeviceHandle;
use super::status::DeviceStatus;

// ── StatusBoard ───────────────────────────────────────────────────────────────

#[derive(Debug)]
struct BoardInner {
    statuses: Mutex<BTreeMap<String, DeviceStatus>>,
    triggered: AtomicBool,
    shutdown: watch::Sender<bool>,
}

/// Shared view of every device's status.
///
/// Shutdown is requested once, when any device reaches a terminal status or
/// every registered device is in a shutdown-class status.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    inner: Arc<BoardInner>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(BoardInner {
                statuses: Mutex::new(BTreeMap::new()),
                triggered: AtomicBool::new(false),
                shutdown,
            }),
        }
    }

    fn statuses(&self) -> MutexGuard<'_, BTreeMap<String, DeviceStatus>> {
        self.inner
            .statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a device in [`DeviceStatus::Starting`].
    pub fn register(&self, name: &str) {
        self.statuses()
            .entry(name.to_string())
            .or_insert(DeviceStatus::Starting);
    }

    pub fn status(&self, name: &str) -> Option<DeviceStatus> {
        self.statuses().get(name).copied()
    }

    pub fn report(&self, name: &str, status: DeviceStatus) {
        let trigger = {
            let mut statuses = self.statuses();
            statuses.insert(name.to_string(), status);
            status.is_terminal() || statuses.values().all(|s| s.is_shutdown_class())
        };
        if trigger {
            self.request_shutdown(name, status);
        }
    }

    fn request_shutdown(&self, name: &str, status: DeviceStatus) {
        if self.inner.triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(device = %name, %status, "requesting shutdown");
        self.inner.shutdown.send_replace(true);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been requested.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.inner.shutdown.subscribe();
        // The sender lives in `self`, so this only fails if it was dropped.
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

// ── DeviceSet ─────────────────────────────────────────────────────────────────

/// Owns the running devices.
#[derive(Debug, Default)]
pub struct DeviceSet {
    board: StatusBoard,
    devices: Vec<DeviceHandle>,
}

impl DeviceSet {
    pub fn new(board: StatusBoard) -> Self {
        Self {
            board,
            devices: Vec::new(),
        }
    }

    pub fn board(&self) -> &StatusBoard {
        &self.board
    }

    pub fn add(&mut self, device: DeviceHandle) -> Result<(), DeviceSetError> {
        if self.devices.iter().any(|d| d.name() == device.name()) {
            return Err(DeviceSetError::DuplicateName(device.name().to_string()));
        }
        self.board.register(device.name());
        self.devices.push(device);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(DeviceHandle::name)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn shutdown_requested(&self) -> bool {
        self.board.shutdown_requested()
    }

    /// Stops every device in registration order.
    pub async fn stop_all(&mut self) {
        for device in self.devices.drain(..) {
            let name = device.name().to_string();
            if device.stop().await.is_none() {
                warn!(device = %name, "device task did not finish cleanly");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_status_triggers_shutdown() {
        let board = StatusBoard::new();
        board.register("a");
        board.register("b");

        board.report("a", DeviceStatus::Ok);
        assert!(!board.shutdown_requested());

        board.report("b", DeviceStatus::SourceFailed);
        assert!(board.shutdown_requested());
    }

    #[test]
    fn all_devices_in_error_trigger_shutdown() {
        let board = StatusBoard::new();
        board.register("a");
        board.register("b");

        board.report("a", DeviceStatus::Error);
        assert!(!board.shutdown_requested());
        board.report("b", DeviceStatus::MsgTimeout);
        assert!(!board.shutdown_requested());
        board.report("b", DeviceStatus::Error);
        assert!(board.shutdown_requested());
    }

    #[test]
    fn register_does_not_overwrite() {
        let board = StatusBoard::new();
        board.register("a");
        board.report("a", DeviceStatus::Ok);
        board.register("a");
        assert_eq!(board.status("a"), Some(DeviceStatus::Ok));
        assert_eq!(board.status("b"), None);
    }

    #[tokio::test]
    async fn concurrent_reports_trigger_once() {
        let board = StatusBoard::new();
        for name in ["a", "b", "c", "d"] {
            board.register(name);
        }

        let waiter = {
            let board = board.clone();
            tokio::spawn(async move { board.wait_for_shutdown().await })
        };

        let tasks: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|name| {
                let board = board.clone();
                tokio::spawn(async move { board.report(name, DeviceStatus::Shutdown) })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        waiter.await.unwrap();
        assert!(board.shutdown_requested());
    }
}
