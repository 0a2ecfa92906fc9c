/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! A metering device: byte stream in, published channel values out.
//!
//! ```text
//!  ByteSource ──► Device::on_source_data ──► DecoderGroup ──► Frame
//!                                                              │
//!              first frame: identity + ChannelRegistry setup ◄─┤
//!              every frame: ChannelRegistry::process_frame  ◄──┘
//!                                                              │
//!                                                     PublishSink
//! ```
//!
//! A `Device` is plain synchronous state.  [`runtime`] drives it from a
//! single tokio task so all of its mutation happens on one path.

pub mod decoder;
pub mod error;
pub mod runtime;
pub mod set;
pub mod status;

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::Settings;
use crate::frame::{Frame, Value};
use crate::pipeline::{build_registry, ChannelRegistry, SetupContext};
use crate::schedule::WatchdogFeed;
use crate::sink::{PublishSink, PublishTarget};

pub use decoder::{DecoderGroup, FrameDecoder};
pub use error::{ChecksumError, DeviceError, DeviceSetError};
pub use runtime::{ByteSource, DeviceEvent, DeviceHandle, SourceEvents};
pub use set::{DeviceSet, StatusBoard};
pub use status::DeviceStatus;

/// How frames are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Process every frame until stopped.
    Run,
    /// Describe and process the first frame, then shut down.
    Analyze,
}

pub struct Device {
    name: String,
    mode: Mode,
    status: DeviceStatus,
    settings: Arc<Settings>,
    decoder: DecoderGroup,
    sink: Arc<dyn PublishSink>,
    board: Option<StatusBoard>,
    watchdog: Option<WatchdogFeed>,
    device_id: Option<String>,
    status_target: PublishTarget,
    registry: Option<ChannelRegistry>,
}

impl Device {
    pub fn new(
        name: impl Into<String>,
        settings: Arc<Settings>,
        decoder: DecoderGroup,
        sink: Arc<dyn PublishSink>,
    ) -> Self {
        let name = name.into();
        let general = &settings.general;
        let status_target = PublishTarget::new(general.base_topic.as_str(), general.qos, general.retain)
            .child(&name, None, None, None)
            .child("status", None, None, None);

        Self {
            name,
            mode: Mode::Run,
            status: DeviceStatus::Starting,
            settings,
            decoder,
            sink,
            board: None,
            watchdog: None,
            device_id: None,
            status_target,
            registry: None,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Status changes are reported to `board`.  Registration is left to
    /// [`DeviceSet::add`] so a device that never starts is not listed.
    pub fn with_status_board(mut self, board: StatusBoard) -> Self {
        self.board = Some(board);
        self
    }

    /// Feeds `watchdog` whenever source data arrives.
    pub fn set_watchdog(&mut self, watchdog: WatchdogFeed) {
        self.watchdog = Some(watchdog);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    /// Identity read from the first frame.
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn status_target(&self) -> &PublishTarget {
        &self.status_target
    }

    pub fn registry(&self) -> Option<&ChannelRegistry> {
        self.registry.as_ref()
    }

    // ── Source events ─────────────────────────────────────────────────────────

    /// Handles a chunk of bytes from the source and every frame it completes.
    pub fn on_source_data(&mut self, bytes: &[u8]) {
        if let Some(watchdog) = &self.watchdog {
            watchdog.feed();
        }
        if self.status.is_terminal() {
            return;
        }

        self.decoder.add_bytes(bytes);
        loop {
            match self.decoder.try_get_frame() {
                Ok(Some(frame)) => self.on_frame(frame),
                Ok(None) => break,
                Err(DeviceError::Checksum(err)) => {
                    debug!(device = %self.name, "{err}");
                    self.decoder.clear();
                    self.set_status(DeviceStatus::CrcError);
                    break;
                }
                Err(err) => {
                    error!(device = %self.name, "{err}");
                    self.decoder.clear();
                    self.set_status(DeviceStatus::Error);
                    break;
                }
            }
            if self.status.is_terminal() {
                break;
            }
        }
    }

    pub fn on_timeout(&mut self) {
        self.decoder.clear();
        self.set_status(DeviceStatus::MsgTimeout);
    }

    pub fn on_source_failed(&mut self, reason: &str) {
        error!(device = %self.name, "source failed: {reason}");
        self.set_status(DeviceStatus::SourceFailed);
    }

    pub fn shutdown(&mut self) {
        self.set_status(DeviceStatus::Shutdown);
    }

    fn on_frame(&mut self, frame: Frame) {
        match self.mode {
            Mode::Analyze => self.analyze_frame(&frame),
            Mode::Run if self.registry.is_none() => self.process_first_frame(&frame),
            Mode::Run => self.process_frame(&frame),
        }
    }

    // ── Frame handling ────────────────────────────────────────────────────────

    /// Reads the identity, builds the channel registry and processes the
    /// frame.  A failed setup shuts the device down.
    pub fn process_first_frame(&mut self, frame: &Frame) {
        if let Err(err) = self.setup(frame) {
            self.log_error(&err, frame);
            self.set_status(DeviceStatus::Shutdown);
            return;
        }
        self.process_frame(frame);
    }

    pub fn process_frame(&mut self, frame: &Frame) {
        let Some(registry) = self.registry.as_mut() else {
            return self.process_first_frame(frame);
        };

        match registry.process_frame(frame, self.sink.as_ref()) {
            Ok(()) => self.set_status(DeviceStatus::Ok),
            Err(err) => {
                self.log_error(&err.into(), frame);
                self.set_status(DeviceStatus::Error);
            }
        }
    }

    /// Sets up the device, logs what it would do with `frame`, processes it
    /// once and shuts down.
    pub fn analyze_frame(&mut self, frame: &Frame) {
        if self.registry.is_none() {
            if let Err(err) = self.setup(frame) {
                self.log_error(&err, frame);
                self.set_status(DeviceStatus::Shutdown);
                return;
            }
        }

        info!(device = %self.name, "Received frame:");
        for (channel, entry) in frame.entries() {
            let value = entry.value().map(|v| v.to_string()).unwrap_or_default();
            info!(device = %self.name, "  {channel}: {value}");
        }
        if let Some(registry) = &self.registry {
            for line in registry.describe() {
                info!(device = %self.name, "{line}");
            }
        }

        self.process_frame(frame);
        self.set_status(DeviceStatus::Shutdown);
    }

    fn setup(&mut self, frame: &Frame) -> Result<(), DeviceError> {
        let device_id = self.find_identity(frame)?;
        info!(device = %self.name, device_id = %device_id, "device identified");

        let settings = Arc::clone(&self.settings);
        let setup = SetupContext {
            device: &self.name,
            device_id: &device_id,
            general: &settings.general,
            device_settings: settings.device(&device_id),
        };
        if setup.device_settings.is_none() {
            debug!(device = %self.name, device_id = %device_id, "no device config found, using defaults");
        }

        let registry = build_registry(&setup, frame)?;
        self.status_target = setup.device_target().child("status", None, None, None);
        self.registry = Some(registry);
        self.device_id = Some(device_id);
        self.decoder.lock_in();
        Ok(())
    }

    /// Value of the first identity channel present in the frame.
    fn find_identity(&self, frame: &Frame) -> Result<String, DeviceError> {
        let searched = &self.settings.general.device_id_channels;
        searched
            .iter()
            .find_map(|channel| frame.get(channel).and_then(|entry| entry.value()))
            .map(|value| value.to_string().trim().to_string())
            .ok_or_else(|| DeviceError::IdentityNotFound {
                searched: searched.clone(),
            })
    }

    fn log_error(&self, err: &DeviceError, frame: &Frame) {
        if err.is_config_mapping() {
            error!(device = %self.name, "{err}");
        } else {
            error!(device = %self.name, error = ?err, "{err}");
        }
        let channels: Vec<&str> = frame.channel_ids().collect();
        info!(device = %self.name, "Received frame: {}", channels.join(", "));
    }

    // ── Status ────────────────────────────────────────────────────────────────

    pub fn set_status(&mut self, new: DeviceStatus) {
        let old = self.status;
        if old == new {
            return;
        }
        if old.is_terminal() {
            debug!(device = %self.name, status = %old, ignored = %new, "status is final");
            return;
        }
        self.status = new;

        match (old, new) {
            (DeviceStatus::Ok, DeviceStatus::CrcError) | (DeviceStatus::CrcError, DeviceStatus::Ok) => {
                debug!(device = %self.name, status = %new, "status changed");
            }
            (DeviceStatus::CrcError, _) => {
                info!(device = %self.name, status = %new, old = %old, "status changed");
            }
            _ => info!(device = %self.name, status = %new, "status changed"),
        }

        self.sink
            .publish(&self.status_target, &Value::Text(new.to_string()));
        if let Some(board) = &self.board {
            board.report(&self.name, new);
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("status", &self.status)
            .field("device_id", &self.device_id)
            .field("decoder", &self.decoder)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
