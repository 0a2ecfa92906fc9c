/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};

use meterbridge::config::Settings;
use meterbridge::device::{ChecksumError, DecoderGroup, Device, FrameDecoder};
use meterbridge::frame::{Frame, FrameEntry, Timestamp};
use meterbridge::sink::MemorySink;

pub const SERIAL: &str = "0100000009ff";
pub const SERVER_ID: &str = "0100600100ff";
pub const ENERGY: &str = "0100010800ff";
pub const POWER: &str = "0100100700ff";

type Queue = Arc<Mutex<VecDeque<Result<Frame, ChecksumError>>>>;

/// Decoder that hands out queued frames instead of parsing bytes.
#[derive(Clone, Default)]
pub struct QueueDecoder {
    queue: Queue,
}

impl QueueDecoder {
    /// Queues a frame for the next `try_get_frame`.
    pub fn push(&self, frame: Frame) {
        self.queue.lock().unwrap().push_back(Ok(frame));
    }
}

impl FrameDecoder for QueueDecoder {
    fn name(&self) -> &str {
        "queue"
    }

    fn add_bytes(&mut self, _bytes: &[u8]) {}

    fn try_get_frame(&mut self) -> Result<Option<Frame>, ChecksumError> {
        self.queue.lock().unwrap().pop_front().transpose()
    }

    fn clear(&mut self) {
        self.queue.lock().unwrap().clear();
    }
}

/// A device wired to a [`QueueDecoder`] and a [`MemorySink`].
pub struct Harness {
    pub device: Device,
    pub sink: Arc<MemorySink>,
    queue: Queue,
}

impl Harness {
    pub fn new(settings: Settings) -> Self {
        let decoder = QueueDecoder::default();
        let queue = decoder.queue.clone();
        let sink = Arc::new(MemorySink::new());
        let device = Device::new(
            "meter",
            Arc::new(settings),
            DecoderGroup::new(vec![Box::new(decoder)]),
            sink.clone(),
        );
        Self {
            device,
            sink,
            queue,
        }
    }

    pub fn from_yaml(yaml: &str) -> Self {
        Self::new(Settings::from_yaml_str(yaml).unwrap())
    }

    /// Delivers `frame` as if its bytes had just arrived.
    pub fn feed(&mut self, frame: Frame) {
        self.queue.lock().unwrap().push_back(Ok(frame));
        self.device.on_source_data(b"\x1b\x1b\x1b\x1b");
    }

    pub fn feed_corrupt(&mut self) {
        self.queue.lock().unwrap().push_back(Err(ChecksumError {
            expected: 0x1234,
            actual: 0x4321,
        }));
        self.device.on_source_data(b"\x1b\x1b\x1b\x1b");
    }

    pub fn published(&self, topic: &str) -> Vec<String> {
        self.sink
            .values_for(topic)
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

/// 2001-01-01 00:00 (a Monday) plus `seconds`.
pub fn wall(seconds: Timestamp) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2001, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::milliseconds((seconds * 1000.0) as i64)
}

pub fn frame(ts: Timestamp, entries: Vec<(&str, FrameEntry)>) -> Frame {
    Frame::at(
        ts,
        wall(ts),
        entries.into_iter().map(|(id, e)| (id.to_string(), e)),
    )
}
