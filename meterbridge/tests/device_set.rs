/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Running devices on tokio and stopping them as a set.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{frame, QueueDecoder, POWER, SERIAL};
use meterbridge::config::Settings;
use meterbridge::device::{
    ByteSource, DecoderGroup, Device, DeviceHandle, DeviceSet, DeviceSetError, DeviceStatus,
    SourceEvents, StatusBoard,
};
use meterbridge::frame::FrameEntry;
use meterbridge::sink::MemorySink;

/// Source whose events the test posts by hand.
#[derive(Clone, Default)]
struct ManualSource {
    events: Arc<Mutex<Option<SourceEvents>>>,
}

impl ManualSource {
    fn events(&self) -> SourceEvents {
        self.events.lock().unwrap().clone().unwrap()
    }
}

impl ByteSource for ManualSource {
    fn start(&mut self, events: SourceEvents) {
        *self.events.lock().unwrap() = Some(events);
    }

    fn stop(&mut self) {
        self.events.lock().unwrap().take();
    }
}

fn spawn(name: &str, board: &StatusBoard, decoder: QueueDecoder) -> (DeviceHandle, ManualSource) {
    let device = Device::new(
        name,
        Arc::new(Settings::default()),
        DecoderGroup::new(vec![Box::new(decoder)]),
        Arc::new(MemorySink::new()),
    )
    .with_status_board(board.clone());
    let source = ManualSource::default();
    let handle = DeviceHandle::spawn(device, Box::new(source.clone()), Duration::from_secs(6)).unwrap();
    (handle, source)
}

#[tokio::test(start_paused = true)]
async fn duplicate_names_are_rejected() {
    let board = StatusBoard::new();
    let mut set = DeviceSet::new(board.clone());

    let (a, _) = spawn("a", &board, QueueDecoder::default());
    let (a2, source_a2) = spawn("a", &board, QueueDecoder::default());
    let a2_events = source_a2.events();
    set.add(a).unwrap();
    assert_eq!(set.add(a2).unwrap_err(), DeviceSetError::DuplicateName("a".into()));
    assert_eq!(set.names().collect::<Vec<_>>(), vec!["a"]);

    // The rejected handle is dropped: its source is stopped and its task aborted.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(source_a2.events.lock().unwrap().is_none());
    assert!(!a2_events.data(vec![0x1b]));

    set.stop_all().await;
    assert!(set.is_empty());
}

#[tokio::test(start_paused = true)]
async fn source_failure_stops_the_set() {
    let board = StatusBoard::new();
    let mut set = DeviceSet::new(board.clone());

    let (a, source_a) = spawn("a", &board, QueueDecoder::default());
    let (b, _source_b) = spawn("b", &board, QueueDecoder::default());
    set.add(a).unwrap();
    set.add(b).unwrap();
    assert!(!set.shutdown_requested());

    source_a.events().failed("serial port closed");
    board.wait_for_shutdown().await;

    assert!(set.shutdown_requested());
    assert_eq!(board.status("a"), Some(DeviceStatus::SourceFailed));

    set.stop_all().await;
    assert_eq!(board.status("b"), Some(DeviceStatus::Shutdown));
}

#[tokio::test(start_paused = true)]
async fn all_devices_timing_out_do_not_stop_the_set() {
    let board = StatusBoard::new();
    let mut set = DeviceSet::new(board.clone());

    let decoder = QueueDecoder::default();
    let (a, source) = spawn("a", &board, decoder.clone());
    set.add(a).unwrap();

    decoder.push(frame(
        0.0,
        vec![(SERIAL, FrameEntry::text("M1")), (POWER, FrameEntry::number(1.0))],
    ));
    source.events().data(vec![0x1b]);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(board.status("a"), Some(DeviceStatus::Ok));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(board.status("a"), Some(DeviceStatus::MsgTimeout));
    assert!(!set.shutdown_requested());

    set.stop_all().await;
    assert!(set.shutdown_requested());
}
