/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Decoded meter frames and the values they carry.
//!
//! A [`Frame`] is produced once per protocol message by the external decoder
//! and is read-only from then on:
//!
//! ```text
//! bytes ──(FrameDecoder)──►  Frame  ──(Device)──►  ChannelRegistry  ──►  PublishSink
//!                             ↑ immutable snapshot, one per message
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;

use chrono::{Local, NaiveDateTime};

/// Monotonic timestamp in seconds.
pub type Timestamp = f64;

/// DLMS unit code for watt-hours (energy totals).
pub const UNIT_WATT_HOUR: u8 = 30;

// ── Value ─────────────────────────────────────────────────────────────────────

/// A single reading: numeric or textual (e.g. a meter serial number).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Returns the numeric payload, or `None` for text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Whole numbers print without a fractional part so that numeric
            // device ids and counters stay readable on the bus.
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

// ── FrameEntry ────────────────────────────────────────────────────────────────

/// Raw entry for one channel as reported by the meter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameEntry {
    /// Unscaled value.
    pub raw: Option<Value>,
    /// DLMS unit code (e.g. [`UNIT_WATT_HOUR`]).
    pub unit: Option<u8>,
    /// Decimal exponent applied to numeric values.
    pub scaler: Option<i8>,
    /// Status bits reported alongside the value.
    pub status: Option<u64>,
}

impl FrameEntry {
    pub fn number(raw: f64) -> Self {
        Self {
            raw: Some(Value::Number(raw)),
            ..Default::default()
        }
    }

    pub fn text(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(Value::Text(raw.into())),
            ..Default::default()
        }
    }

    pub fn with_unit(mut self, unit: u8) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_scaler(mut self, scaler: i8) -> Self {
        self.scaler = Some(scaler);
        self
    }

    pub fn with_status(mut self, status: u64) -> Self {
        self.status = Some(status);
        self
    }

    /// Scaled value: `raw · 10^scaler` for numbers, text unchanged.
    pub fn value(&self) -> Option<Value> {
        match (&self.raw, self.scaler) {
            (Some(Value::Number(n)), Some(scaler)) if scaler > 0 => {
                Some(Value::Number(n * 10f64.powi(i32::from(scaler))))
            }
            (Some(Value::Number(n)), Some(scaler)) if scaler < 0 => {
                Some(Value::Number(n / 10f64.powi(-i32::from(scaler))))
            }
            (raw, _) => raw.clone(),
        }
    }

    /// `true` when the unit marks this entry as an energy total in Wh.
    pub fn is_energy_total(&self) -> bool {
        self.unit == Some(UNIT_WATT_HOUR)
    }
}

// ── Frame ─────────────────────────────────────────────────────────────────────

/// Seconds elapsed on the process-wide monotonic clock.
pub fn monotonic_now() -> Timestamp {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    ORIGIN.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// One decoded, timestamped snapshot of all channels reported together.
///
/// Entries are kept in a `BTreeMap` so iteration (and therefore default
/// pipeline creation) is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Monotonic receive time, used by period-based operations.
    pub timestamp: Timestamp,
    /// Local wall-clock receive time, used by calendar-scheduled resets.
    pub wall_time: NaiveDateTime,
    entries: BTreeMap<String, FrameEntry>,
}

impl Frame {
    /// Creates a frame stamped with the current monotonic and local time.
    pub fn new(entries: impl IntoIterator<Item = (String, FrameEntry)>) -> Self {
        Self::at(monotonic_now(), Local::now().naive_local(), entries)
    }

    /// Creates a frame with explicit timestamps.
    pub fn at(
        timestamp: Timestamp,
        wall_time: NaiveDateTime,
        entries: impl IntoIterator<Item = (String, FrameEntry)>,
    ) -> Self {
        Self {
            timestamp,
            wall_time,
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, channel: &str) -> Option<&FrameEntry> {
        self.entries.get(channel)
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.entries.contains_key(channel)
    }

    /// Channel ids in sorted order.
    pub fn channel_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &FrameEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn wall() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2001, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn scaler_is_applied_to_numbers() {
        let e = FrameEntry::number(12345.0).with_scaler(-1);
        assert_eq!(e.value(), Some(Value::Number(1234.5)));

        let e = FrameEntry::number(7.0).with_scaler(3);
        assert_eq!(e.value(), Some(Value::Number(7000.0)));
    }

    #[test]
    fn scaler_is_ignored_for_text() {
        let e = FrameEntry::text("ISK00").with_scaler(2);
        assert_eq!(e.value(), Some(Value::Text("ISK00".into())));
    }

    #[test]
    fn energy_total_detection_uses_unit_code() {
        assert!(FrameEntry::number(1.0).with_unit(30).is_energy_total());
        assert!(!FrameEntry::number(1.0).with_unit(27).is_energy_total());
        assert!(!FrameEntry::number(1.0).is_energy_total());
    }

    #[test]
    fn whole_numbers_display_without_fraction() {
        assert_eq!(Value::Number(5.0).to_string(), "5");
        assert_eq!(Value::Number(5.25).to_string(), "5.25");
        assert_eq!(Value::Text("abc".into()).to_string(), "abc");
    }

    #[test]
    fn channel_ids_are_sorted() {
        let f = Frame::at(
            0.0,
            wall(),
            [
                ("0100020800ff".to_string(), FrameEntry::number(1.0)),
                ("0100010800ff".to_string(), FrameEntry::number(2.0)),
            ],
        );
        let ids: Vec<_> = f.channel_ids().collect();
        assert_eq!(ids, vec!["0100010800ff", "0100020800ff"]);
        assert_eq!(f.len(), 2);
        assert!(f.contains("0100010800ff"));
        assert!(f.get("ffffffffffff").is_none());
    }

    #[test]
    fn monotonic_clock_does_not_go_backwards() {
        let a = monotonic_now();
        let b = monotonic_now();
        assert!(b >= a);
    }
}
