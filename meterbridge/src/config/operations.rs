/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Operation specifications as they appear in the configuration file.
//!
//! ```yaml
//! operations:
//!   - negative_on_energy_meter_status: true
//!   - factor: 0.001
//!   - or:
//!       - delta_filter: { min_abs: 5 }
//!       - heartbeat_action: 300
//!   - virtual_meter:
//!       start_immediately: true
//!       times: ["02:00"]
//!       days: [monday, 15]
//! ```

use anyhow::{anyhow, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Deserializer};

use crate::operation::RoundMode;

/// One node of an operation tree.  Turned into a live
/// [`Operation`](crate::operation::Operation) by the pipeline builder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationSpec {
    OnChangeFilter,
    DeltaFilter {
        #[serde(default)]
        min_abs: Option<f64>,
        #[serde(default)]
        min_percent: Option<f64>,
    },
    RangeFilter {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default)]
        clamp: bool,
    },
    /// Seconds.
    ThrottleFilter(f64),
    SkipBelowThreshold,
    /// Seconds.
    RefreshAction(f64),
    /// Seconds.
    HeartbeatAction(f64),
    Factor(f64),
    Offset(f64),
    Round(u8),
    RoundToMultiple {
        value: f64,
        #[serde(default = "default_round_mode")]
        round: RoundMode,
    },
    NegativeOnEnergyMeterStatus(SignWorkaroundSpec),
    Sequence(Vec<OperationSpec>),
    Or(Vec<OperationSpec>),
    VirtualMeter(ResetSpec),
    MaxSinceReset(ResetSpec),
    MinSinceReset(ResetSpec),
    MaxOfWindow(WindowSpec),
    MinOfWindow(WindowSpec),
    MeanOfWindow(WindowSpec),
}

fn default_round_mode() -> RoundMode {
    RoundMode::Nearest
}

/// `true` enables the workaround on the default status channel, a channel
/// id selects another one, `false` disables it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SignWorkaroundSpec {
    Enabled(bool),
    Channel(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetSpec {
    /// Start counting with the first value instead of the first reset.
    #[serde(default)]
    pub start_immediately: bool,
    #[serde(deserialize_with = "deserialize_times")]
    pub times: Vec<NaiveTime>,
    /// Weekdays or days of month on which the times apply; empty means
    /// every day.
    #[serde(default)]
    pub days: Vec<DaySpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DaySpec {
    DayOfMonth(u32),
    Weekday(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSpec {
    /// Seconds.
    pub period: f64,
    #[serde(default)]
    pub wait_for_full: bool,
    #[serde(default)]
    pub reset_after_emit: bool,
}

// ── Parsing helpers ───────────────────────────────────────────────────────────

fn deserialize_times<'de, D>(deserializer: D) -> std::result::Result<Vec<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    raw.iter()
        .map(|s| parse_time(s).map_err(serde::de::Error::custom))
        .collect()
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| anyhow!("invalid time of day '{s}' (expected HH:MM or HH:MM:SS)"))
}

/// ISO weekday number (Monday = 1) for an English or German day name.
pub fn weekday_from_name(name: &str) -> Option<u32> {
    const NAMES: [(&str, &str, &str); 7] = [
        ("monday", "mon", "mo"),
        ("tuesday", "tue", "di"),
        ("wednesday", "wed", "mi"),
        ("thursday", "thu", "do"),
        ("friday", "fri", "fr"),
        ("saturday", "sat", "sa"),
        ("sunday", "sun", "so"),
    ];

    let name = name.trim().to_lowercase();
    NAMES
        .iter()
        .position(|(full, short, german)| name == *full || name == *short || name == *german)
        .map(|i| i as u32 + 1)
}
