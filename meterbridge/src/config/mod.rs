/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Gateway configuration loading and validation.
//!
//! The expected YAML structure is:
//! ```yaml
//! general:
//!   republish_after: 120
//!   device_id_channels: ["0100000009ff", "0100600100ff"]
//!   base_topic: meterbridge
//! devices:
//!   "11223344":
//!     skip: ["0100010801ff"]
//!     channels:
//!       - channel: "0100100700ff"
//!         operations:
//!           - negative_on_energy_meter_status: true
//!           - throttle_filter: 10
//! ```
//!
//! Device keys and every channel id are lower-cased on load, so lookups by a
//! device id read from a frame are case-insensitive.

pub mod operations;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::operation::workaround::DEFAULT_STATUS_CHANNEL;
use crate::schedule::watchdog::MIN_TIMEOUT;

pub use operations::{DaySpec, OperationSpec, ResetSpec, SignWorkaroundSpec, WindowSpec};

// ── General settings ──────────────────────────────────────────────────────────

/// Settings that apply to every device.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralSettings {
    /// Convert Wh totals to kWh.
    #[serde(default = "default_true")]
    pub wh_in_kwh: bool,
    /// Default republish period in seconds.
    #[serde(default = "default_republish_after")]
    pub republish_after: f64,
    /// Also report energy totals that stay at zero.
    #[serde(default)]
    pub report_blank_energy_meters: bool,
    /// Publish the identity channel like any other channel.
    #[serde(default)]
    pub report_device_id: bool,
    /// Channels searched, in order, for the device identity.
    #[serde(default = "default_device_id_channels")]
    pub device_id_channels: Vec<String>,
    /// Checksum algorithms tried on the byte stream.
    #[serde(default = "default_checksums")]
    pub checksums: Vec<String>,
    #[serde(default = "default_base_topic")]
    pub base_topic: String,
    #[serde(default)]
    pub qos: u8,
    #[serde(default)]
    pub retain: bool,
    /// Seconds without data before a device reports a timeout.
    #[serde(default = "default_watchdog_timeout")]
    pub watchdog_timeout: f64,
}

fn default_true() -> bool {
    true
}

fn default_republish_after() -> f64 {
    120.0
}

fn default_device_id_channels() -> Vec<String> {
    vec!["0100000009ff".to_string(), "0100600100ff".to_string()]
}

/// Checksum algorithms a frame decoder can be built for.
pub const KNOWN_CHECKSUMS: &[&str] = &["x25", "kermit"];

fn default_checksums() -> Vec<String> {
    vec!["x25".to_string(), "kermit".to_string()]
}

fn default_base_topic() -> String {
    String::from("meterbridge")
}

fn default_watchdog_timeout() -> f64 {
    6.0
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            wh_in_kwh: true,
            republish_after: default_republish_after(),
            report_blank_energy_meters: false,
            report_device_id: false,
            device_id_channels: default_device_id_channels(),
            checksums: default_checksums(),
            base_topic: default_base_topic(),
            qos: 0,
            retain: false,
            watchdog_timeout: default_watchdog_timeout(),
        }
    }
}

// ── Device settings ───────────────────────────────────────────────────────────

/// Per-device configuration, looked up by the identity read from the first
/// frame.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceSettings {
    pub topic: Option<String>,
    pub qos: Option<u8>,
    pub retain: Option<bool>,
    /// Channels that are never published.
    #[serde(default)]
    pub skip: Vec<String>,
    #[serde(default)]
    pub channels: Vec<ChannelSettings>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSettings {
    pub channel: String,
    pub topic: Option<String>,
    pub qos: Option<u8>,
    pub retain: Option<bool>,
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceSettings>,
}

impl Settings {
    /// Reads, normalizes and validates a configuration file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails validation.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parses, normalizes and validates configuration text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut settings: Settings =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;
        settings.normalize();
        settings.validate()?;

        debug!(devices = settings.devices.len(), "configuration loaded");
        Ok(settings)
    }

    /// Configuration for the device with identity `device_id`, if any.
    pub fn device(&self, device_id: &str) -> Option<&DeviceSettings> {
        self.devices.get(&device_id.trim().to_lowercase())
    }

    fn normalize(&mut self) {
        fn lower(ids: &mut [String]) {
            for id in ids {
                *id = id.trim().to_lowercase();
            }
        }

        lower(&mut self.general.device_id_channels);
        lower(&mut self.general.checksums);

        self.devices = std::mem::take(&mut self.devices)
            .into_iter()
            .map(|(key, mut device)| {
                lower(&mut device.skip);
                for channel in &mut device.channels {
                    channel.channel = channel.channel.trim().to_lowercase();
                }
                (key.trim().to_lowercase(), device)
            })
            .collect();
    }

    /// Checks value ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let general = &self.general;

        if general.device_id_channels.is_empty() {
            bail!("general.device_id_channels: at least one channel is required");
        }
        for (i, id) in general.device_id_channels.iter().enumerate() {
            check_channel_id(id, &format!("general.device_id_channels[{i}]"))?;
        }
        if general.checksums.is_empty() {
            bail!("general.checksums: at least one algorithm is required");
        }
        for (i, name) in general.checksums.iter().enumerate() {
            if !KNOWN_CHECKSUMS.contains(&name.as_str()) {
                bail!(
                    "general.checksums[{i}]: unknown algorithm '{name}' (known: {})",
                    KNOWN_CHECKSUMS.join(", ")
                );
            }
        }
        if general.republish_after <= 0.0 {
            bail!("general.republish_after: must be positive");
        }
        if general.watchdog_timeout < MIN_TIMEOUT.as_secs_f64() {
            bail!(
                "general.watchdog_timeout: must be at least {}s",
                MIN_TIMEOUT.as_secs_f64()
            );
        }
        if general.base_topic.trim().is_empty() {
            bail!("general.base_topic: must not be empty");
        }
        check_qos(Some(general.qos), "general.qos")?;

        for (name, device) in &self.devices {
            let path = format!("devices.{name}");
            check_qos(device.qos, &format!("{path}.qos"))?;
            check_topic(device.topic.as_deref(), &format!("{path}.topic"))?;

            for (i, id) in device.skip.iter().enumerate() {
                check_channel_id(id, &format!("{path}.skip[{i}]"))?;
            }

            let mut seen = Vec::new();
            for (i, channel) in device.channels.iter().enumerate() {
                let path = format!("{path}.channels[{i}]");
                check_channel_id(&channel.channel, &format!("{path}.channel"))?;
                if seen.contains(&channel.channel) {
                    bail!("{path}.channel: {} is configured twice", channel.channel);
                }
                seen.push(channel.channel.clone());

                check_qos(channel.qos, &format!("{path}.qos"))?;
                check_topic(channel.topic.as_deref(), &format!("{path}.topic"))?;
                for (j, op) in channel.operations.iter().enumerate() {
                    validate_operation(op, &format!("{path}.operations[{j}]"))?;
                }
            }
        }
        Ok(())
    }
}

// ── Validation helpers ────────────────────────────────────────────────────────

/// Channel ids are 12 hex digits.
fn check_channel_id(id: &str, path: &str) -> Result<()> {
    if id.len() != 12 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("{path}: '{id}' is not a channel id (12 hex digits expected)");
    }
    Ok(())
}

fn check_qos(qos: Option<u8>, path: &str) -> Result<()> {
    match qos {
        Some(q) if q > 2 => bail!("{path}: {q} is not a valid QoS (0, 1 or 2)"),
        _ => Ok(()),
    }
}

fn check_topic(topic: Option<&str>, path: &str) -> Result<()> {
    match topic {
        Some(t) if t.trim().is_empty() => bail!("{path}: must not be empty"),
        _ => Ok(()),
    }
}

fn check_period(period: f64, path: &str) -> Result<()> {
    if !(period > 0.0) {
        bail!("{path}: period must be positive, got {period}");
    }
    Ok(())
}

fn validate_operation(op: &OperationSpec, path: &str) -> Result<()> {
    match op {
        OperationSpec::DeltaFilter {
            min_abs,
            min_percent,
        } => {
            if min_abs.is_none() && min_percent.is_none() {
                bail!("{path}: delta_filter needs min_abs or min_percent");
            }
            if min_abs.is_some_and(|v| v < 0.0) || min_percent.is_some_and(|v| v < 0.0) {
                bail!("{path}: delta_filter thresholds must not be negative");
            }
        }
        OperationSpec::RangeFilter { min, max, .. } => match (min, max) {
            (None, None) => bail!("{path}: range_filter needs min or max"),
            (Some(lo), Some(hi)) if lo > hi => {
                bail!("{path}: range_filter min {lo} is greater than max {hi}")
            }
            _ => {}
        },
        OperationSpec::ThrottleFilter(period)
        | OperationSpec::RefreshAction(period)
        | OperationSpec::HeartbeatAction(period) => check_period(*period, path)?,
        OperationSpec::Round(digits) => {
            if *digits > 6 {
                bail!("{path}: round digits must be in 0..=6, got {digits}");
            }
        }
        OperationSpec::RoundToMultiple { value, .. } => {
            if !(*value > 0.0) {
                bail!("{path}: round_to_multiple value must be positive");
            }
        }
        OperationSpec::NegativeOnEnergyMeterStatus(SignWorkaroundSpec::Channel(id)) => {
            check_channel_id(&id.trim().to_lowercase(), path)?;
        }
        OperationSpec::Sequence(children) | OperationSpec::Or(children) => {
            if children.is_empty() {
                bail!("{path}: needs at least one operation");
            }
            for (i, child) in children.iter().enumerate() {
                validate_operation(child, &format!("{path}[{i}]"))?;
            }
        }
        OperationSpec::VirtualMeter(reset)
        | OperationSpec::MaxSinceReset(reset)
        | OperationSpec::MinSinceReset(reset) => validate_reset(reset, path)?,
        OperationSpec::MaxOfWindow(window)
        | OperationSpec::MinOfWindow(window)
        | OperationSpec::MeanOfWindow(window) => {
            check_period(window.period, path)?;
            if window.reset_after_emit && !window.wait_for_full {
                bail!("{path}: reset_after_emit requires wait_for_full");
            }
        }
        OperationSpec::OnChangeFilter
        | OperationSpec::SkipBelowThreshold
        | OperationSpec::Factor(_)
        | OperationSpec::Offset(_)
        | OperationSpec::NegativeOnEnergyMeterStatus(SignWorkaroundSpec::Enabled(_)) => {}
    }
    Ok(())
}

fn validate_reset(reset: &ResetSpec, path: &str) -> Result<()> {
    if reset.times.is_empty() {
        bail!("{path}: at least one reset time is required");
    }

    let mut weekdays = Vec::new();
    let mut days = Vec::new();
    for day in &reset.days {
        match day {
            DaySpec::DayOfMonth(d) => {
                if !(1..=31).contains(d) {
                    bail!("{path}: day of month {d} is not in 1..=31");
                }
                if days.contains(d) {
                    bail!("{path}: day of month {d} is listed twice");
                }
                days.push(*d);
            }
            DaySpec::Weekday(name) => {
                let Some(d) = operations::weekday_from_name(name) else {
                    bail!("{path}: unknown weekday '{name}'");
                };
                if weekdays.contains(&d) {
                    bail!("{path}: weekday '{name}' is listed twice");
                }
                weekdays.push(d);
            }
        }
    }
    Ok(())
}

/// Status channel used by a sign workaround spec, `None` when disabled.
pub fn sign_status_channel(spec: &SignWorkaroundSpec) -> Option<String> {
    match spec {
        SignWorkaroundSpec::Enabled(true) => Some(DEFAULT_STATUS_CHANNEL.to_string()),
        SignWorkaroundSpec::Enabled(false) => None,
        SignWorkaroundSpec::Channel(id) => Some(id.trim().to_lowercase()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
