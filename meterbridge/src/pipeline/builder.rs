/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Turns configuration into live pipelines.
//!
//! Setup happens once per device, from its first frame:
//!
//! 1. the skip set is the configured `skip` list plus the identity channels
//!    (unless the identity is reported);
//! 2. every explicitly configured channel gets its operations, in order;
//! 3. every other channel of the frame gets an empty pipeline;
//! 4. each pipeline then receives default transformations (Wh → kWh, zero
//!    meter filter) and default filters (on-change + refresh) where the
//!    configured operations do not already cover them.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{
    operations::weekday_from_name, sign_status_channel, DaySpec, DeviceSettings, GeneralSettings,
    OperationSpec, ResetSpec, WindowSpec,
};
use crate::frame::{Frame, FrameEntry};
use crate::operation::{
    Aggregate, DeltaFilter, EnergyMeterSignWorkaround, Extreme, ExtremeSinceReset, Factor,
    HeartbeatAction, OnChangeFilter, Offset, Operation, RangeFilter, RefreshAction, ResetSchedule,
    Round, RoundToMultiple, SkipBelowThreshold, ThrottleFilter, VirtualMeter, WindowAggregate,
};
use crate::schedule::{CalendarError, CalendarFinder, SlidingWindow};
use crate::sink::PublishTarget;

use super::{ChannelPipeline, ChannelRegistry, RegistryError};

/// Factor applied to Wh totals when they are reported in kWh.
pub const WH_TO_KWH: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("invalid reset schedule: {0}")]
    Calendar(#[from] CalendarError),

    #[error("unknown weekday '{0}'")]
    UnknownWeekday(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("topic '{0}' is used by more than one channel")]
    DuplicateTopic(String),
}

// ── Operations ────────────────────────────────────────────────────────────────

/// Builds one operation.  Returns `None` for specs that disable themselves
/// (e.g. `negative_on_energy_meter_status: false`).
///
/// `now` is the wall-clock time used to schedule the first reset of
/// calendar-based operations.
pub fn build_operation(
    spec: &OperationSpec,
    now: NaiveDateTime,
) -> Result<Option<Operation>, BuildError> {
    let op = match spec {
        OperationSpec::OnChangeFilter => Operation::OnChange(OnChangeFilter::new()),
        OperationSpec::DeltaFilter {
            min_abs,
            min_percent,
        } => Operation::Delta(DeltaFilter::new(*min_abs, *min_percent)),
        OperationSpec::RangeFilter { min, max, clamp } => {
            Operation::Range(RangeFilter::new(*min, *max, *clamp))
        }
        OperationSpec::ThrottleFilter(period) => Operation::Throttle(ThrottleFilter::new(*period)),
        OperationSpec::SkipBelowThreshold => Operation::SkipBelowThreshold(SkipBelowThreshold),
        OperationSpec::RefreshAction(period) => Operation::Refresh(RefreshAction::new(*period)),
        OperationSpec::HeartbeatAction(period) => {
            Operation::Heartbeat(HeartbeatAction::new(*period))
        }
        OperationSpec::Factor(factor) => Operation::Factor(Factor { factor: *factor }),
        OperationSpec::Offset(offset) => Operation::Offset(Offset { offset: *offset }),
        OperationSpec::Round(digits) => Operation::Round(Round { digits: *digits }),
        OperationSpec::RoundToMultiple { value, round } => {
            Operation::RoundToMultiple(RoundToMultiple {
                multiple: *value,
                mode: *round,
            })
        }
        OperationSpec::NegativeOnEnergyMeterStatus(spec) => match sign_status_channel(spec) {
            Some(channel) => Operation::EnergyMeterSign(EnergyMeterSignWorkaround::new(channel)),
            None => return Ok(None),
        },
        OperationSpec::Sequence(children) => Operation::Sequence(build_operations(children, now)?),
        OperationSpec::Or(children) => Operation::Or(build_operations(children, now)?),
        OperationSpec::VirtualMeter(reset) => {
            Operation::VirtualMeter(VirtualMeter::new(build_schedule(reset, now)?))
        }
        OperationSpec::MaxSinceReset(reset) => Operation::SinceReset(ExtremeSinceReset::new(
            Extreme::Max,
            build_schedule(reset, now)?,
        )),
        OperationSpec::MinSinceReset(reset) => Operation::SinceReset(ExtremeSinceReset::new(
            Extreme::Min,
            build_schedule(reset, now)?,
        )),
        OperationSpec::MaxOfWindow(window) => build_window(Aggregate::Max, window),
        OperationSpec::MinOfWindow(window) => build_window(Aggregate::Min, window),
        OperationSpec::MeanOfWindow(window) => build_window(Aggregate::Mean, window),
    };
    Ok(Some(op))
}

pub fn build_operations(
    specs: &[OperationSpec],
    now: NaiveDateTime,
) -> Result<Vec<Operation>, BuildError> {
    let mut ops = Vec::with_capacity(specs.len());
    for spec in specs {
        if let Some(op) = build_operation(spec, now)? {
            ops.push(op);
        }
    }
    Ok(ops)
}

fn build_schedule(reset: &ResetSpec, now: NaiveDateTime) -> Result<ResetSchedule, BuildError> {
    let mut finder = CalendarFinder::new();
    for time in &reset.times {
        finder = finder.with_time(*time);
    }
    for day in &reset.days {
        finder = match day {
            DaySpec::DayOfMonth(d) => finder.with_day_of_month(*d)?,
            DaySpec::Weekday(name) => {
                let weekday = weekday_from_name(name)
                    .ok_or_else(|| BuildError::UnknownWeekday(name.clone()))?;
                finder.with_weekday(weekday)?
            }
        };
    }
    Ok(ResetSchedule::new(finder, reset.start_immediately, now))
}

fn build_window(kind: Aggregate, window: &WindowSpec) -> Operation {
    Operation::Window(WindowAggregate::new(
        kind,
        SlidingWindow::new(window.period, window.wait_for_full),
        window.reset_after_emit,
    ))
}

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Prepends the Wh → kWh factor and the zero meter filter for energy totals.
/// `configured` is the number of operations the user configured.
fn add_default_transformations(
    channel: &str,
    ops: &mut Vec<Operation>,
    entry: Option<&FrameEntry>,
    general: &GeneralSettings,
    configured: usize,
) {
    if !entry.is_some_and(FrameEntry::is_energy_total) {
        return;
    }

    let mut prefix = Vec::new();
    if general.wh_in_kwh {
        if ops.iter().any(|op| op.any(&|o| matches!(o, Operation::Factor(_)))) {
            debug!(channel, "found factor - skip creating default factor");
        } else {
            prefix.push(Operation::Factor(Factor { factor: WH_TO_KWH }));
        }
    }

    // Configured operations are taken as they are.
    if configured == 0 && !general.report_blank_energy_meters {
        prefix.push(Operation::SkipBelowThreshold(SkipBelowThreshold));
    }

    ops.splice(0..0, prefix);
}

/// Appends on-change and refresh unless an operation already decides when
/// the value is published.
fn add_default_filters(channel: &str, ops: &mut Vec<Operation>, general: &GeneralSettings) {
    if ops.iter().any(|op| !op.is_transformation()) {
        debug!(channel, "found filter - skip creating default filters");
        return;
    }

    info!(channel, "no filters found, creating default filters");
    ops.push(Operation::OnChange(OnChangeFilter::new()));
    ops.push(Operation::Refresh(RefreshAction::new(general.republish_after)));
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Everything needed to set up one device's registry.
#[derive(Debug, Clone, Copy)]
pub struct SetupContext<'a> {
    /// Device name, used for logging.
    pub device: &'a str,
    /// Identity read from the first frame.
    pub device_id: &'a str,
    pub general: &'a GeneralSettings,
    pub device_settings: Option<&'a DeviceSettings>,
}

impl SetupContext<'_> {
    /// `<base_topic>/<device id>` unless the device overrides it.
    pub fn device_target(&self) -> PublishTarget {
        let general = self.general;
        let base = PublishTarget::new(general.base_topic.as_str(), general.qos, general.retain);
        match self.device_settings {
            Some(cfg) => base.child(self.device_id, cfg.topic.as_deref(), cfg.qos, cfg.retain),
            None => base.child(self.device_id, None, None, None),
        }
    }
}

/// Builds the channel registry of a device from its first frame.
pub fn build_registry(setup: &SetupContext<'_>, frame: &Frame) -> Result<ChannelRegistry, BuildError> {
    let general = setup.general;
    let device_target = setup.device_target();
    let mut registry = ChannelRegistry::new();

    if let Some(cfg) = setup.device_settings {
        for id in &cfg.skip {
            registry.skip(id.as_str());
        }
    }
    if !general.report_device_id {
        for id in &general.device_id_channels {
            registry.skip(id.as_str());
        }
    }

    let mut configured = BTreeSet::new();
    for cfg in setup.device_settings.map(|d| d.channels.as_slice()).unwrap_or_default() {
        let channel = cfg.channel.as_str();
        configured.insert(channel);

        if registry.is_skipped(channel) {
            warn!(
                device = %setup.device,
                "Config for {channel} found but {channel} is also marked to be skipped"
            );
            continue;
        }
        if !frame.contains(channel) {
            warn!(
                device = %setup.device,
                "Config for {channel} found but {channel} was not reported by the frame"
            );
        }

        let mut ops = build_operations(&cfg.operations, frame.wall_time)?;
        let count = ops.len();
        add_default_transformations(channel, &mut ops, frame.get(channel), general, count);
        add_default_filters(channel, &mut ops, general);

        let target = device_target.child(channel, cfg.topic.as_deref(), cfg.qos, cfg.retain);
        registry.add_pipeline(ChannelPipeline::new(channel, target, ops))?;
    }

    for (channel, entry) in frame.entries() {
        if registry.is_skipped(channel) || configured.contains(channel) {
            continue;
        }

        let mut ops = Vec::new();
        add_default_transformations(channel, &mut ops, Some(entry), general, 0);
        add_default_filters(channel, &mut ops, general);

        let target = device_target.child(channel, None, None, None);
        registry.add_pipeline(ChannelPipeline::new(channel, target, ops))?;
    }

    let mut topics = BTreeSet::new();
    for pipeline in registry.pipelines() {
        if !topics.insert(pipeline.target().topic.as_str()) {
            return Err(BuildError::DuplicateTopic(pipeline.target().topic.clone()));
        }
    }

    Ok(registry)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
