/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Value operations: the building blocks of a channel pipeline.
//!
//! An [`Operation`] takes an optional sample plus the frame it came from and
//! returns an optional sample.  `None` in means "no new reading on this
//! tick"; `None` out means "do not publish".
//!
//! | Module | Operations |
//! |---|---|
//! | [`filter`] | on-change, delta, range, throttle, skip-below-threshold |
//! | [`actions`] | refresh, heartbeat |
//! | [`math`] | factor, offset, round, round-to-multiple |
//! | [`workaround`] | energy meter sign |
//! | [`reset`] | virtual meter, max/min since reset |
//! | [`aggregate`] | max/min/mean of a sliding window |
//!
//! Plus the two combinators, [`Operation::Sequence`] and [`Operation::Or`].
//! Every operation owns its state exclusively; no operation reads another's.

pub mod actions;
pub mod aggregate;
pub mod error;
pub mod filter;
pub mod math;
pub mod reset;
pub mod workaround;

use chrono::NaiveDateTime;

use crate::frame::{Frame, Timestamp, Value};

pub use actions::{HeartbeatAction, RefreshAction};
pub use aggregate::{Aggregate, WindowAggregate};
pub use error::OperationError;
pub use filter::{DeltaFilter, OnChangeFilter, RangeFilter, SkipBelowThreshold, ThrottleFilter};
pub use math::{Factor, Offset, Round, RoundMode, RoundToMultiple};
pub use reset::{Extreme, ExtremeSinceReset, ResetSchedule, VirtualMeter};
pub use workaround::EnergyMeterSignWorkaround;

// ── FrameContext ──────────────────────────────────────────────────────────────

/// Read-only context handed to every operation of a pipeline.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    frame: &'a Frame,
    last_publish: Option<Timestamp>,
}

impl<'a> FrameContext<'a> {
    pub fn new(frame: &'a Frame, last_publish: Option<Timestamp>) -> Self {
        Self {
            frame,
            last_publish,
        }
    }

    pub fn frame(&self) -> &'a Frame {
        self.frame
    }

    /// Monotonic receive time of the frame.
    pub fn timestamp(&self) -> Timestamp {
        self.frame.timestamp
    }

    /// Wall-clock receive time of the frame.
    pub fn wall_time(&self) -> NaiveDateTime {
        self.frame.wall_time
    }

    /// When the owning pipeline last published, if ever.
    pub fn last_publish(&self) -> Option<Timestamp> {
        self.last_publish
    }
}

// ── Operation ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Operation {
    OnChange(OnChangeFilter),
    Delta(DeltaFilter),
    Range(RangeFilter),
    Throttle(ThrottleFilter),
    SkipBelowThreshold(SkipBelowThreshold),
    Refresh(RefreshAction),
    Heartbeat(HeartbeatAction),
    Factor(Factor),
    Offset(Offset),
    Round(Round),
    RoundToMultiple(RoundToMultiple),
    EnergyMeterSign(EnergyMeterSignWorkaround),
    /// Children in order; stops at the first child that returns `None`.
    Sequence(Vec<Operation>),
    /// Every child sees the incoming sample; the first non-`None` result in
    /// declaration order wins.
    Or(Vec<Operation>),
    VirtualMeter(VirtualMeter),
    SinceReset(ExtremeSinceReset),
    Window(WindowAggregate),
}

impl Operation {
    pub fn apply(
        &mut self,
        value: Option<Value>,
        ctx: &FrameContext<'_>,
    ) -> Result<Option<Value>, OperationError> {
        match self {
            Operation::OnChange(op) => Ok(op.apply(value)),
            Operation::Delta(op) => op.apply(value),
            Operation::Range(op) => op.apply(value),
            Operation::Throttle(op) => Ok(op.apply(value, ctx)),
            Operation::SkipBelowThreshold(op) => op.apply(value),
            Operation::Refresh(op) => Ok(op.apply(value, ctx)),
            Operation::Heartbeat(op) => Ok(op.apply(value, ctx)),
            Operation::Factor(op) => op.apply(value),
            Operation::Offset(op) => op.apply(value),
            Operation::Round(op) => op.apply(value),
            Operation::RoundToMultiple(op) => op.apply(value),
            Operation::EnergyMeterSign(op) => op.apply(value, ctx),
            Operation::Sequence(children) => {
                let mut value = value;
                for child in children.iter_mut() {
                    value = child.apply(value, ctx)?;
                    if value.is_none() {
                        return Ok(None);
                    }
                }
                Ok(value)
            }
            Operation::Or(children) => {
                let mut selected = None;
                for child in children.iter_mut() {
                    let result = child.apply(value.clone(), ctx)?;
                    if selected.is_none() {
                        selected = result;
                    }
                }
                Ok(selected)
            }
            Operation::VirtualMeter(op) => op.apply(value, ctx),
            Operation::SinceReset(op) => op.apply(value, ctx),
            Operation::Window(op) => op.apply(value, ctx),
        }
    }

    /// Children of a combinator, empty for every other operation.
    pub fn children(&self) -> &[Operation] {
        match self {
            Operation::Sequence(children) | Operation::Or(children) => children,
            _ => &[],
        }
    }

    /// `true` for operations that only transform or bound a value and never
    /// decide on their own when it is (re)published.
    pub fn is_transformation(&self) -> bool {
        matches!(
            self,
            Operation::Factor(_)
                | Operation::Offset(_)
                | Operation::Round(_)
                | Operation::RoundToMultiple(_)
                | Operation::Range(_)
                | Operation::SkipBelowThreshold(_)
        )
    }

    /// Searches this operation and all nested children.
    pub fn any(&self, pred: &dyn Fn(&Operation) -> bool) -> bool {
        pred(self) || self.children().iter().any(|c| c.any(pred))
    }

    /// Human readable, indented description of the operation tree.
    pub fn describe(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.describe_into("", &mut out);
        out
    }

    pub fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        match self {
            Operation::OnChange(op) => op.describe_into(indent, out),
            Operation::Delta(op) => op.describe_into(indent, out),
            Operation::Range(op) => op.describe_into(indent, out),
            Operation::Throttle(op) => op.describe_into(indent, out),
            Operation::SkipBelowThreshold(op) => op.describe_into(indent, out),
            Operation::Refresh(op) => op.describe_into(indent, out),
            Operation::Heartbeat(op) => op.describe_into(indent, out),
            Operation::Factor(op) => op.describe_into(indent, out),
            Operation::Offset(op) => op.describe_into(indent, out),
            Operation::Round(op) => op.describe_into(indent, out),
            Operation::RoundToMultiple(op) => op.describe_into(indent, out),
            Operation::EnergyMeterSign(op) => op.describe_into(indent, out),
            Operation::Sequence(children) | Operation::Or(children) => {
                let title = if matches!(self, Operation::Or(_)) {
                    "Or"
                } else {
                    "Sequence"
                };
                out.push(format!("{indent}- {title}:"));
                let nested = format!("{indent}  ");
                for child in children {
                    child.describe_into(&nested, out);
                }
            }
            Operation::VirtualMeter(op) => op.describe_into(indent, out),
            Operation::SinceReset(op) => op.describe_into(indent, out),
            Operation::Window(op) => op.describe_into(indent, out),
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

pub(crate) fn numeric(value: &Value, operation: &'static str) -> Result<f64, OperationError> {
    value.as_number().ok_or_else(|| OperationError::NotNumeric {
        operation,
        value: value.to_string(),
    })
}

/// Formats a period in seconds as e.g. `1 hour 30 minutes`.
pub fn format_period(period: f64) -> String {
    let whole = period.trunc() as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let seconds = period - (hours * 3600 + minutes * 60) as f64;

    let mut parts = Vec::new();
    for (count, unit) in [(hours, "hour"), (minutes, "minute")] {
        if count > 0 {
            let plural = if count == 1 { "" } else { "s" };
            parts.push(format!("{count} {unit}{plural}"));
        }
    }
    if seconds > 0.0 || parts.is_empty() {
        if seconds.fract() == 0.0 {
            let s = seconds as u64;
            let plural = if s == 1 { "" } else { "s" };
            parts.push(format!("{s} second{plural}"));
        } else {
            parts.push(format!("{seconds:.1} seconds"));
        }
    }
    parts.join(" ")
}


// ── Tests ─────────────────────────────────────────────────────────────────────
