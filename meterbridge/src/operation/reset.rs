/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Operations that reset on a calendar schedule.
//!
//! Each operation owns a [`ResetSchedule`] and starts in one of two ways:
//!
//! * **start immediately** – the first real sample establishes the baseline
//!   and counts as a reset;
//! * **start on schedule** – nothing is reported until the first scheduled
//!   reset has passed.
//!
//! A schedule without any time of day never resets; the first sample then
//! establishes the baseline for good.

use chrono::NaiveDateTime;

use crate::frame::Value;
use crate::schedule::CalendarFinder;

use super::{numeric, FrameContext, OperationError};

// ── ResetSchedule ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ResetSchedule {
    finder: CalendarFinder,
    start_immediately: bool,
    next_reset: Option<NaiveDateTime>,
}

impl ResetSchedule {
    /// `now` is the wall-clock time the operation is created at.
    pub fn new(finder: CalendarFinder, start_immediately: bool, now: NaiveDateTime) -> Self {
        let next_reset = if !finder.is_enabled() {
            None
        } else if start_immediately {
            Some(now)
        } else {
            finder.next(now)
        };

        Self {
            finder,
            start_immediately,
            next_reset,
        }
    }

    pub fn next_reset(&self) -> Option<NaiveDateTime> {
        self.next_reset
    }

    /// Whether the operation waits for the first sample to set its baseline.
    fn starts_on_first_value(&self) -> bool {
        self.start_immediately || !self.finder.is_enabled()
    }

    /// Returns `true` and schedules the following reset once `now` has
    /// reached the pending one.
    fn take_due(&mut self, now: NaiveDateTime) -> bool {
        match self.next_reset {
            Some(at) if now >= at => {
                self.next_reset = self.finder.next(now);
                true
            }
            _ => false,
        }
    }

    fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        let Some(mut next) = self.next_reset else {
            out.push(format!("{indent}    No resets"));
            return;
        };

        out.push(format!("{indent}    Next resets:"));
        out.push(format!("{indent}     - {next}"));

        // Two upcoming instants per configured condition.
        let samples = (self.finder.condition_count() * 2).saturating_sub(1).max(2);
        for _ in 0..samples {
            match self.finder.next(next) {
                Some(dt) => {
                    out.push(format!("{indent}     - {dt}"));
                    next = dt;
                }
                None => break,
            }
        }
    }
}

// ── VirtualMeter ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum MeterPhase {
    /// Waiting for the first sample to become the baseline.
    Uninitialized,
    Active {
        last: Option<f64>,
        offset: Option<f64>,
    },
}

/// Reports how much a counter grew since its last scheduled reset.
///
/// On a reset the baseline becomes the sample seen *before* the reset, so the
/// growth between the last pre-reset sample and the first post-reset sample
/// is not lost.
#[derive(Debug, Clone)]
pub struct VirtualMeter {
    schedule: ResetSchedule,
    phase: MeterPhase,
}

impl VirtualMeter {
    pub fn new(schedule: ResetSchedule) -> Self {
        let phase = if schedule.starts_on_first_value() {
            MeterPhase::Uninitialized
        } else {
            MeterPhase::Active {
                last: None,
                offset: None,
            }
        };
        Self { schedule, phase }
    }

    /// Current baseline, if any.
    pub fn offset(&self) -> Option<f64> {
        match self.phase {
            MeterPhase::Active { offset, .. } => offset,
            MeterPhase::Uninitialized => None,
        }
    }

    pub fn apply(
        &mut self,
        value: Option<Value>,
        ctx: &FrameContext<'_>,
    ) -> Result<Option<Value>, OperationError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let v = numeric(&value, "virtual meter")?;

        let (mut last, mut offset) = match self.phase {
            MeterPhase::Uninitialized => (Some(v), Some(v)),
            MeterPhase::Active { last, offset } => (last, offset),
        };

        if self.schedule.take_due(ctx.wall_time()) {
            offset = last;
        }
        last = Some(v);
        self.phase = MeterPhase::Active { last, offset };

        Ok(offset.map(|o| Value::Number(v - o)))
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        out.push(format!("{indent}- Virtual Meter:"));
        match self.offset() {
            Some(offset) => out.push(format!("{indent}    Offset: {offset}")),
            None => out.push(format!("{indent}    Offset: -")),
        }
        self.schedule.describe_into(indent, out);
    }
}

// ── Max / Min since reset ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Max,
    Min,
}

impl Extreme {
    fn exceeds(self, value: f64, current: f64) -> bool {
        match self {
            Extreme::Max => value > current,
            Extreme::Min => value < current,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ExtremePhase {
    Uninitialized,
    Active(Option<f64>),
}

/// Largest (or smallest) sample since the last scheduled reset.  Emits only
/// when the extreme changes; every reset emits the current sample.
#[derive(Debug, Clone)]
pub struct ExtremeSinceReset {
    kind: Extreme,
    schedule: ResetSchedule,
    phase: ExtremePhase,
}

impl ExtremeSinceReset {
    pub fn new(kind: Extreme, schedule: ResetSchedule) -> Self {
        let phase = if schedule.starts_on_first_value() {
            ExtremePhase::Uninitialized
        } else {
            ExtremePhase::Active(None)
        };
        Self {
            kind,
            schedule,
            phase,
        }
    }

    pub fn kind(&self) -> Extreme {
        self.kind
    }

    pub fn current(&self) -> Option<f64> {
        match self.phase {
            ExtremePhase::Active(v) => v,
            ExtremePhase::Uninitialized => None,
        }
    }

    pub fn apply(
        &mut self,
        value: Option<Value>,
        ctx: &FrameContext<'_>,
    ) -> Result<Option<Value>, OperationError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let v = numeric(&value, "value since reset")?;

        let current = match self.phase {
            ExtremePhase::Uninitialized => Some(v),
            ExtremePhase::Active(current) => current,
        };

        if self.schedule.take_due(ctx.wall_time()) {
            self.phase = ExtremePhase::Active(Some(v));
            return Ok(Some(value));
        }

        match current {
            Some(c) if self.kind.exceeds(v, c) => {
                self.phase = ExtremePhase::Active(Some(v));
                Ok(Some(value))
            }
            _ => {
                self.phase = ExtremePhase::Active(current);
                Ok(None)
            }
        }
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        let (title, key) = match self.kind {
            Extreme::Max => ("Max Value", "max"),
            Extreme::Min => ("Min Value", "min"),
        };
        out.push(format!("{indent}- {title}:"));
        match self.current() {
            Some(v) => out.push(format!("{indent}    {key}: {v}")),
            None => out.push(format!("{indent}    {key}: -")),
        }
        self.schedule.describe_into(indent, out);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
