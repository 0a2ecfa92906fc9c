/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Actions: operations that re-emit a remembered value when the pipeline
//! ticks without a new one.
//!
//! Both actions are evaluated on frame arrival.  A channel's tick is "a frame
//! was received", so a refresh can be late by up to one frame interval.

use crate::frame::{Timestamp, Value};

use super::{format_period, FrameContext};

// ── RefreshAction ─────────────────────────────────────────────────────────────

/// Passes real samples through and republishes the last one once `period`
/// has elapsed without a new emission.
#[derive(Debug, Clone)]
pub struct RefreshAction {
    period: f64,
    last_time: Timestamp,
    last_value: Option<Value>,
}

impl RefreshAction {
    pub fn new(period: f64) -> Self {
        Self {
            period,
            last_time: f64::NEG_INFINITY,
            last_value: None,
        }
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn apply(&mut self, value: Option<Value>, ctx: &FrameContext<'_>) -> Option<Value> {
        let now = ctx.timestamp();

        if let Some(value) = value {
            self.last_value = Some(value.clone());
            self.last_time = now;
            return Some(value);
        }

        let remembered = self.last_value.as_ref()?;
        if now - self.last_time < self.period {
            return None;
        }
        self.last_time = now;
        Some(remembered.clone())
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        out.push(format!("{indent}- Refresh Action: {}", format_period(self.period)));
    }
}

// ── HeartbeatAction ───────────────────────────────────────────────────────────

/// Emits the most recent sample at most once per `period`, whether or not a
/// new sample arrived in between.
#[derive(Debug, Clone)]
pub struct HeartbeatAction {
    period: f64,
    last_time: Timestamp,
    last_value: Option<Value>,
}

impl HeartbeatAction {
    pub fn new(period: f64) -> Self {
        Self {
            period,
            last_time: f64::NEG_INFINITY,
            last_value: None,
        }
    }

    pub fn apply(&mut self, value: Option<Value>, ctx: &FrameContext<'_>) -> Option<Value> {
        if value.is_some() {
            self.last_value = value;
        }

        let remembered = self.last_value.as_ref()?;
        let now = ctx.timestamp();
        if now - self.last_time < self.period {
            return None;
        }
        self.last_time = now;
        Some(remembered.clone())
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        out.push(format!("{indent}- Heartbeat Action: {}", format_period(self.period)));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::testing::{frame_at, ContextExt};

    fn n(v: f64) -> Option<Value> {
        Some(Value::Number(v))
    }

    #[test]
    fn refresh_passes_samples_and_repeats_after_period() {
        let mut a = RefreshAction::new(30.0);

        assert_eq!(a.apply(None, &frame_at(0.0).ctx()), None);
        assert_eq!(a.apply(n(1.0), &frame_at(1.0).ctx()), n(1.0));
        assert_eq!(a.apply(None, &frame_at(30.9).ctx()), None);
        assert_eq!(a.apply(None, &frame_at(31.0).ctx()), n(1.0));
        assert_eq!(a.apply(None, &frame_at(32.0).ctx()), None);
        assert_eq!(a.apply(n(2.0), &frame_at(33.0).ctx()), n(2.0));
        assert_eq!(a.apply(None, &frame_at(62.0).ctx()), None);
        assert_eq!(a.apply(None, &frame_at(63.0).ctx()), n(2.0));
    }

    #[test]
    fn refresh_never_emits_without_a_value() {
        let mut a = RefreshAction::new(1.0);
        for t in 0..10 {
            assert_eq!(a.apply(None, &frame_at(t as f64 * 10.0).ctx()), None);
        }
    }

    #[test]
    fn heartbeat_emits_on_cadence() {
        let mut a = HeartbeatAction::new(30.0);

        assert_eq!(a.apply(None, &frame_at(0.0).ctx()), None);
        assert_eq!(a.apply(n(1.0), &frame_at(1.0).ctx()), n(1.0));
        assert_eq!(a.apply(n(2.0), &frame_at(2.0).ctx()), None);
        assert_eq!(a.apply(None, &frame_at(30.0).ctx()), None);
        assert_eq!(a.apply(None, &frame_at(31.0).ctx()), n(2.0));
        assert_eq!(a.apply(n(3.0), &frame_at(40.0).ctx()), None);
        assert_eq!(a.apply(n(4.0), &frame_at(61.0).ctx()), n(4.0));
    }
}
