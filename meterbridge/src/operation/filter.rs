/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Filters: operations that pass a sample through unchanged or drop it.

use crate::frame::{Timestamp, Value};

use super::{format_period, numeric, FrameContext, OperationError};

/// Samples below this value are treated as an idle (zeroed) counter.
pub const SKIP_THRESHOLD: f64 = 0.1;

// ── OnChangeFilter ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct OnChangeFilter {
    last: Option<Value>,
}

impl OnChangeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value that passed the filter.
    pub fn last(&self) -> Option<&Value> {
        self.last.as_ref()
    }

    pub fn apply(&mut self, value: Option<Value>) -> Option<Value> {
        let value = value?;
        if self.last.as_ref() == Some(&value) {
            return None;
        }
        self.last = Some(value.clone());
        Some(value)
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        out.push(format!("{indent}- On Change Filter"));
    }
}

// ── DeltaFilter ───────────────────────────────────────────────────────────────

/// Passes a sample only if it differs enough from the last accepted one.
/// Every configured threshold must be met.
#[derive(Debug, Clone)]
pub struct DeltaFilter {
    min_abs: Option<f64>,
    min_percent: Option<f64>,
    last: Option<f64>,
}

impl DeltaFilter {
    pub fn new(min_abs: Option<f64>, min_percent: Option<f64>) -> Self {
        Self {
            min_abs,
            min_percent,
            last: None,
        }
    }

    pub fn last(&self) -> Option<f64> {
        self.last
    }

    pub fn apply(&mut self, value: Option<Value>) -> Result<Option<Value>, OperationError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let v = numeric(&value, "delta filter")?;

        if let Some(last) = self.last {
            let diff = (v - last).abs();

            if let Some(min_abs) = self.min_abs {
                if diff < min_abs {
                    return Ok(None);
                }
            }

            // A change away from zero is an infinite relative change.
            if let Some(min_percent) = self.min_percent {
                if last != 0.0 && diff / last.abs() * 100.0 < min_percent {
                    return Ok(None);
                }
            }
        }

        self.last = Some(v);
        Ok(Some(value))
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        out.push(format!("{indent}- Delta Filter:"));
        if let Some(min_abs) = self.min_abs {
            out.push(format!("{indent}    Min  : {min_abs}"));
        }
        if let Some(min_percent) = self.min_percent {
            out.push(format!("{indent}    Min %: {min_percent}"));
        }
    }
}

// ── RangeFilter ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RangeFilter {
    min: Option<f64>,
    max: Option<f64>,
    clamp: bool,
}

impl RangeFilter {
    /// With `clamp` out-of-range samples are limited to the bound instead of
    /// being dropped.
    pub fn new(min: Option<f64>, max: Option<f64>, clamp: bool) -> Self {
        Self { min, max, clamp }
    }

    pub fn apply(&self, value: Option<Value>) -> Result<Option<Value>, OperationError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let v = numeric(&value, "range filter")?;

        if let Some(min) = self.min {
            if v < min {
                return Ok(self.clamp.then_some(Value::Number(min)));
            }
        }
        if let Some(max) = self.max {
            if v > max {
                return Ok(self.clamp.then_some(Value::Number(max)));
            }
        }
        Ok(Some(value))
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        out.push(format!("{indent}- Range Filter:"));
        if let Some(min) = self.min {
            out.push(format!("{indent}    min: {min}"));
        }
        if let Some(max) = self.max {
            out.push(format!("{indent}    max: {max}"));
        }
        out.push(format!("{indent}    limit to min/max: {}", self.clamp));
    }
}

// ── ThrottleFilter ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ThrottleFilter {
    period: f64,
    last_time: Timestamp,
}

impl ThrottleFilter {
    pub fn new(period: f64) -> Self {
        Self {
            period,
            last_time: f64::NEG_INFINITY,
        }
    }

    pub fn apply(&mut self, value: Option<Value>, ctx: &FrameContext<'_>) -> Option<Value> {
        let value = value?;
        let now = ctx.timestamp();
        if now - self.last_time < self.period {
            return None;
        }
        self.last_time = now;
        Some(value)
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        out.push(format!("{indent}- Throttle Filter: {}", format_period(self.period)));
    }
}

// ── SkipBelowThreshold ────────────────────────────────────────────────────────

/// Drops samples below [`SKIP_THRESHOLD`], used for meters that report a
/// zero total for an unused register.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipBelowThreshold;

impl SkipBelowThreshold {
    pub fn apply(&self, value: Option<Value>) -> Result<Option<Value>, OperationError> {
        let Some(value) = value else {
            return Ok(None);
        };
        if numeric(&value, "zero meter filter")? < SKIP_THRESHOLD {
            return Ok(None);
        }
        Ok(Some(value))
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        out.push(format!("{indent}- Zero Meter Filter"));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
