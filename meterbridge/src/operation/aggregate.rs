/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Aggregates over a sliding time window.

use crate::frame::Value;
use crate::schedule::SlidingWindow;

use super::{format_period, numeric, FrameContext, OperationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Max,
    Min,
    /// Mean weighted by how long each value was held.
    Mean,
}

/// Feeds every tick into a [`SlidingWindow`] and reports the aggregate.
///
/// With `reset_after_emit` the window starts over after each result, which
/// turns a sliding window into consecutive, non-overlapping intervals.
#[derive(Debug, Clone)]
pub struct WindowAggregate {
    kind: Aggregate,
    window: SlidingWindow,
    reset_after_emit: bool,
}

impl WindowAggregate {
    pub fn new(kind: Aggregate, window: SlidingWindow, reset_after_emit: bool) -> Self {
        Self {
            kind,
            window,
            reset_after_emit,
        }
    }

    pub fn kind(&self) -> Aggregate {
        self.kind
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn apply(
        &mut self,
        value: Option<Value>,
        ctx: &FrameContext<'_>,
    ) -> Result<Option<Value>, OperationError> {
        let sample = match &value {
            Some(v) => Some(numeric(v, "window aggregate")?),
            None => None,
        };
        let now = ctx.timestamp();
        self.window.add(sample, now);

        let result = match self.kind {
            Aggregate::Max => self
                .window
                .values()
                .and_then(|vs| vs.into_iter().reduce(f64::max)),
            Aggregate::Min => self
                .window
                .values()
                .and_then(|vs| vs.into_iter().reduce(f64::min)),
            Aggregate::Mean => self.window.weighted_segments(now).and_then(|segments| {
                let (sum, total) = segments
                    .iter()
                    .fold((0.0, 0.0), |(sum, total), (v, d)| (sum + v * d, total + d));
                (total > 0.0).then(|| sum / total)
            }),
        };

        if result.is_some() && self.reset_after_emit {
            self.window.clear();
        }
        Ok(result.map(Value::Number))
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        let title = match self.kind {
            Aggregate::Max => "Max Of Interval",
            Aggregate::Min => "Min Of Interval",
            Aggregate::Mean => "Mean Of Interval",
        };
        out.push(format!("{indent}- {title}:"));
        out.push(format!("{indent}    Interval: {}", format_period(self.window.period())));
        out.push(format!("{indent}    Wait for data: {}", self.window.wait_for_full()));
        out.push(format!("{indent}    Reset after value: {}", self.reset_after_emit));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
