/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Time-bounded sample buffer for window aggregates.

use std::collections::VecDeque;

use crate::frame::Timestamp;

/// A timestamped sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub value: f64,
}

/// Samples spanning at most `period` seconds.
///
/// One sample older than `now - period` is retained as the left boundary:
/// its value was still being held when the window started, which matters
/// for duration weighting.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    period: f64,
    wait_for_full: bool,
    samples: VecDeque<Sample>,
    is_full: bool,
}

impl SlidingWindow {
    /// `period` in seconds.  With `wait_for_full` nothing is reported until
    /// the samples cover the whole period.
    pub fn new(period: f64, wait_for_full: bool) -> Self {
        Self {
            period,
            wait_for_full,
            samples: VecDeque::new(),
            is_full: false,
        }
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn wait_for_full(&self) -> bool {
        self.wait_for_full
    }

    pub fn is_full(&self) -> bool {
        self.is_full
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Appends `value` (if any) and slides the window to end at `timestamp`.
    pub fn add(&mut self, value: Option<f64>, timestamp: Timestamp) {
        let start = timestamp - self.period;

        if let Some(value) = value {
            self.samples.push_back(Sample { timestamp, value });
        }

        if !self.is_full {
            if let Some(first) = self.samples.front() {
                if first.timestamp <= start {
                    self.is_full = true;
                }
            }
        }

        // Keep exactly one sample at or before the window start.
        while self.samples.len() > 1 && self.samples[1].timestamp <= start {
            self.samples.pop_front();
        }
    }

    /// Current values, or `None` when empty or still waiting to be full.
    pub fn values(&self) -> Option<Vec<f64>> {
        if !self.is_ready() {
            return None;
        }
        Some(self.samples.iter().map(|s| s.value).collect())
    }

    /// `(value, duration held)` pairs covering
    /// `[max(now - period, oldest sample), now]`.
    pub fn weighted_segments(&self, now: Timestamp) -> Option<Vec<(f64, f64)>> {
        if !self.is_ready() {
            return None;
        }

        let window_start = now - self.period;
        let mut segments = Vec::with_capacity(self.samples.len());
        let mut iter = self.samples.iter().peekable();

        while let Some(sample) = iter.next() {
            let start = sample.timestamp.max(window_start);
            let stop = match iter.peek() {
                Some(next) => next.timestamp,
                None => now,
            };
            segments.push((sample.value, (stop - start).max(0.0)));
        }
        Some(segments)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.is_full = false;
    }

    fn is_ready(&self) -> bool {
        !self.samples.is_empty() && (self.is_full || !self.wait_for_full)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
