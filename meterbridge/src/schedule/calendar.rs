/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Calendar matching: "next configured instant strictly after now".

use std::fmt;

use chrono::{Datelike, Days, NaiveDateTime, NaiveTime};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Rejected calendar condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// ISO weekday outside `1..=7` (Monday = 1).
    InvalidWeekday(u32),
    /// Day of month outside `1..=31`.
    InvalidDayOfMonth(u32),
    /// The same weekday or day of month was registered twice.
    Duplicate(u32),
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarError::InvalidWeekday(d) => write!(f, "weekday {d} is not in 1..=7"),
            CalendarError::InvalidDayOfMonth(d) => write!(f, "day of month {d} is not in 1..=31"),
            CalendarError::Duplicate(d) => write!(f, "day {d} is registered twice"),
        }
    }
}

impl std::error::Error for CalendarError {}

// ── CalendarFinder ────────────────────────────────────────────────────────────

/// Immutable set of times-of-day, ISO weekdays and days of month.
///
/// Times are checked in registration order, not sorted: when times are
/// registered out of chronological order the first later time found on a
/// date wins even if an earlier one on the same date would also qualify.
/// Configurations rely on this order, so it is kept as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarFinder {
    times: Vec<NaiveTime>,
    weekdays: Vec<u32>,
    days: Vec<u32>,
}

impl CalendarFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time(mut self, time: NaiveTime) -> Self {
        self.times.push(time);
        self
    }

    /// Adds an ISO weekday (Monday = 1 … Sunday = 7).
    pub fn with_weekday(mut self, weekday: u32) -> Result<Self, CalendarError> {
        if !(1..=7).contains(&weekday) {
            return Err(CalendarError::InvalidWeekday(weekday));
        }
        if self.weekdays.contains(&weekday) {
            return Err(CalendarError::Duplicate(weekday));
        }
        self.weekdays.push(weekday);
        Ok(self)
    }

    pub fn with_day_of_month(mut self, day: u32) -> Result<Self, CalendarError> {
        if !(1..=31).contains(&day) {
            return Err(CalendarError::InvalidDayOfMonth(day));
        }
        if self.days.contains(&day) {
            return Err(CalendarError::Duplicate(day));
        }
        self.days.push(day);
        Ok(self)
    }

    /// `false` when no time of day is configured; such a finder never fires.
    pub fn is_enabled(&self) -> bool {
        !self.times.is_empty()
    }

    /// Number of configured conditions (times, weekdays and days).
    pub fn condition_count(&self) -> usize {
        self.times.len() + self.weekdays.len() + self.days.len()
    }

    /// Returns the first matching instant strictly after `now`, or `None`
    /// when no time of day is configured.
    ///
    /// The date of `now` is always a candidate; every following date is a
    /// candidate only if it matches a configured weekday or day of month (or
    /// no such filter exists).
    pub fn next(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        if self.times.is_empty() {
            return None;
        }

        let mut date = now.date();
        loop {
            for time in &self.times {
                let candidate = date.and_time(*time);
                if candidate > now {
                    return Some(candidate);
                }
            }

            // Advance to the next qualifying date, at most one year ahead.
            let mut advanced = 0;
            loop {
                date = date.checked_add_days(Days::new(1))?;
                advanced += 1;
                if self.date_matches(date.weekday().number_from_monday(), date.day()) {
                    break;
                }
                if advanced > 366 {
                    return None;
                }
            }
        }
    }

    fn date_matches(&self, iso_weekday: u32, day: u32) -> bool {
        (self.weekdays.is_empty() && self.days.is_empty())
            || self.weekdays.contains(&iso_weekday)
            || self.days.contains(&day)
    }

    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }

    pub fn weekdays(&self) -> &[u32] {
        &self.weekdays
    }

    pub fn days_of_month(&self) -> &[u32] {
        &self.days
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
