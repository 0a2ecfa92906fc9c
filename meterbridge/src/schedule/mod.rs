/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduling primitives used by operations and devices.
//!
//! | Type | Purpose | Clock |
//! |---|---|---|
//! | [`CalendarFinder`] | next matching calendar instant | wall clock (`NaiveDateTime`) |
//! | [`SlidingWindow`] | time-bounded sample buffer | monotonic seconds |
//! | [`ReminderTimer`] | dead-man's switch | tokio timer |
//!
//! The first two are pure and synchronous.  The reminder timer is the only
//! background task; every other time-dependent behaviour is evaluated when a
//! frame arrives.

pub mod calendar;
pub mod watchdog;
pub mod window;

pub use calendar::{CalendarError, CalendarFinder};
pub use watchdog::{ReminderTimer, WatchdogFeed};
pub use window::{Sample, SlidingWindow};
