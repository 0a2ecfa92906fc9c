/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Meterbridge – energy-meter frame processing gateway core
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── frame/       – values, frame entries, decoded frames
//! ├── schedule/    – calendar finder, sliding window, watchdog timer
//! ├── operation/   – value operations and combinators
//! ├── pipeline/    – channel pipelines, registry, builder
//! ├── device/      – device state machine, decoders, device set, runtime
//! ├── sink         – publish targets and the sink contract
//! └── config/      – YAML gateway configuration
//! ```

pub mod config;
pub mod device;
pub mod frame;
pub mod operation;
pub mod pipeline;
pub mod schedule;
pub mod sink;
