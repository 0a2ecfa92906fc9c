/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::fmt;

/// Lifecycle state of a [`Device`](super::Device).
///
/// ```text
///            first frame ok
/// Starting ──────────────────► Ok ◄──────► CrcError
///    │                          │
///    └──────────┬───────────────┘
///               ▼
///   MsgTimeout | Error | SourceFailed* | Shutdown*        (* terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    Starting,
    Ok,
    CrcError,
    MsgTimeout,
    SourceFailed,
    Error,
    Shutdown,
}

impl DeviceStatus {
    /// No further transitions happen out of a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, DeviceStatus::SourceFailed | DeviceStatus::Shutdown)
    }

    /// Statuses that count towards stopping the whole process once every
    /// device has reached one.
    pub fn is_shutdown_class(self) -> bool {
        matches!(
            self,
            DeviceStatus::Error | DeviceStatus::SourceFailed | DeviceStatus::Shutdown
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceStatus::Starting => "starting",
            DeviceStatus::Ok => "ok",
            DeviceStatus::CrcError => "crc_error",
            DeviceStatus::MsgTimeout => "msg_timeout",
            DeviceStatus::SourceFailed => "source_failed",
            DeviceStatus::Error => "error",
            DeviceStatus::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
