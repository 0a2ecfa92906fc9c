/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use thiserror::Error;

/// Failure raised while applying an operation to a sample.
///
/// An error aborts the owning channel pipeline for the current frame only;
/// sibling channels keep processing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    /// A numeric operation received a textual value.
    #[error("{operation} requires a numeric value, got '{value}'")]
    NotNumeric {
        operation: &'static str,
        value: String,
    },

    /// A channel the operation depends on was not part of the frame.
    #[error("channel {channel} is required but was not reported by the frame")]
    RequiredChannelMissing { channel: String },

    /// The status channel was present but carried no status bits.
    #[error("status of channel {channel} is missing or not a valid integer")]
    InvalidStatus { channel: String },
}
