/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Error types of the device layer.
//!
//! [`DeviceError`] splits into two families that are logged differently:
//!
//! * configuration mapping – the frames do not match the configuration
//!   (identity not found, unprocessed or missing channels).  The user has to
//!   fix the configuration; one log line is enough.
//! * everything else – logged with the full error chain.

use std::time::Duration;

use thiserror::Error;

use crate::operation::OperationError;
use crate::pipeline::{BuildError, RegistryError};

/// A frame decoder found a checksum mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("checksum mismatch: expected {expected:#06x}, calculated {actual:#06x}")]
pub struct ChecksumError {
    pub expected: u16,
    pub actual: u16,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    #[error("none of the identity channels found in frame (searched: {})", .searched.join(", "))]
    IdentityNotFound { searched: Vec<String> },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("pipeline setup failed: {0}")]
    Build(#[from] BuildError),

    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    #[error("decoder failure: {0}")]
    Decoder(String),

    #[error("watchdog timeout {0:?} is below the minimum")]
    InvalidTimeout(Duration),
}

impl DeviceError {
    /// `true` when the error means frames and configuration do not match.
    pub fn is_config_mapping(&self) -> bool {
        match self {
            DeviceError::IdentityNotFound { .. } | DeviceError::Build(_) => true,
            DeviceError::Registry(err) => matches!(
                err,
                RegistryError::UnprocessedChannels(_)
                    | RegistryError::MissingChannels(_)
                    | RegistryError::Operation {
                        source: OperationError::RequiredChannelMissing { .. },
                        ..
                    }
            ),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceSetError {
    #[error("device '{0}' is already registered")]
    DuplicateName(String),
}
