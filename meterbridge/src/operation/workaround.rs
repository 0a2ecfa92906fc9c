/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Workarounds for meters that report signed quantities as unsigned.

use crate::frame::Value;

use super::{numeric, FrameContext, OperationError};

/// Channel carrying the energy direction in its status bits.
pub const DEFAULT_STATUS_CHANNEL: &str = "0100010800ff";

/// Status bit set while energy flows towards the grid.
pub const NEGATIVE_ENERGY_BIT: u64 = 0x20;

/// Some meters report current power unsigned and signal the direction only
/// in the status word of the energy total.  Negates the sample when that
/// direction bit is set.
#[derive(Debug, Clone)]
pub struct EnergyMeterSignWorkaround {
    status_channel: String,
}

impl Default for EnergyMeterSignWorkaround {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_CHANNEL)
    }
}

impl EnergyMeterSignWorkaround {
    pub fn new(status_channel: impl Into<String>) -> Self {
        Self {
            status_channel: status_channel.into(),
        }
    }

    pub fn status_channel(&self) -> &str {
        &self.status_channel
    }

    pub fn apply(
        &self,
        value: Option<Value>,
        ctx: &FrameContext<'_>,
    ) -> Result<Option<Value>, OperationError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let v = numeric(&value, "energy meter sign workaround")?;

        let entry = ctx.frame().get(&self.status_channel).ok_or_else(|| {
            OperationError::RequiredChannelMissing {
                channel: self.status_channel.clone(),
            }
        })?;
        let status = entry.status.ok_or_else(|| OperationError::InvalidStatus {
            channel: self.status_channel.clone(),
        })?;

        if status & NEGATIVE_ENERGY_BIT != 0 {
            return Ok(Some(Value::Number(-v)));
        }
        Ok(Some(value))
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        out.push(format!(
            "{indent}- Negative On Status Of Energy Meter {}",
            self.status_channel
        ));
    }
}
