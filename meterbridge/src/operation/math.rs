/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure arithmetic on numeric samples.

use serde::Deserialize;

use crate::frame::Value;

use super::{numeric, OperationError};

fn map_number(
    value: Option<Value>,
    operation: &'static str,
    f: impl FnOnce(f64) -> f64,
) -> Result<Option<Value>, OperationError> {
    match value {
        None => Ok(None),
        Some(value) => Ok(Some(Value::Number(f(numeric(&value, operation)?)))),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Factor {
    pub factor: f64,
}

impl Factor {
    pub fn apply(&self, value: Option<Value>) -> Result<Option<Value>, OperationError> {
        map_number(value, "factor", |v| v * self.factor)
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        out.push(format!("{indent}- Factor: {}", self.factor));
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Offset {
    pub offset: f64,
}

impl Offset {
    pub fn apply(&self, value: Option<Value>) -> Result<Option<Value>, OperationError> {
        map_number(value, "offset", |v| v + self.offset)
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        out.push(format!("{indent}- Offset: {}", self.offset));
    }
}

/// Rounds to `digits` decimal places; `0` rounds to an integer.  Ties round
/// away from zero.
#[derive(Debug, Clone, Copy)]
pub struct Round {
    pub digits: u8,
}

impl Round {
    pub fn apply(&self, value: Option<Value>) -> Result<Option<Value>, OperationError> {
        let digits = self.digits;
        map_number(value, "round", |v| {
            if digits == 0 {
                v.round()
            } else {
                let scale = 10f64.powi(i32::from(digits));
                (v * scale).round() / scale
            }
        })
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        match self.digits {
            0 => out.push(format!("{indent}- Round: integer")),
            d => out.push(format!("{indent}- Round: {d}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundMode {
    Up,
    Down,
    Nearest,
}

impl std::fmt::Display for RoundMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RoundMode::Up => "up",
            RoundMode::Down => "down",
            RoundMode::Nearest => "nearest",
        })
    }
}

/// Rounds to a multiple of `multiple` (e.g. 5 → 0, 5, 10, …).
#[derive(Debug, Clone, Copy)]
pub struct RoundToMultiple {
    pub multiple: f64,
    pub mode: RoundMode,
}

impl RoundToMultiple {
    pub fn apply(&self, value: Option<Value>) -> Result<Option<Value>, OperationError> {
        let m = self.multiple;
        map_number(value, "round to multiple", |v| match self.mode {
            RoundMode::Up => (v / m).ceil() * m,
            RoundMode::Down => (v / m).floor() * m,
            RoundMode::Nearest => {
                let div = (v / m).floor();
                let rest = v - div * m;
                if rest >= 0.5 * m {
                    (div + 1.0) * m
                } else {
                    div * m
                }
            }
        })
    }

    pub(super) fn describe_into(&self, indent: &str, out: &mut Vec<String>) {
        out.push(format!("{indent}- Round To Multiple:"));
        out.push(format!("{indent}      value: {}", self.multiple));
        out.push(format!("{indent}      round: {}", self.mode));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: f64) -> Option<Value> {
        Some(Value::Number(v))
    }

    #[test]
    fn factor_and_offset() {
        assert_eq!(Factor { factor: 0.001 }.apply(n(5000.0)).unwrap(), n(5.0));
        assert_eq!(Factor { factor: -1.0 }.apply(None).unwrap(), None);
        assert_eq!(Offset { offset: 2.5 }.apply(n(1.0)).unwrap(), n(3.5));
        assert_eq!(Offset { offset: 2.5 }.apply(None).unwrap(), None);
    }

    #[test]
    fn arithmetic_rejects_text() {
        let err = Factor { factor: 2.0 }.apply(Some("abc".into())).unwrap_err();
        assert_eq!(
            err,
            OperationError::NotNumeric {
                operation: "factor",
                value: "abc".into()
            }
        );
    }

    #[test]
    fn round_digits() {
        assert_eq!(Round { digits: 0 }.apply(n(1.4)).unwrap(), n(1.0));
        assert_eq!(Round { digits: 0 }.apply(n(1.5)).unwrap(), n(2.0));
        assert_eq!(Round { digits: 0 }.apply(n(-1.5)).unwrap(), n(-2.0));
        assert_eq!(Round { digits: 1 }.apply(n(1.26)).unwrap(), n(1.3));
        assert_eq!(Round { digits: 2 }.apply(n(3.14159)).unwrap(), n(3.14));
        assert_eq!(Round { digits: 2 }.apply(None).unwrap(), None);
    }

    #[test]
    fn round_to_multiple_modes() {
        let up = RoundToMultiple { multiple: 5.0, mode: RoundMode::Up };
        let down = RoundToMultiple { multiple: 5.0, mode: RoundMode::Down };
        let nearest = RoundToMultiple { multiple: 5.0, mode: RoundMode::Nearest };

        assert_eq!(up.apply(n(6.0)).unwrap(), n(10.0));
        assert_eq!(up.apply(n(5.0)).unwrap(), n(5.0));
        assert_eq!(down.apply(n(9.9)).unwrap(), n(5.0));
        assert_eq!(down.apply(n(-1.0)).unwrap(), n(-5.0));
        assert_eq!(nearest.apply(n(7.4)).unwrap(), n(5.0));
        assert_eq!(nearest.apply(n(7.5)).unwrap(), n(10.0));
        assert_eq!(nearest.apply(n(-2.0)).unwrap(), n(0.0));
    }
}
