use serde::{Deserialize, Serialize};
use std::fmt;

const RATIO_MULTIPLIER: i64 = 100_000_000;  // 10^8

/// Dimensionless ratio, fixed-point with 8 decimal places. Used for leverage
/// as reported by the exchange (e.g. 10x cross, 3.5x isolated).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ratio {
    value: i64,
}

impl Ratio {
    pub fn from_f64(value: f64) -> Self {
        Ratio {
            value: (value * RATIO_MULTIPLIER as f64).round() as i64,
        }
    }

    pub fn from_raw(value: i64) -> Self {
        Ratio { value }
    }

    pub fn raw_value(&self) -> i64 {
        self.value
    }

    pub fn to_f64(&self) -> f64 {
        self.value as f64 / RATIO_MULTIPLIER as f64
    }

    pub fn zero() -> Self {
        Ratio { value: 0 }
    }

    pub fn one() -> Self {
        Ratio { value: RATIO_MULTIPLIER }
    }
}

impl From<f64> for Ratio {
    fn from(value: f64) -> Self {
        Ratio::from_f64(value)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}
