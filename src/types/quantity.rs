use crate::types::price::Price;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// Contract quantity in base units, fixed-point with 8 decimal places.
/// Always non-negative in this crate; direction lives on the order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(i64);

impl Quantity {
    pub const MULTIPLIER: i64 = 100_000_000;

    pub fn from_i64(value: i64) -> Self {
        Quantity(value)
    }

    pub fn to_i64(&self) -> i64 {
        self.0
    }

    pub fn from_f64(value: f64) -> Self {
        Quantity((value * Self::MULTIPLIER as f64).round() as i64)
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / Self::MULTIPLIER as f64
    }

    pub fn zero() -> Self {
        Quantity(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn raw_value(&self) -> i64 {
        self.0
    }

    /// Notional value of this quantity at the given price, in i128 raw units
    /// (price raw * quantity raw). Kept wide for weighted-average math.
    pub fn notional(&self, price: Price) -> i128 {
        self.0 as i128 * price.to_i64() as i128
    }
}

impl Add for Quantity {
    type Output = Quantity;
    fn add(self, other: Quantity) -> Quantity {
        Quantity(self.0 + other.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;
    fn sub(self, other: Quantity) -> Quantity {
        Quantity(self.0 - other.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), |acc, x| acc + x)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}
