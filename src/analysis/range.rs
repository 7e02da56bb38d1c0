// src/analysis/range.rs
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

const LINEAR_RATIO_DIVISOR: f64 = 15.0;
const SQRT_TIME_DAYS: f64 = 30.0;

/// Ways of turning a volatility percentage into an intraday move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMethod {
    /// Method A: volatility / 15.
    LinearRatio,
    /// Method B: volatility / sqrt(30).
    SqrtTime,
}

impl MoveMethod {
    pub fn divisor(self) -> f64 {
        match self {
            MoveMethod::LinearRatio => LINEAR_RATIO_DIVISOR,
            MoveMethod::SqrtTime => SQRT_TIME_DAYS.sqrt(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MoveMethod::LinearRatio => "Method A (vix/15)",
            MoveMethod::SqrtTime => "Method B (vix/\u{221a}30)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedMove {
    pub method: MoveMethod,
    /// Unrounded move as a percentage of the base price.
    pub percent: f64,
    pub points: i64,
}

impl ExpectedMove {
    pub fn compute(method: MoveMethod, volatility_percent: f64, base_price: f64) -> Self {
        let percent = volatility_percent / method.divisor();
        let points = (percent / 100.0 * base_price).round() as i64;

        Self {
            method,
            percent,
            points,
        }
    }
}

/// Support and resistance one expected move either side of a pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeLevels {
    pub pivot: i64,
    pub resistance: i64,
    pub support: i64,
}

impl RangeLevels {
    pub fn around(base_price: f64, expected_move: &ExpectedMove) -> Self {
        // Rounding the pivot first keeps resistance - support == 2 * points.
        let pivot = base_price.round() as i64;

        Self {
            pivot,
            resistance: pivot + expected_move.points,
            support: pivot - expected_move.points,
        }
    }

    /// Width of the expected daily range in points.
    pub fn width(&self) -> i64 {
        self.resistance - self.support
    }
}

/// Round half away from zero to `dp` decimal places.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}
