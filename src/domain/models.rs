// src/domain/models.rs
use crate::domain::errors::{GatewayResult, StrategyError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source label for values typed in by hand.
pub const USER_INPUT_SOURCE: &str = "user-input";

/// Largest difference accepted between a requested figure and its echo.
const ECHO_TOLERANCE: f64 = 0.01;

/// One observation of the two market figures the strategy works from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub volatility_percent: f64,
    pub index_price: f64,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl MarketSnapshot {
    pub fn new(volatility_percent: f64, index_price: f64, source: &str) -> Self {
        Self {
            volatility_percent,
            index_price,
            timestamp: Utc::now(),
            source: source.to_string(),
        }
    }
}

/// Validated input of a single strategy calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyInput {
    pub volatility_percent: f64,
    pub index_price: f64,
    /// Price the levels are built around; the index price when absent.
    pub anchor_price: Option<f64>,
    pub as_of: DateTime<Utc>,
    pub source: String,
}

impl StrategyInput {
    pub fn new(volatility_percent: f64, index_price: f64) -> GatewayResult<Self> {
        ensure_positive("VIX", volatility_percent)?;
        ensure_positive("Nifty", index_price)?;

        Ok(Self {
            volatility_percent,
            index_price,
            anchor_price: None,
            as_of: Utc::now(),
            source: USER_INPUT_SOURCE.to_string(),
        })
    }

    /// Parse the two text fields of the input form.
    pub fn parse(volatility_text: &str, index_text: &str) -> GatewayResult<Self> {
        let volatility_percent = parse_number("VIX", volatility_text)?;
        let index_price = parse_number("Nifty", index_text)?;
        Self::new(volatility_percent, index_price)
    }

    pub fn from_snapshot(snapshot: &MarketSnapshot) -> GatewayResult<Self> {
        let mut input = Self::new(snapshot.volatility_percent, snapshot.index_price)?;
        input.as_of = snapshot.timestamp;
        input.source = snapshot.source.clone();
        Ok(input)
    }

    pub fn with_anchor(mut self, anchor_price: f64) -> GatewayResult<Self> {
        ensure_positive("anchor", anchor_price)?;
        self.anchor_price = Some(anchor_price);
        Ok(self)
    }

    /// Price the support and resistance levels are built around.
    pub fn level_base(&self) -> f64 {
        self.anchor_price.unwrap_or(self.index_price)
    }
}

fn parse_number(field: &str, text: &str) -> GatewayResult<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StrategyError::InvalidInput(format!("{} is required", field)));
    }

    trimmed.parse::<f64>().map_err(|_| {
        StrategyError::InvalidInput(format!("{} must be a number, got '{}'", field, trimmed))
    })
}

fn ensure_positive(field: &str, value: f64) -> GatewayResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(StrategyError::InvalidInput(format!(
            "{} must be a positive number, got {}",
            field, value
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Long,
    Short,
    NoTrade,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TradeSide::Long => write!(f, "LONG"),
            TradeSide::Short => write!(f, "SHORT"),
            TradeSide::NoTrade => write!(f, "NO TRADE"),
        }
    }
}

/// Ordered from strongest to weakest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeConfidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for TradeConfidence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TradeConfidence::High => write!(f, "HIGH"),
            TradeConfidence::Medium => write!(f, "MEDIUM"),
            TradeConfidence::Low => write!(f, "LOW"),
        }
    }
}

/// Price levels of an actionable trade.
#[derive(Debug, Clone, PartialEq)]
pub struct TradePlan {
    pub entry_price: i64,
    pub stop_loss: i64,
    pub target_1: i64,
    pub target_2: i64,
    pub risk_points: i64,
    pub risk_percent: f64,
}

impl TradePlan {
    /// Check the directional ordering of the levels for `side`.
    pub fn validate(&self, side: TradeSide) -> Result<(), String> {
        let ordered = match side {
            TradeSide::Long => {
                self.stop_loss < self.entry_price
                    && self.entry_price < self.target_1
                    && self.target_1 < self.target_2
            }
            TradeSide::Short => {
                self.stop_loss > self.entry_price
                    && self.entry_price > self.target_1
                    && self.target_1 > self.target_2
            }
            TradeSide::NoTrade => return Err("NO_TRADE cannot carry a trade plan".to_string()),
        };

        if !ordered {
            return Err(format!(
                "{} levels out of order: stop {} entry {} targets {}/{}",
                side, self.stop_loss, self.entry_price, self.target_1, self.target_2
            ));
        }
        if self.risk_points < 0 {
            return Err(format!("negative risk points {}", self.risk_points));
        }
        if !self.risk_percent.is_finite() || self.risk_percent < 0.0 {
            return Err(format!("invalid risk percent {}", self.risk_percent));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TradeSignal {
    Long(TradePlan),
    Short(TradePlan),
    NoTrade,
}

impl TradeSignal {
    pub fn side(&self) -> TradeSide {
        match self {
            TradeSignal::Long(_) => TradeSide::Long,
            TradeSignal::Short(_) => TradeSide::Short,
            TradeSignal::NoTrade => TradeSide::NoTrade,
        }
    }

    pub fn plan(&self) -> Option<&TradePlan> {
        match self {
            TradeSignal::Long(plan) | TradeSignal::Short(plan) => Some(plan),
            TradeSignal::NoTrade => None,
        }
    }
}

/// Trade suggestion derived from where the index sits in its expected range.
///
/// On the wire this is the flat record with nullable price fields; decoding
/// rejects records whose fields disagree with their side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecommendationRecord", into = "RecommendationRecord")]
pub struct TradeRecommendation {
    pub signal: TradeSignal,
    pub confidence: TradeConfidence,
    pub reasoning: String,
}

impl TradeRecommendation {
    pub fn side(&self) -> TradeSide {
        self.signal.side()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.reasoning.trim().is_empty() {
            return Err("reasoning must not be empty".to_string());
        }
        match &self.signal {
            TradeSignal::Long(plan) => plan.validate(TradeSide::Long),
            TradeSignal::Short(plan) => plan.validate(TradeSide::Short),
            TradeSignal::NoTrade => Ok(()),
        }
    }
}

/// Flat wire form of a [`TradeRecommendation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRecord {
    side: TradeSide,
    entry_price: Option<i64>,
    stop_loss: Option<i64>,
    target_1: Option<i64>,
    target_2: Option<i64>,
    risk_points: Option<i64>,
    risk_percent_of_nifty: Option<f64>,
    trade_confidence: TradeConfidence,
    reasoning: String,
}

impl TryFrom<RecommendationRecord> for TradeRecommendation {
    type Error = String;

    fn try_from(record: RecommendationRecord) -> Result<Self, Self::Error> {
        let signal = match record.side {
            TradeSide::NoTrade => {
                let carried = [
                    ("entry_price", record.entry_price.is_some()),
                    ("stop_loss", record.stop_loss.is_some()),
                    ("target_1", record.target_1.is_some()),
                    ("target_2", record.target_2.is_some()),
                    ("risk_points", record.risk_points.is_some()),
                    ("risk_percent_of_nifty", record.risk_percent_of_nifty.is_some()),
                ];
                if let Some((field, _)) = carried.iter().find(|(_, present)| *present) {
                    return Err(format!("NO_TRADE recommendation carries `{}`", field));
                }
                TradeSignal::NoTrade
            }
            side => {
                let missing = |field: &str| format!("{} recommendation is missing `{}`", side, field);
                let plan = TradePlan {
                    entry_price: record.entry_price.ok_or_else(|| missing("entry_price"))?,
                    stop_loss: record.stop_loss.ok_or_else(|| missing("stop_loss"))?,
                    target_1: record.target_1.ok_or_else(|| missing("target_1"))?,
                    target_2: record.target_2.ok_or_else(|| missing("target_2"))?,
                    risk_points: record.risk_points.ok_or_else(|| missing("risk_points"))?,
                    risk_percent: record
                        .risk_percent_of_nifty
                        .ok_or_else(|| missing("risk_percent_of_nifty"))?,
                };
                if side == TradeSide::Long {
                    TradeSignal::Long(plan)
                } else {
                    TradeSignal::Short(plan)
                }
            }
        };

        let recommendation = TradeRecommendation {
            signal,
            confidence: record.trade_confidence,
            reasoning: record.reasoning,
        };
        recommendation.validate()?;
        Ok(recommendation)
    }
}

impl From<TradeRecommendation> for RecommendationRecord {
    fn from(recommendation: TradeRecommendation) -> Self {
        let side = recommendation.side();
        let plan = recommendation.signal.plan();

        RecommendationRecord {
            side,
            entry_price: plan.map(|p| p.entry_price),
            stop_loss: plan.map(|p| p.stop_loss),
            target_1: plan.map(|p| p.target_1),
            target_2: plan.map(|p| p.target_2),
            risk_points: plan.map(|p| p.risk_points),
            risk_percent_of_nifty: plan.map(|p| p.risk_percent),
            trade_confidence: recommendation.confidence,
            reasoning: recommendation.reasoning,
        }
    }
}

/// Full answer of one strategy calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    #[serde(rename = "vix_percent")]
    pub volatility_percent: f64,
    #[serde(rename = "vix_timestamp")]
    pub volatility_timestamp: DateTime<Utc>,
    #[serde(rename = "vix_source")]
    pub volatility_source: String,
    #[serde(rename = "nifty_price")]
    pub index_price: f64,
    #[serde(rename = "nifty_timestamp")]
    pub index_timestamp: DateTime<Utc>,
    #[serde(rename = "nifty_source")]
    pub index_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_price: Option<f64>,
    pub candle_data_source: String,

    pub expected_move_percent: f64,
    pub expected_move_percent_sqrt: f64,
    pub expected_move_points: i64,
    pub expected_move_points_sqrt: i64,
    pub resistance: i64,
    pub support: i64,
    pub resistance_sqrt: i64,
    pub support_sqrt: i64,

    pub trade_recommendation: TradeRecommendation,

    pub staleness_warning: bool,
    pub check_timestamp: DateTime<Utc>,
    pub notes: String,
}

impl StrategyResult {
    /// Check the arithmetic relationships every result must satisfy.
    pub fn validate(&self) -> GatewayResult<()> {
        self.check_levels_around(self.anchor_price.unwrap_or(self.index_price))
    }

    /// Check a result against the input it was requested for: the echoed
    /// figures must match and the levels must sit around the input's base.
    pub fn validate_for(&self, input: &StrategyInput) -> GatewayResult<()> {
        let base = input.level_base();
        let mut echoed = vec![
            ("vix_percent", self.volatility_percent, input.volatility_percent),
            ("nifty_price", self.index_price, input.index_price),
        ];
        if let Some(anchor) = self.anchor_price {
            echoed.push(("anchor_price", anchor, base));
        }

        for (field, value, expected) in echoed {
            if (value - expected).abs() > ECHO_TOLERANCE {
                return Err(StrategyError::InvalidResponse(format!(
                    "`{}` is {} but {} was requested",
                    field, value, expected
                )));
            }
        }

        self.check_levels_around(base)
    }

    fn check_levels_around(&self, base: f64) -> GatewayResult<()> {
        for (field, value) in [
            ("vix_percent", self.volatility_percent),
            ("nifty_price", self.index_price),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(StrategyError::InvalidResponse(format!(
                    "`{}` must be positive, got {}",
                    field, value
                )));
            }
        }

        check_levels("Method A", self.expected_move_points, self.resistance, self.support, base)?;
        check_levels(
            "Method B",
            self.expected_move_points_sqrt,
            self.resistance_sqrt,
            self.support_sqrt,
            base,
        )?;

        self.trade_recommendation
            .validate()
            .map_err(StrategyError::InvalidResponse)
    }
}

fn check_levels(method: &str, points: i64, resistance: i64, support: i64, base: f64) -> GatewayResult<()> {
    if points < 0 {
        return Err(StrategyError::InvalidResponse(format!(
            "{} move points negative: {}",
            method, points
        )));
    }
    if resistance - support != 2 * points {
        return Err(StrategyError::InvalidResponse(format!(
            "{} levels {}/{} do not span twice the move of {} points",
            method, support, resistance, points
        )));
    }
    let midpoint = (resistance + support) as f64 / 2.0;
    if (midpoint - base).abs() > 1.0 {
        return Err(StrategyError::InvalidResponse(format!(
            "{} levels are centred on {} instead of {}",
            method, midpoint, base
        )));
    }
    Ok(())
}
