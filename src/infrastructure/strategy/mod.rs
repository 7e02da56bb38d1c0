// src/infrastructure/strategy/mod.rs
// Deterministic in-process strategy calculator

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::analysis::{recommend, round_dp, ExpectedMove, MoveMethod, RangeLevels, SignalParams};
use crate::domain::errors::GatewayResult;
use crate::domain::models::{StrategyInput, StrategyResult};
use crate::domain::service::StrategyCalculator;

pub const NO_CANDLE_SOURCE: &str = "none";

pub struct LocalStrategyCalculator {
    params: SignalParams,
    max_quote_age: Duration,
}

impl LocalStrategyCalculator {
    pub fn new(max_quote_age: Duration) -> Self {
        Self {
            params: SignalParams::default(),
            max_quote_age,
        }
    }

    pub fn calculate(&self, input: &StrategyInput) -> StrategyResult {
        self.calculate_at(input, Utc::now())
    }

    fn calculate_at(&self, input: &StrategyInput, now: DateTime<Utc>) -> StrategyResult {
        let base = input.level_base();

        let linear = ExpectedMove::compute(MoveMethod::LinearRatio, input.volatility_percent, base);
        let sqrt = ExpectedMove::compute(MoveMethod::SqrtTime, input.volatility_percent, base);
        let linear_levels = RangeLevels::around(base, &linear);
        let sqrt_levels = RangeLevels::around(base, &sqrt);

        let trade_recommendation = recommend(input.index_price, &linear_levels, &linear, &self.params);

        // A quote from the future is clock skew, not staleness.
        let staleness_warning = now
            .signed_duration_since(input.as_of)
            .to_std()
            .map(|age| age > self.max_quote_age)
            .unwrap_or(false);

        let notes = match input.anchor_price {
            Some(anchor) => format!(
                "Calculated locally from {} values with levels anchored at {:.2}. \
                 Trade recommendation uses Method A levels.",
                input.source, anchor
            ),
            None => format!(
                "Calculated locally from {} values. Trade recommendation uses Method A levels.",
                input.source
            ),
        };

        log::debug!(
            "Local calculation: vix={} nifty={} base={} move A={} B={} side={}",
            input.volatility_percent,
            input.index_price,
            base,
            linear.points,
            sqrt.points,
            trade_recommendation.side()
        );

        StrategyResult {
            volatility_percent: input.volatility_percent,
            volatility_timestamp: input.as_of,
            volatility_source: input.source.clone(),
            index_price: input.index_price,
            index_timestamp: input.as_of,
            index_source: input.source.clone(),
            anchor_price: input.anchor_price,
            candle_data_source: NO_CANDLE_SOURCE.to_string(),
            expected_move_percent: round_dp(linear.percent, 4),
            expected_move_percent_sqrt: round_dp(sqrt.percent, 4),
            expected_move_points: linear.points,
            expected_move_points_sqrt: sqrt.points,
            resistance: linear_levels.resistance,
            support: linear_levels.support,
            resistance_sqrt: sqrt_levels.resistance,
            support_sqrt: sqrt_levels.support,
            trade_recommendation,
            staleness_warning,
            check_timestamp: now,
            notes,
        }
    }
}

impl Default for LocalStrategyCalculator {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl StrategyCalculator for LocalStrategyCalculator {
    fn name(&self) -> &str {
        "local"
    }

    async fn compute(&self, input: &StrategyInput) -> GatewayResult<StrategyResult> {
        Ok(self.calculate(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{TradeSide, TradeSignal};

    #[test]
    fn reference_inputs_produce_both_methods() {
        let input = StrategyInput::new(15.5, 23500.0).unwrap();
        let result = LocalStrategyCalculator::default().calculate(&input);

        assert!((result.expected_move_percent - 1.0333).abs() < 1e-9);
        assert!((result.expected_move_percent_sqrt - 2.8299).abs() < 1e-9);
        assert_eq!(result.expected_move_points, 243);
        assert_eq!(result.expected_move_points_sqrt, 665);
        assert_eq!((result.support, result.resistance), (23257, 23743));
        assert_eq!((result.support_sqrt, result.resistance_sqrt), (22835, 24165));
        assert_eq!(result.trade_recommendation.signal, TradeSignal::NoTrade);
        assert!(!result.staleness_warning);
        assert!(result.validate().is_ok());
    }

    #[test]
    fn anchored_levels_allow_a_trade() {
        let input = StrategyInput::new(15.5, 23260.0)
            .unwrap()
            .with_anchor(23500.0)
            .unwrap();
        let result = LocalStrategyCalculator::default().calculate(&input);

        assert_eq!(result.support, 23257);
        assert_eq!(result.trade_recommendation.side(), TradeSide::Long);
        assert_eq!(result.anchor_price, Some(23500.0));
        assert!(result.validate().is_ok());
    }

    #[test]
    fn old_quotes_are_flagged_stale() {
        let calculator = LocalStrategyCalculator::new(Duration::from_secs(30));
        let mut input = StrategyInput::new(15.5, 23500.0).unwrap();
        let now = input.as_of + chrono::Duration::seconds(31);

        assert!(calculator.calculate_at(&input, now).staleness_warning);

        input.as_of = now + chrono::Duration::seconds(5);
        assert!(!calculator.calculate_at(&input, now).staleness_warning);
    }

    #[tokio::test]
    async fn compute_is_deterministic_for_identical_input() {
        let calculator = LocalStrategyCalculator::default();
        let input = StrategyInput::new(17.25, 24012.4).unwrap();

        let first = calculator.compute(&input).await.unwrap();
        let second = calculator.compute(&input).await.unwrap();
        assert_eq!(first.trade_recommendation, second.trade_recommendation);
        assert_eq!(first.resistance, second.resistance);
        assert_eq!(first.support_sqrt, second.support_sqrt);
    }
}
