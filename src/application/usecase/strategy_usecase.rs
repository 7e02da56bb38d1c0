// src/application/usecase/strategy_usecase.rs
// One-shot strategy calculation use case

use std::sync::Arc;
use async_trait::async_trait;

use crate::domain::errors::GatewayResult;
use crate::domain::models::{StrategyInput, StrategyResult};
use crate::domain::service::StrategyCalculator;

/// Strategy calculation use case
#[async_trait]
pub trait StrategyUseCase {
    /// Validate the two text fields and compute the strategy.
    async fn calculate(&self, volatility_text: &str, index_text: &str) -> GatewayResult<StrategyResult>;

    async fn calculate_input(&self, input: &StrategyInput) -> GatewayResult<StrategyResult>;
}

pub struct StrategyProcessor {
    calculator: Arc<dyn StrategyCalculator>,
}

impl StrategyProcessor {
    pub fn new(calculator: Arc<dyn StrategyCalculator>) -> Self {
        Self { calculator }
    }

    pub fn calculator_name(&self) -> &str {
        self.calculator.name()
    }
}

#[async_trait]
impl StrategyUseCase for StrategyProcessor {
    async fn calculate(&self, volatility_text: &str, index_text: &str) -> GatewayResult<StrategyResult> {
        let input = StrategyInput::parse(volatility_text, index_text)?;
        self.calculate_input(&input).await
    }

    async fn calculate_input(&self, input: &StrategyInput) -> GatewayResult<StrategyResult> {
        log::info!(
            "Calculating strategy with {} - VIX: {}, Nifty: {}",
            self.calculator.name(),
            input.volatility_percent,
            input.index_price
        );

        match self.calculator.compute(input).await {
            Ok(result) => {
                log::info!(
                    "Strategy ready - Range: {} / {}, Trade: {} ({})",
                    result.support,
                    result.resistance,
                    result.trade_recommendation.side(),
                    result.trade_recommendation.confidence
                );
                Ok(result)
            }
            Err(e) => {
                log::error!("Strategy calculation failed: {}", e);
                Err(e)
            }
        }
    }
}
