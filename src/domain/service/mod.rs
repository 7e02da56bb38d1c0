// src/domain/service/mod.rs
// Domain service interfaces

use async_trait::async_trait;

use crate::domain::errors::{FeedError, FeedResult, GatewayResult};
use crate::domain::models::{MarketSnapshot, StrategyInput, StrategyResult};

/// Turns a volatility reading and an index price into a strategy result.
#[async_trait]
pub trait StrategyCalculator: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Compute the strategy for `input`. No retries are attempted.
    async fn compute(&self, input: &StrategyInput) -> GatewayResult<StrategyResult>;
}

/// Produces the next data point of a live feed.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &str;

    /// Next snapshot, given the last one the feed emitted.
    async fn next_snapshot(&self, previous: &MarketSnapshot) -> FeedResult<MarketSnapshot>;
}

/// What the feed should do after a callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedControl {
    Continue,
    Stop,
}

/// Single consumer of a live feed.
#[async_trait]
pub trait FeedObserver: Send + Sync {
    async fn on_data(&self, snapshot: MarketSnapshot) -> FeedControl;

    async fn on_error(&self, error: FeedError) -> FeedControl {
        log::warn!("Live feed error: {}", error);
        FeedControl::Continue
    }
}
