// src/domain/mod.rs
pub mod errors;
pub mod models;
pub mod service;

// Re-export common types for convenience
pub use errors::{AppError, AppResult, FeedError, FeedResult, GatewayResult, StrategyError};
pub use models::{
    MarketSnapshot, StrategyInput, StrategyResult, TradeConfidence, TradePlan, TradeRecommendation,
    TradeSide, TradeSignal,
};
pub use service::{FeedControl, FeedObserver, MarketDataSource, StrategyCalculator};
