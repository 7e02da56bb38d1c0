// src/infrastructure/mod.rs
// Concrete calculators and market data sources

pub mod gateway;
pub mod market;
pub mod strategy;

pub use gateway::RemoteStrategyCalculator;
pub use market::{HttpMarketSource, SimulatedMarketSource};
pub use strategy::LocalStrategyCalculator;
