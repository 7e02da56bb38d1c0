// src/domain/errors.rs
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of the calculation gateway.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    /// Rejected before any computation was attempted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The compute service declined to answer.
    #[error("Computation blocked: {0}")]
    ComputationBlocked(String),

    /// The answer could not be read as a strategy result.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Compute service unavailable: {0}")]
    Unavailable(String),
}

impl StrategyError {
    /// Message suitable for showing to the person at the keyboard.
    pub fn user_message(&self) -> String {
        match self {
            StrategyError::InvalidInput(msg) => {
                format!("Please enter valid positive numbers for VIX and Nifty ({}).", msg)
            }
            StrategyError::ComputationBlocked(_) => {
                "The request was blocked due to safety settings. Please adjust your input.".to_string()
            }
            StrategyError::InvalidResponse(_) | StrategyError::Unavailable(_) => {
                "Failed to get strategy. The service may be overloaded or the input is invalid."
                    .to_string()
            }
        }
    }
}

/// Failures of a single live-feed tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Failed to fetch market data: {0}")]
    Fetch(String),

    #[error("Market data fetch timed out after {0:?}")]
    Timeout(Duration),
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
pub type GatewayResult<T> = Result<T, StrategyError>;
pub type FeedResult<T> = Result<T, FeedError>;
