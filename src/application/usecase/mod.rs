pub mod live_session;
pub mod strategy_usecase;

// Re-export public API
pub use live_session::{LiveStrategySession, SessionEvent};
pub use strategy_usecase::{StrategyProcessor, StrategyUseCase};
