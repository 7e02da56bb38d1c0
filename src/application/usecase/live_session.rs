// src/application/usecase/live_session.rs
// Live feed wired into the strategy calculator

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::application::service::{FeedSettings, LiveFeedController};
use crate::domain::errors::FeedError;
use crate::domain::models::{MarketSnapshot, StrategyInput, StrategyResult};
use crate::domain::service::{FeedControl, FeedObserver, MarketDataSource, StrategyCalculator};

const EVENT_CAPACITY: usize = 64;

/// What a live session publishes to its subscribers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Result(Box<StrategyResult>),
    /// User-facing message of a failed tick.
    Error(String),
    Stopped,
}

/// Recomputes the strategy on every feed data point.
///
/// Levels stay anchored on the index price the session was started with, so
/// the recommendation follows the price as it drifts towards a level.
pub struct LiveStrategySession {
    calculator: Arc<dyn StrategyCalculator>,
    feed: LiveFeedController,
    events: broadcast::Sender<SessionEvent>,
    generation: Arc<AtomicU64>,
}

impl LiveStrategySession {
    pub fn new(
        calculator: Arc<dyn StrategyCalculator>,
        source: Arc<dyn MarketDataSource>,
        settings: FeedSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            calculator,
            feed: LiveFeedController::new(source, settings),
            events,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Start (or restart) the session from `initial`. The first result is
    /// computed before this returns.
    pub async fn start(&self, initial: MarketSnapshot) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!(
            "Starting live session #{} anchored at {}",
            generation,
            initial.index_price
        );

        let observer = Arc::new(SessionObserver {
            calculator: self.calculator.clone(),
            events: self.events.clone(),
            generation: self.generation.clone(),
            session_generation: generation,
            anchor_price: initial.index_price,
        });

        self.feed.start(initial, observer).await;
    }

    pub async fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if self.feed.stop().await {
            let _ = self.events.send(SessionEvent::Stopped);
        }
    }

    pub async fn is_active(&self) -> bool {
        self.feed.is_active().await
    }

    pub fn feed(&self) -> &LiveFeedController {
        &self.feed
    }
}

struct SessionObserver {
    calculator: Arc<dyn StrategyCalculator>,
    events: broadcast::Sender<SessionEvent>,
    generation: Arc<AtomicU64>,
    session_generation: u64,
    anchor_price: f64,
}

impl SessionObserver {
    fn superseded(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.session_generation
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn fail(&self, message: String) -> FeedControl {
        self.publish(SessionEvent::Error(message));
        self.publish(SessionEvent::Stopped);
        FeedControl::Stop
    }
}

#[async_trait]
impl FeedObserver for SessionObserver {
    async fn on_data(&self, snapshot: MarketSnapshot) -> FeedControl {
        if self.superseded() {
            return FeedControl::Stop;
        }

        let input = match StrategyInput::from_snapshot(&snapshot)
            .and_then(|input| input.with_anchor(self.anchor_price))
        {
            Ok(input) => input,
            Err(e) => {
                log::error!("Live data point rejected: {}", e);
                return self.fail(e.user_message());
            }
        };

        let outcome = self.calculator.compute(&input).await;

        if self.superseded() {
            log::debug!("Discarding result of superseded session #{}", self.session_generation);
            return FeedControl::Stop;
        }

        match outcome {
            Ok(result) => {
                log::debug!(
                    "Live result: nifty={} trade={}",
                    result.index_price,
                    result.trade_recommendation.side()
                );
                self.publish(SessionEvent::Result(Box::new(result)));
                FeedControl::Continue
            }
            Err(e) => {
                log::error!("Live calculation failed, stopping session: {}", e);
                self.fail(e.user_message())
            }
        }
    }

    async fn on_error(&self, error: FeedError) -> FeedControl {
        log::warn!("Live feed tick failed: {}", error);
        if !self.superseded() {
            self.publish(SessionEvent::Error(error.to_string()));
        }
        FeedControl::Continue
    }
}
