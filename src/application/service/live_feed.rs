// src/application/service/live_feed.rs
// Periodic market-data feed with start/stop lifecycle

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::domain::errors::FeedError;
use crate::domain::models::MarketSnapshot;
use crate::domain::service::{FeedControl, FeedObserver, MarketDataSource};

/// What a failed fetch does to the feed once the observer has been told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Keep ticking unless the observer asks to stop.
    ContinueOnError,
    StopOnError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Active,
}

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub interval: Duration,
    pub fetch_timeout: Duration,
    pub error_policy: ErrorPolicy,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            fetch_timeout: Duration::from_millis(3000),
            error_policy: ErrorPolicy::ContinueOnError,
        }
    }
}

/// Shortest period the timer accepts.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Last snapshot of one feed run. Every run walks from its own cell.
type Baseline = Arc<StdMutex<MarketSnapshot>>;

struct FeedTask {
    id: u64,
    /// None while `start` is still emitting the first data point.
    handle: Option<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl FeedTask {
    fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(true, |handle| !handle.is_finished())
    }

    fn cancel(self) {
        // The task sees the flag before its next fetch and before dispatching.
        let _ = self.shutdown.send(true);
    }
}

/// Owns the single timer task of a live feed.
///
/// At most one task runs per controller: `start` on an active feed stops the
/// running task first. `stop` only prevents future ticks; a callback already
/// in progress is allowed to finish.
pub struct LiveFeedController {
    source: Arc<dyn MarketDataSource>,
    settings: FeedSettings,
    task: Mutex<Option<FeedTask>>,
    next_id: AtomicU64,
    baseline: StdMutex<Option<Baseline>>,
}

impl LiveFeedController {
    pub fn new(source: Arc<dyn MarketDataSource>, settings: FeedSettings) -> Self {
        Self {
            source,
            settings,
            task: Mutex::new(None),
            next_id: AtomicU64::new(1),
            baseline: StdMutex::new(None),
        }
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    /// Emit `initial` to the observer right away, then keep emitting a fresh
    /// snapshot every interval until stopped.
    ///
    /// The controller is not locked while the first data point is emitted, so
    /// `stop` (or another `start`) can cancel this run before its timer exists.
    pub async fn start(&self, initial: MarketSnapshot, observer: Arc<dyn FeedObserver>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let baseline: Baseline = Arc::new(StdMutex::new(initial.clone()));

        {
            let mut slot = self.task.lock().await;
            let pending = FeedTask {
                id,
                handle: None,
                shutdown,
            };
            if let Some(previous) = slot.replace(pending) {
                log::info!("Live feed already running; stopping previous feed");
                previous.cancel();
            }
            *lock(&self.baseline) = Some(baseline.clone());
        }

        log::info!(
            "Started {} market data feed #{} every {:?} (vix={}, nifty={})",
            self.source.name(),
            id,
            self.settings.interval,
            initial.volatility_percent,
            initial.index_price
        );

        let control = observer.on_data(initial).await;

        let mut slot = self.task.lock().await;
        if !slot.as_ref().is_some_and(|task| task.id == id) {
            log::debug!("Live feed #{} was stopped during its first data point", id);
            return;
        }
        if control == FeedControl::Stop {
            log::info!("Live feed stopped by observer on first data point");
            if let Some(task) = slot.take() {
                task.cancel();
            }
            return;
        }

        let handle = tokio::spawn(run_feed(
            self.source.clone(),
            observer,
            baseline,
            self.settings.clone(),
            shutdown_rx,
        ));
        if let Some(task) = slot.as_mut() {
            task.handle = Some(handle);
        }
    }

    /// Stop the feed. Safe to call when nothing is running.
    ///
    /// Returns whether a feed task was still running.
    pub async fn stop(&self) -> bool {
        let Some(task) = self.task.lock().await.take() else {
            return false;
        };
        let (id, was_running) = (task.id, task.is_running());
        task.cancel();
        if was_running {
            log::info!("Stopped {} market data feed #{}", self.source.name(), id);
        }
        was_running
    }

    pub async fn state(&self) -> FeedState {
        match self.task.lock().await.as_ref() {
            Some(task) if task.is_running() => FeedState::Active,
            _ => FeedState::Idle,
        }
    }

    pub async fn is_active(&self) -> bool {
        self.state().await == FeedState::Active
    }

    /// Last snapshot emitted by the most recently started feed.
    pub fn baseline(&self) -> Option<MarketSnapshot> {
        lock(&self.baseline).as_ref().map(|cell| lock(cell).clone())
    }
}

impl Drop for LiveFeedController {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.cancel();
        }
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_feed(
    source: Arc<dyn MarketDataSource>,
    observer: Arc<dyn FeedObserver>,
    baseline: Baseline,
    settings: FeedSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    // The first data point was already emitted by `start`.
    let period = settings.interval.max(MIN_INTERVAL);
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            // Also fires when the controller is dropped.
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        if *shutdown.borrow() {
            break;
        }

        let previous = lock(&baseline).clone();

        let fetched = match time::timeout(settings.fetch_timeout, source.next_snapshot(&previous)).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout(settings.fetch_timeout)),
        };

        if *shutdown.borrow() {
            break;
        }

        let control = match fetched {
            Ok(snapshot) => {
                log::debug!(
                    "Feed tick: vix={} nifty={}",
                    snapshot.volatility_percent,
                    snapshot.index_price
                );
                *lock(&baseline) = snapshot.clone();
                observer.on_data(snapshot).await
            }
            Err(error) => {
                log::warn!("Feed tick failed: {}", error);
                let requested = observer.on_error(error).await;
                match settings.error_policy {
                    ErrorPolicy::StopOnError => FeedControl::Stop,
                    ErrorPolicy::ContinueOnError => requested,
                }
            }
        };

        if control == FeedControl::Stop {
            log::info!("Live feed stopped from within a tick");
            break;
        }
    }
}
