// src/infrastructure/market/mod.rs
// Market data sources for the live feed

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Uri};
use hyper_tls::HttpsConnector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::analysis::round_dp;
use crate::application::dto::parser::parse_quote;
use crate::domain::errors::{FeedError, FeedResult};
use crate::domain::models::MarketSnapshot;
use crate::domain::service::MarketDataSource;

pub const SIMULATED_SOURCE: &str = "simulated";

/// Random-walk generator standing in for a real quote feed.
///
/// Each step moves the index by up to 10 points either way and the
/// volatility by roughly +/-0.1, with a slight upward lean. Volatility never
/// drops below the configured floor and both figures keep two decimals.
pub struct SimulatedMarketSource {
    rng: Mutex<StdRng>,
    volatility_floor: f64,
}

impl SimulatedMarketSource {
    pub fn new(volatility_floor: f64) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
            volatility_floor,
        }
    }

    /// Reproducible sequence for tests and demos.
    pub fn with_seed(volatility_floor: f64, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            volatility_floor,
        }
    }

    fn step(&self, previous: &MarketSnapshot) -> MarketSnapshot {
        let (index_delta, volatility_delta) = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let index_delta = (rng.random::<f64>() - 0.5) * 20.0;
            let volatility_delta = (rng.random::<f64>() - 0.49) * 0.2;
            (index_delta, volatility_delta)
        };

        let index_price = round_dp(previous.index_price + index_delta, 2);
        let volatility_percent = round_dp(
            (previous.volatility_percent + volatility_delta).max(self.volatility_floor),
            2,
        );

        MarketSnapshot::new(volatility_percent, index_price, SIMULATED_SOURCE)
    }
}

#[async_trait]
impl MarketDataSource for SimulatedMarketSource {
    fn name(&self) -> &str {
        SIMULATED_SOURCE
    }

    async fn next_snapshot(&self, previous: &MarketSnapshot) -> FeedResult<MarketSnapshot> {
        Ok(self.step(previous))
    }
}

/// Polls a JSON quote endpoint once per tick.
pub struct HttpMarketSource {
    client: Client<HttpsConnector<HttpConnector>>,
    url: String,
}

impl HttpMarketSource {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::builder().build::<_, Body>(HttpsConnector::new()),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketSource {
    fn name(&self) -> &str {
        &self.url
    }

    async fn next_snapshot(&self, _previous: &MarketSnapshot) -> FeedResult<MarketSnapshot> {
        let uri: Uri = self
            .url
            .parse()
            .map_err(|e| FeedError::Fetch(format!("Invalid feed URL {}: {}", self.url, e)))?;

        let response = self
            .client
            .get(uri)
            .await
            .map_err(|e| FeedError::Fetch(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Fetch(format!("{} returned {}", self.url, status)));
        }

        let bytes = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(|e| FeedError::Fetch(format!("Failed to read quote body: {}", e)))?;

        parse_quote(&bytes, &self.url)
    }
}
