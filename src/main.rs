// src/main.rs
use vix_range::adapter::{render_report, render_tick};
use vix_range::application::usecase::{
    LiveStrategySession, SessionEvent, StrategyProcessor, StrategyUseCase,
};
use vix_range::config::{CalculatorBackend, Config, FeedSourceKind};
use vix_range::domain::errors::{AppError, AppResult, GatewayResult};
use vix_range::domain::models::{MarketSnapshot, StrategyInput, StrategyResult, USER_INPUT_SOURCE};
use vix_range::domain::service::{MarketDataSource, StrategyCalculator};
use vix_range::infrastructure::{
    HttpMarketSource, LocalStrategyCalculator, RemoteStrategyCalculator, SimulatedMarketSource,
};
use vix_range::{Cli, Command};

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::ctrl_c;
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    // Initialize logging
    config.init_logging()?;

    log::info!("Starting vix_range v{}", env!("CARGO_PKG_VERSION"));

    let calculator = create_calculator(&config)?;
    log::info!("Using {} strategy calculator", calculator.name());

    match cli.command {
        Command::Calculate { vix, nifty, anchor, json } => {
            run_calculate(calculator, &vix, &nifty, anchor, json).await
        }
        Command::Live { vix, nifty, interval_ms, json } => {
            run_live(&config, calculator, &vix, &nifty, interval_ms, json).await
        }
    }
}

fn create_calculator(config: &Config) -> AppResult<Arc<dyn StrategyCalculator>> {
    let settings = &config.calculator;
    match settings.backend {
        CalculatorBackend::Remote => Ok(Arc::new(RemoteStrategyCalculator::new(
            &settings.endpoint,
            &settings.model,
            settings.remote_api_key()?,
            settings.timeout(),
        ))),
        CalculatorBackend::Local => Ok(Arc::new(LocalStrategyCalculator::new(settings.max_quote_age()))),
    }
}

fn create_market_source(config: &Config) -> AppResult<Arc<dyn MarketDataSource>> {
    match config.feed.source {
        FeedSourceKind::Simulated => Ok(Arc::new(SimulatedMarketSource::new(config.feed.volatility_floor))),
        FeedSourceKind::Http => {
            let url = config
                .feed
                .url
                .as_deref()
                .ok_or_else(|| AppError::Config("Missing FEED_URL for the http feed".to_string()))?;
            Ok(Arc::new(HttpMarketSource::new(url)))
        }
    }
}

async fn run_calculate(
    calculator: Arc<dyn StrategyCalculator>,
    vix: &str,
    nifty: &str,
    anchor: Option<f64>,
    json: bool,
) -> AppResult<()> {
    let processor = StrategyProcessor::new(calculator);

    let outcome = calculate_once(&processor, vix, nifty, anchor).await;

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_report(&result));
    }

    Ok(())
}

async fn calculate_once(
    processor: &StrategyProcessor,
    vix: &str,
    nifty: &str,
    anchor: Option<f64>,
) -> GatewayResult<StrategyResult> {
    let mut input = StrategyInput::parse(vix, nifty)?;
    if let Some(anchor) = anchor {
        input = input.with_anchor(anchor)?;
    }
    processor.calculate_input(&input).await
}

async fn run_live(
    config: &Config,
    calculator: Arc<dyn StrategyCalculator>,
    vix: &str,
    nifty: &str,
    interval_ms: Option<u64>,
    json: bool,
) -> AppResult<()> {
    let input = match StrategyInput::parse(vix, nifty) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    let mut settings = config.feed.settings();
    if let Some(interval_ms) = interval_ms {
        settings.interval = Duration::from_millis(interval_ms);
    }

    let source = create_market_source(config)?;
    log::info!("Live data from {} every {:?}", source.name(), settings.interval);

    let session = LiveStrategySession::new(calculator, source, settings);
    let mut events = session.subscribe();

    let shutdown = ctrl_c();
    tokio::pin!(shutdown);

    let initial = MarketSnapshot::new(input.volatility_percent, input.index_price, USER_INPUT_SOURCE);
    tokio::select! {
        _ = &mut shutdown => {
            log::info!("Received Ctrl+C during the first calculation, stopping live session");
            session.stop().await;
            return Ok(());
        }
        _ = session.start(initial) => {}
    }

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Received Ctrl+C, stopping live session");
                session.stop().await;
                break;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Result(result)) => {
                    if json {
                        println!("{}", serde_json::to_string(&result)?);
                    } else {
                        println!("{}", render_tick(&result));
                    }
                }
                Ok(SessionEvent::Error(message)) => eprintln!("{}", message),
                Ok(SessionEvent::Stopped) | Err(RecvError::Closed) => {
                    log::info!("Live session stopped");
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Console fell behind, skipped {} live updates", skipped);
                }
            }
        }
    }

    Ok(())
}
