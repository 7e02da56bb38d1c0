// src/config.rs
use crate::application::service::{ErrorPolicy, FeedSettings};
use crate::domain::errors::{AppError, AppResult};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_COMPUTE_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_COMPUTE_MODEL: &str = "gemini-2.5-flash";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Strategy calculation backend
    pub calculator: CalculatorConfig,

    /// Live feed configuration
    pub feed: FeedConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculatorBackend {
    /// In-process arithmetic
    Local,
    /// Remote generative compute service
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorConfig {
    pub backend: CalculatorBackend,

    /// API key of the compute service; required for the remote backend
    pub api_key: Option<String>,

    pub endpoint: String,

    pub model: String,

    /// Upper bound of one remote call in milliseconds
    pub timeout_ms: u64,

    /// Quotes older than this are flagged stale
    pub max_quote_age_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSourceKind {
    Simulated,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub source: FeedSourceKind,

    /// Quote endpoint for the http source
    pub url: Option<String>,

    pub interval_ms: u64,

    pub fetch_timeout_ms: u64,

    pub error_policy: ErrorPolicy,

    /// Lowest volatility the simulated source produces
    pub volatility_floor: f64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "warn", "error")
    pub level: String,

    /// Log to file
    pub to_file: bool,

    /// Log file path
    pub file_path: Option<String>,
}

impl CalculatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn max_quote_age(&self) -> Duration {
        Duration::from_secs(self.max_quote_age_secs)
    }

    /// API key of the remote backend; there is no fallback when it is missing.
    pub fn remote_api_key(&self) -> AppResult<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            AppError::Config("Missing API_KEY environment variable for the remote calculator".to_string())
        })
    }
}

impl FeedConfig {
    pub fn settings(&self) -> FeedSettings {
        FeedSettings {
            interval: Duration::from_millis(self.interval_ms),
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
            error_policy: self.error_policy,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from a key lookup, falling back to defaults.
    pub fn from_vars<F>(var: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let backend = match var("CALCULATOR_BACKEND") {
            Some(value) => parse_backend(&value)?,
            None => defaults.calculator.backend,
        };

        let calculator_config = CalculatorConfig {
            backend,
            api_key: var("API_KEY").filter(|key| !key.trim().is_empty()),
            endpoint: var("COMPUTE_ENDPOINT").unwrap_or(defaults.calculator.endpoint),
            model: var("COMPUTE_MODEL").unwrap_or(defaults.calculator.model),
            timeout_ms: var("COMPUTE_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.calculator.timeout_ms),
            max_quote_age_secs: var("MAX_QUOTE_AGE_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.calculator.max_quote_age_secs),
        };

        let source = match var("FEED_SOURCE") {
            Some(value) => parse_feed_source(&value)?,
            None => defaults.feed.source,
        };
        let error_policy = match var("FEED_ERROR_POLICY") {
            Some(value) => parse_error_policy(&value)?,
            None => defaults.feed.error_policy,
        };

        let feed_config = FeedConfig {
            source,
            url: var("FEED_URL"),
            interval_ms: var("FEED_INTERVAL_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.feed.interval_ms),
            fetch_timeout_ms: var("FEED_FETCH_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.feed.fetch_timeout_ms),
            error_policy,
            volatility_floor: var("FEED_VOLATILITY_FLOOR")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.feed.volatility_floor),
        };

        // Create Logging config
        let logging_config = LoggingConfig {
            level: var("LOG_LEVEL").unwrap_or(defaults.logging.level),
            to_file: var("LOG_TO_FILE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            file_path: var("LOG_FILE_PATH"),
        };

        let config = Config {
            calculator: calculator_config,
            feed: feed_config,
            logging: logging_config,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let mut file = File::open(path).map_err(|e| {
            AppError::Config(format!("Failed to open config file: {}", e))
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(|e| {
            AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        let config: Config = serde_json::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> AppResult<()> {
        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            AppError::Config(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, contents).map_err(|e| {
            AppError::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.calculator.backend == CalculatorBackend::Remote {
            self.calculator.remote_api_key()?;
        }
        if self.calculator.timeout_ms == 0 {
            return Err(AppError::Config("Compute timeout must be positive".to_string()));
        }
        if self.feed.source == FeedSourceKind::Http && self.feed.url.is_none() {
            return Err(AppError::Config(
                "Missing FEED_URL environment variable for the http feed".to_string(),
            ));
        }
        if self.feed.interval_ms == 0 || self.feed.fetch_timeout_ms == 0 {
            return Err(AppError::Config(
                "Feed interval and fetch timeout must be positive".to_string(),
            ));
        }
        if !self.feed.volatility_floor.is_finite() || self.feed.volatility_floor <= 0.0 {
            return Err(AppError::Config(format!(
                "Volatility floor must be positive, got {}",
                self.feed.volatility_floor
            )));
        }
        Ok(())
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> AppResult<()> {
        let mut builder = env_logger::Builder::new();

        // Set log level
        let log_level = match self.logging.level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        };

        builder.filter_level(log_level);

        // Configure output
        if self.logging.to_file {
            if let Some(file_path) = &self.logging.file_path {
                let file = File::create(file_path).map_err(|e| {
                    AppError::Config(format!("Failed to create log file: {}", e))
                })?;

                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
        }

        // Initialize the logger
        builder.try_init().map_err(|e| {
            AppError::Config(format!("Failed to initialize logger: {}", e))
        })?;

        Ok(())
    }
}

fn parse_backend(value: &str) -> AppResult<CalculatorBackend> {
    match value.trim().to_lowercase().as_str() {
        "local" => Ok(CalculatorBackend::Local),
        "remote" => Ok(CalculatorBackend::Remote),
        other => Err(AppError::Config(format!(
            "Unknown CALCULATOR_BACKEND '{}', expected local or remote",
            other
        ))),
    }
}

fn parse_feed_source(value: &str) -> AppResult<FeedSourceKind> {
    match value.trim().to_lowercase().as_str() {
        "simulated" => Ok(FeedSourceKind::Simulated),
        "http" => Ok(FeedSourceKind::Http),
        other => Err(AppError::Config(format!(
            "Unknown FEED_SOURCE '{}', expected simulated or http",
            other
        ))),
    }
}

fn parse_error_policy(value: &str) -> AppResult<ErrorPolicy> {
    match value.trim().to_lowercase().as_str() {
        "continue" => Ok(ErrorPolicy::ContinueOnError),
        "stop" => Ok(ErrorPolicy::StopOnError),
        other => Err(AppError::Config(format!(
            "Unknown FEED_ERROR_POLICY '{}', expected continue or stop",
            other
        ))),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calculator: CalculatorConfig {
                backend: CalculatorBackend::Local,
                api_key: None,
                endpoint: DEFAULT_COMPUTE_ENDPOINT.to_string(),
                model: DEFAULT_COMPUTE_MODEL.to_string(),
                timeout_ms: 30_000,
                max_quote_age_secs: 60,
            },
            feed: FeedConfig {
                source: FeedSourceKind::Simulated,
                url: None,
                interval_ms: 5_000,
                fetch_timeout_ms: 3_000,
                error_policy: ErrorPolicy::ContinueOnError,
                volatility_floor: 10.0,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                to_file: false,
                file_path: None,
            },
        }
    }
}
