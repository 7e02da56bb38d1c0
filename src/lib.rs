// src/lib.rs
// Main library module declarations

pub mod domain;
pub mod analysis;
pub mod application;
pub mod infrastructure;
pub mod adapter;
pub mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// India VIX based intraday range and trade levels for NIFTY 50
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Load JSON configuration instead of reading the environment
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Calculate the strategy once
    Calculate {
        /// India VIX in percent, e.g. 15.5
        #[arg(allow_hyphen_values = true)]
        vix: String,

        /// NIFTY 50 price, e.g. 23500
        #[arg(allow_hyphen_values = true)]
        nifty: String,

        /// Build the levels around this price instead of the NIFTY price
        #[arg(long)]
        anchor: Option<f64>,

        /// Print the raw JSON result
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Recalculate on every live data point until Ctrl+C
    Live {
        #[arg(allow_hyphen_values = true)]
        vix: String,

        #[arg(allow_hyphen_values = true)]
        nifty: String,

        /// Override the configured feed interval
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,

        /// Print each result as a JSON line
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_calculate_with_anchor() {
        let cli = Cli::try_parse_from(["vix_range", "calculate", "15.5", "23260", "--anchor", "23500"]).unwrap();
        match cli.command {
            Command::Calculate { vix, nifty, anchor, json } => {
                assert_eq!((vix.as_str(), nifty.as_str()), ("15.5", "23260"));
                assert_eq!(anchor, Some(23500.0));
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn negative_values_reach_validation() {
        let cli = Cli::try_parse_from(["vix_range", "calculate", "-1", "23500"]).unwrap();
        assert!(matches!(cli.command, Command::Calculate { ref vix, .. } if vix == "-1"));
    }

    #[test]
    fn live_rejects_zero_interval() {
        assert!(Cli::try_parse_from(["vix_range", "live", "15", "23500", "--interval-ms", "0"]).is_err());
        let cli = Cli::try_parse_from(["vix_range", "--config", "cfg.json", "live", "15", "23500"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("cfg.json")));
    }
}
