//! Command-line interface parsing for zipweather
//!
//! Subcommands mutate the tracked-location list, inspect it, or fetch
//! weather data through the cache.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The zip code is not a 5-digit string
    #[error("invalid zip code '{0}': expected exactly 5 digits")]
    InvalidZipcode(String),
}

/// zipweather - track weather for US zip codes with a persistent cache
#[derive(Parser, Debug)]
#[command(name = "zipweather")]
#[command(about = "Weather for tracked US zip codes, served from a freshness-aware cache")]
#[command(version)]
pub struct Cli {
    /// Path to the config file (defaults to the XDG config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start tracking a zip code
    Add {
        /// 5-digit US zip code
        #[arg(value_parser = parse_zipcode)]
        zipcode: String,
    },
    /// Stop tracking a zip code and evict its cached data
    Remove {
        /// 5-digit US zip code
        #[arg(value_parser = parse_zipcode)]
        zipcode: String,
    },
    /// List tracked zip codes
    List,
    /// Show current conditions for all tracked zip codes
    Show,
    /// Show the 5-day forecast for one zip code
    Forecast {
        /// 5-digit US zip code
        #[arg(value_parser = parse_zipcode)]
        zipcode: String,
    },
}

/// Parses a zip code argument: exactly 5 ASCII digits.
pub fn parse_zipcode(s: &str) -> Result<String, CliError> {
    if s.len() == 5 && s.chars().all(|c| c.is_ascii_digit()) {
        Ok(s.to_string())
    } else {
        Err(CliError::InvalidZipcode(s.to_string()))
    }
}
