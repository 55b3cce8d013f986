//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{DaemonError, DaemonResult};
use chrono::{DateTime, Duration, Utc};
use market_domain::{AuctionRules, Credits, TaxRate};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Sweeper configuration
    pub sweep: SweepConfig,

    /// Auction rule set handed to the engine
    pub rules: AuctionRules,

    /// When the current season ends
    pub season_end: DateTime<Utc>,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// Expiry sweeper configuration.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Seconds between sweep passes
    pub interval_secs: u64,
    /// Per-listing budget within a pass, so one stuck listing cannot
    /// stall the sweep
    pub listing_timeout_secs: u64,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let sweep = Self::load_sweep_config()?;
        let rules = Self::load_rules()?;
        let season_end = Self::load_season_end()?;

        Ok(Self { sweep, rules, season_end, environment })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            sweep: SweepConfig { interval_secs: 1, listing_timeout_secs: 5 },
            rules: AuctionRules::default(),
            season_end: Utc::now() + Duration::days(90),
            environment: Environment::Test,
        }
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("MARKET_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid MARKET_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_sweep_config() -> DaemonResult<SweepConfig> {
        let interval_secs = Self::load_u64_env("MARKET_SWEEP_INTERVAL_SECS", 60)?;
        let listing_timeout_secs = Self::load_u64_env("MARKET_SWEEP_LISTING_TIMEOUT_SECS", 10)?;

        if interval_secs == 0 {
            return Err(DaemonError::Config(
                "MARKET_SWEEP_INTERVAL_SECS must be positive".to_string(),
            ));
        }

        Ok(SweepConfig { interval_secs, listing_timeout_secs })
    }

    fn load_rules() -> DaemonResult<AuctionRules> {
        let defaults = AuctionRules::default();

        let min_bid_increment = Self::load_decimal_env(
            "MARKET_MIN_BID_INCREMENT",
            defaults.min_bid_increment.as_decimal(),
        )?;
        let snipe_window_mins =
            Self::load_u64_env("MARKET_SNIPE_WINDOW_MINS", defaults.snipe_window.num_minutes() as u64)?;
        let extension_mins = Self::load_u64_env(
            "MARKET_EXTENSION_MINS",
            defaults.extension_increment.num_minutes() as u64,
        )?;
        let max_extensions =
            Self::load_u64_env("MARKET_MAX_EXTENSIONS", defaults.max_extensions as u64)?;
        let listing_fee_rate =
            Self::load_decimal_env("MARKET_LISTING_FEE_RATE", defaults.listing_fee_rate)?;
        let tax_rate =
            Self::load_decimal_env("MARKET_TAX_RATE", defaults.tax_rate.as_decimal())?;
        let lock_timeout_secs =
            Self::load_u64_env("MARKET_LOCK_TIMEOUT_SECS", defaults.lock_timeout.as_secs())?;
        let max_retries = Self::load_u64_env("MARKET_MAX_RETRIES", defaults.max_retries as u64)?;

        Ok(AuctionRules {
            min_bid_increment: Credits::new(min_bid_increment).map_err(|e| {
                DaemonError::Config(format!("Invalid MARKET_MIN_BID_INCREMENT: {}", e))
            })?,
            snipe_window: Duration::minutes(snipe_window_mins as i64),
            extension_increment: Duration::minutes(extension_mins as i64),
            max_extensions: max_extensions as u32,
            listing_fee_rate,
            tax_rate: TaxRate::new(tax_rate)
                .map_err(|e| DaemonError::Config(format!("Invalid MARKET_TAX_RATE: {}", e)))?,
            lock_timeout: std::time::Duration::from_secs(lock_timeout_secs),
            max_retries: max_retries as u32,
        })
    }

    fn load_season_end() -> DaemonResult<DateTime<Utc>> {
        match env::var("MARKET_SEASON_END") {
            Ok(val) => DateTime::parse_from_rfc3339(&val)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| {
                    DaemonError::Config(format!(
                        "Invalid MARKET_SEASON_END: {} (expected RFC 3339)",
                        val
                    ))
                }),
            Err(_) => Ok(Utc::now() + Duration::days(90)),
        }
    }

    fn load_u64_env(key: &str, default: u64) -> DaemonResult<u64> {
        match env::var(key) {
            Ok(val) => val
                .parse::<u64>()
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }

    fn load_decimal_env(key: &str, default: Decimal) -> DaemonResult<Decimal> {
        match env::var(key) {
            Ok(val) => Decimal::from_str(&val)
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sweep: SweepConfig { interval_secs: 60, listing_timeout_secs: 10 },
            rules: AuctionRules::default(),
            season_end: Utc::now() + Duration::days(90),
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
