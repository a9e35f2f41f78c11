//! Configuration loader and application settings.

use crate::errors::{AppError, Result};
use std::collections::HashMap;
use std::time::Duration;

/// Consolidated application configuration, loaded once at startup.
/// Missing or malformed required settings fail fast here, before the
/// polling loop starts.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// RPC endpoint for the Ethereum-compatible node.
    pub rpc_url: String,
    /// Minimum spread percentage for an opportunity to qualify.
    pub threshold_pct: f64,
    /// Seconds between evaluation cycles.
    pub poll_interval: Duration,
    /// How many ranked opportunities to keep per cycle.
    pub top_n: usize,
    /// Whether to run the simulated ledger.
    pub simulate: bool,
    /// Simulated starting balance in quote currency (DAI).
    pub starting_balance: f64,
    /// Wall-clock duration of a simulation run.
    pub sim_duration: Duration,
    /// Safety margin fraction applied to maximum affordable trade size.
    pub haircut: f64,
    /// Path of the append-only trade log.
    pub trade_log_path: String,
    /// Default proportional fee for venues without an explicit entry.
    pub default_fee: f64,
    /// Multiplier applied on top of the base-fee gas estimate.
    pub gas_multiplier: f64,
    /// Last-resort gas price when no live or cached base fee exists.
    pub fallback_gas_gwei: Option<f64>,
    /// Emit the dashboard payload as JSON lines.
    pub dash_enable: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let rpc_url = std::env::var("RPC_URL")
            .map_err(|_| AppError::Config("RPC_URL not set".into()))?;

        let threshold_pct = env_parse("ARB_THRESHOLD_PCT", 0.0)?;
        let poll_secs: u64 = env_parse("PRICE_CHECK_INTERVAL_SECONDS", 45)?;
        if poll_secs == 0 {
            return Err(AppError::Config(
                "PRICE_CHECK_INTERVAL_SECONDS must be positive".into(),
            ));
        }
        let top_n: usize = env_parse("TOP_OPPORTUNITIES", 3)?;
        let simulate = env_flag("SIM_ENABLE", true);
        let starting_balance = env_parse("SIM_STARTING_BALANCE", 10_000.0)?;
        if starting_balance <= 0.0 {
            return Err(AppError::Config(
                "SIM_STARTING_BALANCE must be positive".into(),
            ));
        }
        let sim_secs: u64 = env_parse("SIM_DURATION_SECONDS", 3_600)?;
        let haircut = env_parse("SIM_HAIRCUT", 0.9)?;
        if !(0.0..=1.0).contains(&haircut) {
            return Err(AppError::Config("SIM_HAIRCUT must be in [0, 1]".into()));
        }
        let trade_log_path =
            std::env::var("TRADE_LOG_PATH").unwrap_or_else(|_| "trades.csv".into());
        let default_fee_bps: f64 = env_parse("DEFAULT_FEE_BPS", 30.0)?;
        let gas_multiplier = env_parse("GAS_MULTIPLIER", 1.2)?;
        let fallback_gas_gwei = match std::env::var("FALLBACK_GAS_GWEI") {
            Ok(raw) => Some(raw.parse::<f64>()?),
            Err(_) => None,
        };
        let dash_enable = env_flag("DASH_ENABLE", false);

        Ok(Self {
            rpc_url,
            threshold_pct,
            poll_interval: Duration::from_secs(poll_secs),
            top_n,
            simulate,
            starting_balance,
            sim_duration: Duration::from_secs(sim_secs),
            haircut,
            trade_log_path,
            default_fee: default_fee_bps / 10_000.0,
            gas_multiplier,
            fallback_gas_gwei,
            dash_enable,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    AppError: From<T::Err>,
{
    match std::env::var(key) {
        Ok(raw) => Ok(raw.parse::<T>()?),
        Err(_) => Ok(default),
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(raw) => matches!(raw.as_str(), "1" | "true" | "TRUE" | "True"),
        Err(_) => default,
    }
}

/// Proportional trading fee per venue. Total over venue names: unknown
/// venues resolve to the default fee rather than failing the lookup.
#[derive(Debug, Clone)]
pub struct FeeSchedule {
    fees: HashMap<String, f64>,
    default_fee: f64,
}

impl FeeSchedule {
    pub fn new(default_fee: f64) -> Self {
        Self {
            fees: HashMap::new(),
            default_fee,
        }
    }

    pub fn with_fee(mut self, venue: impl Into<String>, fee: f64) -> Self {
        self.fees.insert(venue.into(), fee);
        self
    }

    pub fn fee_for(&self, venue: &str) -> f64 {
        self.fees.get(venue).copied().unwrap_or(self.default_fee)
    }
}
