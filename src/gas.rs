//! Gas cost model: per-venue gas-unit table, live base-fee lookup, and
//! conversion into quote-currency units.

use crate::errors::{AppError, Result};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::BlockNumber;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Quote price of ETH used when no venue reported a price this cycle.
const DEFAULT_ETH_PRICE_QUOTE: f64 = 2_500.0;

/// Gas units for venues without a table entry.
const DEFAULT_GAS_UNITS: u64 = 150_000;

/// Typical swap gas usage per venue.
fn default_gas_units() -> HashMap<String, u64> {
    [
        ("Uniswap V2", 65_000),
        ("Uniswap V3", 85_000),
        ("SushiSwap", 65_000),
        ("ShibaSwap", 65_000),
        ("SakeSwap", 65_000),
        ("Curve", 95_000),
        ("Balancer", 90_000),
        ("Bancor", 120_000),
        ("Kyber", 75_000),
    ]
    .into_iter()
    .map(|(name, units)| (name.to_string(), units))
    .collect()
}

/// Single-slot cache keyed by block number. Inserting a new key discards
/// whatever the previous block held.
#[derive(Debug, Default)]
pub struct BlockSlot<T> {
    slot: Option<(u64, T)>,
}

impl<T: Clone> BlockSlot<T> {
    pub fn get(&self, key: u64) -> Option<T> {
        match &self.slot {
            Some((k, v)) if *k == key => Some(v.clone()),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: u64, value: T) {
        self.slot = Some((key, value));
    }

    /// Last stored value regardless of key, for last-known fallbacks.
    pub fn last(&self) -> Option<T> {
        self.slot.as_ref().map(|(_, v)| v.clone())
    }
}

/// Estimates the quote-currency cost of one swap leg on a given venue.
///
/// Lookup chain for the gas price: live base fee of the latest block,
/// then the last-known cached value, then the configured fallback. With
/// none of those available the estimate errors and the engine excludes
/// the candidate instead of crashing the cycle.
pub struct GasEstimator {
    provider: Arc<Provider<Http>>,
    units: HashMap<String, u64>,
    multiplier: f64,
    fallback_gas_gwei: Option<f64>,
    base_fee_cache: Mutex<BlockSlot<f64>>,
}

impl GasEstimator {
    pub fn new(
        provider: Arc<Provider<Http>>,
        multiplier: f64,
        fallback_gas_gwei: Option<f64>,
    ) -> Self {
        Self {
            provider,
            units: default_gas_units(),
            multiplier,
            fallback_gas_gwei,
            base_fee_cache: Mutex::new(BlockSlot::default()),
        }
    }

    pub fn gas_units(&self, venue: &str) -> u64 {
        self.units.get(venue).copied().unwrap_or(DEFAULT_GAS_UNITS)
    }

    /// Cost of one swap leg on `venue`, in quote currency.
    ///
    /// `reference_price` is the cycle's ETH price in quote units (any
    /// valid venue observation); absent that, a constant default is used.
    pub async fn cost_in_quote(&self, venue: &str, reference_price: Option<f64>) -> Result<f64> {
        let gas_gwei = self.base_fee_gwei().await?;
        let eth_price = reference_price.unwrap_or(DEFAULT_ETH_PRICE_QUOTE);
        Ok(self.gas_units(venue) as f64 * gas_gwei * 1e-9 * self.multiplier * eth_price)
    }

    /// Current base fee in gwei, cached per block number.
    async fn base_fee_gwei(&self) -> Result<f64> {
        match self.provider.get_block(BlockNumber::Latest).await {
            Ok(Some(block)) => {
                if let (Some(number), Some(base_fee)) = (block.number, block.base_fee_per_gas) {
                    let key = number.as_u64();
                    if let Some(cached) = self.base_fee_cache.lock().unwrap().get(key) {
                        return Ok(cached);
                    }
                    let gwei = base_fee.as_u128() as f64 / 1_000_000_000.0;
                    self.base_fee_cache.lock().unwrap().insert(key, gwei);
                    Ok(gwei)
                } else {
                    self.stale_or_fallback("block missing number or base fee")
                }
            }
            Ok(None) => self.stale_or_fallback("no latest block"),
            Err(e) => self.stale_or_fallback(&e.to_string()),
        }
    }

    fn stale_or_fallback(&self, reason: &str) -> Result<f64> {
        if let Some(last) = self.base_fee_cache.lock().unwrap().last() {
            warn!(reason, "base fee lookup failed, using last-known value");
            return Ok(last);
        }
        if let Some(fallback) = self.fallback_gas_gwei {
            warn!(reason, fallback, "base fee lookup failed, using fallback");
            return Ok(fallback);
        }
        Err(AppError::Gas(reason.to_string()))
    }
}
