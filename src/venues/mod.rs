//! Venue price adapters.
//!
//! Each venue is a thin adapter returning a spot price for the configured
//! pair. Adapter failures of any cause (RPC error, pair mismatch, zero
//! liquidity) are recovered here and surface to the engine as an absent
//! observation, never as a propagated error.

use crate::errors::{AppError, Result};
use crate::models::{PriceObservation, Snapshot};
use crate::utils::{RetryPolicy, with_retry};
use async_trait::async_trait;
use ethers::providers::{Http, Provider};
use ethers::types::Address;
use futures::future::join_all;
use std::sync::Arc;
use tracing::warn;

pub mod uniswap_v2;
pub mod uniswap_v3;

pub use uniswap_v2::V2StylePool;
pub use uniswap_v3::V3Pool;

/// One price source for the configured pair.
#[async_trait]
pub trait PriceVenue: Send + Sync {
    fn name(&self) -> &str;

    /// Spot price of one base unit in quote currency.
    async fn spot_price(&self) -> Result<f64>;
}

/// Query every venue concurrently and assemble one immutable snapshot.
///
/// The uniform retry policy replaces the per-adapter ad hoc loops; a venue
/// that still fails after retries contributes an absent observation and
/// never blocks the cycle.
pub async fn collect_snapshot(venues: &[Arc<dyn PriceVenue>], retry: &RetryPolicy) -> Snapshot {
    let observations = join_all(venues.iter().map(|venue| async move {
        match with_retry(retry, venue.name(), || venue.spot_price()).await {
            Ok(price) if price.is_finite() && price > 0.0 => {
                PriceObservation::valid(venue.name(), price)
            }
            Ok(price) => {
                warn!(venue = venue.name(), price, "venue reported unusable price");
                PriceObservation::absent(venue.name())
            }
            Err(e) => {
                warn!(venue = venue.name(), error = %e, "venue price fetch failed");
                PriceObservation::absent(venue.name())
            }
        }
    }))
    .await;
    Snapshot::new(observations)
}

// Mainnet WETH/DAI deployments.
const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
const DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
const UNISWAP_V2_PAIR: &str = "0xA478c2975Ab1Ea89e8196811F51A7B7Ade33eB11";
const SUSHISWAP_PAIR: &str = "0xC3D03e4F041Fd4cD388c549Ee2A29a9E5075882f";
const SHIBASWAP_PAIR: &str = "0x8faf958E36c6970497386118030e6297fFf8d275";
const SAKESWAP_PAIR: &str = "0x2ad95483ac838E2884563aD278e933fba96Bc242";
const UNISWAP_V3_POOL: &str = "0xC2e9F25Be6257c210d7Adf0D4Cd6E3E881ba25f8";

fn address(env_key: &str, default: &str) -> Result<Address> {
    let raw = std::env::var(env_key).unwrap_or_else(|_| default.to_string());
    raw.parse::<Address>()
        .map_err(|e| AppError::Config(format!("{env_key}: invalid address {raw}: {e}")))
}

/// Build the default mainnet WETH/DAI venue set. Pair addresses can be
/// overridden per venue via `<NAME>_PAIR` / `UNISWAP_V3_POOL` env vars.
pub fn mainnet_venues(provider: Arc<Provider<Http>>) -> Result<Vec<Arc<dyn PriceVenue>>> {
    let weth = address("WETH_ADDRESS", WETH)?;
    let dai = address("DAI_ADDRESS", DAI)?;

    let v2_pairs = [
        ("Uniswap V2", "UNISWAP_V2_PAIR", UNISWAP_V2_PAIR),
        ("SushiSwap", "SUSHISWAP_PAIR", SUSHISWAP_PAIR),
        ("ShibaSwap", "SHIBASWAP_PAIR", SHIBASWAP_PAIR),
        ("SakeSwap", "SAKESWAP_PAIR", SAKESWAP_PAIR),
    ];

    let mut venues: Vec<Arc<dyn PriceVenue>> = Vec::new();
    for (name, env_key, default) in v2_pairs {
        venues.push(Arc::new(V2StylePool::new(
            name,
            provider.clone(),
            address(env_key, default)?,
            weth,
            18,
            dai,
            18,
        )));
    }
    // DAI sorts below WETH, so the V3 pool has DAI as token0 and WETH as
    // token1: the base asset is token1.
    venues.push(Arc::new(V3Pool::new(
        "Uniswap V3",
        provider.clone(),
        address("UNISWAP_V3_POOL", UNISWAP_V3_POOL)?,
        18,
        18,
        false,
    )));
    Ok(venues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct FixedVenue {
        name: &'static str,
        price: Option<f64>,
    }

    #[async_trait]
    impl PriceVenue for FixedVenue {
        fn name(&self) -> &str {
            self.name
        }

        async fn spot_price(&self) -> Result<f64> {
            self.price
                .ok_or_else(|| AppError::Venue(format!("{}: unavailable", self.name)))
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn failing_venue_contributes_absent_observation() {
        let venues: Vec<Arc<dyn PriceVenue>> = vec![
            Arc::new(FixedVenue {
                name: "X",
                price: Some(100.0),
            }),
            Arc::new(FixedVenue {
                name: "Y",
                price: None,
            }),
        ];
        let snap = collect_snapshot(&venues, &fast_retry()).await;
        assert_eq!(snap.observations().len(), 2);
        assert_eq!(snap.price_of("X"), Some(100.0));
        assert_eq!(snap.price_of("Y"), None);
    }

    #[tokio::test]
    async fn non_positive_price_is_treated_as_absent() {
        let venues: Vec<Arc<dyn PriceVenue>> = vec![Arc::new(FixedVenue {
            name: "Z",
            price: Some(0.0),
        })];
        let snap = collect_snapshot(&venues, &fast_retry()).await;
        assert_eq!(snap.valid().count(), 0);
    }

    #[test]
    fn mainnet_defaults_parse() {
        let provider = Arc::new(Provider::<Http>::try_from("http://localhost:8545").unwrap());
        let venues = mainnet_venues(provider).unwrap();
        let names: Vec<&str> = venues.iter().map(|v| v.name()).collect();
        assert_eq!(
            names,
            vec!["Uniswap V2", "SushiSwap", "ShibaSwap", "SakeSwap", "Uniswap V3"]
        );
    }
}
