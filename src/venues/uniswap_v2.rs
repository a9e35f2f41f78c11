//! Constant-product pair adapter for Uniswap V2 and its clones
//! (SushiSwap, ShibaSwap, SakeSwap share the pair interface).

use super::PriceVenue;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use ethers::{
    contract::abigen,
    providers::{Http, Provider},
    types::Address,
};
use std::sync::Arc;

abigen!(
    UniswapV2Pair,
    r#"[
        function getReserves() view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast)
        function token0() view returns (address)
        function token1() view returns (address)
    ]"#,
);

/// One Uniswap V2-compatible pair priced as quote per base.
pub struct V2StylePool {
    name: String,
    pair: UniswapV2Pair<Provider<Http>>,
    base: Address,
    base_decimals: u8,
    quote: Address,
    quote_decimals: u8,
}

impl V2StylePool {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        provider: Arc<Provider<Http>>,
        pair_addr: Address,
        base: Address,
        base_decimals: u8,
        quote: Address,
        quote_decimals: u8,
    ) -> Self {
        Self {
            name: name.into(),
            pair: UniswapV2Pair::new(pair_addr, provider),
            base,
            base_decimals,
            quote,
            quote_decimals,
        }
    }
}

#[async_trait]
impl PriceVenue for V2StylePool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn spot_price(&self) -> Result<f64> {
        let (reserve0, reserve1, _) = self.pair.get_reserves().call().await?;
        let token0 = self.pair.token_0().call().await?;
        let token1 = self.pair.token_1().call().await?;

        // Reject pairs that do not hold exactly the configured tokens.
        let (base_reserve, quote_reserve) = if token0 == self.base && token1 == self.quote {
            (reserve0, reserve1)
        } else if token0 == self.quote && token1 == self.base {
            (reserve1, reserve0)
        } else {
            return Err(AppError::Venue(format!(
                "{}: pair tokens do not match configured pair",
                self.name
            )));
        };

        if base_reserve == 0 || quote_reserve == 0 {
            return Err(AppError::Venue(format!("{}: zero reserves", self.name)));
        }

        let base_units = base_reserve as f64 / 10_f64.powi(self.base_decimals as i32);
        let quote_units = quote_reserve as f64 / 10_f64.powi(self.quote_decimals as i32);
        Ok(quote_units / base_units)
    }
}
