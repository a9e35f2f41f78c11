//! Uniswap V3 pool adapter: spot price from `slot0.sqrtPriceX96`.

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
    UniswapV3PoolContract,
    r#"[
        function slot0() view returns (uint160 sqrtPriceX96, int24 tick, uint16 observationIndex, uint16 observationCardinality, uint16 observationCardinalityNext, uint8 feeProtocol, bool unlocked)
    ]"#,
);

/// One Uniswap V3 pool priced as quote per base.
pub struct V3Pool {
    name: String,
    pool: UniswapV3PoolContract<Provider<Http>>,
    token0_decimals: u8,
    token1_decimals: u8,
    /// Whether the base asset is the pool's token0.
    base_is_token0: bool,
}

impl V3Pool {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<Provider<Http>>,
        pool_addr: Address,
        token0_decimals: u8,
        token1_decimals: u8,
        base_is_token0: bool,
    ) -> Self {
        Self {
            name: name.into(),
            pool: UniswapV3PoolContract::new(pool_addr, provider),
            token0_decimals,
            token1_decimals,
            base_is_token0,
        }
    }

    /// Convert sqrtPriceX96 into a human price of token0 in token1 units.
    fn price_token0_in_token1(&self, sqrt_price_x96_dec: &str) -> f64 {
        let sqrt_q96 = sqrt_price_x96_dec.parse::<f64>().unwrap_or(0.0) / 2.0_f64.powi(96);
        // ratio = token1_raw / token0_raw
        let ratio = sqrt_q96 * sqrt_q96;
        ratio * 10_f64.powi(self.token0_decimals as i32 - self.token1_decimals as i32)
    }
}

#[async_trait]
impl PriceVenue for V3Pool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn spot_price(&self) -> Result<f64> {
        let (sqrt_price_x96, _, _, _, _, _, _) = self.pool.slot_0().call().await?;
        let price_t0_in_t1 = self.price_token0_in_token1(&sqrt_price_x96.to_string());
        if price_t0_in_t1 <= 0.0 || !price_t0_in_t1.is_finite() {
            return Err(AppError::Venue(format!(
                "{}: pool reports zero price",
                self.name
            )));
        }
        if self.base_is_token0 {
            Ok(price_t0_in_t1)
        } else {
            Ok(1.0 / price_t0_in_t1)
        }
    }
}
