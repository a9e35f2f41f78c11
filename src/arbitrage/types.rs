use serde::Serialize;

/// One profitable directed venue pair found by the detector.
///
/// Invariants: `buy_venue != sell_venue`, `sell_price > buy_price` beyond
/// floating-point noise, and `profit_pct` exceeds the configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageOpportunity {
    pub buy_venue: String,
    pub sell_venue: String,
    pub buy_price: f64,
    pub sell_price: f64,
    /// Raw spread in percent: `(sell - buy) / buy * 100`.
    pub profit_pct: f64,
}

/// The selector's sized, fee- and gas-adjusted pick for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct BestTrade {
    pub opportunity: ArbitrageOpportunity,
    pub buy_fee: f64,
    pub sell_fee: f64,
    pub units_traded: f64,
    pub capital_needed: f64,
    pub gross_profit: f64,
    pub gas_total: f64,
    pub net_profit: f64,
}
