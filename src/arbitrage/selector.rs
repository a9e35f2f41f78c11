//! Gas- and fee-adjusted trade selection.
//!
//! Operates on the detector's top candidates only, which bounds the number
//! of gas lookups the engine has to resolve per cycle. Fees and gas can
//! reorder the detector's raw-spread ranking, so every candidate is costed
//! before picking.

use super::types::{ArbitrageOpportunity, BestTrade};
use crate::config::FeeSchedule;
use std::collections::HashMap;
use tracing::debug;

/// Pick the candidate with the highest net profit that fits the available
/// capital.
///
/// `gas_costs` maps venue name to the per-leg gas cost in quote currency;
/// candidates whose buy or sell venue is missing from the map were not
/// evaluable this cycle and are skipped. Returns `None` when no candidate
/// clears `net_profit > 0` within `available_capital` — a normal outcome,
/// not an error.
pub fn select_best(
    candidates: &[ArbitrageOpportunity],
    fees: &FeeSchedule,
    gas_costs: &HashMap<String, f64>,
    available_capital: f64,
    haircut: f64,
) -> Option<BestTrade> {
    let mut best: Option<BestTrade> = None;

    for opp in candidates {
        let (Some(&buy_gas), Some(&sell_gas)) =
            (gas_costs.get(&opp.buy_venue), gas_costs.get(&opp.sell_venue))
        else {
            debug!(
                buy = %opp.buy_venue,
                sell = %opp.sell_venue,
                "skipping candidate without gas estimate"
            );
            continue;
        };

        let buy_fee = fees.fee_for(&opp.buy_venue);
        let sell_fee = fees.fee_for(&opp.sell_venue);
        let buy_price_with_fee = opp.buy_price * (1.0 + buy_fee);
        let sell_price_with_fee = opp.sell_price * (1.0 - sell_fee);
        let price_diff_per_unit = sell_price_with_fee - buy_price_with_fee;
        let gas_total = buy_gas + sell_gas;

        // Haircut leaves margin for slippage on the buy leg.
        let max_units_possible = available_capital / buy_price_with_fee;
        let units_traded = max_units_possible * haircut;
        let capital_needed = units_traded * buy_price_with_fee;
        let gross_profit = units_traded * price_diff_per_unit;
        let net_profit = gross_profit - gas_total;

        let candidate = BestTrade {
            opportunity: opp.clone(),
            buy_fee,
            sell_fee,
            units_traded,
            capital_needed,
            gross_profit,
            gas_total,
            net_profit,
        };
        match &best {
            Some(current) if current.net_profit >= candidate.net_profit => {}
            _ => best = Some(candidate),
        }
    }

    let trade = best?;
    if trade.net_profit <= 0.0 || trade.capital_needed > available_capital {
        debug!(
            net_profit = trade.net_profit,
            capital_needed = trade.capital_needed,
            available_capital,
            "best candidate not executable"
        );
        return None;
    }
    Some(trade)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opp(buy: &str, sell: &str, buy_price: f64, sell_price: f64) -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            buy_venue: buy.to_string(),
            sell_venue: sell.to_string(),
            buy_price,
            sell_price,
            profit_pct: (sell_price - buy_price) / buy_price * 100.0,
        }
    }

    fn gas(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries
            .iter()
            .map(|(name, cost)| (name.to_string(), *cost))
            .collect()
    }

    #[test]
    fn selects_profitable_trade_with_fee_adjusted_sizing() {
        let fees = FeeSchedule::new(0.003);
        let gas = gas(&[("X", 1.0), ("Y", 1.0)]);
        let trade = select_best(&[opp("X", "Y", 100.0, 105.0)], &fees, &gas, 1000.0, 0.9)
            .expect("trade should qualify");

        let buy_px = 100.0 * 1.003;
        let sell_px = 105.0 * 0.997;
        let units = 1000.0 / buy_px * 0.9;
        assert!((trade.units_traded - units).abs() < 1e-12);
        assert!((trade.capital_needed - units * buy_px).abs() < 1e-9);
        assert!((trade.gross_profit - units * (sell_px - buy_px)).abs() < 1e-9);
        assert!((trade.net_profit - (trade.gross_profit - 2.0)).abs() < 1e-12);
        assert!(trade.net_profit > 0.0);
        assert!(trade.capital_needed <= 1000.0);
    }

    #[test]
    fn gas_exceeding_gross_profit_rejects_trade() {
        // Scenario C: a 5% spread whose gas outweighs the gross profit.
        let fees = FeeSchedule::new(0.003);
        let gas = gas(&[("X", 30.0), ("Y", 30.0)]);
        let trade = select_best(&[opp("X", "Y", 100.0, 105.0)], &fees, &gas, 100.0, 0.9);
        assert!(trade.is_none());
    }

    #[test]
    fn fees_and_gas_can_reorder_raw_spread_ranking() {
        // Cheap venue pair with the smaller raw spread nets more than the
        // expensive pair ranked first.
        let fees = FeeSchedule::new(0.003)
            .with_fee("Pricey", 0.02)
            .with_fee("Cheap", 0.001);
        let gas = gas(&[("A", 0.5), ("Pricey", 0.5), ("Cheap", 0.5)]);
        let candidates = vec![
            opp("A", "Pricey", 100.0, 106.0),
            opp("A", "Cheap", 100.0, 105.0),
        ];
        let trade = select_best(&candidates, &fees, &gas, 1000.0, 0.9).unwrap();
        assert_eq!(trade.opportunity.sell_venue, "Cheap");
    }

    #[test]
    fn candidate_without_gas_estimate_is_excluded() {
        let fees = FeeSchedule::new(0.003);
        // Sell venue has no resolvable gas cost.
        let gas = gas(&[("X", 1.0)]);
        assert!(select_best(&[opp("X", "Y", 100.0, 110.0)], &fees, &gas, 1000.0, 0.9).is_none());
    }

    #[test]
    fn zero_capital_yields_no_trade() {
        let fees = FeeSchedule::new(0.003);
        let gas = gas(&[("X", 0.1), ("Y", 0.1)]);
        assert!(select_best(&[opp("X", "Y", 100.0, 110.0)], &fees, &gas, 0.0, 0.9).is_none());
    }

    #[test]
    fn empty_candidate_list_yields_none() {
        let fees = FeeSchedule::new(0.003);
        assert!(select_best(&[], &fees, &HashMap::new(), 1000.0, 0.9).is_none());
    }

    #[test]
    fn fee_heavy_pair_with_negative_edge_is_rejected() {
        // Spread of 0.2% is eaten entirely by two 30 bps fee legs.
        let fees = FeeSchedule::new(0.003);
        let gas = gas(&[("X", 0.0), ("Y", 0.0)]);
        assert!(select_best(&[opp("X", "Y", 100.0, 100.2)], &fees, &gas, 1000.0, 0.9).is_none());
    }
}
