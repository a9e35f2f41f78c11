//! Cross-venue spread detection.
//!
//! Pure ranking over one immutable snapshot; fee and gas adjustment is
//! deliberately left to the selector so the dashboard ranks raw spreads.

use super::types::ArbitrageOpportunity;
use crate::models::Snapshot;

/// Guards against floating-point noise qualifying at a zero threshold.
pub const EPSILON: f64 = 1e-8;

/// Detector output for one cycle.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Qualifying pairs, best spread first, capped at the configured size.
    pub top: Vec<ArbitrageOpportunity>,
    pub warnings: Vec<String>,
}

/// Rank every directed venue pair in `snapshot` by raw spread.
///
/// Observations without a finite price are excluded. A pair qualifies when
/// `sell_price > buy_price` and its spread exceeds both `EPSILON` and
/// `threshold_pct`. The result is sorted descending by `profit_pct`
/// (encounter order preserved on ties) and truncated to `top_n`.
/// O(n²) in valid venue count, which stays small.
pub fn detect(snapshot: &Snapshot, threshold_pct: f64, top_n: usize) -> Detection {
    let valid: Vec<(&str, f64)> = snapshot
        .valid()
        .filter_map(|o| Some((o.venue.as_str(), o.price?)))
        .collect();

    let floor = EPSILON.max(threshold_pct);
    let mut opportunities = Vec::new();
    for &(buy_venue, buy_price) in &valid {
        for &(sell_venue, sell_price) in &valid {
            if buy_venue == sell_venue {
                continue;
            }
            let profit_pct = (sell_price - buy_price) / buy_price * 100.0;
            if sell_price > buy_price && profit_pct > floor {
                opportunities.push(ArbitrageOpportunity {
                    buy_venue: buy_venue.to_string(),
                    sell_venue: sell_venue.to_string(),
                    buy_price,
                    sell_price,
                    profit_pct,
                });
            }
        }
    }

    // Stable sort keeps first-encounter order for equal spreads.
    opportunities.sort_by(|a, b| b.profit_pct.total_cmp(&a.profit_pct));
    opportunities.truncate(top_n);

    let warnings = if opportunities.is_empty() {
        vec!["No arbitrage opportunities found.".to_string()]
    } else {
        Vec::new()
    };

    Detection {
        top: opportunities,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceObservation;

    fn snapshot(entries: &[(&str, Option<f64>)]) -> Snapshot {
        Snapshot::new(
            entries
                .iter()
                .map(|(name, price)| match price {
                    Some(p) => PriceObservation::valid(*name, *p),
                    None => PriceObservation::absent(*name),
                })
                .collect(),
        )
    }

    #[test]
    fn finds_simple_spread_and_skips_absent_venue() {
        // Scenario A: {X: 100, Y: 105, Z: absent} at threshold 0.
        let snap = snapshot(&[("X", Some(100.0)), ("Y", Some(105.0)), ("Z", None)]);
        let det = detect(&snap, 0.0, 3);
        assert_eq!(det.top.len(), 1);
        let opp = &det.top[0];
        assert_eq!(opp.buy_venue, "X");
        assert_eq!(opp.sell_venue, "Y");
        assert!((opp.profit_pct - 5.0).abs() < 1e-12);
        assert!(det.warnings.is_empty());
    }

    #[test]
    fn sub_epsilon_spread_does_not_qualify() {
        // Spread of ~1e-9 percent sits below EPSILON at threshold 0.
        let snap = snapshot(&[("X", Some(100.0)), ("Y", Some(100.000_000_001))]);
        let det = detect(&snap, 0.0, 3);
        assert!(det.top.is_empty());
        assert_eq!(det.warnings, vec!["No arbitrage opportunities found."]);
    }

    #[test]
    fn identical_prices_yield_warning() {
        let snap = snapshot(&[("A", Some(250.0)), ("B", Some(250.0)), ("C", Some(250.0))]);
        let det = detect(&snap, 0.0, 3);
        assert!(det.top.is_empty());
        assert_eq!(det.warnings, vec!["No arbitrage opportunities found."]);
    }

    #[test]
    fn fewer_than_two_valid_observations_yield_nothing() {
        let det = detect(&snapshot(&[("A", Some(100.0)), ("B", None)]), 0.0, 3);
        assert!(det.top.is_empty());
        let det = detect(&snapshot(&[]), 0.0, 3);
        assert!(det.top.is_empty());
    }

    #[test]
    fn results_are_capped_and_sorted_descending() {
        let snap = snapshot(&[
            ("A", Some(100.0)),
            ("B", Some(102.0)),
            ("C", Some(104.0)),
            ("D", Some(106.0)),
        ]);
        let det = detect(&snap, 0.0, 3);
        assert_eq!(det.top.len(), 3);
        for pair in det.top.windows(2) {
            assert!(pair[0].profit_pct >= pair[1].profit_pct);
        }
        // Best spread is buy A, sell D.
        assert_eq!(det.top[0].buy_venue, "A");
        assert_eq!(det.top[0].sell_venue, "D");
        assert!((det.top[0].profit_pct - 6.0).abs() < 1e-12);
    }

    #[test]
    fn threshold_filters_small_spreads() {
        let snap = snapshot(&[("X", Some(100.0)), ("Y", Some(101.0))]);
        assert_eq!(detect(&snap, 0.5, 3).top.len(), 1);
        assert!(detect(&snap, 1.0, 3).top.is_empty());
        assert!(detect(&snap, 2.0, 3).top.is_empty());
    }

    #[test]
    fn no_self_pairs_and_strictly_positive_spreads() {
        let snap = snapshot(&[
            ("A", Some(99.0)),
            ("B", Some(101.0)),
            ("C", Some(100.0)),
            ("D", Some(98.5)),
        ]);
        let det = detect(&snap, 0.0, 10);
        for opp in &det.top {
            assert_ne!(opp.buy_venue, opp.sell_venue);
            assert!(opp.sell_price > opp.buy_price);
            assert!(opp.profit_pct > 0.0);
        }
    }

    #[test]
    fn detection_is_idempotent() {
        let snap = snapshot(&[("A", Some(100.0)), ("B", Some(103.0)), ("C", Some(101.0))]);
        let first = detect(&snap, 0.0, 3);
        let second = detect(&snap, 0.0, 3);
        assert_eq!(first.top, second.top);
        assert_eq!(first.warnings, second.warnings);
    }

    #[test]
    fn nan_price_is_excluded_not_zero() {
        let snap = snapshot(&[("A", Some(f64::NAN)), ("B", Some(100.0))]);
        let det = detect(&snap, 0.0, 3);
        assert!(det.top.is_empty());
    }
}
