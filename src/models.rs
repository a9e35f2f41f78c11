//! Shared data structures used throughout the application.

use crate::arbitrage::ArbitrageOpportunity;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One venue's reported price for the configured pair in one cycle.
///
/// `None` (or a non-finite value upstream) means the venue failed to
/// report this cycle; it is excluded from detection, not treated as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub venue: String,
    pub price: Option<f64>,
}

impl PriceObservation {
    pub fn valid(venue: impl Into<String>, price: f64) -> Self {
        Self {
            venue: venue.into(),
            price: Some(price),
        }
    }

    pub fn absent(venue: impl Into<String>) -> Self {
        Self {
            venue: venue.into(),
            price: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.price, Some(p) if p.is_finite())
    }
}

/// All price observations collected in one evaluation cycle, one per
/// configured venue. Venue names are unique within a snapshot.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    observations: Vec<PriceObservation>,
}

impl Snapshot {
    pub fn new(observations: Vec<PriceObservation>) -> Self {
        debug_assert!(
            {
                let mut names: Vec<&str> =
                    observations.iter().map(|o| o.venue.as_str()).collect();
                names.sort_unstable();
                names.windows(2).all(|w| w[0] != w[1])
            },
            "duplicate venue in snapshot"
        );
        Self { observations }
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    /// Observations that carry a finite price.
    pub fn valid(&self) -> impl Iterator<Item = &PriceObservation> {
        self.observations.iter().filter(|o| o.is_valid())
    }

    pub fn price_of(&self, venue: &str) -> Option<f64> {
        self.observations
            .iter()
            .find(|o| o.venue == venue)
            .and_then(|o| o.price.filter(|p| p.is_finite()))
    }

    /// First valid price in venue order, used as the reference quote price
    /// for gas conversion (any venue's WETH/DAI price approximates the
    /// ETH price in quote units).
    pub fn first_valid_price(&self) -> Option<f64> {
        self.valid().filter_map(|o| o.price).next()
    }
}

/// One valid venue price as exposed on the dashboard feed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceEntry {
    pub venue: String,
    pub price: f64,
}

/// Latest cycle results for the external reporting boundary, replaced
/// wholesale each cycle (consumers are free to diff).
#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    pub timestamp: DateTime<Utc>,
    pub prices: Vec<PriceEntry>,
    pub top_spreads: Vec<ArbitrageOpportunity>,
    pub warnings: Vec<String>,
}

impl DashboardState {
    pub fn empty() -> Self {
        Self {
            timestamp: Utc::now(),
            prices: Vec::new(),
            top_spreads: Vec::new(),
            warnings: Vec::new(),
        }
    }
}
