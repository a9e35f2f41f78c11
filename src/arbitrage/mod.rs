pub mod detector;
pub mod selector;
pub mod types;

pub use detector::{Detection, EPSILON, detect};
pub use selector::select_best;
pub use types::{ArbitrageOpportunity, BestTrade};
