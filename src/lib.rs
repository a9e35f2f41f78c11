//! Core library for the arb-scanner project.
//!
//! Polls a set of DEX venues for one trading pair, ranks cross-venue
//! spreads, and (in simulation mode) books the best net-profitable
//! trade each cycle against a simulated ledger.

pub mod arbitrage;
pub mod config;
pub mod engine;
pub mod errors;
pub mod gas;
pub mod ledger;
pub mod models;
pub mod utils;
pub mod venues;
