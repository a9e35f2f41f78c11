//! Simulated capital accounting.
//!
//! The ledger is the sole owner and sole mutator of the simulated
//! balance: it only ever moves by applying a selected trade's net profit.
//! Two phases, `Running` then terminal `Finalized`.

use crate::arbitrage::BestTrade;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Finalized,
}

/// One executed simulated trade, as appended to the trade log.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub buy_venue: String,
    pub buy_price: f64,
    pub sell_venue: String,
    pub sell_price: f64,
    pub spread_pct: f64,
    pub gas_cost: f64,
    pub net_profit: f64,
    pub balance_after: f64,
    pub units_traded: f64,
    pub buy_fee: f64,
    pub sell_fee: f64,
}

/// Final accounting emitted when the simulation window elapses.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub duration: Duration,
    pub starting_balance: f64,
    pub final_balance: f64,
    pub total_return_pct: f64,
    pub trade_count: u64,
    pub gross_profit: f64,
    pub total_gas: f64,
    pub net_profit: f64,
}

/// Append-only delimited trade log, written one row per trade so partial
/// runs stay inspectable.
pub struct TradeLogWriter {
    file: File,
}

impl TradeLogWriter {
    const HEADER: &'static str = "timestamp,buy_venue,buy_price,sell_venue,sell_price,\
        spread_pct,gas_cost,net_profit,balance_after,units_traded,buy_fee,sell_fee";

    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", Self::HEADER)?;
        file.flush()?;
        Ok(Self { file })
    }

    fn write_record(&mut self, rec: &TradeRecord) -> Result<()> {
        writeln!(
            self.file,
            "{},{},{:.6},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.8},{:.6},{:.6}",
            rec.timestamp.to_rfc3339(),
            rec.buy_venue,
            rec.buy_price,
            rec.sell_venue,
            rec.sell_price,
            rec.spread_pct,
            rec.gas_cost,
            rec.net_profit,
            rec.balance_after,
            rec.units_traded,
            rec.buy_fee,
            rec.sell_fee,
        )?;
        self.file.flush()?;
        Ok(())
    }

    fn write_summary(&mut self, summary: &Summary) -> Result<()> {
        writeln!(self.file, "# summary")?;
        writeln!(
            self.file,
            "# duration_secs={} starting_balance={:.6} final_balance={:.6} \
             total_return_pct={:.6} trade_count={} gross_profit={:.6} \
             total_gas={:.6} net_profit={:.6}",
            summary.duration.as_secs(),
            summary.starting_balance,
            summary.final_balance,
            summary.total_return_pct,
            summary.trade_count,
            summary.gross_profit,
            summary.total_gas,
            summary.net_profit,
        )?;
        self.file.flush()?;
        Ok(())
    }
}

pub struct Ledger {
    phase: Phase,
    starting_balance: f64,
    balance: f64,
    gross_profit: f64,
    total_gas: f64,
    net_profit: f64,
    trade_count: u64,
    started_at: Instant,
    trades: Vec<TradeRecord>,
    writer: Option<TradeLogWriter>,
}

impl Ledger {
    pub fn new(starting_balance: f64, writer: Option<TradeLogWriter>) -> Self {
        Self {
            phase: Phase::Running,
            starting_balance,
            balance: starting_balance,
            gross_profit: 0.0,
            total_gas: 0.0,
            net_profit: 0.0,
            trade_count: 0,
            started_at: Instant::now(),
            trades: Vec::new(),
            writer,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn trade_count(&self) -> u64 {
        self.trade_count
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == Phase::Finalized
    }

    /// Book one selected trade: balance moves by its net profit, totals
    /// accumulate, and a record lands in the append-only log.
    pub fn apply(&mut self, trade: &BestTrade) -> Result<&TradeRecord> {
        if self.phase == Phase::Finalized {
            return Err(AppError::LedgerFinalized);
        }

        self.balance += trade.net_profit;
        self.gross_profit += trade.gross_profit;
        self.total_gas += trade.gas_total;
        self.net_profit += trade.net_profit;
        self.trade_count += 1;

        let record = TradeRecord {
            timestamp: Utc::now(),
            buy_venue: trade.opportunity.buy_venue.clone(),
            buy_price: trade.opportunity.buy_price,
            sell_venue: trade.opportunity.sell_venue.clone(),
            sell_price: trade.opportunity.sell_price,
            spread_pct: trade.opportunity.profit_pct,
            gas_cost: trade.gas_total,
            net_profit: trade.net_profit,
            balance_after: self.balance,
            units_traded: trade.units_traded,
            buy_fee: trade.buy_fee,
            sell_fee: trade.sell_fee,
        };
        if let Some(writer) = &mut self.writer {
            writer.write_record(&record)?;
        }
        self.trades.push(record);
        Ok(self.trades.last().expect("record just pushed"))
    }

    /// Close the books. Terminal: any later `apply` or `finalize` errors.
    pub fn finalize(&mut self) -> Result<Summary> {
        if self.phase == Phase::Finalized {
            return Err(AppError::LedgerFinalized);
        }
        self.phase = Phase::Finalized;

        let summary = Summary {
            duration: self.started_at.elapsed(),
            starting_balance: self.starting_balance,
            final_balance: self.balance,
            total_return_pct: (self.balance - self.starting_balance) / self.starting_balance
                * 100.0,
            trade_count: self.trade_count,
            gross_profit: self.gross_profit,
            total_gas: self.total_gas,
            net_profit: self.net_profit,
        };
        if let Some(writer) = &mut self.writer {
            writer.write_summary(&summary)?;
        }
        Ok(summary)
    }
}
