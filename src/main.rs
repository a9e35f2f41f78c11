use anyhow::Result;
use arb_scanner::{
    config::{AppConfig, FeeSchedule},
    engine::{Engine, EngineConfig},
    gas::GasEstimator,
    ledger::{Ledger, TradeLogWriter},
    models::DashboardState,
    utils::{self, RetryPolicy},
    venues,
};
use ethers::providers::{Http, Provider};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    // Fatal misconfiguration stops here, before the polling loop.
    let cfg = AppConfig::load()?;
    tracing::info!(
        threshold_pct = cfg.threshold_pct,
        poll_secs = cfg.poll_interval.as_secs(),
        simulate = cfg.simulate,
        starting_balance = cfg.starting_balance,
        "[INIT] arb-scanner starting"
    );

    let provider = Arc::new(Provider::<Http>::try_from(cfg.rpc_url.as_str())?);
    let venues = venues::mainnet_venues(provider.clone())?;
    let fees = FeeSchedule::new(cfg.default_fee);
    let gas = GasEstimator::new(provider, cfg.gas_multiplier, cfg.fallback_gas_gwei);

    let engine = Engine::new(
        venues,
        fees,
        gas,
        RetryPolicy::default(),
        EngineConfig {
            threshold_pct: cfg.threshold_pct,
            top_n: cfg.top_n,
            haircut: cfg.haircut,
            poll_interval: cfg.poll_interval,
            sim_duration: cfg.simulate.then_some(cfg.sim_duration),
            simulate: cfg.simulate,
        },
    );

    spawn_dashboard_feed(engine.subscribe(), cfg.dash_enable);

    let writer = if cfg.simulate {
        tracing::info!(path = %cfg.trade_log_path, "[INIT] simulation trade log");
        Some(TradeLogWriter::create(&cfg.trade_log_path)?)
    } else {
        None
    };
    let mut ledger = Ledger::new(cfg.starting_balance, writer);

    let summary = engine.run(&mut ledger).await?;
    tracing::info!(
        duration_secs = summary.duration.as_secs(),
        starting_balance = summary.starting_balance,
        final_balance = summary.final_balance,
        total_return_pct = summary.total_return_pct,
        trade_count = summary.trade_count,
        gross_profit = summary.gross_profit,
        total_gas = summary.total_gas,
        net_profit = summary.net_profit,
        "[SIM] simulation complete"
    );
    Ok(())
}

/// Consume the wholesale-replaced dashboard state. With `DASH_ENABLE` the
/// payload is emitted as one JSON line per cycle for an external server
/// to serve; otherwise only a heartbeat is logged while nothing qualifies.
fn spawn_dashboard_feed(mut rx: watch::Receiver<DashboardState>, dash_enable: bool) {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow().clone();
            if dash_enable {
                match serde_json::to_string(&state) {
                    Ok(payload) => println!("{payload}"),
                    Err(e) => tracing::warn!(error = %e, "dashboard payload serialization failed"),
                }
            } else if state.top_spreads.is_empty() {
                tracing::debug!(
                    prices = state.prices.len(),
                    "[HEARTBEAT] no opps above threshold"
                );
            }
        }
    });
}
