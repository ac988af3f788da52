//! Quoting daemon binary: wires a `RestClient`/`FeedClient` pair to a
//! `QuotingSupervisor` and runs the cooperative event loop until
//! ctrl-c. Config loading from a file is out of scope (spec.md §1);
//! everything here comes from CLI flags with production-sane defaults.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use qm_core::config::{Config, ExchangeConfig, MarketsConfig, ObservabilityConfig, RiskConfig, StrategyConfig, SupervisorConfig};
use qm_core::core::types::RiskLimits;
use qm_core::exchange::{FeedClient, NoopSigner, RestClient};
use qm_core::observability::{init_session_log, FillsLog};
use qm_core::risk::{CircuitBreakerParams, DrawdownParams};
use qm_core::strategy::symmetric::SymmetricParams;
use qm_core::supervisor::{startup, ConnectionSupervisor, QuotingSupervisor};
use qm_core::{runtime, SystemClock};

/// Quoting daemon for a cents-denominated binary-outcome exchange.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Exchange REST base URL.
    #[arg(long, default_value = "https://trading-api.example.invalid/v2")]
    rest_base_url: String,

    /// Exchange streaming WebSocket URL.
    #[arg(long, default_value = "wss://trading-api.example.invalid/ws")]
    ws_url: String,

    /// Comma-separated tickers to quote at startup.
    #[arg(long, value_delimiter = ',')]
    tickers: Vec<String>,

    /// Which strategy to run.
    #[arg(long, default_value = "symmetric")]
    strategy: String,

    /// Log level (also honors RUST_LOG).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Directory for the rolling text session log; omit to log to stdout only.
    #[arg(long)]
    log_dir: Option<String>,

    /// Directory for the line-delimited JSON fills log; omit to disable.
    #[arg(long)]
    fills_log_dir: Option<String>,

    /// Maximum contracts held per market, either side.
    #[arg(long, default_value_t = 500)]
    max_position_per_market: i64,

    /// Maximum total absolute exposure across all markets, in cents.
    #[arg(long, default_value_t = 10_000_00)]
    max_total_exposure: i64,

    /// Daily realized-loss limit, in cents, before trading halts.
    #[arg(long, default_value_t = 5_000_00)]
    max_daily_loss: i64,

    /// Maximum size of any single order this process places.
    #[arg(long, default_value_t = 50)]
    max_order_size: u32,
}

fn build_config(args: &Args) -> Config {
    Config {
        exchange: ExchangeConfig {
            rest_base_url: args.rest_base_url.clone(),
            ws_url: args.ws_url.clone(),
            call_timeout_ms: 30_000,
        },
        markets: MarketsConfig {
            tickers: args.tickers.clone(),
            pinned: Vec::new(),
            scanner_enabled: false,
            scan_interval_secs: 60,
        },
        strategy: match args.strategy.as_str() {
            "symmetric" => StrategyConfig::Symmetric(SymmetricParams {
                edge_cents: 2,
                min_spread_cents: 2,
                size_per_side: 10,
                max_market_spread: 20,
            }),
            "adaptive" => StrategyConfig::Adaptive(Default::default()),
            "optimism_tax" => StrategyConfig::OptimismTax(Default::default()),
            "avellaneda" => StrategyConfig::Avellaneda(Default::default()),
            other => {
                tracing::warn!(strategy = other, "unknown strategy, defaulting to symmetric");
                StrategyConfig::Symmetric(SymmetricParams {
                    edge_cents: 2,
                    min_spread_cents: 2,
                    size_per_side: 10,
                    max_market_spread: 20,
                })
            }
        },
        risk: RiskConfig {
            limits: RiskLimits {
                max_position_per_market: args.max_position_per_market,
                max_total_exposure: args.max_total_exposure,
                max_daily_loss: args.max_daily_loss,
                max_order_size: args.max_order_size,
                min_spread: 1,
            },
            drawdown: DrawdownParams {
                scale_down_start: args.max_daily_loss / 4,
                half_size_drawdown: args.max_daily_loss / 2,
                halt_drawdown: args.max_daily_loss * 3 / 4,
            },
            circuit_breaker: CircuitBreakerParams {
                max_consecutive_losses: 5,
                max_losses_in_window: 8,
                window_ms: 60_000,
                cooldown_ms: 120_000,
            },
        },
        supervisor: SupervisorConfig::default(),
        observability: ObservabilityConfig {
            log_dir: args.log_dir.clone(),
            fills_log_dir: args.fills_log_dir.clone(),
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = build_config(&args);
    config.validate().context("invalid configuration")?;

    std::env::set_var("RUST_LOG", std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()));
    let _log_guard = init_session_log(config.observability.log_dir.as_deref().map(std::path::Path::new));

    tracing::info!(tickers = ?config.markets.tickers, strategy = %args.strategy, "starting quoting daemon");

    let signer = Arc::new(NoopSigner);
    let rest = RestClient::new(config.exchange.rest_base_url.clone(), signer.clone());
    let rest_for_startup = rest.clone();
    let mut feed = FeedClient::new(config.exchange.ws_url.clone(), signer);

    let clock: Arc<dyn qm_core::Clock> = Arc::new(SystemClock);
    let strategy = config.strategy.build();
    let fills_log = config.observability.fills_log_dir.as_ref().map(|dir| FillsLog::new(dir, "fills"));

    let mut supervisor = QuotingSupervisor::new(
        strategy,
        rest,
        clock.clone(),
        config.risk.limits,
        config.risk.drawdown,
        config.risk.circuit_breaker,
        config.supervisor.clone(),
        fills_log,
    );

    startup::reconcile(&mut supervisor, &rest_for_startup, &clock, &config.markets.tickers)
        .await
        .context("startup reconciliation")?;
    startup::connect_and_subscribe(&mut feed, config.markets.tickers.clone())
        .await
        .context("connect and subscribe feed")?;

    let mut connection = ConnectionSupervisor::new(clock, config.supervisor);

    let shutdown_signal = tokio::signal::ctrl_c();
    tokio::select! {
        _ = runtime::run(&mut supervisor, &mut connection, &mut feed) => {}
        _ = shutdown_signal => {
            tracing::info!("ctrl-c received, shutting down");
        }
    }

    runtime::shutdown(&mut supervisor).await;
    Ok(())
}
