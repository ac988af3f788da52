//! Configuration structs (ambient stack, spec.md §1 Non-goals excludes
//! *parsing* a config file from disk, not the `Config` shape itself).
//! Grounded on the teacher's `config::types::Config`: one top-level
//! struct composing per-subsystem structs, every numeric threshold with
//! a `#[serde(default = ...)]` so a partial TOML/YAML document is valid.
//! No `Deserialize` impl here does any I/O; loading a file into this
//! struct is left to the embedding binary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::errors::ConfigError;
use crate::core::types::{RiskLimits, Ticker};
use crate::risk::{CircuitBreakerParams, DrawdownParams};
use crate::strategy::{
    adaptive::{AdaptiveParams, AdaptiveStrategy},
    avellaneda::{AvellanedaParams, AvellanedaStrategy},
    optimism_tax::{OptimismTaxParams, OptimismTaxStrategy},
    symmetric::{SymmetricParams, SymmetricStrategy},
    Strategy,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub markets: MarketsConfig,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    pub supervisor: SupervisorConfig,
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Fatal-at-startup checks (spec.md §7's Configuration error kind):
    /// every pinned ticker must also be in `markets.tickers`, and risk
    /// thresholds must be positive and internally consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for ticker in &self.markets.pinned {
            if !self.markets.tickers.contains(ticker) {
                return Err(ConfigError::UnknownTicker(ticker.clone()));
            }
        }

        let limits = &self.risk.limits;
        if limits.max_position_per_market <= 0 {
            return Err(ConfigError::InvalidThreshold {
                field: "risk.limits.max_position_per_market",
                reason: "must be positive".to_string(),
            });
        }
        if limits.max_total_exposure <= 0 {
            return Err(ConfigError::InvalidThreshold {
                field: "risk.limits.max_total_exposure",
                reason: "must be positive".to_string(),
            });
        }
        if limits.max_order_size == 0 {
            return Err(ConfigError::InvalidThreshold {
                field: "risk.limits.max_order_size",
                reason: "must be positive".to_string(),
            });
        }
        if limits.min_spread == 0 {
            return Err(ConfigError::InvalidThreshold {
                field: "risk.limits.min_spread",
                reason: "must be at least 1 cent".to_string(),
            });
        }

        let drawdown = &self.risk.drawdown;
        if !(drawdown.scale_down_start <= drawdown.half_size_drawdown && drawdown.half_size_drawdown <= drawdown.halt_drawdown) {
            return Err(ConfigError::InvalidThreshold {
                field: "risk.drawdown",
                reason: "scale_down_start <= half_size_drawdown <= halt_drawdown must hold".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub rest_base_url: String,
    pub ws_url: String,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketsConfig {
    /// Tickers quoted at startup; the scanner, if enabled, may add more.
    pub tickers: Vec<Ticker>,
    /// Tickers that should never be removed by the scanner.
    #[serde(default)]
    pub pinned: Vec<Ticker>,
    #[serde(default)]
    pub scanner_enabled: bool,
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
}

fn default_scan_interval_secs() -> u64 {
    60
}

/// Which `Strategy` variant to construct (spec.md §9: selection happens
/// at construction time from configuration, no runtime reflection).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum StrategyConfig {
    Symmetric(SymmetricParams),
    Adaptive(AdaptiveParams),
    OptimismTax(OptimismTaxParams),
    Avellaneda(AvellanedaParams),
}

impl StrategyConfig {
    /// Constructs the concrete strategy this config names, boxed behind
    /// the shared `Strategy` trait so callers don't need to be generic
    /// over which variant was selected.
    pub fn build(&self) -> Box<dyn Strategy> {
        match self {
            StrategyConfig::Symmetric(params) => Box::new(SymmetricStrategy::new(*params)),
            StrategyConfig::Adaptive(params) => Box::new(AdaptiveStrategy::new(*params)),
            StrategyConfig::OptimismTax(params) => Box::new(OptimismTaxStrategy::new(*params)),
            StrategyConfig::Avellaneda(params) => Box::new(AvellanedaStrategy::new(*params)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub limits: RiskLimits,
    pub drawdown: DrawdownParams,
    pub circuit_breaker: CircuitBreakerParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_min_global_interval_ms")]
    pub min_global_interval_ms: i64,
    #[serde(default = "default_min_quote_interval_ms")]
    pub min_quote_interval_ms: i64,
    #[serde(default = "default_min_price_change")]
    pub min_price_change: u32,
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: i64,
    #[serde(default = "default_stale_data_threshold_ms")]
    pub stale_data_threshold_ms: i64,
    #[serde(default = "default_force_reconnect_threshold_ms")]
    pub force_reconnect_threshold_ms: i64,
    /// Retention window for *terminal* (Filled/Cancelled/Failed) orders
    /// before `OrderReconciler::cleanup` evicts them (spec.md §3: "default
    /// 24h").
    #[serde(default = "default_order_max_age_ms")]
    pub order_cleanup_max_age_ms: i64,
    /// How long a still-resting order may go without being replaced before
    /// the health check cancels it outright (spec.md §4.8's
    /// `get_stale_orders`, "used by supervisor for enforcement").
    #[serde(default = "default_stale_order_max_age_ms")]
    pub stale_order_max_age_ms: i64,
    /// Max distance (cents) a resting order's price may drift from current
    /// fair value before the health check cancels it (spec.md §4.8's
    /// `get_off_price_orders`).
    #[serde(default = "default_off_price_max_distance_cents")]
    pub off_price_max_distance_cents: f64,
    /// Per-ticker override of `time_to_expiry`-driven widen/stop thresholds
    /// lives on the strategy params; this is just the metadata refresh
    /// cadence used to keep `time_to_expiry` current.
    #[serde(default = "default_metadata_refresh_secs")]
    pub metadata_refresh_secs: u64,
    /// `AdverseSelectionDetector` window: how many recent fills per ticker
    /// to keep, and how old (ms) one may be before it's ignored.
    #[serde(default = "default_adverse_window_fills")]
    pub adverse_window_fills: usize,
    #[serde(default = "default_adverse_window_ms")]
    pub adverse_window_ms: i64,
    #[serde(default = "default_adverse_threshold_cents")]
    pub adverse_threshold_cents: f64,
    /// `VolatilityEstimator` window: how many recent mid snapshots per
    /// ticker to keep, and the range (cents) past which a market is
    /// flagged volatile.
    #[serde(default = "default_volatility_window_ticks")]
    pub volatility_window_ticks: usize,
    #[serde(default = "default_volatility_threshold_cents")]
    pub volatility_threshold_cents: f64,
}

fn default_min_global_interval_ms() -> i64 {
    200
}
fn default_min_quote_interval_ms() -> i64 {
    1_000
}
fn default_min_price_change() -> u32 {
    1
}
fn default_health_check_interval_ms() -> i64 {
    30_000
}
fn default_stale_data_threshold_ms() -> i64 {
    120_000
}
fn default_force_reconnect_threshold_ms() -> i64 {
    300_000
}
fn default_order_max_age_ms() -> i64 {
    86_400_000
}
fn default_stale_order_max_age_ms() -> i64 {
    300_000
}
fn default_off_price_max_distance_cents() -> f64 {
    10.0
}
fn default_metadata_refresh_secs() -> u64 {
    600
}
fn default_adverse_window_fills() -> usize {
    20
}
fn default_adverse_window_ms() -> i64 {
    60_000
}
fn default_adverse_threshold_cents() -> f64 {
    2.0
}
fn default_volatility_window_ticks() -> usize {
    20
}
fn default_volatility_threshold_cents() -> f64 {
    5.0
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            min_global_interval_ms: default_min_global_interval_ms(),
            min_quote_interval_ms: default_min_quote_interval_ms(),
            min_price_change: default_min_price_change(),
            health_check_interval_ms: default_health_check_interval_ms(),
            stale_data_threshold_ms: default_stale_data_threshold_ms(),
            force_reconnect_threshold_ms: default_force_reconnect_threshold_ms(),
            order_cleanup_max_age_ms: default_order_max_age_ms(),
            stale_order_max_age_ms: default_stale_order_max_age_ms(),
            off_price_max_distance_cents: default_off_price_max_distance_cents(),
            metadata_refresh_secs: default_metadata_refresh_secs(),
            adverse_window_fills: default_adverse_window_fills(),
            adverse_window_ms: default_adverse_window_ms(),
            adverse_threshold_cents: default_adverse_threshold_cents(),
            volatility_window_ticks: default_volatility_window_ticks(),
            volatility_threshold_cents: default_volatility_threshold_cents(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default)]
    pub fills_log_dir: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            fills_log_dir: None,
        }
    }
}

/// Per-ticker runtime metadata cached from `get_market`, used to compute
/// `time_to_expiry` (spec.md §4.9 step 2).
#[derive(Debug, Clone, Default)]
pub struct MarketMetadataCache {
    close_times: HashMap<Ticker, i64>,
}

impl MarketMetadataCache {
    pub fn insert(&mut self, ticker: &str, close_time_ms: i64) {
        self.close_times.insert(ticker.to_string(), close_time_ms);
    }

    /// Seconds until close, or `None` if metadata hasn't been fetched yet.
    pub fn time_to_expiry_secs(&self, ticker: &str, now_ms: i64) -> Option<f64> {
        let close = *self.close_times.get(ticker)?;
        Some(((close - now_ms).max(0)) as f64 / 1_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            exchange: ExchangeConfig {
                rest_base_url: "https://example.invalid".into(),
                ws_url: "wss://example.invalid".into(),
                call_timeout_ms: 30_000,
            },
            markets: MarketsConfig {
                tickers: vec!["T".into()],
                pinned: vec!["T".into()],
                scanner_enabled: false,
                scan_interval_secs: 60,
            },
            strategy: StrategyConfig::Symmetric(SymmetricParams {
                edge_cents: 1,
                min_spread_cents: 2,
                size_per_side: 5,
                max_market_spread: 20,
            }),
            risk: RiskConfig {
                limits: RiskLimits {
                    max_position_per_market: 100,
                    max_total_exposure: 1_000,
                    max_daily_loss: 10_000,
                    max_order_size: 50,
                    min_spread: 1,
                },
                drawdown: DrawdownParams {
                    scale_down_start: 1_000,
                    half_size_drawdown: 2_000,
                    halt_drawdown: 3_000,
                },
                circuit_breaker: CircuitBreakerParams {
                    max_consecutive_losses: 5,
                    max_losses_in_window: 5,
                    window_ms: 60_000,
                    cooldown_ms: 60_000,
                },
            },
            supervisor: SupervisorConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }

    #[test]
    fn validate_accepts_well_formed_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_pinned_ticker_not_in_tickers() {
        let mut config = valid_config();
        config.markets.pinned.push("OTHER".into());
        assert!(matches!(config.validate(), Err(ConfigError::UnknownTicker(t)) if t == "OTHER"));
    }

    #[test]
    fn validate_rejects_inverted_drawdown_thresholds() {
        let mut config = valid_config();
        config.risk.drawdown.half_size_drawdown = 500;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThreshold { field: "risk.drawdown", .. })));
    }

    #[test]
    fn time_to_expiry_counts_down_to_zero() {
        let mut cache = MarketMetadataCache::default();
        cache.insert("T", 10_000);
        assert!((cache.time_to_expiry_secs("T", 5_000).unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(cache.time_to_expiry_secs("T", 20_000), Some(0.0));
    }

    #[test]
    fn unknown_ticker_has_no_expiry() {
        let cache = MarketMetadataCache::default();
        assert_eq!(cache.time_to_expiry_secs("NOPE", 0), None);
    }
}
