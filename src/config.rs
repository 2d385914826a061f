//! Configuration types for spot-agent

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration as StdDuration;
use thiserror::Error;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub backtest: BacktestSettings,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub autopilot: AutopilotConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Execution mode: paper trading or live
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Paper,
    Live,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Paper => "paper",
            ExecutionMode::Live => "live",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application paths
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Directory holding candles/orderbook/news Parquet files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// JSON ledger of intents, approvals, executions and audit entries
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

fn default_app_name() -> String {
    "spot-agent".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_state_file() -> PathBuf {
    PathBuf::from("./data/ledger.json")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            data_dir: default_data_dir(),
            state_file: default_state_file(),
        }
    }
}

/// Trading guardrails and live order management
#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    #[serde(default = "default_whitelist")]
    pub symbol_whitelist: Vec<String>,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    /// Candles loaded for each proposal
    #[serde(default = "default_candle_limit")]
    pub candle_limit: usize,
    #[serde(default)]
    pub kill_switch: bool,
    #[serde(default = "default_true")]
    pub require_approval: bool,
    #[serde(default = "default_approval_phrase")]
    pub approval_phrase: String,
    /// Configuration half of the live-trading double consent
    #[serde(default)]
    pub i_understand_live_trading: bool,
    /// Refuse live execution entirely
    #[serde(default = "default_true")]
    pub dry_run: bool,
    #[serde(default = "default_true")]
    pub post_only: bool,
    #[serde(default = "default_order_timeout_secs")]
    pub order_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_cancel_timeout_secs")]
    pub cancel_timeout_secs: u64,
    /// Upper bound for any single gateway request
    #[serde(default = "default_gateway_call_timeout_secs")]
    pub gateway_call_timeout_secs: u64,
    #[serde(default = "default_intent_ttl_secs")]
    pub intent_ttl_secs: u64,
    /// Base-asset precision; sizes round toward zero at this scale
    #[serde(default = "default_size_decimals")]
    pub size_decimals: u32,
    #[serde(default)]
    pub maker_emulation: MakerEmulationConfig,
}

fn default_true() -> bool {
    true
}
fn default_whitelist() -> Vec<String> {
    vec!["BTC/JPY".to_string()]
}
fn default_timeframe() -> String {
    "1m".to_string()
}
fn default_candle_limit() -> usize {
    500
}
fn default_approval_phrase() -> String {
    "I APPROVE".to_string()
}
fn default_order_timeout_secs() -> u64 {
    30
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_cancel_timeout_secs() -> u64 {
    10
}
fn default_gateway_call_timeout_secs() -> u64 {
    10
}
fn default_intent_ttl_secs() -> u64 {
    900
}
fn default_size_decimals() -> u32 {
    8
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbol_whitelist: default_whitelist(),
            timeframe: default_timeframe(),
            candle_limit: default_candle_limit(),
            kill_switch: false,
            require_approval: true,
            approval_phrase: default_approval_phrase(),
            i_understand_live_trading: false,
            dry_run: true,
            post_only: true,
            order_timeout_secs: default_order_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            cancel_timeout_secs: default_cancel_timeout_secs(),
            gateway_call_timeout_secs: default_gateway_call_timeout_secs(),
            intent_ttl_secs: default_intent_ttl_secs(),
            size_decimals: default_size_decimals(),
            maker_emulation: MakerEmulationConfig::default(),
        }
    }
}

impl TradingConfig {
    pub fn intent_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.intent_ttl_secs as i64)
    }

    pub fn order_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.order_timeout_secs)
    }

    pub fn poll_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.poll_interval_ms)
    }

    pub fn cancel_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.cancel_timeout_secs)
    }

    pub fn gateway_call_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.gateway_call_timeout_secs)
    }
}

/// Price padding used when the exchange has no native post-only flag
#[derive(Debug, Clone, Deserialize)]
pub struct MakerEmulationConfig {
    #[serde(default = "default_buffer_bps")]
    pub buffer_bps: Decimal,
    /// Prefer the exchange price tick as the pad when it is known
    #[serde(default = "default_true")]
    pub use_tick: bool,
}

fn default_buffer_bps() -> Decimal {
    Decimal::new(1, 1) // 0.1 bps
}

impl Default for MakerEmulationConfig {
    fn default() -> Self {
        Self {
            buffer_bps: default_buffer_bps(),
            use_tick: true,
        }
    }
}

/// Hard risk limits (quote currency amounts)
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_capital")]
    pub capital: Decimal,
    /// Maximum position value as fraction of capital
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: Decimal,
    #[serde(default = "default_max_order_notional")]
    pub max_order_notional: Decimal,
    #[serde(default = "default_max_loss_per_trade")]
    pub max_loss_per_trade: Decimal,
    #[serde(default = "default_max_loss_per_day")]
    pub max_loss_per_day: Decimal,
    #[serde(default = "default_max_orders_per_day")]
    pub max_orders_per_day: u32,
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,
    /// Price move (fraction) since the last execution that bypasses the cooldown
    #[serde(default = "default_cooldown_bypass_pct")]
    pub cooldown_bypass_pct: Decimal,
}

fn default_capital() -> Decimal {
    dec!(500000)
}
fn default_max_position_pct() -> Decimal {
    Decimal::new(2, 1) // 0.2
}
fn default_max_order_notional() -> Decimal {
    dec!(50000)
}
fn default_max_loss_per_trade() -> Decimal {
    dec!(5000)
}
fn default_max_loss_per_day() -> Decimal {
    dec!(15000)
}
fn default_max_orders_per_day() -> u32 {
    5
}
fn default_cooldown_minutes() -> u64 {
    5
}
fn default_cooldown_bypass_pct() -> Decimal {
    Decimal::new(2, 2) // 0.02
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            capital: default_capital(),
            max_position_pct: default_max_position_pct(),
            max_order_notional: default_max_order_notional(),
            max_loss_per_trade: default_max_loss_per_trade(),
            max_loss_per_day: default_max_loss_per_day(),
            max_orders_per_day: default_max_orders_per_day(),
            cooldown_minutes: default_cooldown_minutes(),
            cooldown_bypass_pct: default_cooldown_bypass_pct(),
        }
    }
}

impl RiskConfig {
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cooldown_minutes as i64)
    }
}

/// Paper fill simulation
#[derive(Debug, Clone, Deserialize)]
pub struct PaperConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: Decimal,
    #[serde(default = "default_fee_bps")]
    pub fee_bps: Decimal,
    /// Probability that an order fills at all within its time in force
    #[serde(default = "default_one")]
    pub fill_probability: Decimal,
    /// Probability that a fill is partial (ignored for FOK)
    #[serde(default)]
    pub partial_fill_probability: Decimal,
    /// Lower bound of the partial fill ratio
    #[serde(default = "default_min_fill_ratio")]
    pub min_fill_ratio: Decimal,
    /// Spread used to synthesize a book from a price
    #[serde(default = "default_spread_bps")]
    pub spread_bps: Decimal,
    #[serde(default = "default_max_snapshot_age_secs")]
    pub max_snapshot_age_secs: u64,
}

fn default_seed() -> u64 {
    42
}
fn default_slippage_bps() -> Decimal {
    dec!(5)
}
fn default_fee_bps() -> Decimal {
    dec!(10)
}
fn default_one() -> Decimal {
    Decimal::ONE
}
fn default_min_fill_ratio() -> Decimal {
    Decimal::new(25, 2) // 0.25
}
fn default_spread_bps() -> Decimal {
    dec!(2)
}
fn default_max_snapshot_age_secs() -> u64 {
    120
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            slippage_bps: default_slippage_bps(),
            fee_bps: default_fee_bps(),
            fill_probability: Decimal::ONE,
            partial_fill_probability: Decimal::ZERO,
            min_fill_ratio: default_min_fill_ratio(),
            spread_bps: default_spread_bps(),
            max_snapshot_age_secs: default_max_snapshot_age_secs(),
        }
    }
}

impl PaperConfig {
    pub fn max_snapshot_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_snapshot_age_secs as i64)
    }
}

/// Backtest cost model
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestSettings {
    #[serde(default = "default_maker_fee_bps")]
    pub maker_fee_bps: Decimal,
    #[serde(default = "default_fee_bps")]
    pub taker_fee_bps: Decimal,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: Decimal,
    #[serde(default = "default_true")]
    pub assume_taker: bool,
    /// Defaults to `risk.capital` when absent
    #[serde(default)]
    pub initial_capital: Option<Decimal>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_maker_fee_bps() -> Decimal {
    dec!(5)
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            maker_fee_bps: default_maker_fee_bps(),
            taker_fee_bps: default_fee_bps(),
            slippage_bps: default_slippage_bps(),
            assume_taker: true,
            initial_capital: None,
            output_dir: default_output_dir(),
        }
    }
}

impl BacktestSettings {
    pub fn fee_bps(&self) -> Decimal {
        if self.assume_taker {
            self.taker_fee_bps
        } else {
            self.maker_fee_bps
        }
    }
}

/// News feature windowing
#[derive(Debug, Clone, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_lookback_hours")]
    pub sentiment_lookback_hours: u64,
    /// Delay between ingestion and a row becoming visible to strategies
    #[serde(default = "default_news_latency_seconds")]
    pub news_latency_seconds: u64,
}

fn default_lookback_hours() -> u64 {
    12
}
fn default_news_latency_seconds() -> u64 {
    600
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            sentiment_lookback_hours: default_lookback_hours(),
            news_latency_seconds: default_news_latency_seconds(),
        }
    }
}

/// Strategy parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub news_overlay: NewsOverlayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaselineConfig {
    #[serde(default = "default_sma_period")]
    pub sma_period: usize,
    #[serde(default = "default_momentum_lookback")]
    pub momentum_lookback: usize,
    /// Fraction of capital per signal
    #[serde(default = "default_base_position_pct")]
    pub base_position_pct: Decimal,
}

fn default_sma_period() -> usize {
    20
}
fn default_momentum_lookback() -> usize {
    10
}
fn default_base_position_pct() -> Decimal {
    Decimal::new(1, 1) // 0.1
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            sma_period: default_sma_period(),
            momentum_lookback: default_momentum_lookback(),
            base_position_pct: default_base_position_pct(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsOverlayConfig {
    #[serde(default = "default_boost_threshold")]
    pub sentiment_boost_threshold: Decimal,
    #[serde(default = "default_cut_threshold")]
    pub sentiment_cut_threshold: Decimal,
    #[serde(default = "default_boost_multiplier")]
    pub boost_multiplier: Decimal,
    #[serde(default = "default_cut_multiplier")]
    pub cut_multiplier: Decimal,
}

fn default_boost_threshold() -> Decimal {
    Decimal::new(2, 1) // 0.2
}
fn default_cut_threshold() -> Decimal {
    Decimal::new(-2, 1) // -0.2
}
fn default_boost_multiplier() -> Decimal {
    Decimal::new(13, 1) // 1.3
}
fn default_cut_multiplier() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

impl Default for NewsOverlayConfig {
    fn default() -> Self {
        Self {
            sentiment_boost_threshold: default_boost_threshold(),
            sentiment_cut_threshold: default_cut_threshold(),
            boost_multiplier: default_boost_multiplier(),
            cut_multiplier: default_cut_multiplier(),
        }
    }
}

/// Constrained automatic approval
#[derive(Debug, Clone, Deserialize)]
pub struct AutopilotConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_autopilot_notional")]
    pub max_order_notional: Decimal,
    #[serde(default = "default_autopilot_loss")]
    pub max_loss_per_trade: Decimal,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: Decimal,
    #[serde(default = "default_whitelist")]
    pub symbol_whitelist: Vec<String>,
}

fn default_autopilot_notional() -> Decimal {
    dec!(10000)
}
fn default_autopilot_loss() -> Decimal {
    dec!(2000)
}
fn default_min_confidence() -> Decimal {
    Decimal::new(6, 1) // 0.6
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_order_notional: default_autopilot_notional(),
            max_loss_per_trade: default_autopilot_loss(),
            min_confidence: default_min_confidence(),
            symbol_whitelist: default_whitelist(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; disabled when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

/// A single invalid field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration:\n{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))]
    Invalid(Vec<FieldError>),
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Check every field and report all violations at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &'static str, message: &str| {
            if !ok {
                errors.push(FieldError {
                    field,
                    message: message.to_string(),
                });
            }
        };

        let t = &self.trading;
        check(
            !t.symbol_whitelist.is_empty(),
            "trading.symbol_whitelist",
            "must contain at least one symbol",
        );
        check(
            t.symbol_whitelist.iter().all(|s| s.contains('/')),
            "trading.symbol_whitelist",
            "symbols must look like BASE/QUOTE",
        );
        check(
            parse_timeframe(&t.timeframe).is_some(),
            "trading.timeframe",
            "expected <n>m, <n>h or <n>d",
        );
        check(t.candle_limit > 0, "trading.candle_limit", "must be > 0");
        check(
            !t.approval_phrase.trim().is_empty(),
            "trading.approval_phrase",
            "must not be empty",
        );
        check(t.order_timeout_secs > 0, "trading.order_timeout_secs", "must be > 0");
        check(t.poll_interval_ms > 0, "trading.poll_interval_ms", "must be > 0");
        check(t.cancel_timeout_secs > 0, "trading.cancel_timeout_secs", "must be > 0");
        check(
            t.gateway_call_timeout_secs > 0,
            "trading.gateway_call_timeout_secs",
            "must be > 0",
        );
        check(t.intent_ttl_secs > 0, "trading.intent_ttl_secs", "must be > 0");
        check(t.size_decimals <= 18, "trading.size_decimals", "must be <= 18");
        check(
            t.maker_emulation.buffer_bps >= Decimal::ZERO,
            "trading.maker_emulation.buffer_bps",
            "must be >= 0",
        );

        let r = &self.risk;
        check(r.capital > Decimal::ZERO, "risk.capital", "must be > 0");
        check(
            r.max_position_pct > Decimal::ZERO && r.max_position_pct <= Decimal::ONE,
            "risk.max_position_pct",
            "must be in (0, 1]",
        );
        check(
            r.max_order_notional > Decimal::ZERO,
            "risk.max_order_notional",
            "must be > 0",
        );
        check(
            r.max_loss_per_trade > Decimal::ZERO,
            "risk.max_loss_per_trade",
            "must be > 0",
        );
        check(
            r.max_loss_per_day > Decimal::ZERO,
            "risk.max_loss_per_day",
            "must be > 0",
        );
        check(
            r.cooldown_bypass_pct >= Decimal::ZERO,
            "risk.cooldown_bypass_pct",
            "must be >= 0",
        );

        let p = &self.paper;
        check(p.slippage_bps >= Decimal::ZERO, "paper.slippage_bps", "must be >= 0");
        check(p.fee_bps >= Decimal::ZERO, "paper.fee_bps", "must be >= 0");
        check(
            is_probability(p.fill_probability),
            "paper.fill_probability",
            "must be in [0, 1]",
        );
        check(
            is_probability(p.partial_fill_probability),
            "paper.partial_fill_probability",
            "must be in [0, 1]",
        );
        check(
            p.min_fill_ratio > Decimal::ZERO && p.min_fill_ratio <= Decimal::ONE,
            "paper.min_fill_ratio",
            "must be in (0, 1]",
        );
        check(p.spread_bps >= Decimal::ZERO, "paper.spread_bps", "must be >= 0");

        let b = &self.backtest;
        check(b.maker_fee_bps >= Decimal::ZERO, "backtest.maker_fee_bps", "must be >= 0");
        check(b.taker_fee_bps >= Decimal::ZERO, "backtest.taker_fee_bps", "must be >= 0");
        check(b.slippage_bps >= Decimal::ZERO, "backtest.slippage_bps", "must be >= 0");
        check(
            b.initial_capital.map_or(true, |c| c > Decimal::ZERO),
            "backtest.initial_capital",
            "must be > 0",
        );

        let s = &self.strategy;
        check(s.baseline.sma_period > 0, "strategy.baseline.sma_period", "must be > 0");
        check(
            s.baseline.momentum_lookback > 0,
            "strategy.baseline.momentum_lookback",
            "must be > 0",
        );
        check(
            s.news_overlay.sentiment_cut_threshold < s.news_overlay.sentiment_boost_threshold,
            "strategy.news_overlay",
            "cut threshold must be below boost threshold",
        );

        check(
            is_probability(self.autopilot.min_confidence),
            "autopilot.min_confidence",
            "must be in [0, 1]",
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

fn is_probability(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE
}

/// Parse a candle timeframe such as `1m`, `15m`, `4h`, `1d`
pub fn parse_timeframe(timeframe: &str) -> Option<chrono::Duration> {
    let unit = timeframe.chars().last()?;
    let count: i64 = timeframe[..timeframe.len() - unit.len_utf8()].parse().ok()?;
    if count <= 0 {
        return None;
    }
    match unit {
        'm' => Some(chrono::Duration::minutes(count)),
        'h' => Some(chrono::Duration::hours(count)),
        'd' => Some(chrono::Duration::days(count)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_fail_closed_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.trading.dry_run);
        assert!(!config.trading.i_understand_live_trading);
        assert!(config.trading.require_approval);
        assert!(!config.autopilot.enabled);
        assert_eq!(config.trading.symbol_whitelist, vec!["BTC/JPY".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [app]
            data_dir = "/tmp/spot"

            [trading]
            symbol_whitelist = ["BTC/JPY", "ETH/JPY"]
            timeframe = "5m"
            dry_run = false
            i_understand_live_trading = true

            [trading.maker_emulation]
            buffer_bps = 0.5
            use_tick = false

            [risk]
            capital = 1000000
            max_loss_per_day = 50000
            max_orders_per_day = 10

            [paper]
            slippage_bps = 5
            fill_probability = 0.7

            [telemetry]
            log_level = "debug"
            log_format = "json"
            metrics_port = 9090
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.trading.symbol_whitelist.len(), 2);
        assert!(!config.trading.dry_run);
        assert_eq!(config.trading.maker_emulation.buffer_bps, dec!(0.5));
        assert!(!config.trading.maker_emulation.use_tick);
        assert_eq!(config.risk.max_loss_per_day, dec!(50000));
        assert_eq!(config.risk.max_orders_per_day, 10);
        assert_eq!(config.risk.cooldown_minutes, 5);
        assert_eq!(config.paper.fill_probability, dec!(0.7));
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert_eq!(config.telemetry.metrics_port, Some(9090));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(include_str!("../config.toml.example")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.trading.approval_phrase, "I APPROVE");
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.trading.symbol_whitelist.clear();
        config.risk.capital = dec!(-1);
        config.paper.fill_probability = dec!(1.5);

        match config.validate() {
            Err(ConfigError::Invalid(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert!(fields.contains(&"trading.symbol_whitelist"));
                assert!(fields.contains(&"risk.capital"));
                assert!(fields.contains(&"paper.fill_probability"));
            }
            Ok(()) => panic!("expected validation errors"),
        }
    }

    #[test]
    fn test_parse_timeframe() {
        assert_eq!(parse_timeframe("1m"), Some(chrono::Duration::minutes(1)));
        assert_eq!(parse_timeframe("4h"), Some(chrono::Duration::hours(4)));
        assert_eq!(parse_timeframe("1d"), Some(chrono::Duration::days(1)));
        assert_eq!(parse_timeframe("0m"), None);
        assert_eq!(parse_timeframe("m"), None);
        assert_eq!(parse_timeframe("5x"), None);
    }

    #[test]
    fn test_backtest_fee_selection() {
        let mut settings = BacktestSettings::default();
        assert_eq!(settings.fee_bps(), dec!(10));
        settings.assume_taker = false;
        assert_eq!(settings.fee_bps(), dec!(5));
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_execution_mode_display() {
        assert_eq!(ExecutionMode::Paper.to_string(), "paper");
        assert_eq!(ExecutionMode::Live.to_string(), "live");
        assert_ne!(ExecutionMode::Paper, ExecutionMode::Live);
    }
}
