//! Trading strategies
//!
//! A strategy turns candles and visible news into a `TradeSignal`. It never
//! sees position or risk state; sizing limits are the risk engine's job.

mod baseline;
mod news_overlay;

pub use baseline::{BaselineStrategy, BASELINE_CONFIDENCE};
pub use news_overlay::NewsOverlayStrategy;

use crate::config::Config;
use crate::intent::TradeSignal;
use crate::market::{Candle, NewsFeature};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trait for signal generators
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;
    /// Signal for the last candle; `candles` are oldest first
    fn generate(&self, symbol: &str, candles: &[Candle], news: &[NewsFeature]) -> TradeSignal;
}

/// Selectable strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum StrategyKind {
    Baseline,
    NewsOverlay,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Baseline => "baseline",
            StrategyKind::NewsOverlay => "news_overlay",
        }
    }

    /// Build the strategy from configuration
    pub fn build(&self, config: &Config) -> Box<dyn Strategy> {
        let baseline = BaselineStrategy::new(
            config.strategy.baseline.clone(),
            config.risk.capital,
            config.trading.size_decimals,
        );
        match self {
            StrategyKind::Baseline => Box::new(baseline),
            StrategyKind::NewsOverlay => Box::new(NewsOverlayStrategy::new(
                baseline,
                config.strategy.news_overlay.clone(),
                config.trading.size_decimals,
            )),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
