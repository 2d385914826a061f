//! SMA + momentum trend follower

use super::Strategy;
use crate::config::BaselineConfig;
use crate::intent::{Side, TradeSignal};
use crate::market::{Candle, NewsFeature};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

pub const BASELINE_CONFIDENCE: Decimal = dec!(0.55);

/// Buys above the SMA with positive momentum, sells below it with negative momentum
#[derive(Debug, Clone)]
pub struct BaselineStrategy {
    config: BaselineConfig,
    capital: Decimal,
    size_decimals: u32,
}

impl BaselineStrategy {
    pub fn new(config: BaselineConfig, capital: Decimal, size_decimals: u32) -> Self {
        Self {
            config,
            capital,
            size_decimals,
        }
    }

    /// Bars needed before a non-hold signal is possible
    pub fn warmup(&self) -> usize {
        self.config.sma_period.max(self.config.momentum_lookback) + 1
    }

    pub(super) fn signal(&self, symbol: &str, candles: &[Candle], strategy: &str) -> TradeSignal {
        if candles.len() < self.warmup() || self.config.sma_period == 0 {
            return TradeSignal::hold(symbol, strategy, "insufficient data");
        }

        let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
        let window = &closes[closes.len() - self.config.sma_period..];
        let sma = window.iter().copied().sum::<Decimal>() / Decimal::from(window.len());
        let current = closes[closes.len() - 1];
        let momentum = current - closes[closes.len() - 1 - self.config.momentum_lookback];

        let side = if current > sma && momentum > Decimal::ZERO {
            Side::Buy
        } else if current < sma && momentum < Decimal::ZERO {
            Side::Sell
        } else {
            return TradeSignal::hold(
                symbol,
                strategy,
                format!("no signal (price={}, sma={})", current, sma.round_dp(2)),
            );
        };

        let size = if current > Decimal::ZERO {
            (self.capital * self.config.base_position_pct / current)
                .round_dp_with_strategy(self.size_decimals, RoundingStrategy::ToZero)
        } else {
            Decimal::ZERO
        };
        let cmp = if side == Side::Buy { '>' } else { '<' };

        TradeSignal {
            symbol: symbol.to_string(),
            side,
            size,
            price: current,
            confidence: BASELINE_CONFIDENCE,
            rationale: format!("price{}{}, momentum={}", cmp, sma.round_dp(2), momentum.round_dp(2)),
            strategy: strategy.to_string(),
        }
    }
}

impl Strategy for BaselineStrategy {
    fn name(&self) -> &'static str {
        "baseline"
    }

    fn generate(&self, symbol: &str, candles: &[Candle], _news: &[NewsFeature]) -> TradeSignal {
        self.signal(symbol, candles, self.name())
    }
}
