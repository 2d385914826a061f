//! Baseline scaled by news sentiment

use super::{BaselineStrategy, Strategy};
use crate::config::NewsOverlayConfig;
use crate::intent::TradeSignal;
use crate::market::{weighted_sentiment, Candle, NewsFeature};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

const CONFIDENCE_STEP: Decimal = dec!(0.1);
const CONFIDENCE_MIN: Decimal = dec!(0.1);
const CONFIDENCE_MAX: Decimal = dec!(0.95);

/// Runs the baseline and boosts or cuts the trade on strong sentiment.
///
/// `news` must already be latency-guarded; the overlay does not filter it.
#[derive(Debug, Clone)]
pub struct NewsOverlayStrategy {
    baseline: BaselineStrategy,
    config: NewsOverlayConfig,
    size_decimals: u32,
}

impl NewsOverlayStrategy {
    pub fn new(baseline: BaselineStrategy, config: NewsOverlayConfig, size_decimals: u32) -> Self {
        Self {
            baseline,
            config,
            size_decimals,
        }
    }
}

impl Strategy for NewsOverlayStrategy {
    fn name(&self) -> &'static str {
        "news_overlay"
    }

    fn generate(&self, symbol: &str, candles: &[Candle], news: &[NewsFeature]) -> TradeSignal {
        let mut signal = self.baseline.signal(symbol, candles, self.name());
        if signal.is_hold() {
            return signal;
        }

        let sentiment = weighted_sentiment(news);
        if sentiment >= self.config.sentiment_boost_threshold {
            signal.size *= self.config.boost_multiplier;
            signal.confidence = (signal.confidence + CONFIDENCE_STEP).min(CONFIDENCE_MAX);
            signal.rationale = format!("{}; sentiment boost {}", signal.rationale, sentiment.round_dp(2));
        } else if sentiment <= self.config.sentiment_cut_threshold {
            signal.size *= self.config.cut_multiplier;
            signal.confidence = (signal.confidence - CONFIDENCE_STEP).max(CONFIDENCE_MIN);
            signal.rationale = format!("{}; sentiment cut {}", signal.rationale, sentiment.round_dp(2));
        }
        signal.size = signal
            .size
            .round_dp_with_strategy(self.size_decimals, RoundingStrategy::ToZero);
        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BaselineConfig;
    use crate::intent::Side;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn uptrend() -> Vec<Candle> {
        [100, 100, 101, 102, 110]
            .iter()
            .enumerate()
            .map(|(i, c)| Candle::flat("BTC/JPY", "1m", t0() + Duration::minutes(i as i64), Decimal::from(*c)))
            .collect()
    }

    fn news(sentiment: Decimal) -> Vec<NewsFeature> {
        vec![NewsFeature {
            symbol: "BTC/JPY".to_string(),
            published_at: t0(),
            observed_at: t0(),
            sentiment,
            keyword_flags: vec![],
            source_weight: dec!(1),
        }]
    }

    fn strategy() -> NewsOverlayStrategy {
        let baseline = BaselineStrategy::new(
            BaselineConfig {
                sma_period: 3,
                momentum_lookback: 2,
                base_position_pct: dec!(0.11),
            },
            dec!(500000),
            8,
        );
        NewsOverlayStrategy::new(baseline, NewsOverlayConfig::default(), 8)
    }

    #[test]
    fn test_neutral_news_keeps_baseline() {
        let signal = strategy().generate("BTC/JPY", &uptrend(), &news(dec!(0.1)));
        assert_eq!(signal.side, Side::Buy);
        assert_eq!(signal.size, dec!(500));
        assert_eq!(signal.confidence, dec!(0.55));
        assert_eq!(signal.strategy, "news_overlay");
    }

    #[test]
    fn test_positive_news_boosts() {
        let signal = strategy().generate("BTC/JPY", &uptrend(), &news(dec!(0.5)));
        assert_eq!(signal.size, dec!(650));
        assert_eq!(signal.confidence, dec!(0.65));
        assert!(signal.rationale.contains("sentiment boost"));
    }

    #[test]
    fn test_negative_news_cuts() {
        let signal = strategy().generate("BTC/JPY", &uptrend(), &news(dec!(-0.5)));
        assert_eq!(signal.size, dec!(250));
        assert_eq!(signal.confidence, dec!(0.45));
    }

    #[test]
    fn test_no_news_is_neutral() {
        let signal = strategy().generate("BTC/JPY", &uptrend(), &[]);
        assert_eq!(signal.size, dec!(500));
    }

    #[test]
    fn test_hold_passes_through() {
        let signal = strategy().generate("BTC/JPY", &uptrend()[..2], &news(dec!(0.9)));
        assert!(signal.is_hold());
        assert_eq!(signal.strategy, "news_overlay");
    }
}
