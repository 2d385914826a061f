//! Market and news rows

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub timeframe: String,
    /// Bar open time
    pub ts: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Flat bar at `price`, handy for synthetic series
    pub fn flat(
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        ts: DateTime<Utc>,
        price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            ts,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: Decimal::ZERO,
        }
    }
}

/// Scored news item for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsFeature {
    pub symbol: String,
    /// Publisher timestamp; not trusted for visibility
    pub published_at: DateTime<Utc>,
    /// Ingestion time
    pub observed_at: DateTime<Utc>,
    /// Sentiment in [-1, 1]
    pub sentiment: Decimal,
    #[serde(default)]
    pub keyword_flags: Vec<String>,
    pub source_weight: Decimal,
}

/// Source-weighted mean sentiment; zero for no rows
pub fn weighted_sentiment(rows: &[NewsFeature]) -> Decimal {
    if rows.is_empty() {
        return Decimal::ZERO;
    }
    let weighted: Decimal = rows.iter().map(|r| r.sentiment * r.source_weight).sum();
    let weights: Decimal = rows.iter().map(|r| r.source_weight.abs()).sum();
    weighted / weights.max(Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn row(sentiment: Decimal, weight: Decimal) -> NewsFeature {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        NewsFeature {
            symbol: "BTC/JPY".to_string(),
            published_at: ts,
            observed_at: ts,
            sentiment,
            keyword_flags: vec![],
            source_weight: weight,
        }
    }

    #[test]
    fn test_weighted_sentiment_empty() {
        assert_eq!(weighted_sentiment(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_weighted_sentiment_mixes_sources() {
        let rows = vec![row(dec!(0.8), dec!(2)), row(dec!(-0.4), dec!(1))];
        // (1.6 - 0.4) / 3
        assert_eq!(weighted_sentiment(&rows), dec!(0.4));
    }

    #[test]
    fn test_weighted_sentiment_small_weights_not_inflated() {
        let rows = vec![row(dec!(0.5), dec!(0.5))];
        assert_eq!(weighted_sentiment(&rows), dec!(0.25));
    }
}
