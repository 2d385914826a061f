//! Top-of-book snapshot

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Best bid/ask for a symbol at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    /// Observation time
    pub ts: DateTime<Utc>,
    pub bid: Decimal,
    pub ask: Decimal,
    #[serde(default)]
    pub bid_size: Option<Decimal>,
    #[serde(default)]
    pub ask_size: Option<Decimal>,
}

impl OrderBookSnapshot {
    pub fn new(symbol: impl Into<String>, ts: DateTime<Utc>, bid: Decimal, ask: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            ts,
            bid,
            ask,
            bid_size: None,
            ask_size: None,
        }
    }

    /// Synthesize a book around `price` with a symmetric spread
    pub fn from_price(
        symbol: impl Into<String>,
        ts: DateTime<Utc>,
        price: Decimal,
        spread_bps: Decimal,
    ) -> Self {
        let half = price * spread_bps / Decimal::from(20_000);
        Self::new(symbol, ts, price - half, price + half)
    }

    /// Get mid price
    pub fn mid_price(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    /// Get spread
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// Both sides positive and not crossed
    pub fn is_valid(&self) -> bool {
        self.bid > Decimal::ZERO && self.ask > Decimal::ZERO && self.bid <= self.ask
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.ts
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) > max_age
    }
}
