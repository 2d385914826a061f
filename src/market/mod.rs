//! Market data module
//!
//! Candles, order-book snapshots and scored news, plus the latency guard that
//! decides which news a strategy may see.

mod news;
mod store;
mod types;

pub use news::NewsVisibility;
pub use store::{MarketDataStore, MemoryMarketData, CANDLES_FILE, NEWS_FILE, ORDERBOOK_FILE};
pub use types::{weighted_sentiment, Candle, NewsFeature};
