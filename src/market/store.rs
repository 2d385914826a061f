//! In-memory market data store

use super::{Candle, NewsFeature};
use crate::data::ParquetReader;
use crate::orderbook::OrderBookSnapshot;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tracing::info;

pub const CANDLES_FILE: &str = "candles.parquet";
pub const ORDERBOOK_FILE: &str = "orderbook.parquet";
pub const NEWS_FILE: &str = "news_features.parquet";

/// Read access to stored market rows
pub trait MarketDataStore: Send + Sync {
    /// Up to `limit` most recent candles with `ts <= until`, oldest first
    fn candles(
        &self,
        symbol: &str,
        timeframe: &str,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Vec<Candle>;

    /// Candles with `start <= ts <= end`, oldest first
    fn candles_between(
        &self,
        symbol: &str,
        timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Candle>;

    /// Most recent snapshot taken at or before `as_of`
    fn latest_orderbook(&self, symbol: &str, as_of: DateTime<Utc>) -> Option<OrderBookSnapshot>;

    /// All news rows for `symbol`, ordered by `observed_at`
    fn news(&self, symbol: &str) -> Vec<NewsFeature>;
}

#[derive(Default)]
struct Tables {
    candles: HashMap<(String, String), Vec<Candle>>,
    books: HashMap<String, Vec<OrderBookSnapshot>>,
    news: HashMap<String, Vec<NewsFeature>>,
}

/// Store backed by sorted vectors
#[derive(Default)]
pub struct MemoryMarketData {
    tables: RwLock<Tables>,
}

impl MemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load whichever of the standard Parquet files exist in `dir`
    pub fn load_dir(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let store = Self::new();

        let candles = dir.join(CANDLES_FILE);
        if candles.exists() {
            store.insert_candles(ParquetReader::new(candles).read_candles()?);
        }
        let books = dir.join(ORDERBOOK_FILE);
        if books.exists() {
            for snapshot in ParquetReader::new(books).read_orderbook()? {
                store.insert_orderbook(snapshot);
            }
        }
        let news = dir.join(NEWS_FILE);
        if news.exists() {
            store.insert_news(ParquetReader::new(news).read_news()?);
        }

        let counts = store.counts();
        info!(
            dir = %dir.display(),
            candles = counts.0,
            orderbooks = counts.1,
            news = counts.2,
            "Loaded market data"
        );
        Ok(store)
    }

    pub fn insert_candles(&self, rows: impl IntoIterator<Item = Candle>) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        for candle in rows {
            let key = (candle.symbol.clone(), candle.timeframe.clone());
            let series = tables.candles.entry(key).or_default();
            // Same bar time replaces the previous row
            match series.binary_search_by_key(&candle.ts, |c| c.ts) {
                Ok(idx) => series[idx] = candle,
                Err(idx) => series.insert(idx, candle),
            }
        }
    }

    pub fn insert_orderbook(&self, snapshot: OrderBookSnapshot) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let series = tables.books.entry(snapshot.symbol.clone()).or_default();
        let idx = series.partition_point(|s| s.ts <= snapshot.ts);
        series.insert(idx, snapshot);
    }

    pub fn insert_news(&self, rows: impl IntoIterator<Item = NewsFeature>) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        for row in rows {
            let series = tables.news.entry(row.symbol.clone()).or_default();
            let idx = series.partition_point(|r| r.observed_at <= row.observed_at);
            series.insert(idx, row);
        }
    }

    /// (candles, orderbook snapshots, news rows)
    pub fn counts(&self) -> (usize, usize, usize) {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        (
            tables.candles.values().map(Vec::len).sum(),
            tables.books.values().map(Vec::len).sum(),
            tables.news.values().map(Vec::len).sum(),
        )
    }
}

impl MarketDataStore for MemoryMarketData {
    fn candles(
        &self,
        symbol: &str,
        timeframe: &str,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Vec<Candle> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let Some(series) = tables
            .candles
            .get(&(symbol.to_string(), timeframe.to_string()))
        else {
            return Vec::new();
        };
        let end = series.partition_point(|c| c.ts <= until);
        let start = end.saturating_sub(limit);
        series[start..end].to_vec()
    }

    fn candles_between(
        &self,
        symbol: &str,
        timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Candle> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .candles
            .get(&(symbol.to_string(), timeframe.to_string()))
            .map(|series| {
                series
                    .iter()
                    .filter(|c| c.ts >= start && c.ts <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn latest_orderbook(&self, symbol: &str, as_of: DateTime<Utc>) -> Option<OrderBookSnapshot> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let series = tables.books.get(symbol)?;
        let idx = series.partition_point(|s| s.ts <= as_of);
        idx.checked_sub(1).map(|i| series[i].clone())
    }

    fn news(&self, symbol: &str) -> Vec<NewsFeature> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.news.get(symbol).cloned().unwrap_or_default()
    }
}
