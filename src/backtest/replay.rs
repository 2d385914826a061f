//! Time-ordered replay of candles and news

use crate::market::{Candle, NewsFeature, NewsVisibility};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Backtest event types
#[derive(Debug, Clone, PartialEq)]
pub enum BacktestEvent {
    /// News row that just became available
    News(NewsFeature),
    /// Closed bar
    Bar(Candle),
}

/// Merges candles and news into one stream ordered by availability time.
///
/// News is keyed by `observed_at + latency`, candles by their own `ts`. On a tie
/// the news row comes first, so a bar at `t` sees every row available at `t`.
pub struct EventStream {
    events: VecDeque<(DateTime<Utc>, BacktestEvent)>,
}

impl EventStream {
    pub fn new(candles: Vec<Candle>, news: Vec<NewsFeature>, visibility: &NewsVisibility) -> Self {
        let mut keyed: Vec<(DateTime<Utc>, u8, BacktestEvent)> =
            Vec::with_capacity(candles.len() + news.len());
        for row in news {
            keyed.push((visibility.available_at(&row), 0, BacktestEvent::News(row)));
        }
        for candle in candles {
            keyed.push((candle.ts, 1, BacktestEvent::Bar(candle)));
        }
        // Stable: equal keys keep input order
        keyed.sort_by_key(|(ts, rank, _)| (*ts, *rank));

        Self {
            events: keyed.into_iter().map(|(ts, _, e)| (ts, e)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Iterator for EventStream {
    type Item = (DateTime<Utc>, BacktestEvent);

    fn next(&mut self) -> Option<Self::Item> {
        self.events.pop_front()
    }
}
