//! News latency guard

use super::NewsFeature;
use crate::config::NewsConfig;
use chrono::{DateTime, Duration, Utc};

/// Decides which news rows a strategy may see at a given time.
///
/// A row is visible at `t` iff `observed_at <= t - latency` and
/// `published_at` lies in `[t - lookback, t]`. Gating is on ingestion time,
/// never on the publisher's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewsVisibility {
    pub latency: Duration,
    pub lookback: Duration,
}

impl NewsVisibility {
    pub fn new(latency: Duration, lookback: Duration) -> Self {
        Self { latency, lookback }
    }

    pub fn from_config(config: &NewsConfig) -> Self {
        Self::new(
            Duration::seconds(config.news_latency_seconds as i64),
            Duration::hours(config.sentiment_lookback_hours as i64),
        )
    }

    /// Earliest time at which `row` can be seen
    pub fn available_at(&self, row: &NewsFeature) -> DateTime<Utc> {
        row.observed_at + self.latency
    }

    pub fn is_visible(&self, row: &NewsFeature, t: DateTime<Utc>) -> bool {
        self.available_at(row) <= t
            && row.published_at >= t - self.lookback
            && row.published_at <= t
    }

    /// Rows visible at `t`, in input order
    pub fn visible(&self, rows: &[NewsFeature], t: DateTime<Utc>) -> Vec<NewsFeature> {
        rows.iter()
            .filter(|r| self.is_visible(r, t))
            .cloned()
            .collect()
    }
}
