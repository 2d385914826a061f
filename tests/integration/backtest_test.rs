//! Backtests over stored data

use crate::common::*;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use spot_agent::backtest::{write_report, BacktestRequest, BacktestResult};
use spot_agent::config::Config;
use spot_agent::market::{Candle, MemoryMarketData, NewsFeature};
use spot_agent::strategy::StrategyKind;
use std::sync::Arc;
use tempfile::TempDir;

fn bar(i: i64) -> DateTime<Utc> {
    t0() + Duration::hours(i)
}

fn backtest_config() -> Config {
    let mut config = config();
    config.trading.timeframe = "1h".to_string();
    config.strategy.baseline.sma_period = 3;
    config.strategy.baseline.momentum_lookback = 2;
    config.strategy.baseline.base_position_pct = dec!(0.01);
    config.risk.max_orders_per_day = 100;
    config
}

/// Flat, then a jump at bar 4 (first buy), then a slide
fn stored_market(news: Vec<NewsFeature>) -> Arc<MemoryMarketData> {
    let market = MemoryMarketData::new();
    let closes = [100, 100, 100, 100, 110, 112, 115, 105, 95, 90];
    market.insert_candles(
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Candle::flat(SYMBOL, "1h", bar(i as i64), Decimal::from(*c))),
    );
    market.insert_news(news);
    Arc::new(market)
}

fn bullish(observed_at: DateTime<Utc>) -> NewsFeature {
    NewsFeature {
        symbol: SYMBOL.to_string(),
        published_at: observed_at - Duration::minutes(1),
        observed_at,
        sentiment: dec!(0.9),
        keyword_flags: vec![],
        source_weight: dec!(1),
    }
}

fn run(news: Vec<NewsFeature>, strategy: StrategyKind) -> BacktestResult {
    let service = service(backtest_config(), stored_market(news));
    let request = BacktestRequest {
        symbol: SYMBOL.to_string(),
        timeframe: "1h".to_string(),
        start: bar(0),
        end: bar(9),
        strategy,
    };
    service.run_backtest(&request).unwrap()
}

#[test]
fn test_news_inside_latency_window_has_no_effect() {
    // Default latency is 600s; observed 5 minutes before the buy bar
    let without = run(vec![], StrategyKind::NewsOverlay);
    let late = run(vec![bullish(bar(4) - Duration::minutes(5))], StrategyKind::NewsOverlay);
    let early = run(vec![bullish(bar(4) - Duration::minutes(20))], StrategyKind::NewsOverlay);

    assert_eq!(without.trades[0].ts, bar(4));
    assert_eq!(late.trades[0], without.trades[0]);
    assert!(early.trades[0].size > without.trades[0].size);
}

#[test]
fn test_backtest_report_files() {
    let result = run(vec![], StrategyKind::Baseline);
    assert_eq!(result.equity.len(), 10);
    assert!(!result.trades.is_empty());
    assert_eq!(result.metrics.num_trades, result.trades.len());

    let dir = TempDir::new().unwrap();
    let paths = write_report(&result, dir.path(), "backtest_baseline").unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.json).unwrap()).unwrap();
    assert_eq!(json["strategy"], "baseline");
    assert_eq!(json["bars"], 10);
    assert!(paths.summary.exists());
    assert!(paths.trades.exists());
    assert!(paths.equity.exists());
}

#[test]
fn test_backtest_outside_stored_range() {
    let service = service(backtest_config(), stored_market(vec![]));
    let request = BacktestRequest {
        symbol: SYMBOL.to_string(),
        timeframe: "1h".to_string(),
        start: bar(100),
        end: bar(200),
        strategy: StrategyKind::Baseline,
    };
    assert!(service.run_backtest(&request).is_err());
}
