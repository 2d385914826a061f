//! Backtesting module
//!
//! Replays stored candles and news through the live decision pipeline, with a
//! latency guard on news visibility

mod analytics;
mod replay;
mod report;
mod simulator;

pub use analytics::PerformanceMetrics;
pub use replay::{BacktestEvent, EventStream};
pub use report::{write_report, ReportPaths};
pub use simulator::{BacktestEngine, BACKTEST_APPROVER};

use crate::intent::Side;
use crate::strategy::StrategyKind;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What to replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub symbol: String,
    pub timeframe: String,
    /// Inclusive start of the replayed period
    pub start: DateTime<Utc>,
    /// Inclusive end of the replayed period
    pub end: DateTime<Utc>,
    pub strategy: StrategyKind,
}

impl BacktestRequest {
    /// Report file prefix
    pub fn prefix(&self) -> String {
        format!("backtest_{}", self.strategy.as_str())
    }
}

/// One simulated fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub ts: DateTime<Utc>,
    pub intent_id: String,
    pub symbol: String,
    pub side: Side,
    pub size: Decimal,
    pub price: Decimal,
    pub notional: Decimal,
    pub fee: Decimal,
    /// Realized P&L booked by this fill (zero for buys)
    pub pnl: Decimal,
}

/// Mark-to-market equity after a bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub ts: DateTime<Utc>,
    pub equity: Decimal,
    pub realized_pnl: Decimal,
    pub position: Decimal,
}

/// Complete backtest results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub strategy: String,
    pub capital: Decimal,
    pub metrics: PerformanceMetrics,
    pub equity: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    /// Refusals by reason code
    pub rejections: BTreeMap<String, u32>,
}
