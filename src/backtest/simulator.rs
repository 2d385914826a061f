//! Backtest engine
//!
//! Sequential replay through the same strategy, risk engine and fill simulator
//! that paper and live execution use.

use super::{
    BacktestEvent, BacktestRequest, BacktestResult, EquityPoint, EventStream, PerformanceMetrics,
    TradeRecord,
};
use crate::config::{Config, ExecutionMode, PaperConfig};
use crate::error::TradeError;
use crate::execution::FillSimulator;
use crate::intent::{Approval, IntentContext, OrderIntent, TradeSignal};
use crate::market::{Candle, NewsFeature, NewsVisibility};
use crate::orderbook::OrderBookSnapshot;
use crate::risk::{AccountContext, PositionBook, RiskDecision, RiskEngine, RiskState};
use crate::strategy::Strategy;
use crate::telemetry;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const BACKTEST_APPROVER: &str = "backtest";

/// Runs one strategy over historical rows
pub struct BacktestEngine {
    strategy: Box<dyn Strategy>,
    risk: RiskEngine,
    simulator: FillSimulator,
    visibility: NewsVisibility,
    capital: Decimal,
    spread_bps: Decimal,
    candle_limit: usize,
    intent_ttl: Duration,
    cooldown: Duration,
}

impl BacktestEngine {
    pub fn new(config: &Config, strategy: Box<dyn Strategy>) -> Self {
        let capital = config.backtest.initial_capital.unwrap_or(config.risk.capital);
        let mut risk_config = config.clone();
        risk_config.risk.capital = capital;

        // Backtest costs replace the paper ones
        let paper = PaperConfig {
            slippage_bps: config.backtest.slippage_bps,
            fee_bps: config.backtest.fee_bps(),
            ..config.paper.clone()
        };

        Self {
            strategy,
            risk: RiskEngine::from_config(&risk_config),
            simulator: FillSimulator::new(paper, config.trading.size_decimals),
            visibility: NewsVisibility::from_config(&config.news),
            capital,
            spread_bps: config.paper.spread_bps,
            candle_limit: config.trading.candle_limit.max(1),
            intent_ttl: config.trading.intent_ttl(),
            cooldown: config.risk.cooldown(),
        }
    }

    pub fn capital(&self) -> Decimal {
        self.capital
    }

    /// Replay `candles` and `news` for `request.symbol`
    pub fn run(
        &self,
        request: &BacktestRequest,
        candles: Vec<Candle>,
        news: Vec<NewsFeature>,
    ) -> Result<BacktestResult, TradeError> {
        if candles.is_empty() {
            return Err(TradeError::Validation(format!(
                "no {} {} candles between {} and {}",
                request.symbol, request.timeframe, request.start, request.end
            )));
        }

        let symbol = request.symbol.as_str();
        let mut state: Option<RiskState> = None;
        let mut book = PositionBook::new();
        let mut history: Vec<Candle> = Vec::with_capacity(candles.len());
        let mut seen_news: Vec<NewsFeature> = Vec::new();
        let mut trades = Vec::new();
        let mut equity = Vec::new();
        let mut rejections: BTreeMap<String, u32> = BTreeMap::new();

        info!(
            symbol,
            strategy = self.strategy.name(),
            bars = candles.len(),
            news = news.len(),
            "Starting backtest"
        );

        for (t, event) in EventStream::new(candles, news, &self.visibility) {
            let candle = match event {
                BacktestEvent::News(row) => {
                    seen_news.push(row);
                    continue;
                }
                BacktestEvent::Bar(candle) => candle,
            };

            let state = state.get_or_insert_with(|| RiskState::new(t));
            if state.roll_to(t) {
                debug!(day = %state.day, "risk state rolled over");
            }

            history.push(candle);
            let window = &history[history.len().saturating_sub(self.candle_limit)..];
            let close = window[window.len() - 1].close;
            let visible = self.visibility.visible(&seen_news, t);

            let signal = self.strategy.generate(symbol, window, &visible);
            if !signal.is_hold() {
                match self.step(symbol, &signal, t, close, state, &mut book) {
                    Ok(trade) => trades.push(trade),
                    Err(reason) => *rejections.entry(reason).or_default() += 1,
                }
            }

            let point = EquityPoint {
                ts: t,
                equity: self.capital + book.realized_pnl() + book.unrealized_pnl(symbol, close),
                realized_pnl: book.realized_pnl(),
                position: book.size(symbol),
            };
            telemetry::record_backtest_equity(point.equity);
            equity.push(point);
        }

        let metrics = PerformanceMetrics::compute(&trades, self.capital, request.start, request.end);
        info!(
            symbol,
            strategy = self.strategy.name(),
            trades = metrics.num_trades,
            total_pnl = %metrics.total_pnl,
            "Backtest complete"
        );

        Ok(BacktestResult {
            symbol: request.symbol.clone(),
            strategy: self.strategy.name().to_string(),
            capital: self.capital,
            metrics,
            equity,
            trades,
            rejections,
        })
    }

    /// One decision: intent, risk, auto-approval, fill, commit.
    /// `Err` carries the code of a refusal.
    fn step(
        &self,
        symbol: &str,
        signal: &TradeSignal,
        t: DateTime<Utc>,
        close: Decimal,
        state: &mut RiskState,
        book: &mut PositionBook,
    ) -> Result<TradeRecord, String> {
        let ctx = IntentContext::new(t, self.intent_ttl, ExecutionMode::Paper)
            .with_features_ref(format!("backtest:{}:{}", symbol, t.timestamp()));
        let intent = OrderIntent::create(signal, &ctx).map_err(|_| "validation".to_string())?;

        let account = AccountContext {
            position_size: book.size(symbol),
            unrealized_pnl: book.unrealized_pnl(symbol, close),
        };
        let mut intent = match self.risk.evaluate(&intent, state, &account, t) {
            RiskDecision::Reject(reason) => return Err(reason.code().to_string()),
            decision => decision.into_intent().ok_or_else(|| "validation".to_string())?,
        };

        let hash = intent.canonical_hash.clone();
        Approval::grant(&mut intent, &hash, BACKTEST_APPROVER, t).map_err(|e| e.code().to_string())?;

        let snapshot = OrderBookSnapshot::from_price(symbol, t, close, self.spread_bps);
        let fill = self.simulator.simulate(&intent, Some(&snapshot), t);

        if fill.size <= Decimal::ZERO {
            return Err(fill.reason);
        }

        let pnl = book.apply(symbol, intent.side, fill.price, fill.size, fill.fee);
        state.record_execution(symbol, fill.price, pnl, t, self.cooldown);

        Ok(TradeRecord {
            ts: t,
            intent_id: intent.intent_id,
            symbol: symbol.to_string(),
            side: intent.side,
            size: fill.size,
            price: fill.price,
            notional: fill.price * fill.size,
            fee: fill.fee,
            pnl,
        })
    }
}
