//! Shared fixtures

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use spot_agent::config::Config;
use spot_agent::config::ExecutionMode;
use spot_agent::execution::{
    ExchangeGateway, GatewayError, GatewayOrderStatus, LimitOrderRequest, LiveConsent,
    OrderHandle, OrderStatusReport,
};
use spot_agent::market::{Candle, MemoryMarketData};
use spot_agent::intent::{IntentStatus, OrderIntent, Side, TradeSignal};
use spot_agent::orderbook::OrderBookSnapshot;
use spot_agent::service::{ProposalOutcome, TradingService};
use spot_agent::store::Ledger;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SYMBOL: &str = "BTC/JPY";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// Limits loose enough for a 0.01 BTC order at ¥5,000,000
pub fn config() -> Config {
    let mut config = Config::default();
    config.risk.max_loss_per_trade = dec!(50000);
    config.risk.max_loss_per_day = dec!(50000);
    config.risk.cooldown_minutes = 0;
    config.paper.slippage_bps = dec!(0.5);
    config.paper.fee_bps = dec!(10);
    config.trading.poll_interval_ms = 1;
    config.trading.order_timeout_secs = 1;
    config
}

/// Book at 4,999,000 / 5,001,000 five seconds before `t0`
pub fn market() -> Arc<MemoryMarketData> {
    let market = MemoryMarketData::new();
    market.insert_orderbook(OrderBookSnapshot::new(
        SYMBOL,
        t0() - Duration::seconds(5),
        dec!(4999000),
        dec!(5001000),
    ));
    Arc::new(market)
}

/// Rising 1m closes ending just before `t0`
pub fn uptrend(market: &MemoryMarketData) {
    let closes = [4990000, 4995000, 5000000, 5005000, 5010000, 5020000];
    market.insert_candles(closes.iter().enumerate().map(|(i, c)| {
        Candle::flat(
            SYMBOL,
            "1m",
            t0() - Duration::minutes(closes.len() as i64 - i as i64),
            Decimal::from(*c),
        )
    }));
}

pub fn service(config: Config, market: Arc<MemoryMarketData>) -> TradingService {
    TradingService::with_consent(config, market, Ledger::new(), None, LiveConsent::default())
}

pub fn live_service(
    config: Config,
    gateway: Arc<ScriptedGateway>,
    consent: LiveConsent,
) -> TradingService {
    let gateway: Arc<dyn ExchangeGateway> = gateway;
    TradingService::with_consent(config, market(), Ledger::new(), Some(gateway), consent)
}

pub fn signal(side: Side, size: Decimal) -> TradeSignal {
    TradeSignal {
        symbol: SYMBOL.to_string(),
        side,
        size,
        price: dec!(5000000),
        confidence: dec!(0.7),
        rationale: "integration".to_string(),
        strategy: "baseline".to_string(),
    }
}

/// Propose `signal` and expect it to be accepted unchanged
pub async fn propose(
    service: &TradingService,
    signal: &TradeSignal,
    mode: ExecutionMode,
    now: DateTime<Utc>,
) -> OrderIntent {
    match service.propose_signal(signal, mode, None, now).await.unwrap() {
        ProposalOutcome::Proposed { intent, adjustment: None, .. } => intent,
        other => panic!("expected unadjusted proposal, got {:?}", other),
    }
}

/// Propose and approve with the configured phrase
pub async fn approved(
    service: &TradingService,
    signal: &TradeSignal,
    mode: ExecutionMode,
    now: DateTime<Utc>,
) -> OrderIntent {
    let intent = propose(service, signal, mode, now).await;
    let phrase = service.config().trading.approval_phrase.clone();
    service
        .approve(&intent.intent_id, &intent.canonical_hash, "operator", &phrase, now)
        .await
        .unwrap();
    intent
}

/// Gateway that fills every order in full and counts every call
pub struct ScriptedGateway {
    pub calls: AtomicUsize,
    pub placed: Mutex<Vec<LimitOrderRequest>>,
    pub fail_place: Mutex<bool>,
    /// Ledger file to inspect when an order arrives
    pub watch: Mutex<Option<PathBuf>>,
    /// Intent statuses found on disk at each placement
    pub disk_at_place: Mutex<Vec<Vec<IntentStatus>>>,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            placed: Mutex::new(vec![]),
            fail_place: Mutex::new(false),
            watch: Mutex::new(None),
            disk_at_place: Mutex::new(vec![]),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExchangeGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }
    fn supports_post_only(&self) -> bool {
        true
    }
    fn has_credentials(&self) -> bool {
        true
    }
    async fn place_limit_order(
        &self,
        request: &LimitOrderRequest,
    ) -> Result<OrderHandle, GatewayError> {
        self.touch();
        if let Some(path) = self.watch.lock().unwrap().as_ref() {
            let on_disk = Ledger::load(path).unwrap();
            let statuses = on_disk.intents().map(|i| i.status).collect();
            self.disk_at_place.lock().unwrap().push(statuses);
        }
        if *self.fail_place.lock().unwrap() {
            return Err(GatewayError::Network("connection reset".to_string()));
        }
        self.placed.lock().unwrap().push(request.clone());
        Ok(OrderHandle {
            order_id: format!("ord-{}", self.placed.lock().unwrap().len()),
            symbol: request.symbol.clone(),
        })
    }
    async fn get_order_status(
        &self,
        handle: &OrderHandle,
    ) -> Result<OrderStatusReport, GatewayError> {
        self.touch();
        let placed = self.placed.lock().unwrap();
        let request = placed
            .iter()
            .last()
            .filter(|r| r.symbol == handle.symbol)
            .ok_or_else(|| GatewayError::Rejected("unknown order".to_string()))?;
        Ok(OrderStatusReport {
            status: GatewayOrderStatus::Filled,
            filled_size: request.size,
            avg_price: Some(request.price),
            fee: Decimal::ZERO,
        })
    }
    async fn cancel_order(&self, _handle: &OrderHandle) -> Result<bool, GatewayError> {
        self.touch();
        Ok(true)
    }
    async fn get_best_bid_ask(&self, _symbol: &str) -> Result<(Decimal, Decimal), GatewayError> {
        self.touch();
        Ok((dec!(4999000), dec!(5001000)))
    }
}
