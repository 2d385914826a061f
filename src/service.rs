//! Trading service
//!
//! The surface the CLI (or any other front end) drives. Owns the ledger and
//! wires strategy, risk engine, approvals and the execution coordinator
//! together.

use crate::backtest::{BacktestEngine, BacktestRequest, BacktestResult};
use crate::config::{Config, ExecutionMode};
use crate::error::TradeError;
use crate::execution::{
    CoordinatorSettings, ExchangeGateway, Execution, ExecutionCoordinator, FillSimulator,
    LiveConsent, LiveExecutor, LiveSettings,
};
use crate::intent::{Approval, IntentContext, IntentStatus, OrderIntent, Side, TradeSignal};
use crate::market::{MarketDataStore, NewsVisibility};
use crate::risk::{RiskDecision, RiskEngine, RiskReason, RiskState, SizeAdjustment};
use crate::store::{Ledger, StateFile};
use crate::strategy::StrategyKind;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const AUTOPILOT_APPROVER: &str = "autopilot";
pub const MANUAL_CLOSE_STRATEGY: &str = "manual_close";

/// Result of a proposal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProposalOutcome {
    /// Persisted and awaiting approval (or already auto-approved)
    Proposed {
        intent: OrderIntent,
        adjustment: Option<SizeAdjustment>,
        auto_approved: bool,
    },
    /// Strategy produced no trade
    Hold { symbol: String, rationale: String },
    /// Risk engine refused; nothing persisted
    Rejected { intent: OrderIntent, reason: RiskReason },
}

/// Open position in a status report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSummary {
    pub symbol: String,
    pub size: Decimal,
    pub avg_cost: Decimal,
    pub realized_pnl: Decimal,
}

/// Snapshot of the agent's safety state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub as_of: DateTime<Utc>,
    pub kill_switch: bool,
    pub dry_run: bool,
    pub require_approval: bool,
    pub autopilot_enabled: bool,
    pub live_consent: bool,
    pub risk: RiskState,
    pub positions: Vec<PositionSummary>,
    pub intents_by_status: BTreeMap<String, usize>,
    /// Proposed, unexpired intents
    pub pending_approval: Vec<String>,
    /// Executions flagged for manual reconciliation
    pub needs_reconciliation: Vec<String>,
}

pub struct TradingService {
    config: Config,
    market: Arc<dyn MarketDataStore>,
    ledger: Arc<Mutex<Ledger>>,
    risk: RiskEngine,
    coordinator: ExecutionCoordinator,
    visibility: NewsVisibility,
    /// Write-through target; `None` keeps the ledger in memory
    state: Option<Arc<StateFile>>,
}

impl TradingService {
    /// Claim `app.state_file`, load the ledger from it and settle any attempt a
    /// previous run left unfinished. Every later mutation is written through.
    pub fn open(
        config: Config,
        market: Arc<dyn MarketDataStore>,
        gateway: Option<Arc<dyn ExchangeGateway>>,
    ) -> Result<Self, TradeError> {
        let consent = LiveConsent::from_env(config.trading.i_understand_live_trading);
        Self::open_with_consent(config, market, gateway, consent)
    }

    pub fn open_with_consent(
        config: Config,
        market: Arc<dyn MarketDataStore>,
        gateway: Option<Arc<dyn ExchangeGateway>>,
        consent: LiveConsent,
    ) -> Result<Self, TradeError> {
        let state = StateFile::open(&config.app.state_file)?;
        let mut ledger = state.load()?;
        let recovered = ledger.recover_interrupted(Utc::now());
        if !recovered.is_empty() {
            warn!(count = recovered.len(), "interrupted executions flagged for reconciliation");
            state.save(&ledger)?;
        }
        Ok(Self::build(config, market, ledger, gateway, consent, Some(Arc::new(state))))
    }

    /// In-memory service; nothing is written unless `save` is called
    pub fn new(
        config: Config,
        market: Arc<dyn MarketDataStore>,
        ledger: Ledger,
        gateway: Option<Arc<dyn ExchangeGateway>>,
    ) -> Self {
        let consent = LiveConsent::from_env(config.trading.i_understand_live_trading);
        Self::with_consent(config, market, ledger, gateway, consent)
    }

    /// Build with an explicit consent instead of reading the environment
    pub fn with_consent(
        config: Config,
        market: Arc<dyn MarketDataStore>,
        ledger: Ledger,
        gateway: Option<Arc<dyn ExchangeGateway>>,
        consent: LiveConsent,
    ) -> Self {
        Self::build(config, market, ledger, gateway, consent, None)
    }

    fn build(
        config: Config,
        market: Arc<dyn MarketDataStore>,
        ledger: Ledger,
        gateway: Option<Arc<dyn ExchangeGateway>>,
        consent: LiveConsent,
        state: Option<Arc<StateFile>>,
    ) -> Self {
        let ledger = Arc::new(Mutex::new(ledger));
        let risk = RiskEngine::from_config(&config);
        let live = gateway.map(|g| LiveExecutor::new(g, LiveSettings::from(&config.trading)));
        let settings = CoordinatorSettings {
            require_approval: config.trading.require_approval,
            dry_run: config.trading.dry_run,
            kill_switch: config.trading.kill_switch,
            consent,
            cooldown: config.risk.cooldown(),
        };
        let coordinator = ExecutionCoordinator::new(
            ledger.clone(),
            market.clone(),
            FillSimulator::new(config.paper.clone(), config.trading.size_decimals),
            live,
            risk.clone(),
            settings,
            state.clone(),
        );

        Self {
            visibility: NewsVisibility::from_config(&config.news),
            config,
            market,
            ledger,
            risk,
            coordinator,
            state,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> Arc<Mutex<Ledger>> {
        self.ledger.clone()
    }

    /// Write the whole ledger to `app.state_file`
    pub async fn save(&self) -> Result<(), TradeError> {
        let ledger = self.ledger.lock().await;
        match &self.state {
            Some(state) => state.save(&ledger),
            None => ledger.save(&self.config.app.state_file),
        }
    }

    fn write_through(&self, ledger: &Ledger) -> Result<(), TradeError> {
        match &self.state {
            Some(state) => state.save(ledger),
            None => Ok(()),
        }
    }

    /// Run `strategy` on recent data for `symbol` and propose the result
    pub async fn propose(
        &self,
        strategy: StrategyKind,
        symbol: &str,
        mode: ExecutionMode,
        now: DateTime<Utc>,
    ) -> Result<ProposalOutcome, TradeError> {
        let timeframe = &self.config.trading.timeframe;
        let candles = self
            .market
            .candles(symbol, timeframe, now, self.config.trading.candle_limit);
        let last = candles.last().ok_or_else(|| {
            TradeError::Validation(format!("no {} candles for {}", timeframe, symbol))
        })?;
        let news = self.visibility.visible(&self.market.news(symbol), now);
        let features_ref = format!(
            "candles:{}:{}:{};news:{}",
            symbol,
            timeframe,
            last.ts.timestamp(),
            news.len()
        );

        let signal = strategy.build(&self.config).generate(symbol, &candles, &news);
        if signal.is_hold() {
            info!(symbol, strategy = %strategy, rationale = %signal.rationale, "hold");
            let mut ledger = self.ledger.lock().await;
            ledger.audit(
                now,
                "proposal_hold",
                None,
                json!({ "symbol": symbol, "strategy": strategy.as_str(), "rationale": signal.rationale }),
            );
            self.write_through(&ledger)?;
            return Ok(ProposalOutcome::Hold {
                symbol: symbol.to_string(),
                rationale: signal.rationale,
            });
        }

        self.propose_signal(&signal, mode, Some(features_ref), now).await
    }

    /// Turn a ready signal into an intent and gate it through the risk engine
    pub async fn propose_signal(
        &self,
        signal: &TradeSignal,
        mode: ExecutionMode,
        features_ref: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ProposalOutcome, TradeError> {
        let mut ctx = IntentContext::new(now, self.config.trading.intent_ttl(), mode);
        if let Some(features_ref) = features_ref {
            ctx = ctx.with_features_ref(features_ref);
        }
        let candidate = OrderIntent::create(signal, &ctx)?;

        let mut ledger = self.ledger.lock().await;
        if let Some(existing) = ledger.intent(&candidate.intent_id) {
            // Same signal at the same instant
            return Ok(ProposalOutcome::Proposed {
                intent: existing.clone(),
                adjustment: None,
                auto_approved: ledger.approval(&existing.intent_id).is_some(),
            });
        }

        let state = ledger.risk_state(now, self.config.risk.cooldown());
        let account = ledger.account_context(&candidate.symbol, candidate.price);
        let decision = self.risk.evaluate(&candidate, &state, &account, now);

        ledger.audit(
            now,
            "risk_check",
            Some(&candidate.intent_id),
            json!({
                "decision": decision.label(),
                "reason": decision.reason().map(|r| r.code()),
                "adjusted": decision.is_adjusted(),
                "original_size": candidate.size.to_string(),
                "final_size": decision.intent().map(|i| i.size.to_string()),
                "risk_state": state,
            }),
        );

        let adjustment = match &decision {
            RiskDecision::Adjust { adjustment, .. } => Some(*adjustment),
            _ => None,
        };
        let mut intent = match decision {
            RiskDecision::Reject(reason) => {
                self.write_through(&ledger)?;
                return Ok(ProposalOutcome::Rejected {
                    intent: candidate,
                    reason,
                })
            }
            decision => decision
                .into_intent()
                .ok_or_else(|| TradeError::Validation("risk decision without intent".to_string()))?,
        };

        let intent_id = intent.intent_id.clone();
        let auto_approved = if self.autopilot_ok(&intent) {
            let hash = intent.canonical_hash.clone();
            let approval = Approval::grant(&mut intent, &hash, AUTOPILOT_APPROVER, now)?;
            ledger.record_approval(approval);
            true
        } else {
            false
        };

        ledger.audit(
            now,
            "intent_proposed",
            Some(&intent_id),
            json!({
                "symbol": intent.symbol,
                "side": intent.side.as_str(),
                "size": intent.size.to_string(),
                "price": intent.price.to_string(),
                "hash": intent.canonical_hash,
                "auto_approved": auto_approved,
            }),
        );
        info!(
            intent_id = %intent_id,
            symbol = %intent.symbol,
            side = %intent.side,
            size = %intent.size,
            auto_approved,
            "intent proposed"
        );
        ledger.upsert_intent(intent.clone());
        self.write_through(&ledger)?;

        Ok(ProposalOutcome::Proposed {
            intent,
            adjustment,
            auto_approved,
        })
    }

    /// Whether the intent fits inside the tighter autopilot envelope
    fn autopilot_ok(&self, intent: &OrderIntent) -> bool {
        let autopilot = &self.config.autopilot;
        autopilot.enabled
            && autopilot.symbol_whitelist.iter().any(|s| s == &intent.symbol)
            && intent.notional() <= autopilot.max_order_notional
            && self.config.risk.max_loss_per_trade <= autopilot.max_loss_per_trade
            && intent.confidence >= autopilot.min_confidence
    }

    /// Approve a proposed intent by its canonical hash
    pub async fn approve(
        &self,
        intent_id: &str,
        hash: &str,
        approved_by: &str,
        phrase: &str,
        now: DateTime<Utc>,
    ) -> Result<Approval, TradeError> {
        if phrase.trim() != self.config.trading.approval_phrase {
            warn!(intent_id, "approval phrase mismatch");
            return Err(TradeError::ApprovalPhraseMismatch);
        }

        let mut ledger = self.ledger.lock().await;
        let intent = ledger
            .intent_mut(intent_id)
            .ok_or_else(|| TradeError::NotFound(intent_id.to_string()))?;
        let result = Approval::grant(intent, hash, approved_by, now);

        match &result {
            Ok(approval) => {
                ledger.record_approval(approval.clone());
                ledger.audit(
                    now,
                    "approved",
                    Some(intent_id),
                    json!({ "approved_by": approved_by, "hash": approval.intent_hash }),
                );
                info!(intent_id, approved_by, "intent approved");
            }
            Err(e) => {
                ledger.audit(
                    now,
                    "approval_refused",
                    Some(intent_id),
                    json!({ "code": e.code(), "error": e.to_string() }),
                );
                warn!(intent_id, code = e.code(), error = %e, "approval refused");
            }
        }
        self.write_through(&ledger)?;
        result
    }

    pub async fn execute(
        &self,
        intent_id: &str,
        mode: ExecutionMode,
        now: DateTime<Utc>,
    ) -> Result<Execution, TradeError> {
        self.coordinator.execute(intent_id, mode, now).await
    }

    pub async fn retry(&self, intent_id: &str, now: DateTime<Utc>) -> Result<OrderIntent, TradeError> {
        self.coordinator.retry(intent_id, now).await
    }

    /// Propose selling the whole held position of `symbol`
    pub async fn close_position(
        &self,
        symbol: &str,
        mode: ExecutionMode,
        now: DateTime<Utc>,
    ) -> Result<ProposalOutcome, TradeError> {
        let size = self.ledger.lock().await.positions().size(symbol);
        let price = self
            .market
            .latest_orderbook(symbol, now)
            .map(|book| book.bid)
            .or_else(|| {
                self.market
                    .candles(symbol, &self.config.trading.timeframe, now, 1)
                    .last()
                    .map(|c| c.close)
            })
            .ok_or_else(|| TradeError::StaleData(format!("no price for {}", symbol)))?;

        let signal = TradeSignal {
            symbol: symbol.to_string(),
            side: Side::Sell,
            size,
            price,
            confidence: Decimal::ONE,
            rationale: "manual close".to_string(),
            strategy: MANUAL_CLOSE_STRATEGY.to_string(),
        };
        self.propose_signal(&signal, mode, None, now).await
    }

    pub async fn status(&self, now: DateTime<Utc>) -> StatusReport {
        let ledger = self.ledger.lock().await;
        let risk = ledger.risk_state(now, self.config.risk.cooldown());

        let positions = ledger
            .positions()
            .open_positions()
            .map(|(symbol, p)| PositionSummary {
                symbol: symbol.clone(),
                size: p.size,
                avg_cost: p.avg_cost(),
                realized_pnl: p.realized_pnl,
            })
            .collect();

        let mut intents_by_status = BTreeMap::new();
        let mut pending_approval = Vec::new();
        for intent in ledger.intents() {
            *intents_by_status
                .entry(intent.status.as_str().to_string())
                .or_insert(0) += 1;
            if intent.status == IntentStatus::Proposed && !intent.is_expired(now) {
                pending_approval.push(intent.intent_id.clone());
            }
        }

        StatusReport {
            as_of: now,
            kill_switch: ledger.kill_switch() || self.config.trading.kill_switch,
            dry_run: self.config.trading.dry_run,
            require_approval: self.config.trading.require_approval,
            autopilot_enabled: self.config.autopilot.enabled,
            live_consent: self.coordinator.settings().consent.granted(),
            risk,
            positions,
            intents_by_status,
            pending_approval,
            needs_reconciliation: ledger
                .executions()
                .iter()
                .filter(|e| e.needs_reconciliation)
                .map(|e| e.exec_id.clone())
                .collect(),
        }
    }

    pub async fn set_kill_switch(&self, enabled: bool, now: DateTime<Utc>) -> Result<(), TradeError> {
        let mut ledger = self.ledger.lock().await;
        ledger.set_kill_switch(enabled);
        ledger.audit(now, "kill_switch", None, json!({ "enabled": enabled }));
        warn!(enabled, "kill switch changed");
        self.write_through(&ledger)
    }

    /// Replay stored data through the decision pipeline
    pub fn run_backtest(&self, request: &BacktestRequest) -> Result<BacktestResult, TradeError> {
        let candles = self.market.candles_between(
            &request.symbol,
            &request.timeframe,
            request.start,
            request.end,
        );
        let news = self
            .market
            .news(&request.symbol)
            .into_iter()
            .filter(|row| row.observed_at <= request.end)
            .collect();

        let engine = BacktestEngine::new(&self.config, request.strategy.build(&self.config));
        engine.run(request, candles, news)
    }
}
