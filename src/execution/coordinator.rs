//! Execution coordinator
//!
//! Drives an approved intent through `approved → executing → final`. The
//! eligibility check and the move to `executing` happen under the ledger lock, so
//! at most one attempt per intent is ever in flight. Simulator or gateway work
//! runs with the lock released; the result is committed under the lock again.
//!
//! With a state file attached, the ledger is written through after the move to
//! `executing` and again after the commit. A run that dies in between leaves the
//! intent `executing` on disk, never `approved`.

use super::live::LiveExecutor;
use super::paper::FillSimulator;
use super::{Execution, ExecutionStatus, Fill, GatewayError};
use crate::config::ExecutionMode;
use crate::error::TradeError;
use crate::intent::{IntentStatus, OrderIntent};
use crate::market::MarketDataStore;
use crate::risk::{RiskDecision, RiskEngine, RiskReason};
use crate::store::{Ledger, StateFile};
use crate::telemetry;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Environment variable carrying the environment half of live consent
pub const LIVE_CONSENT_ENV: &str = "I_UNDERSTAND_LIVE_TRADING";

/// Both halves of the live-trading consent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiveConsent {
    pub env: bool,
    pub config: bool,
}

impl LiveConsent {
    /// Read the environment flag; `config` comes from `trading.i_understand_live_trading`
    pub fn from_env(config: bool) -> Self {
        let env = std::env::var(LIVE_CONSENT_ENV)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self { env, config }
    }

    pub fn granted(&self) -> bool {
        self.env && self.config
    }

    pub fn check(&self) -> Result<(), TradeError> {
        if self.granted() {
            Ok(())
        } else {
            Err(TradeError::ConsentMissing {
                env: self.env,
                config: self.config,
            })
        }
    }
}

/// Coordinator policy switches
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub require_approval: bool,
    pub dry_run: bool,
    /// Configured kill switch; the ledger flag is checked as well
    pub kill_switch: bool,
    pub consent: LiveConsent,
    pub cooldown: chrono::Duration,
}

/// Runs execution attempts against the shared ledger
pub struct ExecutionCoordinator {
    ledger: Arc<Mutex<Ledger>>,
    market: Arc<dyn MarketDataStore>,
    simulator: FillSimulator,
    live: Option<LiveExecutor>,
    risk: RiskEngine,
    settings: CoordinatorSettings,
    state: Option<Arc<StateFile>>,
}

enum Attempt {
    Paper(OrderIntent, Option<crate::orderbook::OrderBookSnapshot>),
    Live(OrderIntent),
}

impl ExecutionCoordinator {
    pub fn new(
        ledger: Arc<Mutex<Ledger>>,
        market: Arc<dyn MarketDataStore>,
        simulator: FillSimulator,
        live: Option<LiveExecutor>,
        risk: RiskEngine,
        settings: CoordinatorSettings,
        state: Option<Arc<StateFile>>,
    ) -> Self {
        Self {
            ledger,
            market,
            simulator,
            live,
            risk,
            settings,
            state,
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    fn persist(&self, ledger: &Ledger) -> Result<(), TradeError> {
        match &self.state {
            Some(state) => state.save(ledger),
            None => Ok(()),
        }
    }

    /// Execute an approved intent in `mode`
    pub async fn execute(
        &self,
        intent_id: &str,
        mode: ExecutionMode,
        now: DateTime<Utc>,
    ) -> Result<Execution, TradeError> {
        let attempt = {
            let mut ledger = self.ledger.lock().await;
            match self.begin(&mut ledger, intent_id, mode, now) {
                Ok(attempt) => {
                    // Nothing is sent until `executing` is on disk
                    if let Err(e) = self.persist(&ledger) {
                        self.abandon(&mut ledger, intent_id, &e, now);
                        return Err(e);
                    }
                    attempt
                }
                Err(e) => {
                    warn!(intent_id, mode = %mode, code = e.code(), error = %e, "execution refused");
                    ledger.audit(
                        now,
                        "execution_refused",
                        Some(intent_id),
                        json!({ "mode": mode.as_str(), "code": e.code(), "error": e.to_string() }),
                    );
                    self.persist(&ledger)?;
                    return Err(e);
                }
            }
        };

        let execution = match attempt {
            Attempt::Paper(intent, snapshot) => self.run_paper(&intent, snapshot.as_ref(), now),
            Attempt::Live(intent) => self.run_live(&intent, now).await,
        };

        let mut ledger = self.ledger.lock().await;
        let execution = self.commit(&mut ledger, execution, now)?;
        self.persist(&ledger)?;
        Ok(execution)
    }

    /// Back out of an attempt that never started. No order was sent.
    fn abandon(&self, ledger: &mut Ledger, intent_id: &str, cause: &TradeError, now: DateTime<Utc>) {
        if let Some(intent) = ledger.intent_mut(intent_id) {
            let _ = intent.transition(IntentStatus::Error);
        }
        ledger.audit(
            now,
            "execution_abandoned",
            Some(intent_id),
            json!({ "code": cause.code(), "error": cause.to_string() }),
        );
        warn!(intent_id, error = %cause, "could not persist executing state; attempt abandoned");
    }

    /// Eligibility checks and the move to `executing`, under the lock
    fn begin(
        &self,
        ledger: &mut Ledger,
        intent_id: &str,
        mode: ExecutionMode,
        now: DateTime<Utc>,
    ) -> Result<Attempt, TradeError> {
        let intent = ledger
            .intent(intent_id)
            .ok_or_else(|| TradeError::NotFound(intent_id.to_string()))?;

        if intent.status == IntentStatus::Executing {
            return Err(TradeError::AlreadyExecuting(intent_id.to_string()));
        }
        if ledger.has_successful_execution(intent_id) {
            return Err(TradeError::AlreadyExecuted(intent_id.to_string()));
        }
        if intent.mode != mode {
            return Err(TradeError::Validation(format!(
                "intent was proposed for {} mode, not {}",
                intent.mode, mode
            )));
        }
        if self.settings.kill_switch || ledger.kill_switch() {
            return Err(TradeError::RiskRejected(RiskReason::KillSwitch));
        }
        if ledger.needs_reconciliation(intent_id) {
            return Err(TradeError::NeedsReconciliation(intent_id.to_string()));
        }

        // Other intents may have filled since this one was approved
        let state = ledger.risk_state(now, self.settings.cooldown);
        let account = ledger.account_context(&intent.symbol, intent.price);
        if let Some(reason) = self.risk.daily_limit_breach(&state, &account) {
            return Err(TradeError::RiskRejected(reason));
        }

        if intent.is_expired(now)
            && matches!(intent.status, IntentStatus::Proposed | IntentStatus::Approved)
        {
            if let Some(intent) = ledger.intent_mut(intent_id) {
                intent.transition(IntentStatus::Expired)?;
            }
            ledger.audit(now, "intent_expired", Some(intent_id), json!({}));
            return Err(TradeError::IntentExpired(intent_id.to_string()));
        }

        let current_hash = intent.compute_hash();
        if !intent.verify_hash() {
            return Err(TradeError::HashMismatch {
                expected: intent.canonical_hash.clone(),
                actual: current_hash,
            });
        }

        if self.settings.require_approval {
            let approval = ledger
                .approval(intent_id)
                .ok_or_else(|| TradeError::ApprovalRequired(intent_id.to_string()))?;
            if !approval.matches(&current_hash) {
                return Err(TradeError::HashMismatch {
                    expected: approval.intent_hash.clone(),
                    actual: current_hash,
                });
            }
        }

        let status = intent.status;
        let symbol = intent.symbol.clone();
        let eligible = status == IntentStatus::Approved
            || (!self.settings.require_approval && status == IntentStatus::Proposed);
        if !eligible {
            return Err(TradeError::InvalidState {
                intent_id: intent_id.to_string(),
                status,
            });
        }

        let snapshot = match mode {
            ExecutionMode::Live => {
                self.settings.consent.check()?;
                if self.settings.dry_run {
                    return Err(TradeError::DryRunEnabled);
                }
                let live = self.live.as_ref().ok_or_else(|| {
                    GatewayError::Unavailable("no exchange gateway configured".to_string())
                })?;
                if !live.gateway().has_credentials() {
                    return Err(GatewayError::Credentials("missing API credentials".to_string()).into());
                }
                None
            }
            ExecutionMode::Paper => self.market.latest_orderbook(&symbol, now),
        };

        let intent = ledger
            .intent_mut(intent_id)
            .ok_or_else(|| TradeError::NotFound(intent_id.to_string()))?;
        if intent.status == IntentStatus::Proposed {
            intent.transition(IntentStatus::Approved)?;
        }
        intent.transition(IntentStatus::Executing)?;
        let intent = intent.clone();
        ledger.audit(
            now,
            "execution_started",
            Some(intent_id),
            json!({ "mode": mode.as_str(), "hash": current_hash }),
        );
        info!(intent_id, mode = %mode, symbol = %symbol, "execution started");

        Ok(match mode {
            ExecutionMode::Paper => Attempt::Paper(intent, snapshot),
            ExecutionMode::Live => Attempt::Live(intent),
        })
    }

    fn run_paper(
        &self,
        intent: &OrderIntent,
        snapshot: Option<&crate::orderbook::OrderBookSnapshot>,
        now: DateTime<Utc>,
    ) -> Execution {
        let exec_id = Uuid::new_v4().to_string();
        let result = self.simulator.simulate(intent, snapshot, now);

        let fills = if result.size > Decimal::ZERO {
            vec![Fill {
                fill_id: Uuid::new_v4().to_string(),
                order_id: format!("paper-{}", exec_id),
                symbol: intent.symbol.clone(),
                side: intent.side,
                price: result.price,
                size: result.size,
                fee: result.fee,
                ts: now,
            }]
        } else {
            vec![]
        };

        Execution {
            exec_id,
            intent_id: intent.intent_id.clone(),
            intent_hash: intent.canonical_hash.clone(),
            mode: ExecutionMode::Paper,
            status: result.status,
            fee: result.fee,
            slippage_model: self.simulator.slippage_model(),
            details: json!({
                "reason": result.reason,
                "seed": result.seed,
                "snapshot_ts": snapshot.map(|s| s.ts),
                "bid": snapshot.map(|s| s.bid.to_string()),
                "ask": snapshot.map(|s| s.ask.to_string()),
            }),
            needs_reconciliation: false,
            executed_at: now,
            fills,
        }
    }

    async fn run_live(&self, intent: &OrderIntent, now: DateTime<Utc>) -> Execution {
        let exec_id = Uuid::new_v4().to_string();
        let outcome = match &self.live {
            Some(live) => live.execute(intent, &exec_id).await,
            // begin() refuses live attempts without a gateway
            None => super::live::LiveOutcome {
                status: ExecutionStatus::Error,
                order_placed: false,
                order_id: None,
                filled_size: Decimal::ZERO,
                avg_price: None,
                fee: Decimal::ZERO,
                needs_reconciliation: false,
                details: json!({ "error": "no exchange gateway configured" }),
            },
        };

        let fills = match (outcome.filled_size > Decimal::ZERO, &outcome.order_id) {
            (true, Some(order_id)) => vec![Fill {
                fill_id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                symbol: intent.symbol.clone(),
                side: intent.side,
                price: outcome.avg_price.unwrap_or(intent.price),
                size: outcome.filled_size,
                fee: outcome.fee,
                ts: now,
            }],
            _ => vec![],
        };

        Execution {
            exec_id,
            intent_id: intent.intent_id.clone(),
            intent_hash: intent.canonical_hash.clone(),
            mode: ExecutionMode::Live,
            status: outcome.status,
            fee: outcome.fee,
            slippage_model: "maker_limit".to_string(),
            details: outcome.details,
            needs_reconciliation: outcome.needs_reconciliation,
            executed_at: now,
            fills,
        }
    }

    /// Record the execution, its fills and the intent's new status together
    fn commit(
        &self,
        ledger: &mut Ledger,
        execution: Execution,
        now: DateTime<Utc>,
    ) -> Result<Execution, TradeError> {
        let intent_id = execution.intent_id.clone();
        if let Some(intent) = ledger.intent_mut(&intent_id) {
            intent.transition(execution.status.intent_status())?;
        }

        ledger.audit(
            now,
            "execution",
            Some(&intent_id),
            json!({
                "exec_id": execution.exec_id,
                "mode": execution.mode.as_str(),
                "status": execution.status.as_str(),
                "filled": execution.filled_size().to_string(),
                "fee": execution.fee.to_string(),
                "needs_reconciliation": execution.needs_reconciliation,
            }),
        );
        info!(
            intent_id = %intent_id,
            exec_id = %execution.exec_id,
            mode = %execution.mode,
            status = %execution.status,
            filled = %execution.filled_size(),
            "execution committed"
        );
        telemetry::record_execution(execution.mode, execution.status.as_str());

        ledger.record_execution(execution.clone());
        Ok(execution)
    }

    /// Re-arm a canceled or errored intent after a fresh risk check
    pub async fn retry(&self, intent_id: &str, now: DateTime<Utc>) -> Result<OrderIntent, TradeError> {
        let mut ledger = self.ledger.lock().await;
        let result = self.rearm(&mut ledger, intent_id, now);
        self.persist(&ledger)?;
        result
    }

    fn rearm(
        &self,
        ledger: &mut Ledger,
        intent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<OrderIntent, TradeError> {
        let intent = ledger
            .intent(intent_id)
            .cloned()
            .ok_or_else(|| TradeError::NotFound(intent_id.to_string()))?;

        if !matches!(intent.status, IntentStatus::Canceled | IntentStatus::Error) {
            return Err(TradeError::InvalidState {
                intent_id: intent_id.to_string(),
                status: intent.status,
            });
        }
        if intent.is_expired(now) {
            return Err(TradeError::IntentExpired(intent_id.to_string()));
        }
        if ledger.needs_reconciliation(intent_id) {
            return Err(TradeError::NeedsReconciliation(intent_id.to_string()));
        }

        let state = ledger.risk_state(now, self.settings.cooldown);
        let account = ledger.account_context(&intent.symbol, intent.price);
        let decision = self.risk.evaluate(&intent, &state, &account, now);

        match decision {
            RiskDecision::Accept(_) => {
                let intent = ledger
                    .intent_mut(intent_id)
                    .ok_or_else(|| TradeError::NotFound(intent_id.to_string()))?;
                intent.transition(IntentStatus::Approved)?;
                let intent = intent.clone();
                ledger.audit(now, "retry_rearmed", Some(intent_id), json!({}));
                Ok(intent)
            }
            RiskDecision::Adjust {
                intent: adjusted,
                original_size,
                adjustment,
            } => {
                ledger.audit(
                    now,
                    "retry_requires_new_proposal",
                    Some(intent_id),
                    json!({
                        "original_size": original_size.to_string(),
                        "allowed_size": adjusted.size.to_string(),
                        "adjustment": adjustment.as_str(),
                    }),
                );
                Err(TradeError::Validation(format!(
                    "risk limits now allow {} instead of {}; propose again",
                    adjusted.size, original_size
                )))
            }
            RiskDecision::Reject(reason) => {
                if let Some(intent) = ledger.intent_mut(intent_id) {
                    intent.transition(IntentStatus::Rejected)?;
                }
                ledger.audit(
                    now,
                    "retry_rejected",
                    Some(intent_id),
                    json!({ "reason": reason.code() }),
                );
                Err(TradeError::RiskRejected(reason))
            }
        }
    }
}
