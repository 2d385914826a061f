//! JSON-backed ledger

use crate::error::TradeError;
use crate::execution::{Execution, ExecutionStatus, Fill};
use crate::intent::{Approval, IntentStatus, OrderIntent};
use crate::risk::{AccountContext, PositionBook, RiskState};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

/// Human-readable record of a decision or state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub ts: DateTime<Utc>,
    pub event: String,
    #[serde(default)]
    pub intent_id: Option<String>,
    pub payload: serde_json::Value,
}

/// Persistent record of everything the agent decided and did
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    intents: BTreeMap<String, OrderIntent>,
    /// Latest approval per intent
    #[serde(default)]
    approvals: BTreeMap<String, Approval>,
    /// Append-only, in commit order
    #[serde(default)]
    executions: Vec<Execution>,
    #[serde(default)]
    audit: Vec<AuditEntry>,
    #[serde(default)]
    kill_switch: bool,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing file is an empty ledger
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TradeError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write atomically: temp file in the same directory, then rename
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TradeError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn upsert_intent(&mut self, intent: OrderIntent) {
        self.intents.insert(intent.intent_id.clone(), intent);
    }

    pub fn intent(&self, intent_id: &str) -> Option<&OrderIntent> {
        self.intents.get(intent_id)
    }

    pub fn intent_mut(&mut self, intent_id: &str) -> Option<&mut OrderIntent> {
        self.intents.get_mut(intent_id)
    }

    pub fn intents(&self) -> impl Iterator<Item = &OrderIntent> {
        self.intents.values()
    }

    pub fn record_approval(&mut self, approval: Approval) {
        self.approvals.insert(approval.intent_id.clone(), approval);
    }

    pub fn approval(&self, intent_id: &str) -> Option<&Approval> {
        self.approvals.get(intent_id)
    }

    pub fn record_execution(&mut self, execution: Execution) {
        self.executions.push(execution);
    }

    pub fn executions(&self) -> &[Execution] {
        &self.executions
    }

    pub fn executions_for<'a>(&'a self, intent_id: &'a str) -> impl Iterator<Item = &'a Execution> {
        self.executions.iter().filter(move |e| e.intent_id == intent_id)
    }

    /// Whether the intent already has a filled or partially filled execution
    pub fn has_successful_execution(&self, intent_id: &str) -> bool {
        self.executions_for(intent_id).any(|e| e.status.is_success())
    }

    /// Whether any execution of the intent is flagged for manual reconciliation
    pub fn needs_reconciliation(&self, intent_id: &str) -> bool {
        self.executions_for(intent_id).any(|e| e.needs_reconciliation)
    }

    /// Settle intents left `executing` by a process that died before committing.
    ///
    /// Only call this while holding the state file: under the lock no other run
    /// can have an attempt in flight. The order may or may not have reached the
    /// exchange, so the intent ends in `error` with a reconciliation flag.
    pub fn recover_interrupted(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let stuck: Vec<String> = self
            .intents
            .values()
            .filter(|i| i.status == IntentStatus::Executing)
            .map(|i| i.intent_id.clone())
            .collect();

        for intent_id in &stuck {
            let Some(intent) = self.intents.get_mut(intent_id) else {
                continue;
            };
            intent.status = IntentStatus::Error;
            let execution = Execution {
                exec_id: Uuid::new_v4().to_string(),
                intent_id: intent_id.clone(),
                intent_hash: intent.canonical_hash.clone(),
                mode: intent.mode,
                status: ExecutionStatus::Error,
                fee: Decimal::ZERO,
                slippage_model: "unknown".to_string(),
                details: serde_json::json!({ "error": "attempt interrupted before its result was recorded" }),
                needs_reconciliation: true,
                executed_at: now,
                fills: vec![],
            };
            warn!(intent_id = %intent_id, mode = %intent.mode, "interrupted execution needs reconciliation");
            self.executions.push(execution);
            self.audit(
                now,
                "interrupted_execution",
                Some(intent_id),
                serde_json::json!({ "needs_reconciliation": true }),
            );
        }
        stuck
    }

    /// All fills in commit order
    pub fn fills(&self) -> impl Iterator<Item = &Fill> {
        self.executions.iter().flat_map(|e| e.fills.iter())
    }

    pub fn positions(&self) -> PositionBook {
        PositionBook::from_fills(self.fills())
    }

    /// Position facts for `symbol`, marked at `mark`
    pub fn account_context(&self, symbol: &str, mark: Decimal) -> AccountContext {
        let book = self.positions();
        AccountContext {
            position_size: book.size(symbol),
            unrealized_pnl: book.unrealized_pnl(symbol, mark),
        }
    }

    pub fn audit(
        &mut self,
        ts: DateTime<Utc>,
        event: impl Into<String>,
        intent_id: Option<&str>,
        payload: serde_json::Value,
    ) {
        self.audit.push(AuditEntry {
            ts,
            event: event.into(),
            intent_id: intent_id.map(str::to_string),
            payload,
        });
    }

    pub fn audit_entries(&self) -> &[AuditEntry] {
        &self.audit
    }

    pub fn kill_switch(&self) -> bool {
        self.kill_switch
    }

    pub fn set_kill_switch(&mut self, enabled: bool) {
        self.kill_switch = enabled;
    }

    /// Derive risk counters for the UTC day containing `now`
    pub fn risk_state(&self, now: DateTime<Utc>, cooldown: Duration) -> RiskState {
        let mut state = RiskState::new(now);
        state.kill_switch = self.kill_switch;

        let today = now.date_naive();
        let mut book = PositionBook::new();
        let mut last_exec: Option<DateTime<Utc>> = None;

        for execution in &self.executions {
            let mut realized = Decimal::ZERO;
            for fill in &execution.fills {
                let pnl = book.apply_fill(fill);
                if fill.ts.date_naive() == today {
                    realized += pnl;
                }
            }
            state.realized_pnl_today += realized;

            if !execution.status.is_success() {
                continue;
            }
            if execution.executed_at.date_naive() == today {
                state.orders_today += 1;
            }
            if last_exec.map_or(true, |t| execution.executed_at >= t) {
                last_exec = Some(execution.executed_at);
            }
            if let (Some(price), Some(fill)) = (execution.avg_price(), execution.fills.first()) {
                state.last_exec_price.insert(fill.symbol.clone(), price);
            }
        }

        state.cooldown_until = last_exec.map(|t| t + cooldown);
        state
    }
}
