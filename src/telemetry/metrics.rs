//! Prometheus metrics
//!
//! Thin wrappers over the `metrics` facade so metric names live in one place.
//! Without an installed recorder these are no-ops.

use crate::config::ExecutionMode;
use rust_decimal::Decimal;

const RISK_DECISIONS: &str = "spot_agent_risk_decisions_total";
const EXECUTIONS: &str = "spot_agent_executions_total";
const GATEWAY_ERRORS: &str = "spot_agent_gateway_errors_total";
const BACKTEST_EQUITY: &str = "spot_agent_backtest_equity";

/// Count a risk decision (`accept`, `adjust`, `reject`)
pub fn record_risk_decision(decision: &'static str, reason: &'static str) {
    metrics::counter!(RISK_DECISIONS, "decision" => decision, "reason" => reason).increment(1);
}

/// Count an execution attempt by outcome
pub fn record_execution(mode: ExecutionMode, status: &'static str) {
    metrics::counter!(EXECUTIONS, "mode" => mode.as_str(), "status" => status).increment(1);
}

/// Count a failed or timed-out gateway call
pub fn record_gateway_error(op: &'static str) {
    metrics::counter!(GATEWAY_ERRORS, "op" => op).increment(1);
    tracing::debug!(metric = GATEWAY_ERRORS, op, "gateway error recorded");
}

/// Latest mark-to-market equity of a running backtest
pub fn record_backtest_equity(equity: Decimal) {
    let value: f64 = equity.try_into().unwrap_or(0.0);
    metrics::gauge!(BACKTEST_EQUITY).set(value);
}
