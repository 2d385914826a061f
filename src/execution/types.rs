//! Execution types

use crate::config::ExecutionMode;
use crate::intent::{IntentStatus, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Filled,
    PartiallyFilled,
    Canceled,
    Rejected,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Filled => "filled",
            ExecutionStatus::PartiallyFilled => "partially_filled",
            ExecutionStatus::Canceled => "canceled",
            ExecutionStatus::Rejected => "rejected",
            ExecutionStatus::Error => "error",
        }
    }

    /// Whether the attempt produced fills that count against the intent
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Filled | ExecutionStatus::PartiallyFilled)
    }

    /// Status the intent moves to after this outcome
    pub fn intent_status(&self) -> IntentStatus {
        match self {
            ExecutionStatus::Filled => IntentStatus::Filled,
            ExecutionStatus::PartiallyFilled => IntentStatus::PartiallyFilled,
            ExecutionStatus::Canceled => IntentStatus::Canceled,
            ExecutionStatus::Rejected => IntentStatus::Rejected,
            ExecutionStatus::Error => IntentStatus::Error,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fill (executed trade leg)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub fill_id: String,
    /// Exchange order id, or a synthetic id for paper fills
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    /// Fees paid, quote currency
    pub fee: Decimal,
    pub ts: DateTime<Utc>,
}

impl Fill {
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}

/// One attempt to fill an intent. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub exec_id: String,
    pub intent_id: String,
    /// Canonical hash of the intent at execution time
    pub intent_hash: String,
    pub mode: ExecutionMode,
    pub status: ExecutionStatus,
    pub fee: Decimal,
    pub slippage_model: String,
    /// Free-form diagnostics
    pub details: serde_json::Value,
    /// Live order whose final state could not be confirmed
    #[serde(default)]
    pub needs_reconciliation: bool,
    pub executed_at: DateTime<Utc>,
    #[serde(default)]
    pub fills: Vec<Fill>,
}

impl Execution {
    pub fn filled_size(&self) -> Decimal {
        self.fills.iter().map(|f| f.size).sum()
    }

    /// Size-weighted average fill price
    pub fn avg_price(&self) -> Option<Decimal> {
        let size = self.filled_size();
        if size <= Decimal::ZERO {
            return None;
        }
        let notional: Decimal = self.fills.iter().map(Fill::notional).sum();
        Some(notional / size)
    }
}
