//! Crate-level error taxonomy
//!
//! Every refusal carries a stable machine-readable code so the CLI and the audit
//! log can report it without parsing messages.

use crate::execution::GatewayError;
use crate::intent::{IntentError, IntentStatus};
use crate::risk::RiskReason;
use thiserror::Error;

/// Errors surfaced by the trading service
#[derive(Debug, Error)]
pub enum TradeError {
    /// Malformed input (symbol not whitelisted, bad arguments)
    #[error("validation failed: {0}")]
    Validation(String),
    /// The risk engine refused the intent
    #[error("risk rejected: {0}")]
    RiskRejected(RiskReason),
    /// Live execution without both consent flags
    #[error("live trading consent missing (env={env}, config={config})")]
    ConsentMissing { env: bool, config: bool },
    /// Exchange gateway failure
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
    /// Market data too old or missing for a decision
    #[error("stale market data: {0}")]
    StaleData(String),
    /// Presented hash does not match the intent's canonical hash
    #[error("hash mismatch: presented {expected}, current {actual}")]
    HashMismatch { expected: String, actual: String },
    /// Unknown intent or execution
    #[error("not found: {0}")]
    NotFound(String),
    /// Intent has no valid approval
    #[error("intent {0} is not approved")]
    ApprovalRequired(String),
    /// Intent deadline passed
    #[error("intent {0} has expired")]
    IntentExpired(String),
    /// An execution for the intent is already in flight
    #[error("intent {0} is already executing")]
    AlreadyExecuting(String),
    /// The intent already has a successful execution
    #[error("intent {0} was already executed")]
    AlreadyExecuted(String),
    /// The intent's status does not permit the operation
    #[error("intent {intent_id} is {status}")]
    InvalidState {
        intent_id: String,
        status: IntentStatus,
    },
    /// A prior attempt's exchange state is unknown
    #[error("intent {0} needs manual reconciliation before another attempt")]
    NeedsReconciliation(String),
    /// Live execution refused by the dry-run switch
    #[error("dry run is enabled; live execution refused")]
    DryRunEnabled,
    /// Interactive approval phrase did not match
    #[error("approval phrase mismatch")]
    ApprovalPhraseMismatch,
    /// Intent model violation
    #[error(transparent)]
    Intent(#[from] IntentError),
    /// Ledger or data file I/O
    #[error("storage error: {0}")]
    Storage(String),
}

impl TradeError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            TradeError::Validation(_) => "validation",
            TradeError::RiskRejected(reason) => reason.code(),
            TradeError::ConsentMissing { .. } => "consent_missing",
            TradeError::Gateway(_) => "gateway_error",
            TradeError::StaleData(_) => "stale_data",
            TradeError::HashMismatch { .. } => "hash_mismatch",
            TradeError::NotFound(_) => "not_found",
            TradeError::ApprovalRequired(_) => "approval_required",
            TradeError::IntentExpired(_) => "intent_expired",
            TradeError::AlreadyExecuting(_) => "already_executing",
            TradeError::AlreadyExecuted(_) => "already_executed",
            TradeError::InvalidState { .. } => "invalid_state",
            TradeError::NeedsReconciliation(_) => "needs_reconciliation",
            TradeError::DryRunEnabled => "dry_run",
            TradeError::ApprovalPhraseMismatch => "approval_phrase_mismatch",
            TradeError::Intent(IntentError::Immutable { .. }) => "immutable_intent",
            TradeError::Intent(IntentError::InvalidTransition { .. }) => "invalid_transition",
            TradeError::Intent(IntentError::Validation(_)) => "validation",
            TradeError::Storage(_) => "storage_error",
        }
    }
}

impl From<std::io::Error> for TradeError {
    fn from(e: std::io::Error) -> Self {
        TradeError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for TradeError {
    fn from(e: serde_json::Error) -> Self {
        TradeError::Storage(e.to_string())
    }
}
