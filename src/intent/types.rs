//! Intent model types

use crate::config::ExecutionMode;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Trade direction. `Hold` is a valid strategy output but never an executable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
    Hold,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
            Side::Hold => "hold",
        }
    }

    /// Whether this side results in an order at all
    pub fn is_tradable(&self) -> bool {
        !matches!(self, Side::Hold)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Limit order (price specified)
    Limit,
    /// Market order (immediate execution)
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "limit",
            OrderType::Market => "market",
        }
    }
}

/// Time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good till canceled
    Gtc,
    /// Immediate or cancel, partial fills allowed
    Ioc,
    /// Fill or kill, no partial fills
    Fok,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Gtc => "GTC",
            TimeInForce::Ioc => "IOC",
            TimeInForce::Fok => "FOK",
        }
    }

    pub fn allows_partial(&self) -> bool {
        !matches!(self, TimeInForce::Fok)
    }
}

/// Lifecycle status of an order intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Proposed,
    Approved,
    Executing,
    Filled,
    PartiallyFilled,
    Canceled,
    Expired,
    Rejected,
    Error,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Proposed => "proposed",
            IntentStatus::Approved => "approved",
            IntentStatus::Executing => "executing",
            IntentStatus::Filled => "filled",
            IntentStatus::PartiallyFilled => "partially_filled",
            IntentStatus::Canceled => "canceled",
            IntentStatus::Expired => "expired",
            IntentStatus::Rejected => "rejected",
            IntentStatus::Error => "error",
        }
    }

    /// Statuses from which no further execution happens without an explicit retry
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntentStatus::Filled
                | IntentStatus::PartiallyFilled
                | IntentStatus::Canceled
                | IntentStatus::Expired
                | IntentStatus::Rejected
                | IntentStatus::Error
        )
    }

    /// Lifecycle state machine.
    ///
    /// `Canceled`/`Error` may be re-armed to `Approved` by an explicit retry that has
    /// passed the risk engine again.
    pub fn can_transition_to(&self, next: IntentStatus) -> bool {
        use IntentStatus::*;
        matches!(
            (self, next),
            (Proposed, Approved)
                | (Proposed, Expired)
                | (Proposed, Rejected)
                | (Approved, Executing)
                | (Approved, Expired)
                | (Approved, Rejected)
                | (Executing, Filled)
                | (Executing, PartiallyFilled)
                | (Executing, Canceled)
                | (Executing, Rejected)
                | (Executing, Error)
                | (Canceled, Approved)
                | (Canceled, Rejected)
                | (Error, Approved)
                | (Error, Rejected)
        )
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intent model errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntentError {
    /// Canonical fields may only change while the intent is proposed
    #[error("intent {intent_id} is {status}; canonical fields are immutable")]
    Immutable {
        intent_id: String,
        status: IntentStatus,
    },
    /// Illegal lifecycle move
    #[error("invalid transition {from} -> {to}")]
    InvalidTransition { from: IntentStatus, to: IntentStatus },
    /// Malformed signal or intent
    #[error("invalid intent: {0}")]
    Validation(String),
}

/// Strategy output before it becomes an intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub symbol: String,
    pub side: Side,
    /// Base-asset quantity
    pub size: Decimal,
    /// Limit reference price
    pub price: Decimal,
    pub confidence: Decimal,
    pub rationale: String,
    pub strategy: String,
}

impl TradeSignal {
    /// A no-trade signal
    pub fn hold(
        symbol: impl Into<String>,
        strategy: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side: Side::Hold,
            size: Decimal::ZERO,
            price: Decimal::ZERO,
            confidence: Decimal::ZERO,
            rationale: rationale.into(),
            strategy: strategy.into(),
        }
    }

    pub fn is_hold(&self) -> bool {
        self.side == Side::Hold
    }
}

/// Context an intent is created in
#[derive(Debug, Clone)]
pub struct IntentContext {
    /// Creation time (wall clock live, simulated time in backtests)
    pub now: DateTime<Utc>,
    /// Time to live before an unapproved intent expires
    pub ttl: Duration,
    pub mode: ExecutionMode,
    /// Reference to the feature snapshot that produced the signal
    pub features_ref: Option<String>,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
}

impl IntentContext {
    pub fn new(now: DateTime<Utc>, ttl: Duration, mode: ExecutionMode) -> Self {
        Self {
            now,
            ttl,
            mode,
            features_ref: None,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtc,
        }
    }

    pub fn with_features_ref(mut self, features_ref: impl Into<String>) -> Self {
        self.features_ref = Some(features_ref.into());
        self
    }

    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }
}

/// Human (or autopilot) authorization bound to an exact intent hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub intent_id: String,
    pub intent_hash: String,
    pub approved_by: String,
    pub approved_at: DateTime<Utc>,
}

impl Approval {
    /// Whether this approval still binds the intent whose current hash is `current_hash`
    pub fn matches(&self, current_hash: &str) -> bool {
        self.intent_hash == current_hash
    }
}
