//! Order intent model
//!
//! An intent is a proposed trade. Its canonical fields are hashed at creation and
//! frozen once the intent leaves `proposed`; approvals bind to that hash.

mod canonical;
mod types;

pub use canonical::{canonicalize, hash, CANONICAL_FIELDS};
pub use types::{
    Approval, IntentContext, IntentError, IntentStatus, OrderType, Side, TimeInForce,
    TradeSignal,
};

use crate::config::ExecutionMode;
use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for deterministic intent ids
const INTENT_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93b7_4d0a_8c55_1e2f_7a9b_3c01);

/// A proposed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub intent_id: String,
    pub symbol: String,
    pub side: Side,
    /// Base-asset quantity
    pub size: Decimal,
    /// Limit reference price
    pub price: Decimal,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub strategy_name: String,
    pub confidence: Decimal,
    pub rationale: String,
    pub features_ref: Option<String>,
    pub mode: ExecutionMode,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: IntentStatus,
    /// Hash of the canonical fields as of the last legitimate change
    pub canonical_hash: String,
}

impl OrderIntent {
    /// Build a proposed intent from a strategy signal
    pub fn create(signal: &TradeSignal, ctx: &IntentContext) -> Result<Self, IntentError> {
        if signal.symbol.trim().is_empty() {
            return Err(IntentError::Validation("symbol is empty".to_string()));
        }
        if signal.size < Decimal::ZERO {
            return Err(IntentError::Validation(format!(
                "size must be >= 0, got {}",
                signal.size
            )));
        }
        if ctx.ttl <= chrono::Duration::zero() {
            return Err(IntentError::Validation("ttl must be positive".to_string()));
        }

        // Microsecond precision is what the canonical form carries
        let created_at = ctx.now.trunc_subsecs(6);
        let expires_at = created_at + ctx.ttl;
        let intent_id = derive_intent_id(signal, ctx.mode, created_at);

        let mut intent = Self {
            intent_id,
            symbol: signal.symbol.clone(),
            side: signal.side,
            size: signal.size,
            price: signal.price,
            order_type: ctx.order_type,
            time_in_force: ctx.time_in_force,
            strategy_name: signal.strategy.clone(),
            confidence: signal.confidence,
            rationale: signal.rationale.clone(),
            features_ref: ctx.features_ref.clone(),
            mode: ctx.mode,
            created_at,
            expires_at,
            status: IntentStatus::Proposed,
            canonical_hash: String::new(),
        };
        intent.canonical_hash = intent.compute_hash();
        Ok(intent)
    }

    /// Canonical bytes of the immutable fields
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonicalize(self)
    }

    /// Recompute the canonical hash from the current field values
    pub fn compute_hash(&self) -> String {
        hash(self)
    }

    /// Whether the stored hash still matches the fields
    pub fn verify_hash(&self) -> bool {
        self.canonical_hash == self.compute_hash()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn notional(&self) -> Decimal {
        self.size * self.price
    }

    /// Shrink the size during risk evaluation; only legal while proposed
    pub fn adjust_size(&mut self, size: Decimal) -> Result<(), IntentError> {
        if self.status != IntentStatus::Proposed {
            return Err(IntentError::Immutable {
                intent_id: self.intent_id.clone(),
                status: self.status,
            });
        }
        if size < Decimal::ZERO {
            return Err(IntentError::Validation(format!(
                "size must be >= 0, got {}",
                size
            )));
        }
        self.size = size;
        self.canonical_hash = self.compute_hash();
        Ok(())
    }

    /// Move to `next` if the lifecycle allows it
    pub fn transition(&mut self, next: IntentStatus) -> Result<(), IntentError> {
        if !self.status.can_transition_to(next) {
            return Err(IntentError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Expire a not-yet-approved intent whose deadline has passed.
    /// Returns true if the status changed.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == IntentStatus::Proposed && self.is_expired(now) {
            self.status = IntentStatus::Expired;
            return true;
        }
        false
    }
}

fn derive_intent_id(signal: &TradeSignal, mode: ExecutionMode, created_at: DateTime<Utc>) -> String {
    let seed = format!(
        "{}|{}|{}|{}|{}|{}|{}",
        signal.strategy,
        signal.symbol,
        signal.side.as_str(),
        canonical::decimal_str(signal.size),
        canonical::decimal_str(signal.price),
        mode.as_str(),
        canonical::timestamp_str(created_at),
    );
    Uuid::new_v5(&INTENT_NAMESPACE, seed.as_bytes()).to_string()
}

impl Approval {
    /// Authorize `intent` if `presented_hash` matches its current canonical hash.
    ///
    /// Expires the intent as a side effect when its deadline has passed.
    pub fn grant(
        intent: &mut OrderIntent,
        presented_hash: &str,
        approved_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Approval, crate::error::TradeError> {
        use crate::error::TradeError;

        if intent.expire_if_due(now) || intent.status == IntentStatus::Expired {
            return Err(TradeError::IntentExpired(intent.intent_id.clone()));
        }
        if intent.status != IntentStatus::Proposed {
            return Err(TradeError::InvalidState {
                intent_id: intent.intent_id.clone(),
                status: intent.status,
            });
        }
        let current = intent.compute_hash();
        if presented_hash != current {
            return Err(TradeError::HashMismatch {
                expected: presented_hash.to_string(),
                actual: current,
            });
        }
        intent.transition(IntentStatus::Approved)?;
        Ok(Approval {
            intent_id: intent.intent_id.clone(),
            intent_hash: current,
            approved_by: approved_by.into(),
            approved_at: now,
        })
    }
}
