//! Risk management types

use crate::intent::OrderIntent;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the risk engine refused an intent. Declaration order is check priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskReason {
    /// Kill switch engaged
    KillSwitch,
    /// Symbol outside the configured whitelist
    SymbolNotWhitelisted,
    /// Too soon after the previous execution
    CooldownActive,
    /// Daily order budget used up
    MaxOrdersPerDay,
    /// Realized (plus open) loss today reached the limit
    DailyLossLimit,
    /// Long-only: nothing held to sell
    NoPositionToSell,
    /// Sizing caps left nothing to trade
    SizeReducedToZero,
    /// Non-positive size or price
    InvalidSizeOrPrice,
}

impl RiskReason {
    /// Machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            RiskReason::KillSwitch => "kill_switch_enabled",
            RiskReason::SymbolNotWhitelisted => "symbol_not_whitelisted",
            RiskReason::CooldownActive => "cooldown_active",
            RiskReason::MaxOrdersPerDay => "max_orders_per_day_reached",
            RiskReason::DailyLossLimit => "daily_loss_limit_reached",
            RiskReason::NoPositionToSell => "no_position_to_sell",
            RiskReason::SizeReducedToZero => "size_reduced_to_zero",
            RiskReason::InvalidSizeOrPrice => "invalid_size_or_price",
        }
    }

    /// Check priority, 1 = evaluated first
    pub fn priority(&self) -> u8 {
        *self as u8 + 1
    }
}

impl fmt::Display for RiskReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Which limit shrank an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeAdjustment {
    /// Position would exceed `capital × max_position_pct`
    MaxPosition,
    /// Notional above `min(max_order_notional, max_loss_per_trade)`
    NotionalCap,
    /// Sell larger than the held position
    HeldPosition,
}

impl SizeAdjustment {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeAdjustment::MaxPosition => "max_position",
            SizeAdjustment::NotionalCap => "notional_cap",
            SizeAdjustment::HeldPosition => "held_position",
        }
    }
}

/// Outcome of a risk evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum RiskDecision {
    /// Intent passes unchanged
    Accept(OrderIntent),
    /// Intent passes with a reduced size; `intent` carries the new size and hash
    Adjust {
        intent: OrderIntent,
        original_size: Decimal,
        adjustment: SizeAdjustment,
    },
    /// Intent refused
    Reject(RiskReason),
}

impl RiskDecision {
    pub fn label(&self) -> &'static str {
        match self {
            RiskDecision::Accept(_) => "accept",
            RiskDecision::Adjust { .. } => "adjust",
            RiskDecision::Reject(_) => "reject",
        }
    }

    /// The intent to persist, if any
    pub fn intent(&self) -> Option<&OrderIntent> {
        match self {
            RiskDecision::Accept(intent) | RiskDecision::Adjust { intent, .. } => Some(intent),
            RiskDecision::Reject(_) => None,
        }
    }

    pub fn into_intent(self) -> Option<OrderIntent> {
        match self {
            RiskDecision::Accept(intent) | RiskDecision::Adjust { intent, .. } => Some(intent),
            RiskDecision::Reject(_) => None,
        }
    }

    pub fn reason(&self) -> Option<RiskReason> {
        match self {
            RiskDecision::Reject(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn is_adjusted(&self) -> bool {
        matches!(self, RiskDecision::Adjust { .. })
    }
}

/// Account facts the engine needs for one symbol
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountContext {
    /// Held base-asset quantity
    pub position_size: Decimal,
    /// Mark-to-market PnL of the open position
    pub unrealized_pnl: Decimal,
}

impl AccountContext {
    pub fn flat() -> Self {
        Self::default()
    }
}
