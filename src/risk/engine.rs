//! Ordered pre-trade risk checks

use super::{AccountContext, RiskDecision, RiskReason, RiskState, SizeAdjustment};
use crate::config::{Config, RiskConfig};
use crate::intent::{IntentStatus, OrderIntent, Side};
use crate::telemetry;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;

/// Evaluates intents against hard limits. Pure: no I/O, no state mutation.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    limits: RiskConfig,
    whitelist: Vec<String>,
    size_decimals: u32,
    /// Static kill switch from configuration, OR'ed with the state flag
    config_kill_switch: bool,
}

impl RiskEngine {
    pub fn new(limits: RiskConfig, whitelist: Vec<String>, size_decimals: u32) -> Self {
        Self {
            limits,
            whitelist,
            size_decimals,
            config_kill_switch: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            limits: config.risk.clone(),
            whitelist: config.trading.symbol_whitelist.clone(),
            size_decimals: config.trading.size_decimals,
            config_kill_switch: config.trading.kill_switch,
        }
    }

    pub fn limits(&self) -> &RiskConfig {
        &self.limits
    }

    /// Run the checks in priority order; the first failure wins
    pub fn evaluate(
        &self,
        intent: &OrderIntent,
        state: &RiskState,
        account: &AccountContext,
        now: DateTime<Utc>,
    ) -> RiskDecision {
        let decision = self.decide(intent, state, account, now);

        let (adjusted, reason) = match &decision {
            RiskDecision::Accept(_) => (false, "ok"),
            RiskDecision::Adjust { adjustment, .. } => (true, adjustment.as_str()),
            RiskDecision::Reject(reason) => (false, reason.code()),
        };
        info!(
            intent_id = %intent.intent_id,
            symbol = %intent.symbol,
            side = %intent.side,
            decision = decision.label(),
            reason,
            adjusted,
            "risk_check"
        );
        telemetry::record_risk_decision(decision.label(), reason);

        decision
    }

    fn decide(
        &self,
        intent: &OrderIntent,
        state: &RiskState,
        account: &AccountContext,
        now: DateTime<Utc>,
    ) -> RiskDecision {
        if state.kill_switch || self.config_kill_switch {
            return RiskDecision::Reject(RiskReason::KillSwitch);
        }

        if !self.whitelist.iter().any(|s| s == &intent.symbol) {
            return RiskDecision::Reject(RiskReason::SymbolNotWhitelisted);
        }

        if state.cooldown_active(now) && !self.cooldown_bypassed(intent, state) {
            return RiskDecision::Reject(RiskReason::CooldownActive);
        }

        if let Some(reason) = self.daily_limit_breach(state, account) {
            return RiskDecision::Reject(reason);
        }

        if intent.side == Side::Sell && account.position_size <= Decimal::ZERO {
            return RiskDecision::Reject(RiskReason::NoPositionToSell);
        }

        // Sizing needs a positive size and price; anything else falls through to the last check
        let sizeable =
            intent.size > Decimal::ZERO && intent.price > Decimal::ZERO && intent.side.is_tradable();
        let limit = if sizeable {
            self.size_limit(intent, account)
        } else {
            None
        };

        if let Some((size, _)) = limit {
            if size <= Decimal::ZERO {
                return RiskDecision::Reject(RiskReason::SizeReducedToZero);
            }
        }

        if !sizeable {
            return RiskDecision::Reject(RiskReason::InvalidSizeOrPrice);
        }

        match limit {
            None => RiskDecision::Accept(intent.clone()),
            Some((size, adjustment)) => {
                // The reduced intent is a fresh candidate
                let mut reduced = intent.clone();
                reduced.status = IntentStatus::Proposed;
                if reduced.adjust_size(size).is_err() {
                    return RiskDecision::Reject(RiskReason::InvalidSizeOrPrice);
                }
                RiskDecision::Adjust {
                    intent: reduced,
                    original_size: intent.size,
                    adjustment,
                }
            }
        }
    }

    /// Order-count and loss limits for the day. Re-checked at execution time,
    /// since fills committed after approval move both counters.
    pub fn daily_limit_breach(&self, state: &RiskState, account: &AccountContext) -> Option<RiskReason> {
        if state.orders_today >= self.limits.max_orders_per_day {
            return Some(RiskReason::MaxOrdersPerDay);
        }
        let loss_proxy = state.realized_pnl_today + account.unrealized_pnl.min(Decimal::ZERO);
        if loss_proxy < Decimal::ZERO && -loss_proxy >= self.limits.max_loss_per_day {
            return Some(RiskReason::DailyLossLimit);
        }
        None
    }

    fn cooldown_bypassed(&self, intent: &OrderIntent, state: &RiskState) -> bool {
        let Some(last) = state.last_exec_price.get(&intent.symbol) else {
            return false;
        };
        if *last <= Decimal::ZERO || self.limits.cooldown_bypass_pct <= Decimal::ZERO {
            return false;
        }
        (intent.price - *last).abs() / *last >= self.limits.cooldown_bypass_pct
    }

    /// Smallest cap that binds, or None when the requested size fits
    fn size_limit(
        &self,
        intent: &OrderIntent,
        account: &AccountContext,
    ) -> Option<(Decimal, SizeAdjustment)> {
        let price = intent.price;
        let mut size = intent.size;
        let mut binding = None;

        match intent.side {
            Side::Buy => {
                let max_position =
                    self.limits.capital * self.limits.max_position_pct / price - account.position_size;
                if size > max_position {
                    size = max_position.max(Decimal::ZERO);
                    binding = Some(SizeAdjustment::MaxPosition);
                }
            }
            Side::Sell => {
                if size > account.position_size {
                    size = account.position_size;
                    binding = Some(SizeAdjustment::HeldPosition);
                }
            }
            Side::Hold => {}
        }

        let notional_cap = self.limits.max_order_notional.min(self.limits.max_loss_per_trade);
        if size * price > notional_cap {
            size = notional_cap / price;
            binding = Some(SizeAdjustment::NotionalCap);
        }

        let size = size.round_dp_with_strategy(self.size_decimals, RoundingStrategy::ToZero);
        binding.map(|adjustment| (size, adjustment))
    }
}
