//! Day-scoped risk counters

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters the risk engine reads. Day-scoped fields reset at the UTC day
/// boundary; kill switch and cooldown carry over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    /// UTC day the counters belong to
    pub day: NaiveDate,
    pub orders_today: u32,
    pub realized_pnl_today: Decimal,
    pub cooldown_until: Option<DateTime<Utc>>,
    /// Last execution price per symbol, for the cooldown bypass
    pub last_exec_price: BTreeMap<String, Decimal>,
    pub kill_switch: bool,
}

impl RiskState {
    /// Fresh state for the day containing `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            day: now.date_naive(),
            orders_today: 0,
            realized_pnl_today: Decimal::ZERO,
            cooldown_until: None,
            last_exec_price: BTreeMap::new(),
            kill_switch: false,
        }
    }

    /// Advance to the day containing `now`, zeroing day counters if it changed.
    /// Returns true on rollover.
    pub fn roll_to(&mut self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        if today <= self.day {
            return false;
        }
        self.day = today;
        self.orders_today = 0;
        self.realized_pnl_today = Decimal::ZERO;
        true
    }

    pub fn cooldown_active(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    /// Commit one execution
    pub fn record_execution(
        &mut self,
        symbol: &str,
        price: Decimal,
        realized_pnl: Decimal,
        at: DateTime<Utc>,
        cooldown: Duration,
    ) {
        self.roll_to(at);
        self.orders_today += 1;
        self.realized_pnl_today += realized_pnl;
        self.cooldown_until = Some(at + cooldown);
        self.last_exec_price.insert(symbol.to_string(), price);
    }
}
