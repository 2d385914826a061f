//! Backtest analytics and reporting

use super::TradeRecord;
use crate::intent::Side;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

/// Summary statistics from a backtest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Sum of realized trade P&L
    pub total_pnl: Decimal,
    /// `total_pnl / capital`
    pub total_return: Decimal,
    pub cagr: Decimal,
    /// Per-trade Sharpe, scaled by √n
    pub sharpe: Decimal,
    /// Maximum drawdown of cumulative realized P&L (absolute)
    pub max_drawdown: Decimal,
    /// Maximum drawdown relative to capital plus the running peak
    pub max_drawdown_pct: Decimal,
    /// Winning fraction of closing trades
    pub win_rate: Decimal,
    pub profit_factor: Decimal,
    /// Traded notional
    pub turnover: Decimal,
    pub fees: Decimal,
    pub num_trades: usize,
}

impl PerformanceMetrics {
    /// Compute metrics over `trades` for a run spanning `start..=end`
    pub fn compute(
        trades: &[TradeRecord],
        capital: Decimal,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        let pnl: Vec<Decimal> = trades.iter().map(|t| t.pnl).collect();
        let total_pnl: Decimal = pnl.iter().sum();
        let total_return = if capital > Decimal::ZERO {
            total_pnl / capital
        } else {
            Decimal::ZERO
        };

        let closing: Vec<Decimal> = trades
            .iter()
            .filter(|t| t.side == Side::Sell)
            .map(|t| t.pnl)
            .collect();
        let wins = closing.iter().filter(|p| **p > Decimal::ZERO).count();
        let win_rate = if closing.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from(wins) / Decimal::from(closing.len())
        };

        let gross_profit: Decimal = pnl.iter().filter(|p| **p > Decimal::ZERO).sum();
        let gross_loss: Decimal = pnl.iter().filter(|p| **p < Decimal::ZERO).sum::<Decimal>().abs();
        let profit_factor = if gross_loss > Decimal::ZERO {
            gross_profit / gross_loss
        } else {
            Decimal::ZERO
        };

        let (max_drawdown, max_drawdown_pct) = drawdown(&pnl, capital);

        Self {
            total_pnl,
            total_return,
            cagr: cagr(total_return, start, end),
            sharpe: sharpe(&pnl, capital),
            max_drawdown,
            max_drawdown_pct,
            win_rate,
            profit_factor,
            turnover: trades.iter().map(|t| t.notional).sum(),
            fees: trades.iter().map(|t| t.fee).sum(),
            num_trades: trades.len(),
        }
    }

    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        format!(
            r#"
══════════════════════════════════════════════════════
               BACKTEST RESULTS
══════════════════════════════════════════════════════

PERFORMANCE
───────────────────────────────────────────────────────
Total P&L:        {:+.2}
Total Return:     {:+.2}%
CAGR:             {:+.2}%
Sharpe (trades):  {:.2}
Max Drawdown:     {:.2} ({:.2}%)
Win Rate:         {:.1}%
Profit Factor:    {:.2}

ACTIVITY
───────────────────────────────────────────────────────
Total Trades:     {}
Turnover:         {:.2}
Fees:             {:.2}
══════════════════════════════════════════════════════
"#,
            self.total_pnl,
            self.total_return * dec!(100),
            self.cagr * dec!(100),
            self.sharpe,
            self.max_drawdown,
            self.max_drawdown_pct * dec!(100),
            self.win_rate * dec!(100),
            self.profit_factor,
            self.num_trades,
            self.turnover,
            self.fees,
        )
    }
}

fn drawdown(pnl: &[Decimal], capital: Decimal) -> (Decimal, Decimal) {
    let mut running = Decimal::ZERO;
    let mut peak = Decimal::ZERO;
    let mut max_dd = Decimal::ZERO;
    let mut max_pct = Decimal::ZERO;
    for p in pnl {
        running += *p;
        peak = peak.max(running);
        let dd = peak - running;
        if dd > max_dd {
            max_dd = dd;
            let base = capital + peak;
            max_pct = if base > Decimal::ZERO {
                dd / base
            } else {
                Decimal::ZERO
            };
        }
    }
    (max_dd, max_pct)
}

fn sharpe(pnl: &[Decimal], capital: Decimal) -> Decimal {
    if capital <= Decimal::ZERO || pnl.len() < 2 {
        return Decimal::ZERO;
    }
    let cap = capital.to_f64().unwrap_or(0.0);
    let returns: Vec<f64> = pnl
        .iter()
        .map(|p| p.to_f64().unwrap_or(0.0) / cap)
        .collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();
    if std <= 0.0 || !std.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::try_from(mean / std * n.sqrt()).unwrap_or_default()
}

fn cagr(total_return: Decimal, start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    let years = (end - start).num_seconds() as f64 / SECONDS_PER_YEAR;
    let r = total_return.to_f64().unwrap_or(0.0);
    if years <= 0.0 || r <= -1.0 {
        return Decimal::ZERO;
    }
    Decimal::try_from((1.0 + r).powf(1.0 / years) - 1.0).unwrap_or_default()
}
