//! Position tracking
//!
//! Positions are derived from the ordered fill history with average-cost
//! accounting. Buy fees are folded into the cost basis; sell fees reduce the
//! realized PnL of the closing leg.

use crate::execution::Fill;
use crate::intent::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Long spot position in one symbol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Held base-asset quantity
    pub size: Decimal,
    /// Total cost of the held quantity, fees included
    pub cost: Decimal,
    /// Realized P&L booked by closing fills
    pub realized_pnl: Decimal,
}

impl Position {
    /// Average entry cost per unit
    pub fn avg_cost(&self) -> Decimal {
        if self.size > Decimal::ZERO {
            self.cost / self.size
        } else {
            Decimal::ZERO
        }
    }

    /// Mark-to-market P&L at `price`
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        if self.size > Decimal::ZERO {
            (price - self.avg_cost()) * self.size
        } else {
            Decimal::ZERO
        }
    }

    pub fn is_flat(&self) -> bool {
        self.size <= Decimal::ZERO
    }
}

/// Tracks positions for every traded symbol
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    positions: BTreeMap<String, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay fills in order
    pub fn from_fills<'a>(fills: impl IntoIterator<Item = &'a Fill>) -> Self {
        let mut book = Self::new();
        for fill in fills {
            book.apply_fill(fill);
        }
        book
    }

    pub fn apply_fill(&mut self, fill: &Fill) -> Decimal {
        self.apply(&fill.symbol, fill.side, fill.price, fill.size, fill.fee)
    }

    /// Apply one trade leg and return the realized P&L it booked.
    /// Sells beyond the held size close the position and ignore the excess.
    pub fn apply(
        &mut self,
        symbol: &str,
        side: Side,
        price: Decimal,
        size: Decimal,
        fee: Decimal,
    ) -> Decimal {
        let position = self.positions.entry(symbol.to_string()).or_default();
        match side {
            Side::Buy => {
                position.cost += price * size + fee;
                position.size += size;
                Decimal::ZERO
            }
            Side::Sell => {
                if position.size <= Decimal::ZERO {
                    return Decimal::ZERO;
                }
                let closed = size.min(position.size);
                let avg = position.avg_cost();
                let pnl = (price - avg) * closed - fee;
                position.cost -= avg * closed;
                position.size -= closed;
                if position.size <= Decimal::ZERO {
                    position.size = Decimal::ZERO;
                    position.cost = Decimal::ZERO;
                }
                position.realized_pnl += pnl;
                pnl
            }
            Side::Hold => Decimal::ZERO,
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn size(&self, symbol: &str) -> Decimal {
        self.get(symbol).map(|p| p.size).unwrap_or_default()
    }

    pub fn unrealized_pnl(&self, symbol: &str, price: Decimal) -> Decimal {
        self.get(symbol)
            .map(|p| p.unrealized_pnl(price))
            .unwrap_or_default()
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }

    /// Symbols with a non-zero holding
    pub fn open_positions(&self) -> impl Iterator<Item = (&String, &Position)> {
        self.positions.iter().filter(|(_, p)| !p.is_flat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_average_cost_includes_buy_fees() {
        let mut book = PositionBook::new();
        book.apply("BTC/JPY", Side::Buy, dec!(100), dec!(1), dec!(1));
        book.apply("BTC/JPY", Side::Buy, dec!(200), dec!(1), dec!(1));

        let pos = book.get("BTC/JPY").unwrap();
        assert_eq!(pos.size, dec!(2));
        assert_eq!(pos.avg_cost(), dec!(151));
        assert_eq!(pos.unrealized_pnl(dec!(161)), dec!(20));
    }

    #[test]
    fn test_sell_books_realized_pnl() {
        let mut book = PositionBook::new();
        book.apply("BTC/JPY", Side::Buy, dec!(100), dec!(2), dec!(0));
        let pnl = book.apply("BTC/JPY", Side::Sell, dec!(110), dec!(1), dec!(2));

        assert_eq!(pnl, dec!(8));
        assert_eq!(book.size("BTC/JPY"), dec!(1));
        assert_eq!(book.get("BTC/JPY").unwrap().avg_cost(), dec!(100));
        assert_eq!(book.realized_pnl(), dec!(8));
    }

    #[test]
    fn test_oversell_closes_position() {
        let mut book = PositionBook::new();
        book.apply("BTC/JPY", Side::Buy, dec!(100), dec!(1), dec!(0));
        let pnl = book.apply("BTC/JPY", Side::Sell, dec!(90), dec!(5), dec!(0));

        assert_eq!(pnl, dec!(-10));
        assert_eq!(book.size("BTC/JPY"), Decimal::ZERO);
        assert_eq!(book.open_positions().count(), 0);
    }

    #[test]
    fn test_sell_without_position_ignored() {
        let mut book = PositionBook::new();
        let pnl = book.apply("BTC/JPY", Side::Sell, dec!(100), dec!(1), dec!(1));
        assert_eq!(pnl, Decimal::ZERO);
        assert_eq!(book.size("BTC/JPY"), Decimal::ZERO);
        assert_eq!(book.unrealized_pnl("ETH/JPY", dec!(1)), Decimal::ZERO);
    }
}
