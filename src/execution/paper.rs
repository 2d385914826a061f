//! Paper trading fill simulation
//!
//! Deterministic: the same intent against the same snapshot with the same seed
//! always produces the same result.

use super::ExecutionStatus;
use crate::config::PaperConfig;
use crate::intent::{OrderIntent, Side};
use crate::orderbook::OrderBookSnapshot;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const BPS: Decimal = dec!(10000);

/// Result of one simulated fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillResult {
    pub status: ExecutionStatus,
    /// Execution price; zero when nothing filled
    pub price: Decimal,
    pub size: Decimal,
    pub fee: Decimal,
    /// Machine-readable explanation (`crossed_spread`, `stale_orderbook`, ...)
    pub reason: String,
    /// Seed the draws came from
    pub seed: u64,
}

impl FillResult {
    fn unfilled(status: ExecutionStatus, reason: &str, seed: u64) -> Self {
        Self {
            status,
            price: Decimal::ZERO,
            size: Decimal::ZERO,
            fee: Decimal::ZERO,
            reason: reason.to_string(),
            seed,
        }
    }
}

/// Taker fill model with fixed-bps slippage against the touch
#[derive(Debug, Clone)]
pub struct FillSimulator {
    config: PaperConfig,
    size_decimals: u32,
}

impl FillSimulator {
    pub fn new(config: PaperConfig, size_decimals: u32) -> Self {
        Self {
            config,
            size_decimals,
        }
    }

    pub fn config(&self) -> &PaperConfig {
        &self.config
    }

    /// Name recorded on executions
    pub fn slippage_model(&self) -> String {
        format!("fixed_bps:{}", self.config.slippage_bps.normalize())
    }

    /// Stable seed from the configured base seed, the intent and the snapshot time
    pub fn seed_for(&self, intent: &OrderIntent, snapshot: &OrderBookSnapshot) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.config.seed.to_be_bytes());
        hasher.update(intent.intent_id.as_bytes());
        hasher.update(snapshot.ts.timestamp_micros().to_be_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(bytes)
    }

    /// Simulate with the derived seed
    pub fn simulate(
        &self,
        intent: &OrderIntent,
        snapshot: Option<&OrderBookSnapshot>,
        as_of: DateTime<Utc>,
    ) -> FillResult {
        let seed = snapshot.map(|s| self.seed_for(intent, s)).unwrap_or_default();
        self.simulate_fill(intent, snapshot, as_of, seed)
    }

    /// Simulate a fill of `intent` against `snapshot` as of `as_of`
    pub fn simulate_fill(
        &self,
        intent: &OrderIntent,
        snapshot: Option<&OrderBookSnapshot>,
        as_of: DateTime<Utc>,
        seed: u64,
    ) -> FillResult {
        let Some(book) = snapshot else {
            return FillResult::unfilled(ExecutionStatus::Error, "no_orderbook", seed);
        };
        if book.is_stale(as_of, self.config.max_snapshot_age()) {
            return FillResult::unfilled(ExecutionStatus::Rejected, "stale_orderbook", seed);
        }
        if !book.is_valid() {
            return FillResult::unfilled(ExecutionStatus::Error, "invalid_orderbook", seed);
        }
        if intent.size <= Decimal::ZERO {
            return FillResult::unfilled(ExecutionStatus::Rejected, "invalid_size", seed);
        }

        let slippage = self.config.slippage_bps / BPS;
        let price = match intent.side {
            Side::Buy => book.ask * (Decimal::ONE + slippage),
            Side::Sell => book.bid * (Decimal::ONE - slippage),
            Side::Hold => {
                return FillResult::unfilled(ExecutionStatus::Rejected, "invalid_side", seed)
            }
        };

        // Draw order is fixed so results only depend on the seed
        let mut rng = StdRng::seed_from_u64(seed);
        let fill_draw: f64 = rng.gen();
        let partial_draw: f64 = rng.gen();
        let ratio_draw: f64 = rng.gen();

        if !below(fill_draw, self.config.fill_probability) {
            return FillResult::unfilled(ExecutionStatus::Canceled, "not_filled", seed);
        }

        let mut size = intent.size;
        let mut status = ExecutionStatus::Filled;
        let mut reason = "crossed_spread";

        if below(partial_draw, self.config.partial_fill_probability) {
            if !intent.time_in_force.allows_partial() {
                return FillResult::unfilled(ExecutionStatus::Canceled, "fok_killed", seed);
            }
            let min_ratio = self.config.min_fill_ratio;
            let ratio = min_ratio
                + (Decimal::ONE - min_ratio) * Decimal::try_from(ratio_draw).unwrap_or_default();
            let partial = (intent.size * ratio)
                .round_dp_with_strategy(self.size_decimals, RoundingStrategy::ToZero);
            if partial > Decimal::ZERO && partial < intent.size {
                size = partial;
                status = ExecutionStatus::PartiallyFilled;
                reason = "partial_fill";
            }
        }

        let fee = price * size * self.config.fee_bps / BPS;
        FillResult {
            status,
            price,
            size,
            fee,
            reason: reason.to_string(),
            seed,
        }
    }
}

fn below(draw: f64, probability: Decimal) -> bool {
    let p: f64 = probability.try_into().unwrap_or(0.0);
    draw < p
}
