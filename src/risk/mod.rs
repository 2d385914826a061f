//! Risk management module
//!
//! Ordered pre-trade checks, day-scoped counters and position accounting

mod engine;
mod position;
mod state;
mod types;

pub use engine::RiskEngine;
pub use position::{Position, PositionBook};
pub use state::RiskState;
pub use types::{AccountContext, RiskDecision, RiskReason, SizeAdjustment};
