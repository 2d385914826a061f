//! Execution module
//!
//! Paper fills, live order management and the coordinator that drives an
//! approved intent to a final state

mod coordinator;
mod gateway;
mod live;
mod paper;
mod types;

pub use coordinator::{CoordinatorSettings, ExecutionCoordinator, LiveConsent, LIVE_CONSENT_ENV};
pub use gateway::{
    ExchangeGateway, GatewayError, GatewayOrderStatus, LimitOrderRequest, OrderHandle,
    OrderStatusReport,
};
pub use live::{maker_price, LiveExecutor, LiveOutcome, LiveSettings};
pub use paper::{FillResult, FillSimulator};
pub use types::{Execution, ExecutionStatus, Fill};
