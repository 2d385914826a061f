//! Exchange gateway abstraction
//!
//! The coordinator only talks to exchanges through this trait. Capability
//! differences (post-only support, price tick) are queried, never inferred from
//! the exchange name.

use crate::intent::Side;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),
    #[error("order rejected: {0}")]
    Rejected(String),
    #[error("insufficient credentials: {0}")]
    Credentials(String),
    #[error("timed out: {0}")]
    Timeout(String),
    /// No gateway configured for live trading
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// Limit order to place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitOrderRequest {
    pub symbol: String,
    pub side: Side,
    pub size: Decimal,
    pub price: Decimal,
    pub post_only: bool,
    /// Idempotency key, derived from the execution id
    pub client_order_id: String,
}

/// Exchange reference to a placed order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHandle {
    pub order_id: String,
    pub symbol: String,
}

/// Order state as reported by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOrderStatus {
    Open,
    Filled,
    PartiallyFilled,
    Canceled,
    Error,
}

impl GatewayOrderStatus {
    /// No further fills will arrive
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            GatewayOrderStatus::Filled | GatewayOrderStatus::Canceled | GatewayOrderStatus::Error
        )
    }
}

/// Snapshot of an order's progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusReport {
    pub status: GatewayOrderStatus,
    /// Cumulative filled size
    pub filled_size: Decimal,
    pub avg_price: Option<Decimal>,
    /// Cumulative fee
    pub fee: Decimal,
}

/// Trait for exchange connectivity
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Exchange identifier for logs
    fn name(&self) -> &str;
    /// Whether a native post-only flag is honored
    fn supports_post_only(&self) -> bool;
    /// Whether API credentials are present
    fn has_credentials(&self) -> bool;
    /// Minimum price increment, when known
    fn price_tick(&self, _symbol: &str) -> Option<Decimal> {
        None
    }
    /// Place a limit order
    async fn place_limit_order(
        &self,
        request: &LimitOrderRequest,
    ) -> Result<OrderHandle, GatewayError>;
    /// Poll an order
    async fn get_order_status(&self, handle: &OrderHandle)
        -> Result<OrderStatusReport, GatewayError>;
    /// Cancel an order; `Ok(false)` when the exchange refused
    async fn cancel_order(&self, handle: &OrderHandle) -> Result<bool, GatewayError>;
    /// Best bid and ask
    async fn get_best_bid_ask(&self, symbol: &str) -> Result<(Decimal, Decimal), GatewayError>;
}
