//! Live order placement with bounded polling
//!
//! One placement per attempt. Every gateway call runs under a timeout; a failed
//! cancel leaves the attempt in `error` with `needs_reconciliation` set.

use super::gateway::{
    ExchangeGateway, GatewayError, GatewayOrderStatus, LimitOrderRequest, OrderHandle,
    OrderStatusReport,
};
use super::ExecutionStatus;
use crate::config::{MakerEmulationConfig, TradingConfig};
use crate::intent::{OrderIntent, Side};
use crate::telemetry;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{info, warn};

/// Timing and pricing knobs for live orders
#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub post_only: bool,
    pub order_timeout: Duration,
    pub poll_interval: Duration,
    pub cancel_timeout: Duration,
    pub call_timeout: Duration,
    pub maker: MakerEmulationConfig,
}

impl From<&TradingConfig> for LiveSettings {
    fn from(config: &TradingConfig) -> Self {
        Self {
            post_only: config.post_only,
            order_timeout: config.order_timeout(),
            poll_interval: config.poll_interval(),
            cancel_timeout: config.cancel_timeout(),
            call_timeout: config.gateway_call_timeout(),
            maker: config.maker_emulation.clone(),
        }
    }
}

/// What happened to a live order
#[derive(Debug, Clone, PartialEq)]
pub struct LiveOutcome {
    pub status: ExecutionStatus,
    pub order_placed: bool,
    pub order_id: Option<String>,
    pub filled_size: Decimal,
    pub avg_price: Option<Decimal>,
    pub fee: Decimal,
    pub needs_reconciliation: bool,
    pub details: Value,
}

/// Price a limit order so it rests on the book.
///
/// Buys sit at or below `bid - pad`, sells at or above `ask + pad`. The pad is
/// the exchange tick when configured and known, else `buffer_bps` of the touch.
pub fn maker_price(
    side: Side,
    reference: Decimal,
    bid: Decimal,
    ask: Decimal,
    tick: Option<Decimal>,
    maker: &MakerEmulationConfig,
) -> Decimal {
    let tick = tick.filter(|t| *t > Decimal::ZERO);
    let pad = |base: Decimal| match tick {
        Some(t) if maker.use_tick => t,
        _ => base * maker.buffer_bps / dec!(10000),
    };

    match side {
        Side::Buy => {
            let price = reference.min(bid - pad(bid));
            let price = match tick {
                Some(t) => (price / t).floor() * t,
                None => price,
            };
            price.max(Decimal::ZERO)
        }
        Side::Sell => {
            let price = reference.max(ask + pad(ask));
            match tick {
                Some(t) => (price / t).ceil() * t,
                None => price,
            }
        }
        Side::Hold => reference,
    }
}

/// Drives one live order from placement to a final state
pub struct LiveExecutor {
    gateway: Arc<dyn ExchangeGateway>,
    settings: LiveSettings,
}

impl LiveExecutor {
    pub fn new(gateway: Arc<dyn ExchangeGateway>, settings: LiveSettings) -> Self {
        Self { gateway, settings }
    }

    pub fn gateway(&self) -> &Arc<dyn ExchangeGateway> {
        &self.gateway
    }

    async fn call<T, F>(&self, op: &'static str, limit: Duration, fut: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        let result = match timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(op.to_string())),
        };
        if let Err(e) = &result {
            warn!(gateway = self.gateway.name(), op, error = %e, "gateway call failed");
            telemetry::record_gateway_error(op);
        }
        result
    }

    /// Place, poll until final or timeout, cancel if still open
    pub async fn execute(&self, intent: &OrderIntent, client_order_id: &str) -> LiveOutcome {
        let mut details = Map::new();
        details.insert("requested_price".into(), json!(intent.price.to_string()));

        let native_post_only = self.settings.post_only && self.gateway.supports_post_only();
        let mut price = intent.price;

        if self.settings.post_only && !native_post_only {
            details.insert("maker_emulation".into(), json!(true));
            match self
                .call(
                    "best_bid_ask",
                    self.settings.call_timeout,
                    self.gateway.get_best_bid_ask(&intent.symbol),
                )
                .await
            {
                Ok((bid, ask)) => {
                    let tick = self.gateway.price_tick(&intent.symbol);
                    price = maker_price(intent.side, intent.price, bid, ask, tick, &self.settings.maker);
                    details.insert("best_bid".into(), json!(bid.to_string()));
                    details.insert("best_ask".into(), json!(ask.to_string()));
                    details.insert(
                        "tick_size".into(),
                        json!(tick.map(|t| t.to_string())),
                    );
                }
                Err(e) => {
                    // Without a book the padded price is unknown; an unpadded order could cross
                    details.insert("maker_emulation_error".into(), json!(e.to_string()));
                    details.insert("error".into(), json!(e.to_string()));
                    return LiveOutcome {
                        status: ExecutionStatus::Error,
                        order_placed: false,
                        order_id: None,
                        filled_size: Decimal::ZERO,
                        avg_price: None,
                        fee: Decimal::ZERO,
                        needs_reconciliation: false,
                        details: Value::Object(details),
                    };
                }
            }
        }
        details.insert("placed_price".into(), json!(price.to_string()));

        let request = LimitOrderRequest {
            symbol: intent.symbol.clone(),
            side: intent.side,
            size: intent.size,
            price,
            post_only: native_post_only,
            client_order_id: client_order_id.to_string(),
        };

        let handle = match self
            .call(
                "place",
                self.settings.call_timeout,
                self.gateway.place_limit_order(&request),
            )
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                // A timed-out placement may still have reached the exchange
                let unknown = matches!(e, GatewayError::Timeout(_));
                details.insert("error".into(), json!(e.to_string()));
                return LiveOutcome {
                    status: ExecutionStatus::Error,
                    order_placed: false,
                    order_id: None,
                    filled_size: Decimal::ZERO,
                    avg_price: None,
                    fee: Decimal::ZERO,
                    needs_reconciliation: unknown,
                    details: Value::Object(details),
                };
            }
        };
        info!(
            intent_id = %intent.intent_id,
            order_id = %handle.order_id,
            %price,
            post_only = native_post_only,
            "live order placed"
        );
        details.insert("order_id".into(), json!(handle.order_id));

        let (mut report, poll_errors) = self.poll_until_final(&handle).await;
        if poll_errors > 0 {
            details.insert("poll_errors".into(), json!(poll_errors));
        }

        let mut needs_reconciliation = false;
        let final_status = match report.as_ref().map(|r| r.status) {
            Some(status) if status.is_final() => status,
            _ => {
                // Timed out while open: cancel, then capture any fills up to the cancel
                match self
                    .call(
                        "cancel",
                        self.settings.cancel_timeout,
                        self.gateway.cancel_order(&handle),
                    )
                    .await
                {
                    Ok(true) => {
                        details.insert("canceled_on_timeout".into(), json!(true));
                        if let Ok(after) = self
                            .call(
                                "status",
                                self.settings.call_timeout,
                                self.gateway.get_order_status(&handle),
                            )
                            .await
                        {
                            report = Some(after);
                        }
                        GatewayOrderStatus::Canceled
                    }
                    Ok(false) => {
                        details.insert("cancel_error".into(), json!("cancel refused"));
                        needs_reconciliation = true;
                        GatewayOrderStatus::Error
                    }
                    Err(e) => {
                        details.insert("cancel_error".into(), json!(e.to_string()));
                        needs_reconciliation = true;
                        GatewayOrderStatus::Error
                    }
                }
            }
        };

        let filled_size = report.as_ref().map(|r| r.filled_size).unwrap_or_default();
        let avg_price = report.as_ref().and_then(|r| r.avg_price);
        let fee = report.as_ref().map(|r| r.fee).unwrap_or_default();

        let status = if needs_reconciliation {
            ExecutionStatus::Error
        } else if filled_size >= intent.size && filled_size > Decimal::ZERO {
            ExecutionStatus::Filled
        } else if filled_size > Decimal::ZERO {
            ExecutionStatus::PartiallyFilled
        } else {
            match final_status {
                GatewayOrderStatus::Error => ExecutionStatus::Error,
                _ => ExecutionStatus::Canceled,
            }
        };

        details.insert("filled".into(), json!(filled_size.to_string()));
        if needs_reconciliation {
            warn!(
                intent_id = %intent.intent_id,
                order_id = %handle.order_id,
                "order state unknown after failed cancel; manual reconciliation required"
            );
        }

        LiveOutcome {
            status,
            order_placed: true,
            order_id: Some(handle.order_id),
            filled_size,
            avg_price,
            fee,
            needs_reconciliation,
            details: Value::Object(details),
        }
    }

    /// Poll until the order is final or the order timeout elapses.
    /// Returns the last successful report and the number of failed polls.
    async fn poll_until_final(&self, handle: &OrderHandle) -> (Option<OrderStatusReport>, u32) {
        let deadline = Instant::now() + self.settings.order_timeout;
        let mut last = None;
        let mut errors = 0;

        loop {
            match self
                .call(
                    "status",
                    self.settings.call_timeout,
                    self.gateway.get_order_status(handle),
                )
                .await
            {
                Ok(report) => {
                    let done = report.status.is_final();
                    last = Some(report);
                    if done {
                        break;
                    }
                }
                Err(_) => errors += 1,
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep(self.settings.poll_interval.min(deadline - now)).await;
        }

        (last, errors)
    }
}
