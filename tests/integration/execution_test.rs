//! Paper execution, approval binding and lifecycle refusals

use crate::common::*;
use chrono::Duration;
use rust_decimal_macros::dec;
use spot_agent::config::ExecutionMode;
use spot_agent::error::TradeError;
use spot_agent::execution::ExecutionStatus;
use spot_agent::intent::{IntentStatus, Side};
use spot_agent::market::MemoryMarketData;
use spot_agent::risk::RiskReason;
use std::sync::Arc;

#[tokio::test]
async fn test_paper_buy_fills_at_ask_plus_slippage() {
    let service = service(config(), market());
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;

    let execution = service
        .execute(&intent.intent_id, ExecutionMode::Paper, t0())
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Filled);
    assert_eq!(execution.fills.len(), 1);
    let fill = &execution.fills[0];
    // 5,001,000 × (1 + 0.5 bps)
    assert_eq!(fill.price, dec!(5001250.05));
    assert_eq!(fill.size, dec!(0.01));
    assert_eq!(fill.fee, dec!(50.0125005));
    assert_eq!(execution.intent_hash, intent.canonical_hash);

    let ledger = service.ledger();
    let ledger = ledger.lock().await;
    assert_eq!(ledger.intent(&intent.intent_id).unwrap().status, IntentStatus::Filled);
    assert_eq!(ledger.positions().size(SYMBOL), dec!(0.01));
}

#[tokio::test]
async fn test_paper_buy_with_five_bps_slippage() {
    let mut config = config();
    config.paper.slippage_bps = dec!(5);
    let service = service(config, market());
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;

    let execution = service
        .execute(&intent.intent_id, ExecutionMode::Paper, t0())
        .await
        .unwrap();
    assert_eq!(execution.fills[0].price, dec!(5003500.5));
}

#[tokio::test]
async fn test_second_execute_is_refused() {
    let service = service(config(), market());
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;

    let (a, b) = tokio::join!(
        service.execute(&intent.intent_id, ExecutionMode::Paper, t0()),
        service.execute(&intent.intent_id, ExecutionMode::Paper, t0()),
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let refused = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(
        refused,
        TradeError::AlreadyExecuted(_) | TradeError::AlreadyExecuting(_)
    ));

    let ledger = service.ledger();
    assert_eq!(ledger.lock().await.executions().len(), 1);
}

#[tokio::test]
async fn test_order_limit_rechecked_at_execution() {
    let mut config = config();
    config.risk.max_orders_per_day = 1;
    let service = service(config, market());

    // Both pass the proposal-time check while nothing has filled yet
    let first = approved(&service, &signal(Side::Buy, dec!(0.001)), ExecutionMode::Paper, t0()).await;
    let second = approved(&service, &signal(Side::Buy, dec!(0.002)), ExecutionMode::Paper, t0()).await;

    let execution = service
        .execute(&first.intent_id, ExecutionMode::Paper, t0())
        .await
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Filled);

    let err = service
        .execute(&second.intent_id, ExecutionMode::Paper, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::RiskRejected(RiskReason::MaxOrdersPerDay)));

    let ledger = service.ledger();
    let ledger = ledger.lock().await;
    assert_eq!(ledger.executions().len(), 1);
    assert_eq!(ledger.intent(&second.intent_id).unwrap().status, IntentStatus::Approved);
}

#[tokio::test]
async fn test_tampered_intent_is_refused() {
    let service = service(config(), market());
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;

    service
        .ledger()
        .lock()
        .await
        .intent_mut(&intent.intent_id)
        .unwrap()
        .size = dec!(0.02);

    let err = service
        .execute(&intent.intent_id, ExecutionMode::Paper, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::HashMismatch { .. }));
    assert!(service.ledger().lock().await.executions().is_empty());
}

#[tokio::test]
async fn test_rehashed_tamper_breaks_approval() {
    let service = service(config(), market());
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;

    {
        let ledger = service.ledger();
        let mut ledger = ledger.lock().await;
        let stored = ledger.intent_mut(&intent.intent_id).unwrap();
        stored.price = dec!(4000000);
        stored.canonical_hash = stored.compute_hash();
    }

    let err = service
        .execute(&intent.intent_id, ExecutionMode::Paper, t0())
        .await
        .unwrap_err();
    let TradeError::HashMismatch { expected, .. } = err else {
        panic!("expected hash mismatch, got {:?}", err);
    };
    assert_eq!(expected, intent.canonical_hash);
}

#[tokio::test]
async fn test_unapproved_intent_is_refused() {
    let service = service(config(), market());
    let intent = propose(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;

    let err = service
        .execute(&intent.intent_id, ExecutionMode::Paper, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::ApprovalRequired(_)));
}

#[tokio::test]
async fn test_approval_with_wrong_hash() {
    let service = service(config(), market());
    let intent = propose(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;

    let err = service
        .approve(&intent.intent_id, "deadbeef", "operator", "I APPROVE", t0())
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::HashMismatch { .. }));
}

#[tokio::test]
async fn test_expired_intent_is_refused() {
    let service = service(config(), market());
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;

    let err = service
        .execute(&intent.intent_id, ExecutionMode::Paper, t0() + Duration::minutes(16))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::IntentExpired(_)));

    let ledger = service.ledger();
    let ledger = ledger.lock().await;
    assert_eq!(ledger.intent(&intent.intent_id).unwrap().status, IntentStatus::Expired);
}

#[tokio::test]
async fn test_kill_switch_blocks_approved_intent() {
    let service = service(config(), market());
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;
    service.set_kill_switch(true, t0()).await.unwrap();

    let err = service
        .execute(&intent.intent_id, ExecutionMode::Paper, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::RiskRejected(RiskReason::KillSwitch)));
}

#[tokio::test]
async fn test_missing_orderbook_is_error_then_retry() {
    let market = Arc::new(MemoryMarketData::new());
    let service = service(config(), market.clone());
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;

    let execution = service
        .execute(&intent.intent_id, ExecutionMode::Paper, t0())
        .await
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Error);
    assert!(execution.fills.is_empty());

    // Book arrives; the approval still binds the unchanged intent
    market.insert_orderbook(spot_agent::orderbook::OrderBookSnapshot::new(
        SYMBOL,
        t0(),
        dec!(4999000),
        dec!(5001000),
    ));
    let rearmed = service.retry(&intent.intent_id, t0()).await.unwrap();
    assert_eq!(rearmed.status, IntentStatus::Approved);

    let execution = service
        .execute(&intent.intent_id, ExecutionMode::Paper, t0() + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Filled);
}

#[tokio::test]
async fn test_stale_orderbook_is_rejected() {
    let service = service(config(), market());
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;

    let execution = service
        .execute(&intent.intent_id, ExecutionMode::Paper, t0() + Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Rejected);
    assert!(execution.fills.is_empty());
}

#[tokio::test]
async fn test_mode_mismatch_is_refused() {
    let service = service(config(), market());
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;

    let err = service
        .execute(&intent.intent_id, ExecutionMode::Live, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::Validation(_)));
}

#[tokio::test]
async fn test_ledger_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config();
    config.app.state_file = dir.path().join("state.json");

    let service = service(config.clone(), market());
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;
    service
        .execute(&intent.intent_id, ExecutionMode::Paper, t0())
        .await
        .unwrap();
    service.save().await.unwrap();

    let ledger = spot_agent::store::Ledger::load(&config.app.state_file).unwrap();
    assert_eq!(ledger.positions().size(SYMBOL), dec!(0.01));
    assert_eq!(ledger.risk_state(t0(), config.risk.cooldown()).orders_today, 1);
    assert!(ledger.approval(&intent.intent_id).is_some());
}
