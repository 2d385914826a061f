//! State file ownership, write-through and crash recovery

use crate::common::*;
use rust_decimal_macros::dec;
use spot_agent::config::{Config, ExecutionMode};
use spot_agent::error::TradeError;
use spot_agent::execution::{ExchangeGateway, ExecutionStatus, LiveConsent};
use spot_agent::intent::{IntentStatus, Side};
use spot_agent::service::TradingService;
use spot_agent::store::Ledger;
use std::path::Path;
use std::sync::Arc;

fn config_at(path: &Path) -> Config {
    let mut config = config();
    config.app.state_file = path.to_path_buf();
    config
}

fn open(config: &Config) -> Result<TradingService, TradeError> {
    TradingService::open_with_consent(config.clone(), market(), None, LiveConsent::default())
}

#[tokio::test]
async fn test_one_service_per_state_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_at(&dir.path().join("ledger.json"));

    let first = open(&config).unwrap();
    let err = open(&config).err().unwrap();
    assert!(matches!(err, TradeError::Storage(_)));

    let intent = approved(&first, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;
    let execution = first
        .execute(&intent.intent_id, ExecutionMode::Paper, t0())
        .await
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Filled);

    // Written through without an explicit save
    let ledger = Ledger::load(&config.app.state_file).unwrap();
    assert_eq!(ledger.intent(&intent.intent_id).unwrap().status, IntentStatus::Filled);
    assert_eq!(ledger.executions().len(), 1);
    drop(first);

    let second = open(&config).unwrap();
    let err = second
        .execute(&intent.intent_id, ExecutionMode::Paper, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::AlreadyExecuted(_)));

    let ledger = Ledger::load(&config.app.state_file).unwrap();
    assert_eq!(ledger.executions().len(), 1);
    assert_eq!(ledger.positions().size(SYMBOL), dec!(0.01));
    assert!(ledger
        .audit_entries()
        .iter()
        .any(|e| e.event == "execution_refused"));
}

#[tokio::test]
async fn test_executing_is_on_disk_before_the_order_is_sent() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_at(&dir.path().join("ledger.json"));
    config.trading.dry_run = false;
    config.trading.i_understand_live_trading = true;

    let gateway = ScriptedGateway::new();
    *gateway.watch.lock().unwrap() = Some(config.app.state_file.clone());
    let dyn_gateway: Arc<dyn ExchangeGateway> = gateway.clone();
    let service = TradingService::open_with_consent(
        config.clone(),
        market(),
        Some(dyn_gateway),
        LiveConsent { env: true, config: true },
    )
    .unwrap();

    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Live, t0()).await;
    let execution = service
        .execute(&intent.intent_id, ExecutionMode::Live, t0())
        .await
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Filled);

    let seen = gateway.disk_at_place.lock().unwrap().clone();
    assert_eq!(seen, vec![vec![IntentStatus::Executing]]);

    let ledger = Ledger::load(&config.app.state_file).unwrap();
    assert_eq!(ledger.intent(&intent.intent_id).unwrap().status, IntentStatus::Filled);
}

#[tokio::test]
async fn test_interrupted_attempt_needs_reconciliation() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_at(&dir.path().join("ledger.json"));

    let service = open(&config).unwrap();
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, t0()).await;
    drop(service);

    // A run that died after persisting `executing`
    let mut ledger = Ledger::load(&config.app.state_file).unwrap();
    ledger
        .intent_mut(&intent.intent_id)
        .unwrap()
        .transition(IntentStatus::Executing)
        .unwrap();
    ledger.save(&config.app.state_file).unwrap();

    let service = open(&config).unwrap();
    let status = service.status(t0()).await;
    assert_eq!(status.needs_reconciliation.len(), 1);

    let err = service
        .execute(&intent.intent_id, ExecutionMode::Paper, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::NeedsReconciliation(_)));

    let err = service.retry(&intent.intent_id, t0()).await.unwrap_err();
    assert_eq!(err.code(), "needs_reconciliation");

    let ledger = Ledger::load(&config.app.state_file).unwrap();
    assert_eq!(ledger.intent(&intent.intent_id).unwrap().status, IntentStatus::Error);
    assert!(ledger.needs_reconciliation(&intent.intent_id));
    assert!(!ledger.has_successful_execution(&intent.intent_id));
    assert!(ledger
        .audit_entries()
        .iter()
        .any(|e| e.event == "interrupted_execution"));
}
