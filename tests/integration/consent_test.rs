//! Live path: double consent, dry-run and the gateway

use crate::common::*;
use rust_decimal_macros::dec;
use spot_agent::config::{Config, ExecutionMode};
use spot_agent::error::TradeError;
use spot_agent::execution::{ExecutionStatus, GatewayError, LiveConsent};
use spot_agent::intent::{IntentStatus, Side};
use spot_agent::service::TradingService;

fn live_config() -> Config {
    let mut config = config();
    config.trading.dry_run = false;
    config.trading.i_understand_live_trading = true;
    config
}

const BOTH: LiveConsent = LiveConsent { env: true, config: true };

#[tokio::test]
async fn test_live_without_env_consent_never_contacts_gateway() {
    let gateway = ScriptedGateway::new();
    let service = live_service(
        live_config(),
        gateway.clone(),
        LiveConsent { env: false, config: true },
    );
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Live, t0()).await;

    let err = service
        .execute(&intent.intent_id, ExecutionMode::Live, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::ConsentMissing { env: false, config: true }));
    assert_eq!(gateway.calls(), 0);

    // Never downgraded to paper either
    let ledger = service.ledger();
    let ledger = ledger.lock().await;
    assert!(ledger.executions().is_empty());
    assert_eq!(ledger.intent(&intent.intent_id).unwrap().status, IntentStatus::Approved);
}

#[tokio::test]
async fn test_single_consent_is_not_enough() {
    for consent in [
        LiveConsent { env: true, config: false },
        LiveConsent { env: false, config: true },
        LiveConsent { env: false, config: false },
    ] {
        let gateway = ScriptedGateway::new();
        let service = live_service(live_config(), gateway.clone(), consent);
        let intent =
            approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Live, t0()).await;

        let err = service
            .execute(&intent.intent_id, ExecutionMode::Live, t0())
            .await
            .unwrap_err();
        assert!(
            matches!(err, TradeError::ConsentMissing { .. }),
            "{:?} was allowed",
            consent
        );
        assert_eq!(gateway.calls(), 0);
    }
}

#[tokio::test]
async fn test_dry_run_refuses_after_consent() {
    let mut config = live_config();
    config.trading.dry_run = true;
    let gateway = ScriptedGateway::new();
    let service = live_service(config, gateway.clone(), BOTH);
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Live, t0()).await;

    let err = service
        .execute(&intent.intent_id, ExecutionMode::Live, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::DryRunEnabled));
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn test_double_consent_places_order() {
    let gateway = ScriptedGateway::new();
    let service = live_service(live_config(), gateway.clone(), BOTH);
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Live, t0()).await;

    let execution = service
        .execute(&intent.intent_id, ExecutionMode::Live, t0())
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Filled);
    assert_eq!(execution.filled_size(), dec!(0.01));
    assert!(gateway.calls() > 0);
    let placed = gateway.placed.lock().unwrap();
    assert_eq!(placed.len(), 1);
    assert!(placed[0].post_only);
    assert_eq!(placed[0].client_order_id, execution.exec_id);
}

#[tokio::test]
async fn test_gateway_failure_is_recorded_and_retryable() {
    let gateway = ScriptedGateway::new();
    *gateway.fail_place.lock().unwrap() = true;
    let service = live_service(live_config(), gateway.clone(), BOTH);
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Live, t0()).await;

    let execution = service
        .execute(&intent.intent_id, ExecutionMode::Live, t0())
        .await
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Error);
    assert!(!execution.needs_reconciliation);

    *gateway.fail_place.lock().unwrap() = false;
    service.retry(&intent.intent_id, t0()).await.unwrap();
    let execution = service
        .execute(&intent.intent_id, ExecutionMode::Live, t0())
        .await
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Filled);

    let ledger = service.ledger();
    assert_eq!(ledger.lock().await.executions().len(), 2);
}

#[tokio::test]
async fn test_live_without_gateway_is_gateway_error() {
    let service = TradingService::with_consent(
        live_config(),
        market(),
        spot_agent::store::Ledger::new(),
        None,
        BOTH,
    );
    let intent = approved(&service, &signal(Side::Buy, dec!(0.01)), ExecutionMode::Live, t0()).await;

    let err = service
        .execute(&intent.intent_id, ExecutionMode::Live, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::Gateway(GatewayError::Unavailable(_))));
}
