//! Proposals through the risk engine

use crate::common::*;
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use spot_agent::config::ExecutionMode;
use spot_agent::execution::{Execution, ExecutionStatus, Fill, LiveConsent};
use spot_agent::intent::{IntentStatus, Side};
use spot_agent::market::NewsFeature;
use spot_agent::risk::RiskReason;
use spot_agent::service::{ProposalOutcome, TradingService};
use spot_agent::store::Ledger;
use spot_agent::strategy::StrategyKind;

fn filled(id: &str, side: Side, price: Decimal, size: Decimal, minutes_before: i64) -> Execution {
    let ts = t0() - Duration::minutes(minutes_before);
    Execution {
        exec_id: id.to_string(),
        intent_id: format!("intent-{}", id),
        intent_hash: "h".to_string(),
        mode: ExecutionMode::Paper,
        status: ExecutionStatus::Filled,
        fee: Decimal::ZERO,
        slippage_model: "fixed_bps:0".to_string(),
        details: serde_json::json!({}),
        needs_reconciliation: false,
        executed_at: ts,
        fills: vec![Fill {
            fill_id: format!("fill-{}", id),
            order_id: format!("order-{}", id),
            symbol: SYMBOL.to_string(),
            side,
            price,
            size,
            fee: Decimal::ZERO,
            ts,
        }],
    }
}

#[tokio::test]
async fn test_daily_loss_limit_rejects_proposal() {
    // ¥60,000 realized loss today against a ¥50,000 limit
    let mut ledger = Ledger::new();
    ledger.record_execution(filled("a", Side::Buy, dec!(100000), dec!(1), 60));
    ledger.record_execution(filled("b", Side::Sell, dec!(40000), dec!(1), 30));
    let service =
        TradingService::with_consent(config(), market(), ledger, None, LiveConsent::default());

    let outcome = service
        .propose_signal(&signal(Side::Buy, dec!(0.001)), ExecutionMode::Paper, None, t0())
        .await
        .unwrap();

    let ProposalOutcome::Rejected { reason, .. } = outcome else {
        panic!("expected rejection, got {:?}", outcome);
    };
    assert_eq!(reason, RiskReason::DailyLossLimit);
    assert_eq!(reason.code(), "daily_loss_limit_reached");

    let ledger = service.ledger();
    let ledger = ledger.lock().await;
    let check = ledger
        .audit_entries()
        .iter()
        .find(|e| e.event == "risk_check")
        .unwrap();
    assert_eq!(check.payload["reason"], "daily_loss_limit_reached");
    let realized: Decimal = check.payload["risk_state"]["realized_pnl_today"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(realized, dec!(-60000));
}

#[tokio::test]
async fn test_kill_switch_outranks_every_other_reason() {
    let mut config = config();
    config.trading.kill_switch = true;
    let service = service(config, market());

    // Not whitelisted and nothing held, still reported as the kill switch
    let mut sell = signal(Side::Sell, dec!(0.01));
    sell.symbol = "DOGE/JPY".to_string();
    let outcome = service
        .propose_signal(&sell, ExecutionMode::Paper, None, t0())
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        ProposalOutcome::Rejected { reason: RiskReason::KillSwitch, .. }
    ));
}

#[tokio::test]
async fn test_long_only_sell_without_position() {
    let service = service(config(), market());
    for size in [dec!(0.0001), dec!(0.01), dec!(1)] {
        let outcome = service
            .propose_signal(&signal(Side::Sell, size), ExecutionMode::Paper, None, t0())
            .await
            .unwrap();
        assert!(
            matches!(
                outcome,
                ProposalOutcome::Rejected { reason: RiskReason::NoPositionToSell, .. }
            ),
            "size {} was not rejected",
            size
        );
    }
}

#[tokio::test]
async fn test_oversized_buy_is_adjusted() {
    let mut config = config();
    config.risk.max_order_notional = dec!(10000);
    let service = service(config, market());

    let outcome = service
        .propose_signal(&signal(Side::Buy, dec!(0.01)), ExecutionMode::Paper, None, t0())
        .await
        .unwrap();
    let ProposalOutcome::Proposed { intent, adjustment, .. } = outcome else {
        panic!("expected proposal, got {:?}", outcome);
    };
    assert!(adjustment.is_some());
    assert_eq!(intent.size, dec!(0.002));
    assert_eq!(intent.status, IntentStatus::Proposed);
    assert!(intent.verify_hash());
}

#[tokio::test]
async fn test_strategy_proposal_from_stored_candles() {
    let mut config = config();
    config.strategy.baseline.sma_period = 3;
    config.strategy.baseline.momentum_lookback = 2;
    config.strategy.baseline.base_position_pct = dec!(0.01);
    let market = market();
    uptrend(&market);
    let service = service(config, market);

    let outcome = service
        .propose(StrategyKind::Baseline, SYMBOL, ExecutionMode::Paper, t0())
        .await
        .unwrap();
    let ProposalOutcome::Proposed { intent, .. } = outcome else {
        panic!("expected proposal, got {:?}", outcome);
    };
    assert_eq!(intent.side, Side::Buy);
    assert_eq!(intent.price, dec!(5020000));
    assert_eq!(intent.strategy_name, "baseline");
    assert!(intent.features_ref.as_deref().unwrap().ends_with("news:0"));
}

#[tokio::test]
async fn test_news_hidden_until_latency_passes() {
    let mut config = config();
    config.strategy.baseline.sma_period = 3;
    config.strategy.baseline.momentum_lookback = 2;
    config.strategy.baseline.base_position_pct = dec!(0.01);
    config.news.news_latency_seconds = 60;
    let market = market();
    uptrend(&market);
    market.insert_news(vec![NewsFeature {
        symbol: SYMBOL.to_string(),
        published_at: t0() - Duration::seconds(40),
        observed_at: t0() - Duration::seconds(30),
        sentiment: dec!(0.8),
        keyword_flags: vec!["etf".to_string()],
        source_weight: dec!(1),
    }]);
    let service = service(config, market);

    let early = service
        .propose(StrategyKind::NewsOverlay, SYMBOL, ExecutionMode::Paper, t0())
        .await
        .unwrap();
    let ProposalOutcome::Proposed { intent: early, .. } = early else {
        panic!("expected proposal");
    };
    assert!(early.features_ref.as_deref().unwrap().ends_with("news:0"));

    // Observed 30s before t0 with 60s latency: visible from t0 + 30s
    let late = service
        .propose(
            StrategyKind::NewsOverlay,
            SYMBOL,
            ExecutionMode::Paper,
            t0() + Duration::seconds(30),
        )
        .await
        .unwrap();
    let ProposalOutcome::Proposed { intent: late, .. } = late else {
        panic!("expected proposal");
    };
    assert!(late.features_ref.as_deref().unwrap().ends_with("news:1"));
    assert!(late.size > early.size);
    assert!(late.confidence > early.confidence);
}
