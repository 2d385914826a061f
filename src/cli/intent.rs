//! Intent lifecycle commands

use super::print_json;
use crate::config::ExecutionMode;
use crate::service::TradingService;
use crate::strategy::StrategyKind;
use chrono::Utc;
use clap::Args;

#[derive(Args, Debug)]
pub struct ProposeArgs {
    /// Trading pair, e.g. BTC/JPY
    #[arg(long)]
    pub symbol: String,

    #[arg(long, value_enum, default_value = "baseline")]
    pub strategy: StrategyKind,

    #[arg(long, value_enum, default_value = "paper")]
    pub mode: ExecutionMode,
}

impl ProposeArgs {
    pub async fn execute(&self, service: &TradingService) -> anyhow::Result<()> {
        let outcome = service
            .propose(self.strategy, &self.symbol, self.mode, Utc::now())
            .await?;
        print_json(&outcome)
    }
}

#[derive(Args, Debug)]
pub struct ApproveArgs {
    pub intent_id: String,

    /// Canonical hash shown at proposal time
    #[arg(long)]
    pub hash: String,

    /// Must equal `trading.approval_phrase`
    #[arg(long)]
    pub phrase: String,

    #[arg(long, default_value = "operator")]
    pub by: String,
}

impl ApproveArgs {
    pub async fn execute(&self, service: &TradingService) -> anyhow::Result<()> {
        let approval = service
            .approve(&self.intent_id, &self.hash, &self.by, &self.phrase, Utc::now())
            .await?;
        print_json(&approval)
    }
}

#[derive(Args, Debug)]
pub struct ExecuteArgs {
    pub intent_id: String,

    #[arg(long, value_enum, default_value = "paper")]
    pub mode: ExecutionMode,
}

impl ExecuteArgs {
    pub async fn execute(&self, service: &TradingService) -> anyhow::Result<()> {
        let execution = service
            .execute(&self.intent_id, self.mode, Utc::now())
            .await?;
        print_json(&execution)
    }
}

#[derive(Args, Debug)]
pub struct RetryArgs {
    pub intent_id: String,
}

impl RetryArgs {
    pub async fn execute(&self, service: &TradingService) -> anyhow::Result<()> {
        let intent = service.retry(&self.intent_id, Utc::now()).await?;
        print_json(&intent)
    }
}

#[derive(Args, Debug)]
pub struct CloseArgs {
    #[arg(long)]
    pub symbol: String,

    #[arg(long, value_enum, default_value = "paper")]
    pub mode: ExecutionMode,
}

impl CloseArgs {
    pub async fn execute(&self, service: &TradingService) -> anyhow::Result<()> {
        let outcome = service
            .close_position(&self.symbol, self.mode, Utc::now())
            .await?;
        print_json(&outcome)
    }
}
