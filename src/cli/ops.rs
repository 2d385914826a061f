//! Operational commands

use super::print_json;
use crate::service::TradingService;
use chrono::Utc;
use clap::{Args, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[derive(Args, Debug)]
pub struct KillSwitchArgs {
    #[arg(value_enum)]
    pub state: Switch,
}

impl KillSwitchArgs {
    pub async fn execute(&self, service: &TradingService) -> anyhow::Result<()> {
        let enabled = self.state == Switch::On;
        service.set_kill_switch(enabled, Utc::now()).await?;
        println!("kill switch {}", if enabled { "ENGAGED" } else { "released" });
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Only entries for this intent
    #[arg(long)]
    pub intent: Option<String>,

    /// Number of most recent entries
    #[arg(long, default_value = "20")]
    pub limit: usize,
}

impl AuditArgs {
    pub async fn execute(&self, service: &TradingService) -> anyhow::Result<()> {
        let ledger = service.ledger();
        let ledger = ledger.lock().await;
        let entries: Vec<_> = ledger
            .audit_entries()
            .iter()
            .filter(|e| match &self.intent {
                Some(id) => e.intent_id.as_deref() == Some(id.as_str()),
                None => true,
            })
            .collect();
        let skip = entries.len().saturating_sub(self.limit);
        print_json(&entries[skip..])
    }
}
