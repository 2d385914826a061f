//! CLI interface for spot-agent
//!
//! Provides subcommands for:
//! - `propose` / `close`: Run a strategy (or a manual close) through the risk engine
//! - `approve`: Bind an operator approval to an intent's hash
//! - `execute` / `retry`: Paper or live execution of an approved intent
//! - `backtest`: Replay stored data and write reports
//! - `status`, `kill-switch`, `audit`, `config`: Operations

mod backtest;
mod intent;
mod ops;

pub use backtest::BacktestArgs;
pub use intent::{ApproveArgs, CloseArgs, ExecuteArgs, ProposeArgs, RetryArgs};
pub use ops::{AuditArgs, KillSwitchArgs};

use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "spot-agent")]
#[command(about = "Approval-gated trade decision and execution agent for spot crypto")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Propose a trade from a strategy signal
    Propose(ProposeArgs),
    /// Approve a proposed intent
    Approve(ApproveArgs),
    /// Execute an approved intent
    Execute(ExecuteArgs),
    /// Re-arm a canceled or failed intent
    Retry(RetryArgs),
    /// Propose selling the whole position of a symbol
    Close(CloseArgs),
    /// Run backtest on stored data
    Backtest(BacktestArgs),
    /// Show current safety state
    Status,
    /// Engage or release the kill switch
    KillSwitch(KillSwitchArgs),
    /// Show recent audit entries
    Audit(AuditArgs),
    /// Show configuration
    Config,
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
