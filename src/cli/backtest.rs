//! Backtest command implementation

use crate::backtest::{write_report, BacktestRequest};
use crate::service::TradingService;
use crate::strategy::StrategyKind;
use chrono::{DateTime, Utc};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct BacktestArgs {
    #[arg(long)]
    pub symbol: String,

    /// Start time (RFC 3339)
    #[arg(long)]
    pub start: DateTime<Utc>,

    /// End time (RFC 3339)
    #[arg(long)]
    pub end: DateTime<Utc>,

    #[arg(long, value_enum, default_value = "baseline")]
    pub strategy: StrategyKind,

    /// Candle timeframe; defaults to `trading.timeframe`
    #[arg(long)]
    pub timeframe: Option<String>,

    /// Output directory; defaults to `backtest.output_dir`
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Output format: json or table
    #[arg(long, default_value = "table")]
    pub format: String,
}

impl BacktestArgs {
    pub async fn execute(&self, service: &TradingService) -> anyhow::Result<()> {
        if self.end < self.start {
            anyhow::bail!("--end {} is before --start {}", self.end, self.start);
        }
        let config = service.config();
        let request = BacktestRequest {
            symbol: self.symbol.clone(),
            timeframe: self
                .timeframe
                .clone()
                .unwrap_or_else(|| config.trading.timeframe.clone()),
            start: self.start,
            end: self.end,
            strategy: self.strategy,
        };

        tracing::info!(symbol = %request.symbol, strategy = %request.strategy, "Running backtest");
        let result = service.run_backtest(&request)?;
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| config.backtest.output_dir.clone());
        let paths = write_report(&result, &output, &request.prefix())?;

        match self.format.as_str() {
            "json" => super::print_json(&result.metrics)?,
            _ => println!("{}", result.metrics.format_table()),
        }
        println!("Report: {}", paths.json.display());
        Ok(())
    }
}
