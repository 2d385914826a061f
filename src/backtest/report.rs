//! Report files

use super::BacktestResult;
use crate::data::ParquetWriter;
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

/// Paths of the files written for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub summary: PathBuf,
    pub trades: PathBuf,
    pub equity: PathBuf,
}

/// Write `<prefix>_report.json`, `_summary.txt`, `_trades.parquet` and
/// `_equity.parquet` into `output_dir`
pub fn write_report(
    result: &BacktestResult,
    output_dir: &Path,
    prefix: &str,
) -> anyhow::Result<ReportPaths> {
    let writer = ParquetWriter::new(output_dir);
    writer.ensure_dir()?;

    let paths = ReportPaths {
        json: writer.file_path(&format!("{}_report.json", prefix)),
        summary: writer.file_path(&format!("{}_summary.txt", prefix)),
        trades: writer.file_path(&format!("{}_trades.parquet", prefix)),
        equity: writer.file_path(&format!("{}_equity.parquet", prefix)),
    };

    let report = json!({
        "symbol": result.symbol,
        "strategy": result.strategy,
        "capital": result.capital,
        "metrics": result.metrics,
        "rejections": result.rejections,
        "bars": result.equity.len(),
    });
    fs::write(&paths.json, serde_json::to_string_pretty(&report)?)?;
    fs::write(&paths.summary, result.metrics.format_table())?;
    writer.write_trades(&paths.trades, &result.trades)?;
    writer.write_equity(&paths.equity, &result.equity)?;

    tracing::info!(dir = %output_dir.display(), prefix, "Wrote backtest report");
    Ok(paths)
}
