//! Parquet readers and writers
//!
//! Decimals are stored as strings to keep full precision; timestamps are UTC
//! microseconds.

use crate::backtest::{EquityPoint, TradeRecord};
use crate::intent::Side;
use crate::market::{Candle, NewsFeature};
use crate::orderbook::OrderBookSnapshot;
use arrow::array::{Array, ArrayRef, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

fn ts_field(name: &str) -> Field {
    Field::new(
        name,
        DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        false,
    )
}

fn str_field(name: &str) -> Field {
    Field::new(name, DataType::Utf8, false)
}

/// Candle schema
pub fn candle_schema() -> Schema {
    Schema::new(vec![
        str_field("symbol"),
        str_field("timeframe"),
        ts_field("ts"),
        str_field("open"),
        str_field("high"),
        str_field("low"),
        str_field("close"),
        str_field("volume"),
    ])
}

/// Top-of-book schema
pub fn orderbook_schema() -> Schema {
    Schema::new(vec![
        str_field("symbol"),
        ts_field("ts"),
        str_field("bid"),
        str_field("ask"),
        Field::new("bid_size", DataType::Utf8, true),
        Field::new("ask_size", DataType::Utf8, true),
    ])
}

/// News feature schema; keyword flags are comma-joined
pub fn news_schema() -> Schema {
    Schema::new(vec![
        str_field("symbol"),
        ts_field("published_at"),
        ts_field("observed_at"),
        str_field("sentiment"),
        str_field("keyword_flags"),
        str_field("source_weight"),
    ])
}

/// Backtest trade schema
pub fn trade_schema() -> Schema {
    Schema::new(vec![
        ts_field("ts"),
        str_field("intent_id"),
        str_field("symbol"),
        str_field("side"),
        str_field("size"),
        str_field("price"),
        str_field("notional"),
        str_field("fee"),
        str_field("pnl"),
    ])
}

/// Equity curve schema
pub fn equity_schema() -> Schema {
    Schema::new(vec![
        ts_field("ts"),
        str_field("equity"),
        str_field("realized_pnl"),
        str_field("position"),
    ])
}

fn ts_array(values: impl Iterator<Item = DateTime<Utc>>) -> ArrayRef {
    let micros: Vec<i64> = values.map(|t| t.timestamp_micros()).collect();
    Arc::new(TimestampMicrosecondArray::from(micros).with_timezone("UTC"))
}

fn str_array<S: AsRef<str>>(values: impl Iterator<Item = S>) -> ArrayRef {
    let owned: Vec<String> = values.map(|s| s.as_ref().to_string()).collect();
    Arc::new(StringArray::from(owned))
}

fn dec_array(values: impl Iterator<Item = Decimal>) -> ArrayRef {
    str_array(values.map(|d| d.to_string()))
}

fn opt_dec_array(values: impl Iterator<Item = Option<Decimal>>) -> ArrayRef {
    let owned: Vec<Option<String>> = values.map(|d| d.map(|v| v.to_string())).collect();
    Arc::new(StringArray::from(owned))
}

/// Writes record sets to Parquet files under one directory
pub struct ParquetWriter {
    output_dir: PathBuf,
}

impl ParquetWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Ensure output directory exists
    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    fn write_batch(&self, path: &Path, schema: Schema, columns: Vec<ArrayRef>) -> anyhow::Result<()> {
        self.ensure_dir()?;

        let schema = Arc::new(schema);
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        let batch = RecordBatch::try_new(schema, columns)?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }

    pub fn write_candles(&self, path: &Path, candles: &[Candle]) -> anyhow::Result<()> {
        self.write_batch(
            path,
            candle_schema(),
            vec![
                str_array(candles.iter().map(|c| c.symbol.as_str())),
                str_array(candles.iter().map(|c| c.timeframe.as_str())),
                ts_array(candles.iter().map(|c| c.ts)),
                dec_array(candles.iter().map(|c| c.open)),
                dec_array(candles.iter().map(|c| c.high)),
                dec_array(candles.iter().map(|c| c.low)),
                dec_array(candles.iter().map(|c| c.close)),
                dec_array(candles.iter().map(|c| c.volume)),
            ],
        )?;
        tracing::debug!(path = ?path, count = candles.len(), "Wrote candles to Parquet");
        Ok(())
    }

    pub fn write_orderbook(&self, path: &Path, books: &[OrderBookSnapshot]) -> anyhow::Result<()> {
        self.write_batch(
            path,
            orderbook_schema(),
            vec![
                str_array(books.iter().map(|b| b.symbol.as_str())),
                ts_array(books.iter().map(|b| b.ts)),
                dec_array(books.iter().map(|b| b.bid)),
                dec_array(books.iter().map(|b| b.ask)),
                opt_dec_array(books.iter().map(|b| b.bid_size)),
                opt_dec_array(books.iter().map(|b| b.ask_size)),
            ],
        )?;
        tracing::debug!(path = ?path, count = books.len(), "Wrote orderbook snapshots to Parquet");
        Ok(())
    }

    pub fn write_news(&self, path: &Path, rows: &[NewsFeature]) -> anyhow::Result<()> {
        self.write_batch(
            path,
            news_schema(),
            vec![
                str_array(rows.iter().map(|r| r.symbol.as_str())),
                ts_array(rows.iter().map(|r| r.published_at)),
                ts_array(rows.iter().map(|r| r.observed_at)),
                dec_array(rows.iter().map(|r| r.sentiment)),
                str_array(rows.iter().map(|r| r.keyword_flags.join(","))),
                dec_array(rows.iter().map(|r| r.source_weight)),
            ],
        )?;
        tracing::debug!(path = ?path, count = rows.len(), "Wrote news features to Parquet");
        Ok(())
    }

    pub fn write_trades(&self, path: &Path, trades: &[TradeRecord]) -> anyhow::Result<()> {
        self.write_batch(
            path,
            trade_schema(),
            vec![
                ts_array(trades.iter().map(|t| t.ts)),
                str_array(trades.iter().map(|t| t.intent_id.as_str())),
                str_array(trades.iter().map(|t| t.symbol.as_str())),
                str_array(trades.iter().map(|t| t.side.as_str())),
                dec_array(trades.iter().map(|t| t.size)),
                dec_array(trades.iter().map(|t| t.price)),
                dec_array(trades.iter().map(|t| t.notional)),
                dec_array(trades.iter().map(|t| t.fee)),
                dec_array(trades.iter().map(|t| t.pnl)),
            ],
        )?;
        tracing::debug!(path = ?path, count = trades.len(), "Wrote trades to Parquet");
        Ok(())
    }

    pub fn write_equity(&self, path: &Path, points: &[EquityPoint]) -> anyhow::Result<()> {
        self.write_batch(
            path,
            equity_schema(),
            vec![
                ts_array(points.iter().map(|p| p.ts)),
                dec_array(points.iter().map(|p| p.equity)),
                dec_array(points.iter().map(|p| p.realized_pnl)),
                dec_array(points.iter().map(|p| p.position)),
            ],
        )?;
        tracing::debug!(path = ?path, count = points.len(), "Wrote equity curve to Parquet");
        Ok(())
    }
}

/// Reader for one Parquet file
pub struct ParquetReader {
    path: PathBuf,
}

impl ParquetReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn batches(&self) -> anyhow::Result<Vec<RecordBatch>> {
        let file = File::open(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let mut batches = Vec::new();
        for batch in reader {
            batches.push(batch?);
        }
        Ok(batches)
    }

    pub fn read_candles(&self) -> anyhow::Result<Vec<Candle>> {
        let mut out = Vec::new();
        for batch in self.batches()? {
            let cols = Columns::new(&batch);
            let symbol = cols.strings("symbol")?;
            let timeframe = cols.strings("timeframe")?;
            let ts = cols.timestamps("ts")?;
            let open = cols.strings("open")?;
            let high = cols.strings("high")?;
            let low = cols.strings("low")?;
            let close = cols.strings("close")?;
            let volume = cols.strings("volume")?;

            for i in 0..batch.num_rows() {
                out.push(Candle {
                    symbol: symbol.value(i).to_string(),
                    timeframe: timeframe.value(i).to_string(),
                    ts: to_datetime(ts.value(i))?,
                    open: Decimal::from_str(open.value(i))?,
                    high: Decimal::from_str(high.value(i))?,
                    low: Decimal::from_str(low.value(i))?,
                    close: Decimal::from_str(close.value(i))?,
                    volume: Decimal::from_str(volume.value(i))?,
                });
            }
        }
        Ok(out)
    }

    pub fn read_orderbook(&self) -> anyhow::Result<Vec<OrderBookSnapshot>> {
        let mut out = Vec::new();
        for batch in self.batches()? {
            let cols = Columns::new(&batch);
            let symbol = cols.strings("symbol")?;
            let ts = cols.timestamps("ts")?;
            let bid = cols.strings("bid")?;
            let ask = cols.strings("ask")?;
            let bid_size = cols.strings("bid_size")?;
            let ask_size = cols.strings("ask_size")?;

            for i in 0..batch.num_rows() {
                out.push(OrderBookSnapshot {
                    symbol: symbol.value(i).to_string(),
                    ts: to_datetime(ts.value(i))?,
                    bid: Decimal::from_str(bid.value(i))?,
                    ask: Decimal::from_str(ask.value(i))?,
                    bid_size: optional_decimal(bid_size, i)?,
                    ask_size: optional_decimal(ask_size, i)?,
                });
            }
        }
        Ok(out)
    }

    pub fn read_news(&self) -> anyhow::Result<Vec<NewsFeature>> {
        let mut out = Vec::new();
        for batch in self.batches()? {
            let cols = Columns::new(&batch);
            let symbol = cols.strings("symbol")?;
            let published = cols.timestamps("published_at")?;
            let observed = cols.timestamps("observed_at")?;
            let sentiment = cols.strings("sentiment")?;
            let flags = cols.strings("keyword_flags")?;
            let weight = cols.strings("source_weight")?;

            for i in 0..batch.num_rows() {
                out.push(NewsFeature {
                    symbol: symbol.value(i).to_string(),
                    published_at: to_datetime(published.value(i))?,
                    observed_at: to_datetime(observed.value(i))?,
                    sentiment: Decimal::from_str(sentiment.value(i))?,
                    keyword_flags: flags
                        .value(i)
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect(),
                    source_weight: Decimal::from_str(weight.value(i))?,
                });
            }
        }
        Ok(out)
    }

    pub fn read_trades(&self) -> anyhow::Result<Vec<TradeRecord>> {
        let mut out = Vec::new();
        for batch in self.batches()? {
            let cols = Columns::new(&batch);
            let ts = cols.timestamps("ts")?;
            let intent_id = cols.strings("intent_id")?;
            let symbol = cols.strings("symbol")?;
            let side = cols.strings("side")?;
            let size = cols.strings("size")?;
            let price = cols.strings("price")?;
            let notional = cols.strings("notional")?;
            let fee = cols.strings("fee")?;
            let pnl = cols.strings("pnl")?;

            for i in 0..batch.num_rows() {
                out.push(TradeRecord {
                    ts: to_datetime(ts.value(i))?,
                    intent_id: intent_id.value(i).to_string(),
                    symbol: symbol.value(i).to_string(),
                    side: parse_side(side.value(i))?,
                    size: Decimal::from_str(size.value(i))?,
                    price: Decimal::from_str(price.value(i))?,
                    notional: Decimal::from_str(notional.value(i))?,
                    fee: Decimal::from_str(fee.value(i))?,
                    pnl: Decimal::from_str(pnl.value(i))?,
                });
            }
        }
        Ok(out)
    }
}

struct Columns<'a> {
    batch: &'a RecordBatch,
}

impl<'a> Columns<'a> {
    fn new(batch: &'a RecordBatch) -> Self {
        Self { batch }
    }

    fn strings(&self, name: &str) -> anyhow::Result<&'a StringArray> {
        self.batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| anyhow::anyhow!("Invalid {} column", name))
    }

    fn timestamps(&self, name: &str) -> anyhow::Result<&'a TimestampMicrosecondArray> {
        self.batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<TimestampMicrosecondArray>())
            .ok_or_else(|| anyhow::anyhow!("Invalid {} column", name))
    }
}

fn to_datetime(micros: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))
}

fn optional_decimal(col: &StringArray, i: usize) -> anyhow::Result<Option<Decimal>> {
    if col.is_null(i) {
        return Ok(None);
    }
    Ok(Some(Decimal::from_str(col.value(i))?))
}

fn parse_side(s: &str) -> anyhow::Result<Side> {
    match s {
        "buy" => Ok(Side::Buy),
        "sell" => Ok(Side::Sell),
        "hold" => Ok(Side::Hold),
        other => Err(anyhow::anyhow!("Invalid side: {}", other)),
    }
}
