//! Data storage module
//!
//! Parquet files for market inputs and backtest outputs

mod parquet;

pub use parquet::{
    candle_schema, equity_schema, news_schema, orderbook_schema, trade_schema, ParquetReader,
    ParquetWriter,
};
