//! spot-agent: approval-gated trade decision and execution core for spot crypto
//!
//! This library provides the core components for:
//! - Order intents with canonical SHA-256 hashes and hash-bound approvals
//! - A fail-closed risk engine with a fixed check order
//! - Deterministic paper fills and a live path behind double consent
//! - Latency-guarded news features and baseline/news-overlay strategies
//! - Backtesting through the same decision pipeline
//! - Parquet market data and a JSON ledger
//! - Structured logging and Prometheus metrics

pub mod backtest;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod execution;
pub mod intent;
pub mod market;
pub mod orderbook;
pub mod risk;
pub mod service;
pub mod store;
pub mod strategy;
pub mod telemetry;
