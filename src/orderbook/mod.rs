//! Order book module
//!
//! Top-of-book snapshots used for paper fills and maker pricing

mod book;

pub use book::OrderBookSnapshot;
