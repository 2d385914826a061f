//! End-to-end tests over the public API

mod backtest_test;
mod common;
mod consent_test;
mod execution_test;
mod persistence_test;
mod proposal_test;
