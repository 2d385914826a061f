//! Durable state
//!
//! The ledger is the source of truth for intents, approvals, executions and
//! audit entries. Risk counters and positions are derived from it on demand.

mod ledger;
mod state_file;

pub use ledger::{AuditEntry, Ledger};
pub use state_file::StateFile;
