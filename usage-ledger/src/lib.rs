//! Append-only usage/cost ledger for AI review runs.
//!
//! Every pipeline completion (success or failure) becomes one immutable
//! [`UsageLogEntry`], written into three JSON rollups that stay consistent
//! by construction: the all-time log, one file per calendar month, one per
//! calendar day. Aggregates are recomputed from the entry list on every
//! save, never updated incrementally, so the stored totals always equal
//! the sum over the stored entries.
//!
//! The statistics module provides the read-only projections used by
//! reporting tooling (recent entries, date ranges, per-day/per-model
//! rollups, CSV export).

pub mod cost;
pub mod entry;
pub mod stats;
pub mod store;

pub use entry::{DiffInfo, NewUsageEntry, ReviewStatus, TokenUsage, UsageLogEntry};
pub use store::{LedgerError, LedgerResult, UsageLedger, UsageLog};
