//! Ledger record shapes (persisted as camelCase JSON).

use serde::{Deserialize, Serialize};

/// Token counts for one review run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Size of the reviewed diff, kept for accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffInfo {
    pub file_count: usize,
    pub total_size_bytes: usize,
    pub total_lines: usize,
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Success,
    Failed,
}

/// One immutable usage record.
///
/// Created exactly once per pipeline completion, never mutated or deleted
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLogEntry {
    pub id: String,
    /// YYYY-MM-DD
    pub date: String,
    /// Abbreviated weekday for `date` (Mon..Sun).
    pub day_of_week: String,
    /// HH:MM:SS
    pub time: String,
    pub mr_title: String,
    pub mr_url: String,
    pub project_id: String,
    pub mr_iid: u64,
    pub model: String,
    pub provider: String,
    pub token_usage: TokenUsage,
    pub estimated_cost_usd: f64,
    pub estimated_cost_krw: i64,
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_info: Option<DiffInfo>,
}

/// Caller-supplied fields for a new record. Id, clock fields, and costs
/// are filled in by [`crate::store::UsageLedger::record`].
#[derive(Debug, Clone)]
pub struct NewUsageEntry {
    pub mr_title: String,
    pub mr_url: String,
    pub project_id: String,
    pub mr_iid: u64,
    pub model: String,
    pub provider: String,
    pub token_usage: TokenUsage,
    pub status: ReviewStatus,
    pub error_message: Option<String>,
    pub diff_info: Option<DiffInfo>,
}
