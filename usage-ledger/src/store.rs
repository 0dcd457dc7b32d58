//! JSON-on-disk rollup store (all-time / monthly / daily).
//!
//! Layout under the base dir:
//!
//! ```text
//! all-entries.json
//! monthly/YYYY-MM.json
//! daily/YYYY-MM-DD.json
//! ```
//!
//! Each save is read-full-file → append-in-memory → recompute aggregates →
//! write-full-file. Writes are serialized through one internal lock so two
//! pipelines finishing close together cannot drop each other's entries.

use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cost;
use crate::entry::{NewUsageEntry, UsageLogEntry};

/// Convenient alias for ledger results.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger persistence failure (non-fatal to the pipeline).
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One rollup file: derived aggregates plus the full entry list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLog {
    pub created_at: String,
    pub last_updated_at: String,
    pub total_entries: usize,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub total_cost_krw: i64,
    pub entries: Vec<UsageLogEntry>,
}

impl UsageLog {
    /// Fresh log with zeroed aggregates.
    pub fn empty() -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            created_at: now.clone(),
            last_updated_at: now,
            total_entries: 0,
            total_tokens: 0,
            total_cost_usd: 0.0,
            total_cost_krw: 0,
            entries: Vec::new(),
        }
    }

    /// Recomputes every aggregate from `entries`. Called on each save so
    /// the stored totals can never drift from the records.
    pub fn recompute(&mut self) {
        self.last_updated_at = Utc::now().to_rfc3339();
        self.total_entries = self.entries.len();
        self.total_tokens = self
            .entries
            .iter()
            .map(|e| e.token_usage.total_tokens)
            .sum();
        self.total_cost_usd = self.entries.iter().map(|e| e.estimated_cost_usd).sum();
        self.total_cost_krw = self.entries.iter().map(|e| e.estimated_cost_krw).sum();
    }
}

/// Handle over the rollup files. Cheap to share behind an `Arc`.
pub struct UsageLedger {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl UsageLedger {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn all_entries_path(&self) -> PathBuf {
        self.base_dir.join("all-entries.json")
    }

    fn daily_path(&self, date: &str) -> PathBuf {
        self.base_dir.join("daily").join(format!("{date}.json"))
    }

    fn monthly_path(&self, month: &str) -> PathBuf {
        self.base_dir.join("monthly").join(format!("{month}.json"))
    }

    /// Loads one rollup file. A missing file yields an empty log; an
    /// unreadable one is logged and also treated as empty.
    pub async fn load_log(&self, path: &Path) -> UsageLog {
        match fs::read(path).await {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|e| {
                warn!("unreadable ledger file {}: {e}", path.display());
                UsageLog::empty()
            }),
            Err(_) => UsageLog::empty(),
        }
    }

    async fn save_log(&self, log: &mut UsageLog, path: &Path) -> LedgerResult<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        log.recompute();
        let json = serde_json::to_vec_pretty(&log)?;
        fs::write(path, json).await?;
        Ok(())
    }

    async fn append_to(&self, path: &Path, entry: &UsageLogEntry) -> LedgerResult<()> {
        let mut log = self.load_log(path).await;
        log.entries.push(entry.clone());
        self.save_log(&mut log, path).await
    }

    /// Builds the full record (id, clock fields, cost) and appends it to
    /// the all-time, daily, and monthly logs in that order.
    pub async fn record(&self, new: NewUsageEntry) -> LedgerResult<UsageLogEntry> {
        let now = Local::now();
        let date = now.format("%Y-%m-%d").to_string();
        let month = now.format("%Y-%m").to_string();

        let (usd, krw) = cost::calculate_cost(
            new.token_usage.prompt_tokens,
            new.token_usage.completion_tokens,
            &new.model,
            &new.provider,
        );

        let entry = UsageLogEntry {
            id: Uuid::new_v4().to_string(),
            date: date.clone(),
            day_of_week: now.format("%a").to_string(),
            time: now.format("%H:%M:%S").to_string(),
            mr_title: new.mr_title,
            mr_url: new.mr_url,
            project_id: new.project_id,
            mr_iid: new.mr_iid,
            model: new.model,
            provider: new.provider,
            token_usage: new.token_usage,
            estimated_cost_usd: usd,
            estimated_cost_krw: krw,
            status: new.status,
            error_message: new.error_message,
            diff_info: new.diff_info,
        };

        let _guard = self.write_lock.lock().await;
        self.append_to(&self.all_entries_path(), &entry).await?;
        self.append_to(&self.daily_path(&date), &entry).await?;
        self.append_to(&self.monthly_path(&month), &entry).await?;
        debug!("usage entry {} appended to all three rollups", entry.id);

        Ok(entry)
    }

    /// The all-time log.
    pub async fn all_time(&self) -> UsageLog {
        self.load_log(&self.all_entries_path()).await
    }

    /// The log for one calendar day (`YYYY-MM-DD`).
    pub async fn daily(&self, date: &str) -> UsageLog {
        self.load_log(&self.daily_path(date)).await
    }

    /// The log for one calendar month (`YYYY-MM`).
    pub async fn monthly(&self, month: &str) -> UsageLog {
        self.load_log(&self.monthly_path(month)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ReviewStatus, TokenUsage};
    use chrono::Datelike;

    fn sample_entry(iid: u64, prompt: u64, completion: u64) -> NewUsageEntry {
        NewUsageEntry {
            mr_title: format!("MR number {iid}"),
            mr_url: format!("https://gitlab.example.com/group/proj/-/merge_requests/{iid}"),
            project_id: "42".into(),
            mr_iid: iid,
            model: "gpt-4o".into(),
            provider: "openai".into(),
            token_usage: TokenUsage::new(prompt, completion),
            status: ReviewStatus::Success,
            error_message: None,
            diff_info: None,
        }
    }

    fn assert_aggregates_match(log: &UsageLog) {
        assert_eq!(log.total_entries, log.entries.len());
        assert_eq!(
            log.total_tokens,
            log.entries
                .iter()
                .map(|e| e.token_usage.total_tokens)
                .sum::<u64>()
        );
        assert_eq!(
            log.total_cost_usd,
            log.entries.iter().map(|e| e.estimated_cost_usd).sum::<f64>()
        );
        assert_eq!(
            log.total_cost_krw,
            log.entries.iter().map(|e| e.estimated_cost_krw).sum::<i64>()
        );
    }

    #[tokio::test]
    async fn record_appends_to_all_three_rollups() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = UsageLedger::new(dir.path());

        let first = ledger.record(sample_entry(1, 1000, 500)).await.expect("record");
        ledger.record(sample_entry(2, 2000, 100)).await.expect("record");

        let all = ledger.all_time().await;
        let daily = ledger.daily(&first.date).await;
        let month = &first.date[..7];
        let monthly = ledger.monthly(month).await;

        assert_eq!(all.entries.len(), 2);
        assert_eq!(daily.entries.len(), 2);
        assert_eq!(monthly.entries.len(), 2);

        // aggregates equal the sum over entries in every rollup
        assert_aggregates_match(&all);
        assert_aggregates_match(&daily);
        assert_aggregates_match(&monthly);
    }

    #[tokio::test]
    async fn aggregates_hold_after_every_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = UsageLedger::new(dir.path());

        for i in 1..=5u64 {
            ledger
                .record(sample_entry(i, i * 100, i * 10))
                .await
                .expect("record");
            assert_aggregates_match(&ledger.all_time().await);
        }
    }

    #[tokio::test]
    async fn concurrent_records_do_not_lose_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = std::sync::Arc::new(UsageLedger::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..8u64 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.record(sample_entry(i, 100, 10)).await
            }));
        }
        for h in handles {
            h.await.expect("join").expect("record");
        }

        let all = ledger.all_time().await;
        assert_eq!(all.entries.len(), 8);
        assert_aggregates_match(&all);
    }

    #[tokio::test]
    async fn log_round_trips_through_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = UsageLedger::new(dir.path());
        ledger.record(sample_entry(7, 4321, 987)).await.expect("record");

        let all = ledger.all_time().await;
        let json = serde_json::to_string(&all).expect("serialize");
        let parsed: UsageLog = serde_json::from_str(&json).expect("parse");

        assert_eq!(parsed.entries, all.entries);
        let mut recomputed = parsed.clone();
        recomputed.recompute();
        assert_eq!(recomputed.total_tokens, all.total_tokens);
        assert_eq!(recomputed.total_cost_usd, all.total_cost_usd);
        assert_eq!(recomputed.total_cost_krw, all.total_cost_krw);
    }

    #[tokio::test]
    async fn entry_clock_fields_are_consistent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = UsageLedger::new(dir.path());
        let entry = ledger.record(sample_entry(3, 10, 10)).await.expect("record");

        let today = Local::now();
        assert_eq!(entry.date[..4].parse::<i32>().expect("year"), today.year());
        assert!(!entry.day_of_week.is_empty());
        assert_eq!(entry.time.len(), 8);
    }
}
