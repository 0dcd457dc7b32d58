//! Read-only statistics projections over the ledger.
//!
//! Nothing here mutates a log; reporting tooling calls these over whatever
//! rollup it loaded.

use std::collections::BTreeMap;

use crate::entry::{ReviewStatus, UsageLogEntry};
use crate::store::UsageLog;

/// Aggregated totals for one bucket (a day, a model, a month).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodTotals {
    pub requests: usize,
    pub tokens: u64,
    pub cost_usd: f64,
    pub cost_krw: i64,
}

impl PeriodTotals {
    fn add(&mut self, e: &UsageLogEntry) {
        self.requests += 1;
        self.tokens += e.token_usage.total_tokens;
        self.cost_usd += e.estimated_cost_usd;
        self.cost_krw += e.estimated_cost_krw;
    }
}

/// Usage statistics over an optional date range.
#[derive(Debug, Clone, Default)]
pub struct UsageStatistics {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub total_tokens: u64,
    pub avg_tokens_per_request: u64,
    pub total_cost_usd: f64,
    pub total_cost_krw: i64,
    /// Per-day totals keyed by YYYY-MM-DD.
    pub daily: BTreeMap<String, PeriodTotals>,
    /// Per-model totals keyed by "provider/model".
    pub per_model: BTreeMap<String, PeriodTotals>,
}

/// Computes statistics over `log`, optionally bounded to an inclusive
/// `[start_date, end_date]` range of YYYY-MM-DD strings.
pub fn statistics(
    log: &UsageLog,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> UsageStatistics {
    let entries: Vec<&UsageLogEntry> = log
        .entries
        .iter()
        .filter(|e| start_date.is_none_or(|s| e.date.as_str() >= s))
        .filter(|e| end_date.is_none_or(|s| e.date.as_str() <= s))
        .collect();

    let mut stats = UsageStatistics {
        total_requests: entries.len(),
        ..Default::default()
    };

    for e in &entries {
        match e.status {
            ReviewStatus::Success => stats.successful_requests += 1,
            ReviewStatus::Failed => stats.failed_requests += 1,
        }
        stats.total_tokens += e.token_usage.total_tokens;
        stats.total_cost_usd += e.estimated_cost_usd;
        stats.total_cost_krw += e.estimated_cost_krw;

        stats.daily.entry(e.date.clone()).or_default().add(e);
        stats
            .per_model
            .entry(format!("{}/{}", e.provider, e.model))
            .or_default()
            .add(e);
    }

    if stats.total_requests > 0 {
        stats.avg_tokens_per_request = stats.total_tokens / stats.total_requests as u64;
    }
    stats
}

/// Last `count` entries, newest first.
pub fn recent_entries(log: &UsageLog, count: usize) -> Vec<&UsageLogEntry> {
    log.entries.iter().rev().take(count).collect()
}

/// Per-month summary with a daily breakdown, newest month first.
#[derive(Debug, Clone)]
pub struct MonthlySummary {
    /// YYYY-MM
    pub month: String,
    pub requests: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub total_tokens: u64,
    pub avg_tokens_per_request: u64,
    pub cost_usd: f64,
    pub cost_krw: i64,
    pub daily_breakdown: BTreeMap<String, PeriodTotals>,
}

/// Groups the log's entries by calendar month.
pub fn monthly_summaries(log: &UsageLog) -> Vec<MonthlySummary> {
    let mut by_month: BTreeMap<String, Vec<&UsageLogEntry>> = BTreeMap::new();
    for e in &log.entries {
        let month = e.date.get(..7).unwrap_or(&e.date).to_string();
        by_month.entry(month).or_default().push(e);
    }

    let mut out: Vec<MonthlySummary> = by_month
        .into_iter()
        .map(|(month, entries)| {
            let total_tokens: u64 = entries.iter().map(|e| e.token_usage.total_tokens).sum();
            let mut daily_breakdown: BTreeMap<String, PeriodTotals> = BTreeMap::new();
            for e in &entries {
                daily_breakdown.entry(e.date.clone()).or_default().add(e);
            }
            MonthlySummary {
                requests: entries.len(),
                success_count: entries
                    .iter()
                    .filter(|e| e.status == ReviewStatus::Success)
                    .count(),
                failed_count: entries
                    .iter()
                    .filter(|e| e.status == ReviewStatus::Failed)
                    .count(),
                total_tokens,
                avg_tokens_per_request: if entries.is_empty() {
                    0
                } else {
                    total_tokens / entries.len() as u64
                },
                cost_usd: entries.iter().map(|e| e.estimated_cost_usd).sum(),
                cost_krw: entries.iter().map(|e| e.estimated_cost_krw).sum(),
                daily_breakdown,
                month,
            }
        })
        .collect();

    out.reverse(); // newest first
    out
}

/// Serializes the log's entries as CSV, one row per entry.
pub fn export_csv(log: &UsageLog) -> String {
    const HEADERS: &str = "ID,Date,Weekday,Time,MR Title,MR URL,Project ID,MR IID,Model,Provider,\
Prompt Tokens,Completion Tokens,Total Tokens,Cost USD,Cost KRW,Status";

    let mut out = String::from(HEADERS);
    for e in &log.entries {
        let status = match e.status {
            ReviewStatus::Success => "success",
            ReviewStatus::Failed => "failed",
        };
        out.push('\n');
        out.push_str(&format!(
            "{},{},{},{},\"{}\",{},{},{},{},{},{},{},{},{},{},{}",
            e.id,
            e.date,
            e.day_of_week,
            e.time,
            e.mr_title.replace('"', "\"\""),
            e.mr_url,
            e.project_id,
            e.mr_iid,
            e.model,
            e.provider,
            e.token_usage.prompt_tokens,
            e.token_usage.completion_tokens,
            e.token_usage.total_tokens,
            e.estimated_cost_usd,
            e.estimated_cost_krw,
            status,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::TokenUsage;
    use crate::store::UsageLog;

    fn entry(date: &str, model: &str, status: ReviewStatus, tokens: u64) -> UsageLogEntry {
        UsageLogEntry {
            id: format!("id-{date}-{model}-{tokens}"),
            date: date.into(),
            day_of_week: "Mon".into(),
            time: "12:00:00".into(),
            mr_title: "Add \"quoted\" feature".into(),
            mr_url: "https://gitlab.example.com/g/p/-/merge_requests/1".into(),
            project_id: "42".into(),
            mr_iid: 1,
            model: model.into(),
            provider: "openai".into(),
            token_usage: TokenUsage::new(tokens, 0),
            estimated_cost_usd: 0.01,
            estimated_cost_krw: 15,
            status,
            error_message: None,
            diff_info: None,
        }
    }

    fn log_with(entries: Vec<UsageLogEntry>) -> UsageLog {
        let mut log = UsageLog::empty();
        log.entries = entries;
        log.recompute();
        log
    }

    #[test]
    fn date_range_filters_inclusively() {
        let log = log_with(vec![
            entry("2026-01-01", "gpt-4o", ReviewStatus::Success, 100),
            entry("2026-01-15", "gpt-4o", ReviewStatus::Failed, 200),
            entry("2026-02-01", "gpt-4o", ReviewStatus::Success, 400),
        ]);

        let jan = statistics(&log, Some("2026-01-01"), Some("2026-01-31"));
        assert_eq!(jan.total_requests, 2);
        assert_eq!(jan.successful_requests, 1);
        assert_eq!(jan.failed_requests, 1);
        assert_eq!(jan.total_tokens, 300);
        assert_eq!(jan.avg_tokens_per_request, 150);

        let all = statistics(&log, None, None);
        assert_eq!(all.total_requests, 3);
    }

    #[test]
    fn per_model_buckets_use_provider_prefix() {
        let log = log_with(vec![
            entry("2026-01-01", "gpt-4o", ReviewStatus::Success, 100),
            entry("2026-01-02", "gpt-4o", ReviewStatus::Success, 100),
            entry("2026-01-02", "o1-mini", ReviewStatus::Success, 50),
        ]);

        let stats = statistics(&log, None, None);
        assert_eq!(stats.per_model["openai/gpt-4o"].requests, 2);
        assert_eq!(stats.per_model["openai/o1-mini"].tokens, 50);
        assert_eq!(stats.daily["2026-01-02"].requests, 2);
    }

    #[test]
    fn recent_entries_are_newest_first() {
        let log = log_with(vec![
            entry("2026-01-01", "gpt-4o", ReviewStatus::Success, 1),
            entry("2026-01-02", "gpt-4o", ReviewStatus::Success, 2),
            entry("2026-01-03", "gpt-4o", ReviewStatus::Success, 3),
        ]);

        let recent = recent_entries(&log, 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].date, "2026-01-03");
        assert_eq!(recent[1].date, "2026-01-02");
    }

    #[test]
    fn monthly_summaries_group_and_sort_desc() {
        let log = log_with(vec![
            entry("2026-01-01", "gpt-4o", ReviewStatus::Success, 100),
            entry("2026-02-01", "gpt-4o", ReviewStatus::Failed, 200),
        ]);

        let months = monthly_summaries(&log);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2026-02");
        assert_eq!(months[0].failed_count, 1);
        assert_eq!(months[1].month, "2026-01");
        assert_eq!(months[1].success_count, 1);
    }

    #[test]
    fn csv_has_header_and_quotes_titles() {
        let log = log_with(vec![entry(
            "2026-01-01",
            "gpt-4o",
            ReviewStatus::Success,
            100,
        )]);

        let csv = export_csv(&log);
        let mut lines = csv.lines();
        let header = lines.next().expect("header");
        assert!(header.starts_with("ID,Date,Weekday,Time,MR Title"));
        assert_eq!(header.split(',').count(), 16);

        let row = lines.next().expect("row");
        assert!(row.contains("\"Add \"\"quoted\"\" feature\""));
        assert!(row.ends_with("success"));
    }
}
