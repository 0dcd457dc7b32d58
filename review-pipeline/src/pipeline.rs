//! The review pipeline: single-MR execution plus the two front-end entry
//! points (poll sweep and webhook-by-iid).
//!
//! Step order within one run is fixed: fetch diffs → diff metrics → build
//! prompt → LLM call → post review comment. The review label is applied in
//! a finally-style step no matter how the run ended; the label, not the
//! comment, keeps an MR from being picked up again. A usage entry is
//! recorded whenever a prompt was built; a failure before that (diff
//! fetch) stays silent apart from the log and the label.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use gitlab_service::types::MergeRequest;
use gitlab_service::{GitLabClient, GitLabError};
use llm_service::{LlmClient, LlmError};
use usage_ledger::{DiffInfo, NewUsageEntry, ReviewStatus, TokenUsage, UsageLedger};

use crate::dedup::{ProcessingGuard, ProcessingState};
use crate::prompt::{self, DiffMetrics};
use crate::{filter, tokens};

/// Everything a review run needs, wired once at startup and shared behind
/// an `Arc` between the scheduler and the webhook handlers.
pub struct ReviewContext {
    pub gitlab: GitLabClient,
    pub llm: LlmClient,
    pub ledger: UsageLedger,
    pub state: ProcessingState,
    pub project_id: String,
    pub review_label: String,
    pub model: String,
    pub exclude_target_branches: Vec<String>,
    pub exclude_target_branch_patterns: Vec<String>,
    pub system_prompt: Option<String>,
}

/// Failure of one pipeline stage, kept for the error comment and ledger.
#[derive(Debug, Error)]
enum StageError {
    #[error("failed to fetch MR diffs: {0}")]
    DiffFetch(#[source] GitLabError),

    #[error("LLM query failed: {0}")]
    Llm(#[source] LlmError),

    #[error("failed to post review comment: {0}")]
    Comment(#[source] GitLabError),
}

/// One poll cycle: select eligible MRs and review them one after another.
///
/// GitLab fetch failures abort the cycle and surface to the caller; the
/// next tick retries discovery from scratch.
pub async fn process_merge_requests(ctx: &ReviewContext) -> Result<(), GitLabError> {
    debug!("searching for review targets");
    let all = ctx
        .gitlab
        .list_opened_merge_requests(&ctx.project_id)
        .await?;
    debug!("{} open MRs fetched", all.len());

    let targets = filter::select_targets(
        all,
        &ctx.review_label,
        &ctx.exclude_target_branches,
        &ctx.exclude_target_branch_patterns,
    );
    if targets.is_empty() {
        debug!("no MRs to review");
        return Ok(());
    }
    info!("{} MRs selected for review", targets.len());

    for mr in &targets {
        match ctx.state.try_acquire(mr.iid) {
            Some(guard) => process_single_mr(ctx, mr, guard).await,
            None => info!("MR !{}: already being processed, skipping", mr.iid),
        }
    }
    Ok(())
}

/// Reviews a single MR by iid (webhook path).
///
/// The target filter does not run here; only the label guard applies,
/// because the label is the system-wide idempotency marker.
pub async fn process_merge_request_by_iid(ctx: &ReviewContext, iid: u64) {
    let Some(guard) = ctx.state.try_acquire(iid) else {
        info!("MR !{iid}: already being processed, skipping");
        return;
    };

    let mr = match ctx.gitlab.get_merge_request(&ctx.project_id, iid).await {
        Ok(mr) => mr,
        Err(e) => {
            error!("MR !{iid}: fetch failed: {e}");
            return;
        }
    };

    if mr.labels.iter().any(|l| l == &ctx.review_label) {
        info!("MR !{iid}: already carries the review label, skipping");
        return;
    }

    process_single_mr(ctx, &mr, guard).await;
}

/// Runs the full pipeline for one admitted MR.
///
/// Never propagates errors: failures end up in the MR comment, the log,
/// and the ledger. The admission guard is released when this returns.
pub async fn process_single_mr(
    ctx: &ReviewContext,
    mr: &MergeRequest,
    _guard: ProcessingGuard,
) {
    info!("MR !{}: starting review: {}", mr.iid, mr.title);

    let mut built_prompt: Option<String> = None;
    let mut metrics: Option<DiffMetrics> = None;

    let outcome: Result<Option<String>, StageError> = async {
        let changes = ctx
            .gitlab
            .get_merge_request_changes(&ctx.project_id, mr.iid)
            .await
            .map_err(StageError::DiffFetch)?;

        if changes.is_empty() {
            info!("MR !{}: no file changes, nothing to review", mr.iid);
            return Ok(None);
        }
        debug!("MR !{}: {} changed files", mr.iid, changes.len());

        let m = prompt::diff_metrics(&changes);
        debug!(
            "MR !{}: diff size {:.1}KB over {} lines",
            mr.iid,
            m.total_size_bytes as f64 / 1024.0,
            m.total_lines
        );
        metrics = Some(m);

        let p = prompt::build_review_prompt(mr, &changes, ctx.system_prompt.as_deref());
        built_prompt = Some(p.clone());

        debug!(
            "MR !{}: querying {} via {}",
            mr.iid,
            ctx.model,
            ctx.llm.provider().display_name()
        );
        let review = ctx
            .llm
            .query_stream(&ctx.model, &p)
            .await
            .map_err(StageError::Llm)?;

        ctx.gitlab
            .add_comment(&ctx.project_id, mr.iid, &review)
            .await
            .map_err(StageError::Comment)?;
        info!("MR !{}: review posted", mr.iid);

        Ok(Some(review))
    }
    .await;

    if let Err(e) = &outcome {
        error!("MR !{}: review failed: {e}", mr.iid);
        // A diff-fetch failure produced no prompt; it stays silent so a
        // broken upstream does not spam the MR.
        if built_prompt.is_some() {
            post_failure_comment(ctx, mr.iid, e).await;
        }
    }

    // The label is the idempotency guard: apply it regardless of outcome so
    // the MR is not picked up again on the next cycle.
    if let Err(e) = ctx
        .gitlab
        .add_label(&ctx.project_id, mr.iid, &ctx.review_label)
        .await
    {
        warn!(
            "MR !{}: failed to add label \"{}\": {e}",
            mr.iid, ctx.review_label
        );
    }

    record_usage(ctx, mr, &outcome, built_prompt.as_deref(), metrics).await;
    // _guard drops here: the iid returns to idle
}

/// Best-effort failure note with retry guidance.
async fn post_failure_comment(ctx: &ReviewContext, iid: u64, err: &StageError) {
    let body = format!(
        "## ⚠️ AI review failed\n\n\
         An error occurred while generating the review:\n\n\
         ```\n{err}\n```\n\n\
         Remove the `{}` label to retry on the next cycle.",
        ctx.review_label
    );
    if let Err(e) = ctx.gitlab.add_comment(&ctx.project_id, iid, &body).await {
        error!("MR !{iid}: failed to post the failure comment: {e}");
    }
}

/// Writes the usage entry for this run. No prompt means nothing worth
/// accounting (empty diff, or an upstream failure before prompt build).
async fn record_usage(
    ctx: &ReviewContext,
    mr: &MergeRequest,
    outcome: &Result<Option<String>, StageError>,
    built_prompt: Option<&str>,
    metrics: Option<DiffMetrics>,
) {
    let Some(built_prompt) = built_prompt else {
        return;
    };
    let prompt_tokens = tokens::count_tokens(built_prompt);

    let (status, completion_tokens, error_message) = match outcome {
        Ok(Some(review)) => (ReviewStatus::Success, tokens::count_tokens(review), None),
        // an empty diff never builds a prompt; nothing to record
        Ok(None) => return,
        Err(e) => (ReviewStatus::Failed, 0, Some(e.to_string())),
    };

    let new = NewUsageEntry {
        mr_title: mr.title.clone(),
        mr_url: mr.web_url.clone(),
        project_id: ctx.project_id.clone(),
        mr_iid: mr.iid,
        model: ctx.model.clone(),
        provider: ctx.llm.provider().as_str().to_string(),
        token_usage: TokenUsage::new(prompt_tokens, completion_tokens),
        status,
        error_message,
        diff_info: metrics.map(|m| DiffInfo {
            file_count: m.file_count,
            total_size_bytes: m.total_size_bytes,
            total_lines: m.total_lines,
        }),
    };

    match ctx.ledger.record(new).await {
        Ok(entry) => debug!(
            "usage entry {} recorded (${:.4})",
            entry.id, entry.estimated_cost_usd
        ),
        // Persistence failure is non-fatal; the run still counts as
        // recorded for this execution.
        Err(e) => error!("failed to persist usage entry: {e}"),
    }
}
