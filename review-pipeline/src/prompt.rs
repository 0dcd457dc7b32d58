//! Review prompt assembly.
//!
//! Prompt = optional external system prompt + MR metadata header +
//! per-file diff bodies tagged `[NEW]`/`[DELETED]`/`[RENAMED]`/`[MODIFIED]`.

use gitlab_service::types::{MergeRequest, MergeRequestChange};
use tracing::{info, warn};

/// Size of the fetched diff, kept for usage accounting.
#[derive(Debug, Clone, Copy)]
pub struct DiffMetrics {
    pub file_count: usize,
    pub total_size_bytes: usize,
    pub total_lines: usize,
}

/// Computes raw diff size metrics over the fetched changes.
pub fn diff_metrics(changes: &[MergeRequestChange]) -> DiffMetrics {
    DiffMetrics {
        file_count: changes.len(),
        total_size_bytes: changes.iter().map(|c| c.diff.len()).sum(),
        total_lines: changes.iter().map(|c| c.diff.lines().count()).sum(),
    }
}

fn file_status(change: &MergeRequestChange) -> &'static str {
    if change.new_file {
        "[NEW]"
    } else if change.deleted_file {
        "[DELETED]"
    } else if change.renamed_file {
        "[RENAMED]"
    } else {
        "[MODIFIED]"
    }
}

fn format_changes(changes: &[MergeRequestChange]) -> String {
    changes
        .iter()
        .map(|c| {
            format!(
                "\n{} {}\n---\n{}\n---\n",
                file_status(c),
                c.new_path,
                c.diff
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the full review prompt for one MR.
pub fn build_review_prompt(
    mr: &MergeRequest,
    changes: &[MergeRequestChange],
    system_prompt: Option<&str>,
) -> String {
    let header = format!(
        "# Merge Request\n- Title: {}\n- Description: {}\n- URL: {}\n\n# Code changes\n",
        mr.title,
        mr.description.as_deref().unwrap_or("(no description)"),
        mr.web_url
    );
    let formatted = format_changes(changes);

    match system_prompt {
        Some(sp) => format!("{sp}\n\n{header}{formatted}"),
        None => format!("{header}{formatted}"),
    }
}

/// Configuration-time lookup of the external system prompt file.
/// Absence is a normal condition: logged, returned as `None`.
pub fn load_system_prompt(path: &str) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            info!("system prompt loaded from {path} ({} bytes)", text.len());
            Some(text)
        }
        Err(e) => {
            warn!("system prompt file {path} not loaded: {e}; continuing without it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(path: &str, diff: &str) -> MergeRequestChange {
        MergeRequestChange {
            old_path: path.into(),
            new_path: path.into(),
            new_file: false,
            renamed_file: false,
            deleted_file: false,
            diff: diff.into(),
        }
    }

    fn mr() -> MergeRequest {
        MergeRequest {
            id: 1,
            iid: 5,
            title: "Fix login race".into(),
            description: Some("Serialize token refresh".into()),
            web_url: "https://gitlab.example.com/g/p/-/merge_requests/5".into(),
            state: "opened".into(),
            source_branch: "fix/login".into(),
            target_branch: "main".into(),
            labels: Vec::new(),
            approved: None,
            detailed_merge_status: None,
            merge_status: None,
            approvals_before_merge: None,
            approvals: None,
        }
    }

    #[test]
    fn file_status_tags() {
        let mut c = change("a.rs", "");
        c.new_file = true;
        assert_eq!(file_status(&c), "[NEW]");

        let mut c = change("a.rs", "");
        c.deleted_file = true;
        assert_eq!(file_status(&c), "[DELETED]");

        let mut c = change("a.rs", "");
        c.renamed_file = true;
        assert_eq!(file_status(&c), "[RENAMED]");

        assert_eq!(file_status(&change("a.rs", "")), "[MODIFIED]");
    }

    #[test]
    fn prompt_contains_header_and_tagged_diffs() {
        let changes = vec![change("src/auth.rs", "@@ -1 +1 @@\n-a\n+b")];
        let prompt = build_review_prompt(&mr(), &changes, None);

        assert!(prompt.contains("- Title: Fix login race"));
        assert!(prompt.contains("- Description: Serialize token refresh"));
        assert!(prompt.contains("[MODIFIED] src/auth.rs"));
        assert!(prompt.contains("@@ -1 +1 @@"));
    }

    #[test]
    fn system_prompt_is_prepended_when_present() {
        let changes = vec![change("src/auth.rs", "+b")];
        let with = build_review_prompt(&mr(), &changes, Some("You are a strict reviewer."));
        assert!(with.starts_with("You are a strict reviewer."));

        let without = build_review_prompt(&mr(), &changes, None);
        assert!(without.starts_with("# Merge Request"));
    }

    #[test]
    fn missing_description_gets_placeholder() {
        let mut m = mr();
        m.description = None;
        let prompt = build_review_prompt(&m, &[change("a.rs", "+x")], None);
        assert!(prompt.contains("- Description: (no description)"));
    }

    #[test]
    fn metrics_sum_over_all_files() {
        let changes = vec![change("a.rs", "line1\nline2"), change("b.rs", "x\ny\nz")];
        let m = diff_metrics(&changes);
        assert_eq!(m.file_count, 2);
        assert_eq!(m.total_size_bytes, 11 + 5);
        assert_eq!(m.total_lines, 5);
    }

    #[test]
    fn absent_system_prompt_file_is_none() {
        assert!(load_system_prompt("/definitely/missing/AGENTS.md").is_none());
    }
}
