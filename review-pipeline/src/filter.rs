//! Target selection for the poll path.
//!
//! Pure filter over already-fetched MRs; GitLab fetch failures stay with
//! the caller. An MR is eligible iff it does not carry the review label,
//! is not approved, and does not target an excluded branch.

use gitlab_service::types::MergeRequest;
use tracing::debug;

/// Approval is derived by a priority-ordered check, newest API fields
/// first; the first field that is present decides.
pub fn is_approved(mr: &MergeRequest) -> bool {
    if let Some(approved) = mr.approved {
        return approved;
    }
    if mr.detailed_merge_status.as_deref() == Some("approved") {
        return true;
    }
    if mr.merge_status.as_deref() == Some("can_be_merged") && mr.approvals_before_merge == Some(0) {
        return true;
    }
    if mr.approvals.as_ref().is_some_and(|a| a.approved) {
        return true;
    }
    false
}

/// Returns the reason a target branch is excluded, if any.
///
/// `exact` entries must equal the branch name; `patterns` entries exclude
/// any branch that contains them ("release" also drops "release-1.6.51").
pub fn excluded_target_branch(
    target: &str,
    exact: &[String],
    patterns: &[String],
) -> Option<String> {
    if exact.iter().any(|b| b == target) {
        return Some(format!("excluded target branch ({target})"));
    }
    patterns
        .iter()
        .find(|p| target.contains(p.as_str()))
        .map(|p| format!("excluded pattern match ({p} in {target})"))
}

/// Selects the MRs eligible for review.
pub fn select_targets(
    all: Vec<MergeRequest>,
    review_label: &str,
    exclude_exact: &[String],
    exclude_patterns: &[String],
) -> Vec<MergeRequest> {
    let mut targets = Vec::new();
    for mr in all {
        let has_label = mr.labels.iter().any(|l| l == review_label);
        let approved = is_approved(&mr);
        let exclusion = excluded_target_branch(&mr.target_branch, exclude_exact, exclude_patterns);

        if !has_label && !approved && exclusion.is_none() {
            debug!(
                "MR !{}: \"{}\" selected for review (target: {})",
                mr.iid, mr.title, mr.target_branch
            );
            targets.push(mr);
        } else {
            let reason = if has_label {
                "already carries the review label".to_string()
            } else if approved {
                "already approved".to_string()
            } else {
                exclusion.unwrap_or_default()
            };
            debug!("MR !{}: \"{}\" skipped: {}", mr.iid, mr.title, reason);
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitlab_service::types::LegacyApprovals;

    fn mr(iid: u64, target_branch: &str) -> MergeRequest {
        MergeRequest {
            id: iid,
            iid,
            title: format!("MR {iid}"),
            description: None,
            web_url: format!("https://gitlab.example.com/g/p/-/merge_requests/{iid}"),
            state: "opened".into(),
            source_branch: format!("feature/{iid}"),
            target_branch: target_branch.into(),
            labels: Vec::new(),
            approved: None,
            detailed_merge_status: None,
            merge_status: None,
            approvals_before_merge: None,
            approvals: None,
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn labeled_mrs_are_excluded() {
        let mut labeled = mr(1, "main");
        labeled.labels = strings(&["ai-review", "backend"]);
        let clean = mr(2, "main");

        let targets = select_targets(vec![labeled, clean], "ai-review", &[], &[]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].iid, 2);
    }

    #[test]
    fn approval_is_priority_ordered() {
        // explicit flag wins even over contradicting legacy data
        let mut m = mr(1, "main");
        m.approved = Some(false);
        m.detailed_merge_status = Some("approved".into());
        assert!(!is_approved(&m));

        let mut m = mr(2, "main");
        m.approved = Some(true);
        assert!(is_approved(&m));

        let mut m = mr(3, "main");
        m.detailed_merge_status = Some("approved".into());
        assert!(is_approved(&m));

        let mut m = mr(4, "main");
        m.merge_status = Some("can_be_merged".into());
        m.approvals_before_merge = Some(0);
        assert!(is_approved(&m));

        // mergeable but still waiting on approvals is NOT approved
        let mut m = mr(5, "main");
        m.merge_status = Some("can_be_merged".into());
        m.approvals_before_merge = Some(2);
        assert!(!is_approved(&m));

        let mut m = mr(6, "main");
        m.approvals = Some(LegacyApprovals { approved: true });
        assert!(is_approved(&m));

        assert!(!is_approved(&mr(7, "main")));
    }

    #[test]
    fn approved_mrs_are_excluded() {
        let mut approved = mr(1, "main");
        approved.approved = Some(true);

        let targets = select_targets(vec![approved, mr(2, "main")], "ai-review", &[], &[]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].iid, 2);
    }

    #[test]
    fn exact_branch_exclusion() {
        let exact = strings(&["develop", "prod", "stage"]);
        assert!(excluded_target_branch("develop", &exact, &[]).is_some());
        assert!(excluded_target_branch("development", &exact, &[]).is_none());

        let targets = select_targets(
            vec![mr(1, "develop"), mr(2, "main")],
            "ai-review",
            &exact,
            &[],
        );
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].iid, 2);
    }

    #[test]
    fn pattern_exclusion_matches_substrings() {
        let patterns = strings(&["release"]);
        assert!(excluded_target_branch("release-1.6.51", &[], &patterns).is_some());
        assert!(excluded_target_branch("hotfix-release-candidate", &[], &patterns).is_some());
        assert!(excluded_target_branch("main", &[], &patterns).is_none());
    }

    #[test]
    fn exact_list_alone_excludes_without_patterns() {
        let exact = strings(&["release-x"]);
        assert!(excluded_target_branch("release-x", &exact, &[]).is_some());
        assert!(excluded_target_branch("release-y", &exact, &[]).is_none());
    }
}
