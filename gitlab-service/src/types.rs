//! GitLab response shapes (subset of fields we actually use).

use serde::Deserialize;

/// One open merge request as returned by the MR listing and show endpoints.
///
/// Ephemeral: fetched for a single review run and discarded afterwards.
/// The approval-related fields vary across GitLab versions and tiers, so
/// every one of them is optional; derivation order lives in the target
/// filter, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    pub id: u64,
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub web_url: String,
    pub state: String,
    pub source_branch: String,
    pub target_branch: String,
    #[serde(default)]
    pub labels: Vec<String>,

    // approval signals, newest API shape first
    #[serde(default)]
    pub approved: Option<bool>,
    #[serde(default)]
    pub detailed_merge_status: Option<String>,
    #[serde(default)]
    pub merge_status: Option<String>,
    #[serde(default)]
    pub approvals_before_merge: Option<u32>,
    #[serde(default)]
    pub approvals: Option<LegacyApprovals>,
}

/// Pre-15.x nested approval flag, still emitted by some instances.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyApprovals {
    #[serde(default)]
    pub approved: bool,
}

/// One changed file within an MR.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequestChange {
    pub old_path: String,
    pub new_path: String,
    pub new_file: bool,
    pub renamed_file: bool,
    pub deleted_file: bool,
    /// Unified diff text; empty for binary/too-large files.
    #[serde(default)]
    pub diff: String,
}
