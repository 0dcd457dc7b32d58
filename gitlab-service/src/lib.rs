//! GitLab REST v4 collaborator for the review pipeline.
//!
//! Read side: list opened MRs, fetch one MR, fetch file-level diffs.
//! Write side: create MR notes and add labels (idempotent against
//! duplicates). Errors are status-aware so callers can log precisely.

pub mod client;
pub mod errors;
pub mod types;

pub use client::GitLabClient;
pub use errors::{GitLabError, GitLabResult};
