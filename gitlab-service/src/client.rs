//! GitLab client (REST v4) for MR listing, diffs, notes, and labels.
//!
//! Endpoints used:
//! - GET  /projects/:id/merge_requests?state=opened
//! - GET  /projects/:id/merge_requests/:iid
//! - GET  /projects/:id/merge_requests/:iid/diffs   (preferred over deprecated /changes)
//! - POST /projects/:id/merge_requests/:iid/notes
//! - PUT  /projects/:id/merge_requests/:iid         (label updates)

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::GitLabResult;
use crate::types::{MergeRequest, MergeRequestChange};

#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_api: String, // e.g. "https://gitlab.com/api/v4"
    token: String,    // "PRIVATE-TOKEN"
}

impl GitLabClient {
    /// Constructs a client for `base_url` (instance root, not the API path)
    /// with a private/project access token.
    pub fn new(base_url: &str, token: String) -> GitLabResult<Self> {
        let http = Client::builder().user_agent("mr-review-bot/0.1").build()?;
        let base_api = format!("{}/api/v4", base_url.trim_end_matches('/'));
        Ok(Self {
            http,
            base_api,
            token,
        })
    }

    fn project_url(&self, project: &str) -> String {
        format!("{}/projects/{}", self.base_api, urlencoding::encode(project))
    }

    /// Lists currently open MRs for the project.
    pub async fn list_opened_merge_requests(
        &self,
        project: &str,
    ) -> GitLabResult<Vec<MergeRequest>> {
        let url = format!(
            "{}/merge_requests?state=opened&per_page=100",
            self.project_url(project)
        );
        debug!("GET {url}");
        let mrs: Vec<MergeRequest> = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(mrs)
    }

    /// Fetches a single MR by iid.
    pub async fn get_merge_request(&self, project: &str, iid: u64) -> GitLabResult<MergeRequest> {
        let url = format!("{}/merge_requests/{}", self.project_url(project), iid);
        debug!("GET {url}");
        let mr: MergeRequest = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(mr)
    }

    /// Fetches file-level diffs for an MR.
    pub async fn get_merge_request_changes(
        &self,
        project: &str,
        iid: u64,
    ) -> GitLabResult<Vec<MergeRequestChange>> {
        let url = format!(
            "{}/merge_requests/{}/diffs?per_page=100",
            self.project_url(project),
            iid
        );
        debug!("GET {url}");
        let changes: Vec<MergeRequestChange> = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(changes)
    }

    /// Posts a note (comment) on an MR.
    pub async fn add_comment(&self, project: &str, iid: u64, body: &str) -> GitLabResult<()> {
        #[derive(Serialize)]
        struct Req<'a> {
            body: &'a str,
        }

        let url = format!("{}/merge_requests/{}/notes", self.project_url(project), iid);
        debug!("POST {url}");
        self.http
            .post(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&Req { body })
            .send()
            .await?
            .error_for_status()?;

        info!("comment added to MR !{iid}");
        Ok(())
    }

    /// Adds `label` to an MR's label set. Idempotent: an MR that already
    /// carries the label is left untouched.
    pub async fn add_label(&self, project: &str, iid: u64, label: &str) -> GitLabResult<()> {
        let mr = self.get_merge_request(project, iid).await?;
        if mr.labels.iter().any(|l| l == label) {
            debug!("MR !{iid} already carries label \"{label}\"");
            return Ok(());
        }

        #[derive(Serialize)]
        struct Req {
            labels: String,
        }

        let mut labels = mr.labels;
        labels.push(label.to_string());

        let url = format!("{}/merge_requests/{}", self.project_url(project), iid);
        debug!("PUT {url}");
        self.http
            .put(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&Req {
                labels: labels.join(","),
            })
            .send()
            .await?
            .error_for_status()?;

        info!("label \"{label}\" added to MR !{iid}");
        Ok(())
    }
}
