//! Unified error handling for `llm-service`.
//!
//! A single top-level [`LlmError`] covers all three backends so the review
//! pipeline can treat any provider failure uniformly. All messages include
//! the prefix `[LLM Service]` to simplify attribution in logs.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Top-level error for LLM calls.
///
/// No variant is retried inside this crate; a single failed call surfaces
/// once to the caller.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LlmError {
    /// Backend executable or model cannot be found at all.
    #[error("[LLM Service] provider unavailable: {0}")]
    Unavailable(String),

    /// Call exceeded its wall-clock deadline. The underlying request or
    /// subprocess has already been cancelled when this is returned.
    #[error("[LLM Service] operation timed out after {0:?}")]
    Timeout(Duration),

    /// Backend finished without producing any output.
    #[error("[LLM Service] provider returned an empty response")]
    EmptyResponse,

    /// Invalid endpoint (empty or missing http/https).
    #[error("[LLM Service] invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Non-successful HTTP status from upstream.
    #[error("[LLM Service] unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        /// Numeric HTTP status code.
        status: StatusCode,
        /// Request URL.
        url: String,
        /// Short snippet of the response body.
        snippet: String,
    },

    /// Transport/HTTP client error.
    #[error("[LLM Service] transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Unexpected/invalid payload from the backend.
    #[error("[LLM Service] failed to decode response: {0}")]
    Decode(String),

    /// Subprocess failure (non-zero exit, broken pipe).
    #[error("[LLM Service] provider process failed: {0}")]
    Process(String),
}

impl LlmError {
    /// Classifies a subprocess failure message: missing-binary patterns
    /// (`ENOENT`, "not found") become [`LlmError::Unavailable`], everything
    /// else stays a plain process failure.
    pub fn from_process_failure(cli_path: &str, message: &str) -> Self {
        if message.contains("ENOENT") || message.to_lowercase().contains("not found") {
            LlmError::Unavailable(format!("executable not found: {cli_path}"))
        } else {
            LlmError::Process(message.to_string())
        }
    }
}

/// Trims an upstream body for inclusion in an error message.
pub(crate) fn make_snippet(text: &str) -> String {
    text.chars().take(240).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enoent_maps_to_unavailable() {
        let e = LlmError::from_process_failure("codex", "spawn codex ENOENT");
        assert!(matches!(e, LlmError::Unavailable(_)));

        let e = LlmError::from_process_failure("codex", "codex: command not found");
        assert!(matches!(e, LlmError::Unavailable(_)));
    }

    #[test]
    fn other_failures_stay_process_errors() {
        let e = LlmError::from_process_failure("codex", "panicked at 'oh no'");
        assert!(matches!(e, LlmError::Process(_)));
    }
}
