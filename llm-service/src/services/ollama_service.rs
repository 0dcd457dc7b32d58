//! Streaming Ollama service for text generation.
//!
//! This module implements a thin client for the local Ollama API:
//! - `POST {endpoint}/api/generate` — text generation with `stream=true`;
//!   newline-delimited JSON chunks are accumulated into one string
//! - `GET {endpoint}/api/tags`      — installed model listing, used by the
//!   availability check
//!
//! Streaming keeps long generations alive without a response-size limit;
//! the caller only ever sees the fully accumulated text.

use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::error_handler::{LlmError, Result, make_snippet};

const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Thin client for Ollama.
///
/// Reuses one HTTP client with a configurable total-request timeout that
/// doubles as the provider deadline for a generation call.
pub struct OllamaService {
    client: reqwest::Client,
    timeout: Duration,
    url_generate: String,
    url_tags: String,
}

impl OllamaService {
    /// Creates a new [`OllamaService`] for the given base URL.
    ///
    /// # Errors
    /// - [`LlmError::InvalidEndpoint`] if `base_url` is empty or not http(s)
    /// - [`LlmError::Transport`] if the HTTP client cannot be built
    pub fn new(base_url: &str, timeout_secs: Option<u64>) -> Result<Self> {
        let endpoint = base_url.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(LlmError::InvalidEndpoint(base_url.to_string()));
        }

        let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let base = endpoint.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            timeout,
            url_generate: format!("{}/api/generate", base),
            url_tags: format!("{}/api/tags", base),
        })
    }

    /// Streams a generation for `prompt` and returns the accumulated text.
    ///
    /// # Errors
    /// - [`LlmError::HttpStatus`] for non-2xx responses
    /// - [`LlmError::Timeout`] when the request deadline is exceeded
    /// - [`LlmError::EmptyResponse`] if the stream produced no text
    /// - [`LlmError::Decode`] on malformed stream chunks
    #[instrument(skip_all, fields(model = %model))]
    pub async fn query_stream(&self, model: &str, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            model,
            prompt,
            stream: true,
        };

        debug!("POST {}", self.url_generate);
        let resp = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_generate.clone();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status,
                url,
                snippet: make_snippet(&text),
            });
        }

        // NDJSON: one JSON object per line, partial lines kept buffered.
        let mut full = String::new();
        let mut buf: Vec<u8> = Vec::new();
        let mut stream = resp.bytes_stream();

        'outer: while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.map_transport(e))?;
            buf.extend_from_slice(&chunk);

            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let part: GenerateChunk = serde_json::from_str(line)
                    .map_err(|e| LlmError::Decode(format!("bad stream chunk: {e}")))?;
                full.push_str(&part.response);
                if part.done {
                    break 'outer;
                }
            }
        }

        if full.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(full)
    }

    /// Checks whether `model` is installed on the Ollama host.
    ///
    /// Resilient: probe failures are logged and reported as unavailable.
    pub async fn check_availability(&self, model: &str) -> bool {
        match self.try_list_models().await {
            Ok(models) => {
                let available = models.iter().any(|m| m == model);
                if !available {
                    warn!("model \"{model}\" not found on the Ollama host");
                    for m in &models {
                        debug!("installed model: {m}");
                    }
                }
                available
            }
            Err(e) => {
                error!("Ollama availability probe failed: {e}");
                false
            }
        }
    }

    /// Lists installed model names via `/api/tags`.
    async fn try_list_models(&self) -> Result<Vec<String>> {
        debug!("GET {}", self.url_tags);
        let resp = self
            .client
            .get(&self.url_tags)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_tags.clone();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status,
                url,
                snippet: make_snippet(&text),
            });
        }

        let out: TagsResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("serde error: {e}")))?;
        Ok(out.models.into_iter().map(|m| m.name).collect())
    }

    fn map_transport(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout)
        } else {
            LlmError::Transport(e)
        }
    }
}

/* ==========================
HTTP payloads
========================== */

/// Request body for `/api/generate` (streaming).
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// One NDJSON chunk of a streaming generation.
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

/// Response body for `/api/tags`.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_endpoint() {
        assert!(matches!(
            OllamaService::new("", None),
            Err(LlmError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            OllamaService::new("localhost:11434", None),
            Err(LlmError::InvalidEndpoint(_))
        ));
        assert!(OllamaService::new("http://localhost:11434", Some(30)).is_ok());
    }
}
