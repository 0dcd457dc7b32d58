//! OpenAI-compatible chat-completions client (streaming).
//!
//! - `POST {endpoint}/chat/completions` with `stream=true` — SSE `data:`
//!   lines, accumulated into one string
//! - `GET {endpoint}/models` — best-effort model listing
//!
//! The availability check is deliberately relaxed: hosted APIs routinely
//! serve models that are absent from the public listing, so a missing
//! model only logs a warning and still counts as available.

use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::error_handler::{LlmError, Result, make_snippet};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Thin client for OpenAI-compatible APIs.
pub struct OpenAiService {
    client: reqwest::Client,
    timeout: Duration,
    api_key: String,
    url_chat: String,
    url_models: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`]. `base_url` defaults to the public
    /// OpenAI endpoint; override it for compatible gateways.
    ///
    /// # Errors
    /// - [`LlmError::InvalidEndpoint`] if the override is not http(s)
    /// - [`LlmError::Transport`] if the HTTP client cannot be built
    pub fn new(api_key: String, base_url: Option<&str>, timeout_secs: Option<u64>) -> Result<Self> {
        let endpoint = base_url.unwrap_or(DEFAULT_BASE_URL).trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(LlmError::InvalidEndpoint(endpoint.to_string()));
        }

        let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let base = endpoint.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            timeout,
            api_key,
            url_chat: format!("{}/chat/completions", base),
            url_models: format!("{}/models", base),
        })
    }

    /// Streams a chat completion for `prompt` and returns the accumulated
    /// text.
    ///
    /// # Errors
    /// - [`LlmError::HttpStatus`] for non-2xx responses
    /// - [`LlmError::Timeout`] when the request deadline is exceeded
    /// - [`LlmError::EmptyResponse`] if no content deltas arrived
    #[instrument(skip_all, fields(model = %model))]
    pub async fn query_stream(&self, model: &str, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: true,
        };

        debug!("POST {}", self.url_chat);
        let resp = self
            .client
            .post(&self.url_chat)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status,
                url,
                snippet: make_snippet(&text),
            });
        }

        // SSE: `data: {json}` per event, terminated by `data: [DONE]`.
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
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    break 'outer;
                }

                let event: ChatChunk = serde_json::from_str(data)
                    .map_err(|e| LlmError::Decode(format!("bad stream event: {e}")))?;
                if let Some(content) = event
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta.content)
                {
                    full.push_str(&content);
                }
            }
        }

        if full.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(full)
    }

    /// Checks whether `model` appears in the API's model listing.
    ///
    /// Relaxed on purpose: an absent model logs a warning but still returns
    /// `true`; only a failed connection counts as unavailable.
    pub async fn check_availability(&self, model: &str) -> bool {
        match self.try_list_models().await {
            Ok(models) => {
                if !models.iter().any(|m| m == model) {
                    warn!(
                        "model \"{model}\" not in the API listing; assuming it is still servable"
                    );
                    for m in models.iter().take(10) {
                        debug!("listed model: {m}");
                    }
                }
                true
            }
            Err(e) => {
                error!("OpenAI availability probe failed: {e}");
                false
            }
        }
    }

    /// Lists model ids via `/models`.
    async fn try_list_models(&self) -> Result<Vec<String>> {
        debug!("GET {}", self.url_models);
        let resp = self
            .client
            .get(&self.url_models)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_models.clone();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status,
                url,
                snippet: make_snippet(&text),
            });
        }

        let out: ModelsResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("serde error: {e}")))?;
        Ok(out.data.into_iter().map(|m| m.id).collect())
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

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// One SSE event of a streaming chat completion.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    delta: ChatDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Response body for `/models`.
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}
