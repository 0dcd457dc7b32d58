//! Provider facade w/o async-trait or dynamic trait objects.
//!
//! A closed enum with one variant per backend, each carrying only the
//! fields it needs. Callers hold the enum for the process lifetime and
//! dispatch through plain `async fn`s.

use crate::config::llm_provider::LlmProvider;
use crate::error_handler::Result;
use crate::services::codex_service::CodexCliService;
use crate::services::ollama_service::OllamaService;
use crate::services::open_ai_service::OpenAiService;

/// Concrete LLM client (enum-dispatch).
pub enum LlmClient {
    Ollama(OllamaService),
    OpenAi(OpenAiService),
    Codex(CodexCliService),
}

impl LlmClient {
    /// Local Ollama server at `base_url`.
    pub fn ollama(base_url: &str, timeout_secs: Option<u64>) -> Result<Self> {
        Ok(Self::Ollama(OllamaService::new(base_url, timeout_secs)?))
    }

    /// OpenAI or a compatible gateway; `base_url` of `None` means the
    /// public API.
    pub fn open_ai(
        api_key: String,
        base_url: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        Ok(Self::OpenAi(OpenAiService::new(
            api_key,
            base_url,
            timeout_secs,
        )?))
    }

    /// Local Codex CLI executable.
    pub fn codex(cli_path: &str, timeout_secs: u64) -> Self {
        Self::Codex(CodexCliService::new(cli_path, timeout_secs))
    }

    /// Which backend this client talks to.
    pub fn provider(&self) -> LlmProvider {
        match self {
            Self::Ollama(_) => LlmProvider::Ollama,
            Self::OpenAi(_) => LlmProvider::OpenAi,
            Self::Codex(_) => LlmProvider::Codex,
        }
    }

    /// Streams one completion and returns the accumulated full text.
    /// The Codex CLI picks its own model, so `model` is ignored there.
    pub async fn query_stream(&self, model: &str, prompt: &str) -> Result<String> {
        match self {
            Self::Ollama(s) => s.query_stream(model, prompt).await,
            Self::OpenAi(s) => s.query_stream(model, prompt).await,
            Self::Codex(s) => s.query_stream(prompt).await,
        }
    }

    /// Startup probe: can this backend serve `model` right now?
    pub async fn check_availability(&self, model: &str) -> bool {
        match self {
            Self::Ollama(s) => s.check_availability(model).await,
            Self::OpenAi(s) => s.check_availability(model).await,
            Self::Codex(s) => s.check_availability().await,
        }
    }
}
