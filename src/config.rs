//! Environment-driven configuration.
//!
//! Every knob has a default except the GitLab token and project id.
//! Loaded once at startup; the rest of the system receives plain values.

use llm_service::LlmProvider;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    #[error("unsupported LLM provider: {0}")]
    UnsupportedProvider(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gitlab_url: String,
    pub gitlab_token: String,
    pub project_id: String,

    pub provider: LlmProvider,
    pub model: String,
    pub ollama_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub codex_cli_path: String,
    pub codex_timeout_seconds: u64,
    pub llm_timeout_seconds: u64,

    pub interval_seconds: u64,
    pub review_label: String,
    pub exclude_target_branches: Vec<String>,
    pub exclude_target_branch_patterns: Vec<String>,

    pub webhook_host: String,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,

    pub system_prompt_path: Option<String>,
    pub usage_log_dir: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = env_or("LLM_PROVIDER", "ollama")
            .parse::<LlmProvider>()
            .map_err(ConfigError::UnsupportedProvider)?;

        Ok(Self {
            gitlab_url: env_or("GITLAB_URL", "https://gitlab.com"),
            gitlab_token: must_env("GITLAB_TOKEN")?,
            project_id: must_env("GITLAB_PROJECT_ID")?,

            provider,
            model: env_or("LLM_MODEL", "ai-review-model"),
            ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_base_url: env_opt("OPENAI_BASE_URL"),
            codex_cli_path: env_or("CODEX_CLI_PATH", "codex"),
            codex_timeout_seconds: env_num("CODEX_TIMEOUT_SECONDS", 600)?,
            llm_timeout_seconds: env_num("LLM_TIMEOUT_SECONDS", 600)?,

            interval_seconds: env_num("CHECK_INTERVAL_SECONDS", 10)?,
            review_label: env_or("AI_REVIEW_LABEL", "ai-review"),
            exclude_target_branches: env_list("EXCLUDE_TARGET_BRANCHES", "develop,prod,stage"),
            exclude_target_branch_patterns: env_list("EXCLUDE_TARGET_BRANCH_PATTERNS", "release"),

            webhook_host: env_or("WEBHOOK_HOST", "0.0.0.0"),
            webhook_port: env_num("WEBHOOK_PORT", 3000)? as u16,
            webhook_secret: env_opt("WEBHOOK_SECRET"),

            system_prompt_path: env_opt("SYSTEM_PROMPT_PATH"),
            usage_log_dir: env_or("USAGE_LOG_DIR", "data/log"),
        })
    }

    /// One-line-per-knob startup summary (secrets excluded).
    pub fn log_summary(&self) {
        info!("GitLab URL: {}", self.gitlab_url);
        info!("GitLab project: {}", self.project_id);
        info!("LLM provider: {} (model: {})", self.provider, self.model);
        info!("check interval: {}s", self.interval_seconds);
        info!("review label: {}", self.review_label);
        info!(
            "excluded target branches: {:?} (patterns: {:?})",
            self.exclude_target_branches, self.exclude_target_branch_patterns
        );
        info!("webhook: {}:{}", self.webhook_host, self.webhook_port);
        if self.webhook_secret.is_none() {
            info!("webhook secret: not configured");
        }
        info!("usage log dir: {}", self.usage_log_dir);
    }
}

/// Fetches a required, non-empty environment variable.
fn must_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_num(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            v.trim().parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            })
        }
        _ => Ok(default),
    }
}

/// Comma-separated list with a comma-separated default.
fn env_list(name: &str, default: &str) -> Vec<String> {
    env_or(name, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
