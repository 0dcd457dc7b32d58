use std::fmt;
use std::str::FromStr;

/// Represents the backend used for LLM inference.
///
/// Selected once at startup; the rest of the system only sees the
/// capability interface, never the concrete backend.
///
/// Adding more providers (e.g., Anthropic, Mistral API) is a matter of
/// extending this enum and [`crate::client::LlmClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// Local Ollama runtime for on-device inference.
    Ollama,
    /// OpenAI or any API speaking the same chat-completions protocol.
    OpenAi,
    /// Local Codex CLI executable driven over stdin/stdout.
    Codex,
}

impl LlmProvider {
    /// Stable lowercase identifier, used in config and usage records.
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "ollama",
            LlmProvider::OpenAi => "openai",
            LlmProvider::Codex => "codex",
        }
    }

    /// Human-facing name for log lines.
    pub fn display_name(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "Ollama",
            LlmProvider::OpenAi => "OpenAI",
            LlmProvider::Codex => "Codex CLI",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" => Ok(LlmProvider::OpenAi),
            "codex" => Ok(LlmProvider::Codex),
            other => Err(format!("unsupported LLM provider: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_providers_case_insensitively() {
        assert_eq!("ollama".parse::<LlmProvider>(), Ok(LlmProvider::Ollama));
        assert_eq!("OpenAI".parse::<LlmProvider>(), Ok(LlmProvider::OpenAi));
        assert_eq!("CODEX".parse::<LlmProvider>(), Ok(LlmProvider::Codex));
        assert!("mistral".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn identifier_round_trips() {
        for p in [LlmProvider::Ollama, LlmProvider::OpenAi, LlmProvider::Codex] {
            assert_eq!(p.as_str().parse::<LlmProvider>(), Ok(p));
        }
    }
}
