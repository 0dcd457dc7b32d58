//! Unified LLM service for automated MR review.
//!
//! One client facade over three interchangeable backends:
//! - **Ollama** — local model server (`POST /api/generate`, streaming)
//! - **OpenAI-compatible** — hosted chat-completions API (SSE streaming)
//! - **Codex CLI** — local executable fed the prompt on standard input
//!
//! Callers depend only on the capability pair
//! [`LlmClient::query_stream`] / [`LlmClient::check_availability`],
//! dispatched over a closed enum. No async-trait, no heap trait objects.
//!
//! Retry policy deliberately lives with the caller: a failed call here is
//! reported once and becomes a single failed review run.

pub mod client;
pub mod config;
pub mod error_handler;
pub mod services;

pub use client::LlmClient;
pub use config::llm_provider::LlmProvider;
pub use error_handler::{LlmError, Result};
