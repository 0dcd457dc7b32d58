//! Codex CLI backend.
//!
//! Spawns the local executable in non-interactive mode (`exec -`), writes
//! the prompt on stdin, and reads stdout as it arrives until the process
//! exits or the wall-clock deadline hits. The deadline drops the child
//! future, which kills the process (`kill_on_drop`).
//!
//! Availability is a `--version` probe with a short timeout.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, error, warn};

use crate::error_handler::{LlmError, Result};

const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Local CLI backend. The CLI chooses its own model; the `model` argument
/// of the client facade is ignored here.
pub struct CodexCliService {
    cli_path: String,
    timeout: Duration,
}

impl CodexCliService {
    pub fn new(cli_path: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            cli_path: cli_path.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Runs one prompt through the CLI and returns the trimmed stdout.
    ///
    /// # Errors
    /// - [`LlmError::Unavailable`] if the executable cannot be found
    /// - [`LlmError::Timeout`] when the deadline expires (the child is killed)
    /// - [`LlmError::EmptyResponse`] if the CLI exited cleanly with no output
    /// - [`LlmError::Process`] for non-zero exits and pipe failures
    pub async fn query_stream(&self, prompt: &str) -> Result<String> {
        debug!(
            "spawning {} exec - (timeout: {}s)",
            self.cli_path,
            self.timeout.as_secs()
        );

        let mut child = Command::new(&self.cli_path)
            .arg("exec")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.map_spawn_error(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| LlmError::Process("child stdin unavailable".into()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| LlmError::Process("child stdout unavailable".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| LlmError::Process("child stderr unavailable".into()))?;

        // Feed the prompt from a separate task so a full stdout pipe can
        // never deadlock against an unfinished stdin write.
        let prompt_bytes = prompt.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&prompt_bytes).await {
                warn!("failed to write prompt to CLI stdin: {e}");
            }
            // stdin drops here, closing the pipe so the CLI starts answering
        });

        let cli_path = self.cli_path.clone();
        let run = async move {
            let mut out = String::new();
            let mut buf = [0u8; 8192];
            loop {
                let n = stdout
                    .read(&mut buf)
                    .await
                    .map_err(|e| LlmError::Process(format!("stdout read failed: {e}")))?;
                if n == 0 {
                    break;
                }
                out.push_str(&String::from_utf8_lossy(&buf[..n]));
            }

            let mut err_text = String::new();
            let _ = stderr.read_to_string(&mut err_text).await;

            let status = child
                .wait()
                .await
                .map_err(|e| LlmError::Process(format!("wait failed: {e}")))?;

            if !status.success() {
                let message = if err_text.trim().is_empty() {
                    format!("process exited with status {status}")
                } else {
                    err_text.trim().to_string()
                };
                return Err(LlmError::from_process_failure(&cli_path, &message));
            }

            let out = out.trim();
            if out.is_empty() {
                return Err(LlmError::EmptyResponse);
            }
            Ok(out.to_string())
        };

        // On timeout the `run` future is dropped, and with it the child
        // handle: kill_on_drop terminates the process.
        let result = match tokio::time::timeout(self.timeout, run).await {
            Ok(res) => res,
            Err(_) => Err(LlmError::Timeout(self.timeout)),
        };
        writer.abort();
        result
    }

    /// `--version` probe with a 5-second deadline.
    pub async fn check_availability(&self) -> bool {
        debug!("probing {} --version", self.cli_path);

        let child = Command::new(&self.cli_path)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(c) => c,
            Err(e) => {
                error!("Codex CLI not runnable at \"{}\": {e}", self.cli_path);
                return false;
            }
        };

        match tokio::time::timeout(VERSION_PROBE_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                error!("Codex CLI probe failed: {e}");
                false
            }
            Err(_) => {
                warn!("Codex CLI --version probe timed out");
                let _ = child.start_kill();
                false
            }
        }
    }

    fn map_spawn_error(&self, e: std::io::Error) -> LlmError {
        if e.kind() == std::io::ErrorKind::NotFound {
            LlmError::Unavailable(format!(
                "executable not found: {}. Check the path or PATH.",
                self.cli_path
            ))
        } else {
            LlmError::Process(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let svc = CodexCliService::new("/definitely/not/a/binary", 5);
        let err = svc.query_stream("hello").await.unwrap_err();
        assert!(matches!(err, LlmError::Unavailable(_)));
        assert!(!svc.check_availability().await);
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        // `sleep` ignores stdin and outlives the 1-second deadline.
        let svc = CodexCliService::new("sleep", 1);
        let started = std::time::Instant::now();
        let err = svc.query_stream("10").await.unwrap_err();
        // `sleep exec - 10` exits non-zero immediately on most systems, so
        // accept either a process failure or a timeout, but never a hang.
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(
            err,
            LlmError::Timeout(_) | LlmError::Process(_) | LlmError::EmptyResponse
        ));
    }
}
