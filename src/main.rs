use std::sync::Arc;

use colored::Colorize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::AppConfig;
use gitlab_service::GitLabClient;
use llm_service::{LlmClient, LlmProvider};
use review_pipeline::{ProcessingState, ReviewContext, prompt, scheduler};
use usage_ledger::UsageLedger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional in production; a missing file is fine.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("{}", "GitLab MR AI review automation".bold().cyan());

    let cfg = AppConfig::from_env()?;
    cfg.log_summary();

    let llm = build_llm_client(&cfg)?;

    // Availability gate: refuse to start against a backend that cannot
    // serve the configured model.
    if !llm.check_availability(&cfg.model).await {
        error!(
            "{} cannot serve model \"{}\"; exiting",
            llm.provider().display_name(),
            cfg.model
        );
        std::process::exit(1);
    }
    info!(
        "{} ready to serve model \"{}\"",
        llm.provider().display_name(),
        cfg.model
    );

    let system_prompt = cfg
        .system_prompt_path
        .as_deref()
        .and_then(prompt::load_system_prompt);

    let ctx = Arc::new(ReviewContext {
        gitlab: GitLabClient::new(&cfg.gitlab_url, cfg.gitlab_token.clone())?,
        llm,
        ledger: UsageLedger::new(&cfg.usage_log_dir),
        state: ProcessingState::new(),
        project_id: cfg.project_id.clone(),
        review_label: cfg.review_label.clone(),
        model: cfg.model.clone(),
        exclude_target_branches: cfg.exclude_target_branches.clone(),
        exclude_target_branch_patterns: cfg.exclude_target_branch_patterns.clone(),
        system_prompt,
    });

    // Poll loop in the background; the HTTP server owns the foreground and
    // the Ctrl+C shutdown.
    let poll_ctx = ctx.clone();
    let interval = cfg.interval_seconds;
    tokio::spawn(async move {
        scheduler::run(&poll_ctx, interval).await;
    });

    let state = api::AppState {
        webhook_secret: cfg.webhook_secret.clone(),
        ctx,
    };
    let addr = format!("{}:{}", cfg.webhook_host, cfg.webhook_port);
    api::start(&addr, state).await?;

    info!("shutdown complete");
    Ok(())
}

fn build_llm_client(cfg: &AppConfig) -> anyhow::Result<LlmClient> {
    let client = match cfg.provider {
        LlmProvider::Ollama => LlmClient::ollama(&cfg.ollama_url, Some(cfg.llm_timeout_seconds))?,
        LlmProvider::OpenAi => {
            let api_key = cfg.openai_api_key.clone().ok_or_else(|| {
                anyhow::anyhow!("OPENAI_API_KEY is required for the openai provider")
            })?;
            LlmClient::open_ai(
                api_key,
                cfg.openai_base_url.as_deref(),
                Some(cfg.llm_timeout_seconds),
            )?
        }
        LlmProvider::Codex => LlmClient::codex(&cfg.codex_cli_path, cfg.codex_timeout_seconds),
    };
    Ok(client)
}
