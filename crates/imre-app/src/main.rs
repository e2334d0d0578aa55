//! IMRE application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Initialize tracing
//! 3. Wire the conversation orchestrator to the in-process collaborators
//! 4. Serve the HTTP API, or run a line-based REPL with `--repl`

mod cli;

use std::sync::Arc;

use clap::Parser;
use imre_api::state::AppState;
use imre_chat::{Collaborators, ConversationOrchestrator};
use imre_core::services::local::{LocalKnowledgeBase, LocalPatientRecords, LocalReportService};
use imre_core::ImreConfig;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::cli::CliArgs;

/// Read one message per stdin line and print each reply.
async fn run_repl(orchestrator: &ConversationOrchestrator, user_id: &str) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    stdout
        .write_all(b"IMRE pronto. Digite sua mensagem (Ctrl+D para sair).\n")
        .await?;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let output = match orchestrator.handle(user_id, &line).await {
            Ok(reply) => format!("{}\n[{} | {:.2}]\n", reply.content, reply.reply_type, reply.confidence),
            Err(e) => format!("erro: {}\n", e),
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ImreConfig::load_or_default(&config_file);
    config.api.port = args.resolve_port(config.api.port);

    // Tracing: RUST_LOG wins over flag and config.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    tracing::info!("Starting IMRE v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    // Collaborators.
    let orchestrator = Arc::new(ConversationOrchestrator::new(
        config.clone(),
        Collaborators {
            knowledge: Arc::new(LocalKnowledgeBase::with_defaults()),
            reports: Arc::new(LocalReportService::new()),
            records: Some(Arc::new(LocalPatientRecords::new())),
            assistant: None,
        },
    ));

    if args.repl {
        run_repl(&orchestrator, &args.user).await?;
    } else {
        let state = AppState::new(config.clone(), Arc::clone(&orchestrator));
        if let Err(e) = imre_api::start_server(&config, state, shutdown_signal()).await {
            tracing::error!(
                addr = %format!("{}:{}", config.api.host, config.api.port),
                error = %e,
                "API server failed"
            );
            return Err(e.into());
        }
    }

    // The server has released its state by now; stop the worker cleanly.
    match Arc::try_unwrap(orchestrator) {
        Ok(orchestrator) => orchestrator.shutdown().await,
        Err(shared) => shared.flush().await,
    }
    tracing::info!("IMRE stopped");
    Ok(())
}
