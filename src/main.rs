// src/main.rs
// kit-mcp - approval-gated MCP server for the Kit email marketing API

use anyhow::Result;
use clap::{Parser, Subcommand};
use kit_mcp::approvals::ApprovalQueue;
use kit_mcp::config::Config;
use kit_mcp::drafts::DraftStore;
use kit_mcp::kit::KitClient;
use kit_mcp::mcp::KitServer;
use kit_mcp::policy::PolicyTable;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Parser)]
#[command(name = "kit-mcp")]
#[command(about = "Approval-gated MCP server for the Kit email marketing API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run as MCP server on stdio (default)
    Serve,

    /// Validate configuration and exit
    CheckConfig,
}

fn build_server(config: &Config) -> Result<KitServer> {
    let policy = match &config.policy_file {
        Some(path) => PolicyTable::from_file(path)?,
        None => PolicyTable::default(),
    };
    info!(policy = %policy.summary(), "policy table loaded");

    let client = KitClient::new(&config.api_key, config.api_url.clone())?;
    let drafts = DraftStore::new(config.drafts_dir.clone())?;
    let approvals = ApprovalQueue::new(chrono::Duration::seconds(
        config.approval_max_age_secs as i64,
    ));

    Ok(KitServer::new(
        Arc::new(client),
        Arc::new(policy),
        Arc::new(approvals),
        Arc::new(drafts),
    ))
}

async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    let server = build_server(&config)?;

    // The sweep is the only automatic removal path for stale approvals.
    let approvals = server.approvals.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = approvals.expire();
            if removed > 0 {
                info!(removed, "expired stale approvals");
            }
        }
    });

    info!("kit-mcp serving on stdio");
    let transport = rmcp::transport::io::stdio();
    let service = rmcp::serve_server(server, transport).await?;
    service.waiting().await?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level = match &cli.command {
        Some(Commands::Serve) | None => Level::WARN, // quiet for MCP stdio
        Some(Commands::CheckConfig) => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        None | Some(Commands::Serve) => {
            run_server().await?;
        }
        Some(Commands::CheckConfig) => {
            let config = Config::from_env()?;
            build_server(&config)?;
            println!("Configuration OK.");
            println!("  api_url: {}", config.api_url);
            println!("  drafts_dir: {}", config.drafts_dir.display());
            println!("  approval_max_age: {}s", config.approval_max_age_secs);
        }
    }

    Ok(())
}
