mod cli;
mod commands;

use clap::Parser;
use tracing::debug;

use prd_studio::api::ApiClient;
use prd_studio::config::Settings;
use prd_studio::keys::KeyStore;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialise tracing on stderr; stdout carries command output
    let default_filter = if cli.verbose { "prd_studio=debug" } else { "prd_studio=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Settings ──────────────────────────────────────────────────────────────
    let mut settings = Settings::from_env();
    if let Some(url) = cli.api_url {
        settings.api_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(path) = cli.key_file {
        settings.key_file = path;
    }
    debug!(api = %settings.api_base_url, key_file = %settings.key_file.display(), "Settings resolved");

    // ── Local-only commands ───────────────────────────────────────────────────
    let store = settings.key_store();
    let command = match cli.command {
        Commands::Keys { command } => return commands::keys::run(&store, command),
        Commands::Estimate { command } => return commands::estimate::run(command).await,
        other => other,
    };

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let keys = store.load()?;
    let client = ApiClient::new(&settings, keys)?;

    match command {
        Commands::Projects { command } => commands::projects::run(&client, command).await,
        Commands::Files { command } => commands::files::run(&client, command).await,
        Commands::Kb { command } => commands::knowledge::run(&client, command).await,
        Commands::Conversations { command } => {
            commands::conversations::run(&client, command).await
        }
        Commands::Chat(args) => commands::chat::run(client, args).await,
        Commands::Export(args) => commands::documents::export(&client, args).await,
        Commands::Prd { command } => commands::documents::prd(&client, command).await,
        Commands::Wireframe(args) => commands::documents::wireframe(&client, args).await,
        Commands::Ai { command } => commands::ai::run(&client, &store, command).await,
        Commands::Keys { .. } | Commands::Estimate { .. } => Ok(()),
    }
}
