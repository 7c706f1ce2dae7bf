// site-content - content resolution and migration tooling
// Entry point and command dispatch

use anyhow::Context;
use clap::{Parser, Subcommand};
use site_content::app::AppState;
use site_content::{commands, config};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "site-content")]
#[command(about = "Content resolution and legacy settings migration for multi-site deployments")]
#[command(version)]
struct Args {
    /// SQLite database file
    #[arg(long, env = config::DATABASE_ENV_VAR, default_value = config::DEFAULT_DATABASE_FILE)]
    database: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Move legacy settings blocks into component records
    Migrate {
        /// Migrate only this site (all sites when omitted)
        #[arg(long)]
        site_id: Option<String>,

        /// Overwrite destinations that already hold data
        #[arg(long)]
        force: bool,
    },

    /// Print what a site renders for a block and where it came from
    Resolve {
        #[arg(long)]
        site_id: String,

        /// Block name, e.g. heroSlides
        block: String,
    },

    /// Replace a block's items with a JSON payload
    Save {
        #[arg(long)]
        site_id: String,

        /// Page the block is placed on (homepage when omitted)
        #[arg(long)]
        page: Option<String>,

        /// Recorded as the author of component writes
        #[arg(long)]
        actor: Option<String>,

        block: String,

        /// JSON file holding a list, an object or null; `-` reads stdin
        payload: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "site_content=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    tracing::info!("Opening database {:?}", args.database);
    let state = AppState::open(&args.database)
        .await
        .with_context(|| format!("failed to open database {}", args.database.display()))?;

    let code = match args.command {
        Command::Migrate { site_id, force } => {
            let summary = commands::migrate(&state, site_id.as_deref(), force).await?;
            println!("{}", summary);
            if summary.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Resolve { site_id, block } => {
            let resolved = commands::resolve_block(&state, &site_id, &block).await?;
            println!("{}", serde_json::to_string_pretty(&resolved.payload)?);
            println!("source: {}", resolved.source);
            ExitCode::SUCCESS
        }
        Command::Save {
            site_id,
            page,
            actor,
            block,
            payload,
        } => {
            let text = read_payload(&payload)?;
            let payload = serde_json::from_str(&text).context("payload is not valid JSON")?;
            let outcome =
                commands::save_block(&state, &site_id, &block, page, actor, payload).await?;
            println!(
                "Saved {} items to {:?}, removed {}",
                outcome.saved_ids.len(),
                outcome.target,
                outcome.removed_ids.len()
            );
            ExitCode::SUCCESS
        }
    };

    state.pool.close().await;
    Ok(code)
}

fn read_payload(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("failed to read stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
