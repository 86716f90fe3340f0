use alexandria::models::ScrollId;
use alexandria::render::RenderOutcome;
use alexandria::{Alexandria, AppError, BatchPolicy, Config};
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "alexandria")]
#[command(about = "Personal knowledge base of LaTeX scrolls", version, long_about = None)]
struct Cli {
    /// Configuration file, layered over the built-in defaults
    #[arg(short, long, env = "ALEXANDRIA_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a single scroll
    Render {
        #[arg(value_name = "SCROLL_ID")]
        id: String,
    },

    /// Render every scroll in the library
    RenderAll {
        /// Log failures and continue instead of aborting
        #[arg(short, long)]
        keep_going: bool,
    },

    /// Index scrolls created or modified since the last update
    Index,

    /// Remove a deleted scroll from the index
    Remove {
        #[arg(value_name = "SCROLL_ID")]
        id: String,
    },

    /// Search the library: +required -excluded ~optional, bare terms are required
    Find {
        #[arg(value_name = "TERM", required = true, allow_hyphen_values = true)]
        terms: Vec<String>,
    },

    /// Show the number of scrolls and the size of the library
    Stats,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "alexandria=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config
        .ensure_directories()
        .context("Failed to prepare library directories")?;

    tracing::debug!("Starting Alexandria v{}", env!("CARGO_PKG_VERSION"));
    let alexandria = Alexandria::new(config);

    match cli.command {
        Commands::Render { id } => {
            let id = ScrollId::from(id);
            match alexandria.render_one(&id).await {
                Ok(RenderOutcome::UpToDate) => println!("{} is up to date", id),
                Ok(RenderOutcome::Rendered(path)) => println!("{}", path.display()),
                Err(AppError::Render(e)) if e.is_missing() => {
                    tracing::warn!(scroll_id = %id, "No such scroll");
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to render scroll {}", id));
                }
            }
        }

        Commands::RenderAll { keep_going } => {
            let policy = keep_going.then_some(BatchPolicy::KeepGoing);
            let summary = alexandria
                .render_all(policy)
                .await
                .context("Failed to render library")?;
            print_json(&summary)?;
        }

        Commands::Index => {
            let report = alexandria
                .update_index()
                .await
                .context("Failed to update index")?;
            print_json(&report)?;
        }

        Commands::Remove { id } => {
            let id = ScrollId::from(id);
            alexandria
                .remove_from_index(&id)
                .await
                .with_context(|| format!("Failed to remove scroll {} from index", id))?;
        }

        Commands::Find { terms } => {
            let query = terms.join(" ");
            let results = alexandria
                .find(&query)
                .await
                .with_context(|| format!("Failed to answer query '{}'", query))?;
            print_json(&results)?;
        }

        Commands::Stats => {
            let stats = alexandria
                .compute_statistics()
                .await
                .context("Failed to compute statistics")?;
            print_json(&stats)?;
        }
    }

    Ok(())
}
