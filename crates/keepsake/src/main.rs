//! Keepsake - session record inspection CLI
//!
//! Main entry point for the keepsake CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use console::style;
use keepsake_config::KeepsakeConfig;
use keepsake_session::SessionStore;
use tracing::warn;

mod commands;

use commands::{destroy, exists, set, show};

/// Redis URL used when neither the config nor the command line names one.
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Keepsake - inspect and edit session records in a live backend
#[derive(Parser)]
#[command(name = "keepsake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file to use instead of the discovered ones
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Redis URL (default: redis://127.0.0.1:6379/0)
    #[arg(long, global = true, env = "KEEPSAKE_REDIS_URL")]
    pub redis_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a session record
    Show(show::ShowArgs),

    /// Check whether a session record exists
    Exists(exists::ExistsArgs),

    /// Set a key in a session record
    Set(set::SetArgs),

    /// Remove a key from a session record
    Unset(set::UnsetArgs),

    /// Delete a session record
    Destroy(destroy::DestroyArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, warnings) = match &cli.config {
        Some(path) => (keepsake_config::load_config_file(path)?, Vec::new()),
        None => {
            let loaded = keepsake_config::load_config(None)?;
            (loaded.config, loaded.warnings)
        }
    };

    init_tracing(cli.verbose, &config);
    for warning in warnings {
        warn!("{warning}");
    }

    let mut store_config = config.store_config();
    if let Some(url) = cli.redis_url {
        store_config = store_config.with_redis_url(url);
    } else if store_config.redis_url.is_none() {
        store_config = store_config.with_redis_url(DEFAULT_REDIS_URL);
    }

    let store = SessionStore::builder(store_config)
        .on_backend_down(|err, _ctx, id| {
            let id = id.unwrap_or("-");
            eprintln!("{} {err} (session {id})", style("backend down:").yellow().bold());
        })
        .on_decode_error(|err, id| {
            eprintln!("{} {err} (session {id})", style("discarded record:").yellow().bold());
        })
        .build()
        .context("failed to set up the session store")?;

    let ctx = commands::Context {
        store,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Show(args) => show::run(args, &ctx),
        Commands::Exists(args) => exists::run(args, &ctx),
        Commands::Set(args) => set::run(args, &ctx),
        Commands::Unset(args) => set::run_unset(args, &ctx),
        Commands::Destroy(args) => destroy::run(args, &ctx),
    }
}

/// Log to stderr. `RUST_LOG` wins, then `--verbose`, then `[logging] filter`.
///
/// Store fallbacks are reported by the hooks, so the library's own warnings
/// stay hidden unless asked for.
fn init_tracing(verbose: bool, config: &KeepsakeConfig) {
    use tracing_subscriber::EnvFilter;

    let fallback = if verbose {
        "keepsake=debug,keepsake_session=debug,keepsake_config=debug,info"
    } else {
        config.log_filter().unwrap_or("keepsake=info,keepsake_session=error,warn")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}
