//! # Bug Triage CLI (`triage`)
//!
//! ## Usage
//!
//! ```bash
//! triage --config ./config/triage.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `triage init` | Create the SQLite schema and seed default severity rules |
//! | `triage seed <file>` | Import team members, loads, and rules from JSON |
//! | `triage run <file>` | Triage a handshake request file and print the response |
//! | `triage serve` | Start the HTTP server |
//! | `triage supervisor --scenario <name>` | Post a sample request to a running server |
//!
//! `run` and `supervisor` fall back to built-in defaults (store disabled)
//! when the config file does not exist.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bug_triage::{config, logging, migrate, run, seed, server, supervisor};

/// Bug triage service: classification, priority, assignment, and fix
/// suggestions for batches of bug reports.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/triage.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "triage",
    about = "Bug triage service: classify, prioritize, assign, and suggest fixes",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/triage.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite file, every table, and the default severity rules.
    /// Safe to run repeatedly.
    Init,

    /// Import team members, developer loads, and rules from a JSON file.
    Seed {
        /// Path to the seed file.
        file: PathBuf,
    },

    /// Triage a handshake request file and print the response.
    ///
    /// Exits non-zero when the response status is `failed`.
    Run {
        /// Path to a JSON handshake request.
        file: PathBuf,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Act as the supervisor: post a sample request to a running server.
    Supervisor {
        /// Sample to send: backend, ui, security, or performance.
        #[arg(long, default_value = "backend")]
        scenario: String,

        /// Server base URL. Defaults to `http://<server.bind>`.
        #[arg(long)]
        url: Option<String>,

        /// Request timeout in seconds.
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Also write the response to this file.
        #[arg(long)]
        save_response: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that can run without a config file
    let cfg = match &cli.command {
        Commands::Run { .. } | Commands::Supervisor { .. } => {
            config::load_config_or_minimal(&cli.config)?
        }
        _ => config::load_config(&cli.config)?,
    };
    logging::init(&cfg.logging.level);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Seed { file } => {
            seed::run_seed(&cfg, &file).await?;
        }
        Commands::Run { file } => {
            run::run_file(&cfg, &file).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Supervisor {
            scenario,
            url,
            timeout,
            save_response,
        } => {
            let url = url.unwrap_or_else(|| format!("http://{}", cfg.server.bind));
            supervisor::run_supervisor(&url, &scenario, timeout, save_response.as_deref()).await?;
        }
    }

    Ok(())
}
