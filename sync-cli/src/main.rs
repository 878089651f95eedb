//! # todo-sync
//!
//! Command-line front end for todo-sync.
//!
//! ## Commands
//!
//! - `init`: Create the local profile
//! - `add` / `list` / `done` / `delete`: Manage tasks
//! - `category`: Manage categories
//! - `host` / `join`: Sync with another device over TCP
//! - `share` / `accept`: Pass a single task around as a link
//! - `export` / `import`: Move a profile through a JSON file
//! - `status`: Show profile and sync status
//!
//! ## Example
//!
//! ```bash
//! # Create a profile
//! todo-sync init --name "Ana"
//!
//! # Add a task
//! todo-sync add "Buy milk" --deadline 2024-06-01
//!
//! # On this device, wait for a peer
//! todo-sync host --listen 192.168.1.20:7878
//!
//! # On the other device, connect and sync
//! todo-sync join 192.168.1.20:7878
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{category, init, share, status, sync, task, transfer};
use config::AppConfig;

/// Peer-to-peer to-do list sync.
#[derive(Parser, Debug)]
#[command(name = "todo-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the profile, blobs and config.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the local profile
    Init {
        /// Your display name
        #[arg(long, short)]
        name: String,
    },

    /// Add a task
    Add {
        /// Task name (up to 30 characters)
        name: String,

        /// Longer description (up to 200 characters)
        #[arg(long, short)]
        description: Option<String>,

        /// Emoji code
        #[arg(long)]
        emoji: Option<String>,

        /// Color as #RRGGBB
        #[arg(long, short)]
        color: Option<String>,

        /// Deadline as YYYY-MM-DD or RFC 3339
        #[arg(long)]
        deadline: Option<String>,

        /// Category name or ID prefix (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
    },

    /// List tasks
    List,

    /// Toggle a task's done flag
    Done {
        /// Task ID or unique prefix
        id: String,
    },

    /// Delete a task
    Delete {
        /// Task ID or unique prefix
        id: String,
    },

    /// Manage categories
    #[command(subcommand)]
    Category(CategoryCommand),

    /// Wait for another device and sync with it
    Host {
        /// Address to listen on (default from config.toml)
        #[arg(long)]
        listen: Option<String>,
    },

    /// Connect to a hosting device and sync with it
    Join {
        /// The sync ID printed by `host`
        peer_id: String,
    },

    /// Print a share link for a task
    Share {
        /// Task ID or unique prefix
        id: String,
    },

    /// Add a task from a share link
    Accept {
        /// The share link (or just its ?task=... query)
        link: String,
    },

    /// Export the profile as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Merge an exported profile into this one
    Import {
        /// File written by `export`
        file: PathBuf,
    },

    /// Show profile and sync status
    Status,
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    /// Add a category
    Add {
        /// Category name (up to 20 characters)
        name: String,

        /// Emoji code
        #[arg(long)]
        emoji: Option<String>,

        /// Color as #RRGGBB
        #[arg(long, short)]
        color: Option<String>,
    },

    /// List categories
    List,

    /// Delete a category
    Delete {
        /// Category name or ID prefix
        category: String,
    },

    /// Toggle a category as favorite
    Favorite {
        /// Category name or ID prefix
        category: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    let config = AppConfig::load(&data_dir).await?;

    match cli.command {
        Commands::Init { name } => init::run(&data_dir, &name).await?,
        Commands::Add {
            name,
            description,
            emoji,
            color,
            deadline,
            categories,
        } => {
            task::add(
                &data_dir,
                task::NewTask {
                    name,
                    description,
                    emoji,
                    color,
                    deadline,
                    categories,
                },
            )
            .await?
        }
        Commands::List => task::list(&data_dir).await?,
        Commands::Done { id } => task::done(&data_dir, &id).await?,
        Commands::Delete { id } => task::delete(&data_dir, &id).await?,
        Commands::Category(command) => match command {
            CategoryCommand::Add { name, emoji, color } => {
                category::add(&data_dir, &name, emoji, color).await?
            }
            CategoryCommand::List => category::list(&data_dir).await?,
            CategoryCommand::Delete { category } => category::delete(&data_dir, &category).await?,
            CategoryCommand::Favorite { category } => {
                category::favorite(&data_dir, &category).await?
            }
        },
        Commands::Host { listen } => sync::host(&data_dir, &config, listen.as_deref()).await?,
        Commands::Join { peer_id } => sync::join(&data_dir, &config, &peer_id).await?,
        Commands::Share { id } => {
            share::share(&data_dir, &config, &id).await?;
        }
        Commands::Accept { link } => share::accept(&data_dir, &link).await?,
        Commands::Export { out } => transfer::export(&data_dir, out.as_deref()).await?,
        Commands::Import { file } => transfer::import(&data_dir, &file).await?,
        Commands::Status => status::run(&data_dir, &config).await?,
    }

    Ok(())
}

/// Log to stderr so command output on stdout stays clean.
fn init_tracing(verbose: bool) {
    let default = if verbose { "todo_sync=debug" } else { "todo_sync=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Get the default data directory for todo-sync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "todo-sync", "todo-sync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
