//! # Todo CLI (`todo`)
//!
//! The `todo` binary manages tasks from the command line and starts the
//! HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! todo --config ./config/todo.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `todo init` | Create the SQLite database and run schema migrations |
//! | `todo serve` | Start the HTTP server |
//! | `todo add "<description>"` | Create a task |
//! | `todo list` | List tasks in id order |
//! | `todo get <id>` | Show one task |
//! | `todo update <id>` | Change description, status, or category |
//! | `todo complete <id>` / `todo reopen <id>` | Toggle completion |
//! | `todo delete <id>` | Delete a task |
//! | `todo categorize "<text>"` | Show the keyword category for some text |
//! | `todo summary` | Summarize the task list |
//! | `todo chat "<question>"` | Ask the assistant about the task list |
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG` (default
//! `info`) to adjust. Command output goes to stdout.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use todo_agent::models::{Category, TaskUpdate};
use todo_agent::state::AppState;
use todo_agent::{cli, config, migrate, server};

const DEFAULT_CONFIG_PATH: &str = "./config/todo.toml";

/// Todo Agent CLI: a todo list with AI summaries and chat.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the flag is omitted and `./config/todo.toml` does not exist,
/// built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "todo",
    about = "Todo Agent: a todo list with AI summaries and chat",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep tasks in memory instead of SQLite (nothing is persisted).
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Create a task. Its category is assigned automatically.
    Add {
        description: String,

        /// Create the task already completed.
        #[arg(long)]
        completed: bool,
    },

    /// List tasks in id order.
    List {
        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Page size (at most 100).
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// Show one task.
    Get { id: i64 },

    /// Update fields of a task. Omitted fields are left unchanged.
    Update {
        id: i64,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        completed: Option<bool>,

        /// One of Urgent, Work, Personal, Uncategorized.
        #[arg(long)]
        category: Option<Category>,
    },

    /// Mark a task done.
    Complete { id: i64 },

    /// Mark a task pending again.
    Reopen { id: i64 },

    /// Delete a task.
    Delete { id: i64 },

    /// Print the keyword category for a description without storing it.
    Categorize { text: String },

    /// Summarize the task list in two sentences.
    Summary,

    /// Ask the assistant a question about the task list.
    Chat {
        query: String,

        /// Text whose most similar tasks are added to the prompt.
        #[arg(long, default_value = "")]
        selected_text: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config_path(flag: Option<&Path>) -> Option<PathBuf> {
    match flag {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing();

    // Commands that don't require config
    if let Commands::Categorize { text } = &args.command {
        cli::run_categorize(text);
        return Ok(());
    }

    let config_path = resolve_config_path(args.config.as_deref());
    let cfg = config::load_config(config_path.as_deref())?;

    if let Commands::Init = args.command {
        migrate::run_migrations(&cfg).await?;
        println!("Database initialized successfully.");
        return Ok(());
    }

    let state = AppState::from_config(&cfg, args.memory).await?;

    match args.command {
        Commands::Init | Commands::Categorize { .. } => {
            // Handled above
        }
        Commands::Serve => {
            server::run_server(&cfg, state).await?;
        }
        Commands::Add {
            description,
            completed,
        } => {
            cli::run_add(&state, &description, completed).await?;
        }
        Commands::List { skip, limit } => {
            cli::run_list(&state, skip, limit).await?;
        }
        Commands::Get { id } => {
            cli::run_get(&state, id).await?;
        }
        Commands::Update {
            id,
            description,
            completed,
            category,
        } => {
            let update = TaskUpdate {
                description,
                completed,
                category,
            };
            cli::run_update(&state, id, update).await?;
        }
        Commands::Complete { id } => {
            cli::run_set_completed(&state, id, true).await?;
        }
        Commands::Reopen { id } => {
            cli::run_set_completed(&state, id, false).await?;
        }
        Commands::Delete { id } => {
            cli::run_delete(&state, id).await?;
        }
        Commands::Summary => {
            cli::run_summary(&state).await?;
        }
        Commands::Chat {
            query,
            selected_text,
        } => {
            cli::run_chat(&state, &query, &selected_text).await?;
        }
    }

    Ok(())
}
