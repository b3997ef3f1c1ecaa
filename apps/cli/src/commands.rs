//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use frontdesk_engine::Engine;
use frontdesk_server::{ServeConfig, Server};
use frontdesk_shared::{AppConfig, init_config, load_config};
use frontdesk_storage::Storage;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Frontdesk — answer from the knowledge base, escalate the rest.
#[derive(Parser)]
#[command(
    name = "frontdesk",
    version,
    about = "Support-escalation agent: knowledge-base answers, supervisor escalation, timeout sweeps.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the catch-up sweep, then accept customer sessions until interrupted.
    Serve {
        /// Listen address (overrides config).
        #[arg(long)]
        listen: Option<String>,

        /// Database path (overrides config).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Run one timeout sweep and exit.
    Sweep {
        /// Database path (overrides config).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Run one question through the agent without a transport.
    Ask {
        /// The question text.
        question: String,

        /// Customer identity (defaults to the configured fallback).
        #[arg(long)]
        customer_id: Option<String>,

        /// Database path (overrides config).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Knowledge base curation.
    Kb {
        /// Knowledge subcommand.
        #[command(subcommand)]
        action: KbAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Knowledge curation subcommands.
#[derive(Subcommand)]
pub(crate) enum KbAction {
    /// Add a question/answer pair.
    Add {
        /// The customer question, matched verbatim on lookup.
        query: String,

        /// The answer to send back.
        answer: String,

        /// Database path (overrides config).
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// List all knowledge entries in insertion order.
    List {
        /// Database path (overrides config).
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "frontdesk=info",
        1 => "frontdesk=debug",
        _ => "frontdesk=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve { listen, db } => cmd_serve(listen, db.as_deref()).await,
        Command::Sweep { db } => cmd_sweep(db.as_deref()).await,
        Command::Ask {
            question,
            customer_id,
            db,
        } => cmd_ask(&question, customer_id.as_deref(), db.as_deref()).await,
        Command::Kb { action } => match action {
            KbAction::Add { query, answer, db } => cmd_kb_add(&query, &answer, db.as_deref()).await,
            KbAction::List { db } => cmd_kb_list(db.as_deref()).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Open the store read-write. An unreachable or misconfigured store is fatal
/// here: commands must not proceed without persistence.
async fn open_storage(config: &AppConfig, db_override: Option<&Path>) -> Result<Arc<Storage>> {
    let path = match db_override {
        Some(p) => p.to_path_buf(),
        None => config.store.resolved_db_path()?,
    };
    info!(path = %path.display(), "opening store");
    Ok(Arc::new(Storage::open(&path).await?))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_serve(listen: Option<String>, db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;

    let serve_config = ServeConfig {
        listen: listen.unwrap_or_else(|| config.server.listen.clone()),
        timeout: config.agent.timeout(),
        default_customer_id: config.agent.default_customer_id.clone(),
        sweep_interval: config.server.sweep_interval(),
    };

    let server = Server::bind(serve_config, storage).await?;
    println!(
        "Frontdesk agent listening on {} (ctrl-c to stop)",
        server.local_addr()?
    );
    server.run().await?;
    Ok(())
}

async fn cmd_sweep(db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let engine = Engine::new(storage);

    let count = engine
        .sweep_timeouts(Utc::now(), config.agent.timeout())
        .await?;
    println!("Marked {count} request(s) unresolved_timeout.");
    Ok(())
}

async fn cmd_ask(question: &str, customer_id: Option<&str>, db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let engine = Engine::new(storage);

    let customer_id = customer_id.unwrap_or(&config.agent.default_customer_id);
    let reply = engine.answer_or_escalate(question, customer_id).await?;
    println!("{}", reply.text());
    Ok(())
}

async fn cmd_kb_add(query: &str, answer: &str, db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;

    storage.insert_knowledge(query, answer).await?;
    println!("Added knowledge entry for: {query}");
    Ok(())
}

async fn cmd_kb_list(db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;

    let entries = storage.list_knowledge().await?;
    if entries.is_empty() {
        println!("No knowledge entries.");
        return Ok(());
    }
    for entry in entries {
        println!("  {}  ->  {}", entry.query, entry.answer);
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Created {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
