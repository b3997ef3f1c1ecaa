//! Frontdesk CLI — support-escalation agent.
//!
//! Answers customer questions from a curated knowledge base, escalates the
//! rest to a supervisor as tracked help requests, and sweeps requests that
//! outlive their timeout.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
