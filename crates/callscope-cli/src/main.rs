//! Callscope CLI
//!
//! Explain a symbol in a Python repository by following its calls.

use anyhow::Result;
use callscope_core::error::exit_codes;
use callscope_core::{CallscopeError, Config};
use clap::Parser;

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Explain(args) => commands::explain::run(args, config, cli.format).await,
        Commands::Index(args) => commands::index::run(args, &config, cli.format),
        Commands::Resolve(args) => commands::resolve::run(args, &config, cli.format),
        Commands::Usages(args) => commands::usages::run(args, &config, cli.format),
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CallscopeError>())
        .map_or(exit_codes::GENERAL_ERROR, CallscopeError::exit_code)
}
