//! varfilter main executable

pub mod common;
pub mod engine;
pub mod genes;
pub mod ped;
pub mod query;

use clap::{Args, Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Variant filter query engine",
    long_about = "Filter the variants of one case or project by typed criteria"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Query-related commands.
    Query(Query),
}

/// Parsing of "query *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Query {
    /// The sub command to run
    #[command(subcommand)]
    command: QueryCommands,
}

/// Enum supporting the parsing of "query *" sub commands.
#[derive(Debug, Subcommand)]
enum QueryCommands {
    Run(query::RunArgs),
    ResolvePreset(query::ResolvePresetArgs),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Query(query) => match &query.command {
                QueryCommands::Run(args) => {
                    query::run(&cli.common, args)?;
                }
                QueryCommands::ResolvePreset(args) => {
                    query::run_resolve_preset(&cli.common, args)?;
                }
            },
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}
