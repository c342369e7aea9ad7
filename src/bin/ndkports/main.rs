//! ndkports CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands, GlobalOpts};
use ndkports::util::diagnostic::emit_error;

fn main() {
    if let Err(e) = run() {
        emit_error(&e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("ndkports=debug")
    } else if cli.quiet {
        EnvFilter::new("ndkports=warn")
    } else {
        EnvFilter::new("ndkports=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let opts = GlobalOpts::from(&cli);
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, &opts),
        Commands::Fetch => commands::fetch::execute(&opts),
        Commands::Resolve => commands::resolve::execute(&opts),
        Commands::Package(args) => commands::package::execute(args, &opts),
        Commands::Inspect(args) => commands::inspect::execute(args),
        Commands::Clean => commands::clean::execute(&opts),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
