mod cli;
mod commands;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Args;
use meemo_core::Session;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they never interleave with the candidate listing
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("meemo_cli=warn,meemo_core=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let config = args.session_config();
    info!("Starting session with {:?}", config);

    let mut session = Session::start(args.pid, &config)
        .with_context(|| format!("Failed to start a session for PID {}", args.pid))?;

    let max_entries = args
        .max_entries
        .unwrap_or_else(commands::repl::terminal_entries);

    let result = commands::repl::run(
        &mut session,
        io::stdin().lock(),
        &mut io::stdout().lock(),
        max_entries,
    );
    session.teardown();
    result
}
