//! Mimizuku CLI main entry point

use anyhow::Result;
use clap::Parser;
use mimizuku_cli::commands::{Cli, CommandExecutor};

fn main() -> Result<()> {
    // Logs go to stderr so command output stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let executor = CommandExecutor::from_cli(&cli)?;
    let result = executor.execute(cli.command)?;

    println!("{}", result.output);
    tracing::info!(success = result.success, "{}", result.message);

    // Exit with appropriate code
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
