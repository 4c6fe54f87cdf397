use anyhow::Result;
use clap::Parser;

use e2e_runner::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Command::Run(args) => e2e_runner::run(args).await?,
        Command::Repair(args) => e2e_runner::repair(args)?,
    };

    std::process::exit(code);
}
