//! crxpack - CRX3 packer CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crxpack_cli::cmd;
use crxpack_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Pack { dir, output, key } => cmd::pack::pack(&dir, output, key).await,
        Commands::Id { key } => cmd::id::id(&key),
        Commands::Verify { package } => cmd::verify::verify(&package),
    }
}
