//! terv - version manager for the Terraform-family CLIs

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use terv_cli::{Cli, build_config, dispatch};
use terv_core::manager::VersionManager;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let conf = build_config(&cli)?;
    let (tool, action) = cli.command.split();

    let manager = VersionManager::new(Arc::new(conf), tool);
    dispatch(&manager, action).await
}
