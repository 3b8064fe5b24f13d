use anyhow::{Context, Result};
use terv_core::manager::VersionManager;

/// Resolve and print the version that a proxy call would run.
pub async fn detect(manager: &VersionManager) -> Result<()> {
    let version = manager
        .detect()
        .await
        .context("failed to detect a version")?;
    println!(
        "{} {version} will be run from this directory",
        manager.tool().exec_name()
    );
    Ok(())
}
