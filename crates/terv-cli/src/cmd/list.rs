use std::collections::HashSet;

use anyhow::{Context, Result};
use terv_core::manager::VersionManager;

/// List installed versions, newest first by default.
pub fn list(manager: &VersionManager, descending: bool) -> Result<()> {
    let versions = manager
        .list_local(descending)
        .context("failed to read installed versions")?;
    if versions.is_empty() {
        println!(
            "No {} version installed, run 'terv {} install' to get one",
            manager.tool().exec_name(),
            manager.tool().exec_name()
        );
        return Ok(());
    }
    for version in versions {
        println!("  {version}");
    }
    Ok(())
}

/// List remote versions, marking the ones already installed.
pub async fn list_remote(manager: &VersionManager, descending: bool) -> Result<()> {
    let installed: HashSet<String> = manager
        .list_local(true)
        .context("failed to read installed versions")?
        .into_iter()
        .collect();
    let versions = manager
        .list_remote(descending)
        .await
        .context("failed to list remote versions")?;
    for version in versions {
        if installed.contains(&version) {
            println!("  {version} (installed)");
        } else {
            println!("  {version}");
        }
    }
    Ok(())
}
