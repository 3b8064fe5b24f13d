use anyhow::{Context, Result};
use terv_core::manager::VersionManager;

/// Install the version matching `requested`, even when auto-install is
/// disabled.
pub async fn install(manager: &VersionManager, requested: &str) -> Result<()> {
    let version = manager
        .install(requested)
        .await
        .with_context(|| format!("failed to install {requested:?}"))?;
    println!("Installed {} {version}", manager.tool().exec_name());
    Ok(())
}
