use anyhow::{Context, Result};
use terv_core::manager::VersionManager;

/// Resolve `requested` and pin the result, in the working directory's
/// version file or the root-level one.
pub async fn use_version(manager: &VersionManager, requested: &str, working_dir: bool) -> Result<()> {
    let version = manager
        .use_version(requested, working_dir)
        .await
        .with_context(|| format!("failed to use {requested:?}"))?;
    println!("Now using {} {version}", manager.tool().exec_name());
    Ok(())
}
