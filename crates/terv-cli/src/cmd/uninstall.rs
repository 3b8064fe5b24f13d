use anyhow::{Context, Result};
use terv_core::manager::VersionManager;

/// Remove installed versions: exact versions, `all`, or a constraint
/// applied to the local inventory.
pub async fn uninstall(manager: &VersionManager, requests: &[String]) -> Result<()> {
    let mut removed_any = false;
    for requested in requests {
        let removed = manager
            .uninstall(requested)
            .await
            .with_context(|| format!("failed to uninstall {requested:?}"))?;
        removed_any |= !removed.is_empty();
    }
    if !removed_any {
        println!("Nothing to uninstall");
    }
    Ok(())
}
