use anyhow::{Context, Result};
use terv_core::manager::VersionManager;

/// Remove the root-level pinned version.
pub fn reset(manager: &VersionManager) -> Result<()> {
    manager.reset().context("failed to reset pinned version")
}
