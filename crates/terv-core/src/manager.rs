//! Version manager: the orchestration layer behind every CLI command.
//!
//! Ties together version resolution, local inventory, remote retrieval,
//! the cross-process install lock, and last-use stamping. One manager
//! instance serves one tool.

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;

use crate::config::{Config, Tool};
use crate::error::{Result, TervError};
use crate::resolver::{self, PredicateInfo};
use crate::retriever::{self, Retriever};
use crate::version::sort_versions;
use crate::{lastuse, lock, versionfile};

pub struct VersionManager {
    conf: Arc<Config>,
    client: Client,
    tool: Tool,
    retriever: Box<dyn Retriever>,
}

impl VersionManager {
    pub fn new(conf: Arc<Config>, tool: Tool) -> Self {
        Self {
            conf,
            client: Client::new(),
            tool,
            retriever: retriever::for_tool(tool),
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn config(&self) -> &Config {
        &self.conf
    }

    /// The version request pinning this tool, from the environment and
    /// version files, or `default_requested` when nothing pins one.
    pub fn resolve(&self, default_requested: &str) -> Result<String> {
        Ok(versionfile::resolve_version(&self.conf, self.tool)?
            .unwrap_or_else(|| default_requested.to_string()))
    }

    /// Resolve the version to run, installing it if allowed and needed.
    pub async fn detect(&self) -> Result<String> {
        let requested = self.resolve(resolver::LATEST_ALLOWED)?;
        self.evaluate(&requested).await
    }

    /// Install the version matching `requested`, regardless of the
    /// auto-install setting. Returns the installed version.
    pub async fn install(&self, requested: &str) -> Result<String> {
        if crate::version::is_version(requested) {
            let version = cleaned(requested)?;
            self.install_specific(&version).await?;
            return Ok(version);
        }

        let info = resolver::parse_predicate(&self.conf, self.tool, requested)?;
        self.flush_diagnostics(&info);
        self.search_install_remote(&info, false).await
    }

    /// Turn a version request into a concrete installed version.
    pub async fn evaluate(&self, requested: &str) -> Result<String> {
        if crate::version::is_version(requested) {
            let version = cleaned(requested)?;
            if !self.conf.no_install {
                self.install_specific(&version).await?;
            }
            return Ok(version);
        }

        let info = resolver::parse_predicate(&self.conf, self.tool, requested)?;
        self.flush_diagnostics(&info);

        if !self.conf.force_remote {
            for version in self.list_local(info.search_descending)? {
                if (info.predicate)(&version) {
                    lastuse::touch(&self.version_dir(&version)?, self.conf.reporter.as_ref());
                    return Ok(version);
                }
            }
            if self.conf.no_install {
                return Err(TervError::NoCompatibleVersion);
            }
            self.conf
                .reporter
                .display("No compatible version found locally, searching remote...");
        }

        self.search_install_remote(&info, self.conf.no_install)
            .await
    }

    /// Locally installed versions, sorted.
    pub fn list_local(&self, descending: bool) -> Result<Vec<String>> {
        let dir = self.conf.install_path(self.tool)?;
        let mut versions = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                versions.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        sort_versions(&mut versions, descending);
        Ok(versions)
    }

    /// Remotely available versions, sorted.
    pub async fn list_remote(&self, descending: bool) -> Result<Vec<String>> {
        let mut versions = self.retriever.list_versions(&self.conf, &self.client).await?;
        sort_versions(&mut versions, descending);
        Ok(versions)
    }

    /// Resolve `requested` and pin it, either in the working directory's
    /// version file or the root-level one.
    pub async fn use_version(&self, requested: &str, working_dir: bool) -> Result<String> {
        let version = self.evaluate(requested).await?;

        let target = if working_dir {
            self.conf.work_path.join(self.tool.version_file_name())
        } else {
            self.conf.install_path(self.tool)?;
            self.conf.root_version_file(self.tool)
        };
        self.conf
            .reporter
            .display(&format!("Writing {version} to {}", target.display()));
        std::fs::write(target, &version)?;
        Ok(version)
    }

    /// Remove installed versions: an exact version, `all`, or every local
    /// version matching a constraint. Returns the removed versions.
    pub async fn uninstall(&self, requested: &str) -> Result<Vec<String>> {
        if crate::version::is_version(requested) {
            let version = cleaned(requested)?;
            self.remove_version(&version)?;
            return Ok(vec![version]);
        }

        let locals = self.list_local(true)?;
        let selected: Vec<String> = if requested == "all" {
            locals
        } else {
            let info = resolver::parse_predicate(&self.conf, self.tool, requested)?;
            self.flush_diagnostics(&info);
            locals
                .into_iter()
                .filter(|v| (info.predicate)(v))
                .collect()
        };

        for version in &selected {
            self.remove_version(version)?;
        }
        Ok(selected)
    }

    /// Remove the root-level pinned version file.
    pub fn reset(&self) -> Result<()> {
        let path = self.conf.root_version_file(self.tool);
        self.conf
            .reporter
            .display(&format!("Removing {}", path.display()));
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Path of the installed binary for `version`.
    pub fn binary_path(&self, version: &str) -> Result<PathBuf> {
        Ok(self
            .version_dir(version)?
            .join(self.conf.binary_name(self.tool)))
    }

    pub fn version_dir(&self, version: &str) -> Result<PathBuf> {
        Ok(self.conf.install_path(self.tool)?.join(version))
    }

    async fn search_install_remote(
        &self,
        info: &PredicateInfo,
        no_install: bool,
    ) -> Result<String> {
        let versions = self.list_remote(info.search_descending).await?;
        for version in versions {
            if (info.predicate)(&version) {
                if !no_install {
                    self.install_specific(&version).await?;
                }
                return Ok(version);
            }
        }
        Err(TervError::NoCompatibleVersion)
    }

    /// Download and unpack `version` under the install lock. Already
    /// installed versions are a no-op; a failed install leaves no partial
    /// version directory behind.
    async fn install_specific(&self, version: &str) -> Result<()> {
        let install_path = self.conf.install_path(self.tool)?;
        let _guard = lock::acquire(&install_path, self.conf.reporter.as_ref()).await?;

        let target_dir = install_path.join(version);
        if target_dir.is_dir() {
            self.conf.reporter.debug(&format!(
                "{} {version} already installed",
                self.tool.folder_name()
            ));
            lastuse::touch(&target_dir, self.conf.reporter.as_ref());
            return Ok(());
        }

        self.conf.reporter.display(&format!(
            "Installing {} {version}",
            self.tool.folder_name()
        ));
        if let Err(err) = self
            .retriever
            .install(&self.conf, &self.client, version, &target_dir)
            .await
        {
            let _ = std::fs::remove_dir_all(&target_dir);
            return Err(err);
        }
        lastuse::touch(&target_dir, self.conf.reporter.as_ref());
        Ok(())
    }

    fn remove_version(&self, version: &str) -> Result<()> {
        let dir = self.version_dir(version)?;
        self.conf.reporter.display(&format!(
            "Uninstalling {} {version} (removing {})",
            self.tool.folder_name(),
            dir.display()
        ));
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn flush_diagnostics(&self, info: &PredicateInfo) {
        for note in &info.diagnostics {
            self.conf.reporter.display(note);
        }
    }
}

/// Canonical form of an exact version request.
fn cleaned(requested: &str) -> Result<String> {
    match crate::version::ParsedVersion::parse(requested) {
        crate::version::ParsedVersion::Ordered(v) => Ok(v.to_string()),
        crate::version::ParsedVersion::Unordered => Err(TervError::resolution(format!(
            "unparsable version {requested:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn manager(root: &std::path::Path) -> VersionManager {
        VersionManager::new(Arc::new(Config::for_root(root)), Tool::Tofu)
    }

    fn fake_install(root: &std::path::Path, version: &str) {
        let dir = root.join("OpenTofu").join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("tofu"), b"bin").unwrap();
    }

    #[test]
    fn list_local_sorts_by_version() {
        let tmp = tempfile::tempdir().unwrap();
        for v in ["1.6.0", "1.10.0", "1.6.0-rc1"] {
            fake_install(tmp.path(), v);
        }
        let m = manager(tmp.path());
        assert_eq!(
            m.list_local(true).unwrap(),
            ["1.10.0", "1.6.0", "1.6.0-rc1"]
        );
        assert_eq!(
            m.list_local(false).unwrap(),
            ["1.6.0-rc1", "1.6.0", "1.10.0"]
        );
    }

    #[tokio::test]
    async fn evaluate_prefers_local_match() {
        let tmp = tempfile::tempdir().unwrap();
        fake_install(tmp.path(), "1.6.0");
        fake_install(tmp.path(), "1.6.2");
        let m = manager(tmp.path());
        // no network: the local inventory satisfies the constraint
        assert_eq!(m.evaluate("~> 1.6.0").await.unwrap(), "1.6.2");
    }

    #[tokio::test]
    async fn evaluate_exact_version_without_install_skips_network() {
        let tmp = tempfile::tempdir().unwrap();
        let mut conf = Config::for_root(tmp.path());
        conf.no_install = true;
        let m = VersionManager::new(Arc::new(conf), Tool::Tofu);
        assert_eq!(m.evaluate("v1.6.0").await.unwrap(), "1.6.0");
    }

    #[tokio::test]
    async fn no_install_without_local_match_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut conf = Config::for_root(tmp.path());
        conf.no_install = true;
        let m = VersionManager::new(Arc::new(conf), Tool::Tofu);
        assert!(matches!(
            m.evaluate("latest").await,
            Err(TervError::NoCompatibleVersion)
        ));
    }

    #[tokio::test]
    async fn use_version_writes_pin_files() {
        let tmp = tempfile::tempdir().unwrap();
        fake_install(tmp.path(), "1.6.2");
        let m = manager(tmp.path());

        let version = m.use_version("1.6.2", true).await.unwrap();
        assert_eq!(version, "1.6.2");
        assert_eq!(
            fs::read_to_string(tmp.path().join(".opentofu-version")).unwrap(),
            "1.6.2"
        );

        m.use_version("1.6.2", false).await.unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join("OpenTofu").join("version")).unwrap(),
            "1.6.2"
        );
    }

    #[tokio::test]
    async fn uninstall_exact_and_all() {
        let tmp = tempfile::tempdir().unwrap();
        fake_install(tmp.path(), "1.6.0");
        fake_install(tmp.path(), "1.6.2");
        fake_install(tmp.path(), "1.7.0");
        let m = manager(tmp.path());

        assert_eq!(m.uninstall("1.6.0").await.unwrap(), ["1.6.0"]);
        assert!(!tmp.path().join("OpenTofu").join("1.6.0").exists());

        let removed = m.uninstall("all").await.unwrap();
        assert_eq!(removed.len(), 2);
        assert!(m.list_local(true).unwrap().is_empty());
    }

    #[tokio::test]
    async fn uninstall_by_constraint() {
        let tmp = tempfile::tempdir().unwrap();
        fake_install(tmp.path(), "1.6.0");
        fake_install(tmp.path(), "1.7.0");
        let m = manager(tmp.path());

        let removed = m.uninstall("< 1.7.0").await.unwrap();
        assert_eq!(removed, ["1.6.0"]);
        assert_eq!(m.list_local(true).unwrap(), ["1.7.0"]);
    }

    #[tokio::test]
    async fn reset_removes_pin() {
        let tmp = tempfile::tempdir().unwrap();
        fake_install(tmp.path(), "1.6.2");
        let m = manager(tmp.path());
        m.use_version("1.6.2", false).await.unwrap();
        m.reset().unwrap();
        assert!(!tmp.path().join("OpenTofu").join("version").exists());
        // resetting twice is fine
        m.reset().unwrap();
    }

    #[tokio::test]
    async fn evaluate_stamps_last_use() {
        let tmp = tempfile::tempdir().unwrap();
        fake_install(tmp.path(), "1.6.2");
        let m = manager(tmp.path());
        m.evaluate("1.6.2").await.unwrap();
        assert!(
            lastuse::read(&tmp.path().join("OpenTofu").join("1.6.2")).is_some()
        );
    }
}
