//! Configuration surface consumed by the core.
//!
//! Owned by the caller (CLI flags and `TERV_*` environment variables feed
//! it), read-only for the core subsystems. Per-tool remote settings are
//! resolved lazily through [`Config::remote`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Result, TervError};
use crate::reporter::{NullReporter, Reporter};

/// One of the managed infrastructure CLIs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tool {
    Tofu,
    Terraform,
    Terragrunt,
    Terramate,
    Atmos,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::Tofu,
        Tool::Terraform,
        Tool::Terragrunt,
        Tool::Terramate,
        Tool::Atmos,
    ];

    /// Directory name under the install root.
    pub fn folder_name(self) -> &'static str {
        match self {
            Tool::Tofu => "OpenTofu",
            Tool::Terraform => "Terraform",
            Tool::Terragrunt => "Terragrunt",
            Tool::Terramate => "Terramate",
            Tool::Atmos => "Atmos",
        }
    }

    /// Name of the proxied executable (without platform suffix).
    pub fn exec_name(self) -> &'static str {
        match self {
            Tool::Tofu => "tofu",
            Tool::Terraform => "terraform",
            Tool::Terragrunt => "terragrunt",
            Tool::Terramate => "terramate",
            Tool::Atmos => "atmos",
        }
    }

    /// Project-local version file name.
    pub fn version_file_name(self) -> &'static str {
        match self {
            Tool::Tofu => ".opentofu-version",
            Tool::Terraform => ".terraform-version",
            Tool::Terragrunt => ".terragrunt-version",
            Tool::Terramate => ".terramate-version",
            Tool::Atmos => ".atmos-version",
        }
    }

    /// Environment variable prefix for tool-specific settings.
    pub fn env_prefix(self) -> &'static str {
        match self {
            Tool::Tofu => "TERV_TOFU",
            Tool::Terraform => "TERV_TF",
            Tool::Terragrunt => "TERV_TG",
            Tool::Terramate => "TERV_TM",
            Tool::Atmos => "TERV_ATMOS",
        }
    }

    /// Key used by `.tool-versions` (asdf format) files.
    pub fn asdf_name(self) -> &'static str {
        match self {
            Tool::Tofu => "opentofu",
            Tool::Terraform => "terraform",
            Tool::Terragrunt => "terragrunt",
            Tool::Terramate => "terramate",
            Tool::Atmos => "atmos",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        match name {
            "tofu" | "opentofu" => Some(Tool::Tofu),
            "tf" | "terraform" => Some(Tool::Terraform),
            "tg" | "terragrunt" => Some(Tool::Terragrunt),
            "tm" | "terramate" => Some(Tool::Terramate),
            "atmos" => Some(Tool::Atmos),
            _ => None,
        }
    }
}

/// Retrieval strategy for a tool's release assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallMode {
    /// Direct path under the releases host.
    Direct,
    /// REST API asset lookup by tag.
    Api,
    /// Mirror URL-template substitution.
    Mirror,
}

/// Retrieval strategy for enumerating remote versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListMode {
    /// Directory-listing page parsed with a CSS selector.
    Html,
    /// REST API release list.
    Api,
    /// Structured mirror index document.
    Mirror,
}

/// Remote settings for one tool, merged from defaults and environment.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub remote_url: String,
    pub list_url: String,
    pub install_mode: InstallMode,
    pub list_mode: ListMode,
    /// Old-base -> new-base substring replacement enabling private mirrors.
    pub rewrite_rule: Option<(String, String)>,
    /// Free-form settings for the HTML list mode (selector, part).
    pub data: HashMap<String, String>,
}

/// Shared configuration for every core operation.
pub struct Config {
    /// Install root; the directory tree `<root>/<tool>/<version>/` lives here.
    pub root_path: PathBuf,
    /// Directory scanned for IaC files and version files.
    pub work_path: PathBuf,
    /// User home directory, part of the version file search path.
    pub user_path: PathBuf,
    /// Target architecture in release-asset notation (amd64, arm64, ...).
    pub arch: String,
    /// Target OS in release-asset notation (linux, darwin, windows).
    pub os: String,
    pub skip_signature: bool,
    pub force_remote: bool,
    pub no_install: bool,
    pub github_token: Option<String>,
    /// CI output-capture mode (GitHub Actions).
    pub github_actions: bool,
    /// Local OpenTofu PGP key override path.
    pub tofu_key_path: Option<PathBuf>,
    pub reporter: Arc<dyn Reporter>,
    remotes: HashMap<Tool, RemoteConfig>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("root_path", &self.root_path)
            .field("work_path", &self.work_path)
            .field("arch", &self.arch)
            .field("os", &self.os)
            .field("skip_signature", &self.skip_signature)
            .field("force_remote", &self.force_remote)
            .field("no_install", &self.no_install)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Build a configuration from the process environment.
    pub fn from_env(reporter: Arc<dyn Reporter>) -> Result<Self> {
        let user_path = dirs::home_dir()
            .ok_or_else(|| TervError::context("config", "cannot locate home directory"))?;
        let root_path = match std::env::var_os("TERV_ROOT") {
            Some(root) => PathBuf::from(root),
            None => user_path.join(".terv"),
        };
        let work_path = std::env::current_dir()?;

        let mut conf = Self {
            root_path,
            work_path,
            user_path,
            arch: env_or("TERV_ARCH", default_arch()),
            os: default_os().to_string(),
            skip_signature: env_flag("TERV_SKIP_SIGNATURE"),
            force_remote: env_flag("TERV_FORCE_REMOTE"),
            no_install: env_set_false("TERV_AUTO_INSTALL"),
            github_token: std::env::var("TERV_GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            github_actions: env_flag("GITHUB_ACTIONS"),
            tofu_key_path: std::env::var_os("TERV_TOFU_OPENTOFU_PGP_KEY").map(PathBuf::from),
            reporter,
            remotes: HashMap::new(),
        };

        for tool in Tool::ALL {
            let remote = remote_from_env(tool)?;
            conf.remotes.insert(tool, remote);
        }
        Ok(conf)
    }

    /// Minimal configuration rooted at `root_path`, silent reporter.
    /// Used by tests and library embedders.
    pub fn for_root(root_path: impl Into<PathBuf>) -> Self {
        let root_path = root_path.into();
        let mut remotes = HashMap::new();
        for tool in Tool::ALL {
            remotes.insert(tool, default_remote(tool));
        }
        Self {
            work_path: root_path.clone(),
            user_path: root_path.clone(),
            root_path,
            arch: default_arch().to_string(),
            os: default_os().to_string(),
            skip_signature: false,
            force_remote: false,
            no_install: false,
            github_token: None,
            github_actions: false,
            tofu_key_path: None,
            reporter: Arc::new(NullReporter),
            remotes,
        }
    }

    /// Remote settings for `tool`.
    pub fn remote(&self, tool: Tool) -> &RemoteConfig {
        // every tool is seeded in the constructors
        &self.remotes[&tool]
    }

    /// Replace the remote settings for `tool` (flag overrides, tests).
    pub fn set_remote(&mut self, tool: Tool, remote: RemoteConfig) {
        self.remotes.insert(tool, remote);
    }

    /// Install directory for `tool`, created on demand.
    pub fn install_path(&self, tool: Tool) -> Result<PathBuf> {
        let dir = self.root_path.join(tool.folder_name());
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Path of the root-level pinned version file for `tool`.
    pub fn root_version_file(&self, tool: Tool) -> PathBuf {
        self.root_path.join(tool.folder_name()).join("version")
    }

    /// Path of the per-tool default constraint file.
    pub fn constraint_file(&self, tool: Tool) -> PathBuf {
        self.root_path.join(tool.folder_name()).join("constraint")
    }

    /// Executable file name for `tool` on the target OS.
    pub fn binary_name(&self, tool: Tool) -> String {
        if self.os == "windows" {
            format!("{}.exe", tool.exec_name())
        } else {
            tool.exec_name().to_string()
        }
    }
}

fn remote_from_env(tool: Tool) -> Result<RemoteConfig> {
    let prefix = tool.env_prefix();
    let mut remote = default_remote(tool);

    if let Ok(url) = std::env::var(format!("{prefix}_REMOTE")) {
        if !url.is_empty() {
            remote.list_url.clone_from(&url);
            remote.remote_url = url;
        }
    }
    if let Ok(url) = std::env::var(format!("{prefix}_LIST_URL")) {
        if !url.is_empty() {
            remote.list_url = url;
        }
    }
    if let Ok(mode) = std::env::var(format!("{prefix}_INSTALL_MODE")) {
        remote.install_mode = parse_install_mode(&mode)?;
    }
    if let Ok(mode) = std::env::var(format!("{prefix}_LIST_MODE")) {
        remote.list_mode = parse_list_mode(&mode)?;
    }
    if let Ok(rule) = std::env::var(format!("{prefix}_URL_REWRITE")) {
        if let Some((old, new)) = rule.split_once(',') {
            if !old.is_empty() && !new.is_empty() {
                remote.rewrite_rule = Some((old.to_string(), new.to_string()));
            }
        }
    }
    if let Ok(selector) = std::env::var(format!("{prefix}_LIST_SELECTOR")) {
        remote.data.insert("selector".to_string(), selector);
    }
    if let Ok(part) = std::env::var(format!("{prefix}_LIST_PART")) {
        remote.data.insert("part".to_string(), part);
    }
    Ok(remote)
}

fn parse_install_mode(mode: &str) -> Result<InstallMode> {
    match mode {
        "direct" => Ok(InstallMode::Direct),
        "api" => Ok(InstallMode::Api),
        "mirror" => Ok(InstallMode::Mirror),
        other => Err(TervError::InstallMode(other.to_string())),
    }
}

fn parse_list_mode(mode: &str) -> Result<ListMode> {
    match mode {
        "html" => Ok(ListMode::Html),
        "api" => Ok(ListMode::Api),
        "mirror" => Ok(ListMode::Mirror),
        other => Err(TervError::ListMode(other.to_string())),
    }
}

fn default_remote(tool: Tool) -> RemoteConfig {
    let (remote_url, list_url) = match tool {
        Tool::Tofu => (
            "https://github.com",
            "https://api.github.com/repos/opentofu/opentofu/releases",
        ),
        Tool::Terraform => (
            "https://releases.hashicorp.com",
            "https://releases.hashicorp.com/terraform/index.json",
        ),
        Tool::Terragrunt => (
            "https://github.com",
            "https://api.github.com/repos/gruntwork-io/terragrunt/releases",
        ),
        Tool::Terramate => (
            "https://github.com",
            "https://api.github.com/repos/terramate-io/terramate/releases",
        ),
        Tool::Atmos => (
            "https://github.com",
            "https://api.github.com/repos/cloudposse/atmos/releases",
        ),
    };
    RemoteConfig {
        remote_url: remote_url.to_string(),
        list_url: list_url.to_string(),
        install_mode: InstallMode::Direct,
        list_mode: ListMode::Api,
        rewrite_rule: None,
        data: HashMap::new(),
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).ok().as_deref(),
        Some("1" | "true" | "TRUE" | "True" | "yes")
    )
}

/// True when the variable is explicitly set to a false value.
fn env_set_false(name: &str) -> bool {
    matches!(
        std::env::var(name).ok().as_deref(),
        Some("0" | "false" | "FALSE" | "False" | "no")
    )
}

/// Release-asset architecture notation for the build target.
fn default_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        other => other,
    }
}

/// Release-asset OS notation for the build target.
fn default_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_lookup_accepts_aliases() {
        assert_eq!(Tool::from_name("tofu"), Some(Tool::Tofu));
        assert_eq!(Tool::from_name("opentofu"), Some(Tool::Tofu));
        assert_eq!(Tool::from_name("tf"), Some(Tool::Terraform));
        assert_eq!(Tool::from_name("tg"), Some(Tool::Terragrunt));
        assert_eq!(Tool::from_name("nope"), None);
    }

    #[test]
    fn install_mode_parsing() {
        assert_eq!(parse_install_mode("direct").unwrap(), InstallMode::Direct);
        assert_eq!(parse_install_mode("mirror").unwrap(), InstallMode::Mirror);
        assert!(matches!(
            parse_install_mode("ftp"),
            Err(TervError::InstallMode(_))
        ));
    }

    #[test]
    fn for_root_seeds_every_tool() {
        let conf = Config::for_root("/tmp/terv-root");
        for tool in Tool::ALL {
            let remote = conf.remote(tool);
            assert!(!remote.remote_url.is_empty());
            assert!(!remote.list_url.is_empty());
        }
    }

    #[test]
    fn binary_name_windows_suffix() {
        let mut conf = Config::for_root("/tmp/terv-root");
        conf.os = "windows".to_string();
        assert_eq!(conf.binary_name(Tool::Tofu), "tofu.exe");
        conf.os = "linux".to_string();
        assert_eq!(conf.binary_name(Tool::Tofu), "tofu");
    }
}
