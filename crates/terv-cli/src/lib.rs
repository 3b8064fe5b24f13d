//! terv - version manager for the Terraform-family CLIs
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! One tool to install, pin, and proxy OpenTofu, Terraform, Terragrunt,
//! Terramate, and Atmos. Versions are resolved from version files and IaC
//! constraints, downloaded with checksum and signature verification, and
//! laid out under a per-tool directory tree:
//!
//! ```text
//! ~/.terv/
//! ├── OpenTofu/
//! │   ├── 1.6.2/          # installed version (binary inside)
//! │   ├── version         # root-level pin
//! │   └── constraint      # default constraint
//! ├── Terraform/
//! └── ...
//! ```

pub mod cmd;
pub mod proxy_main;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use terv_core::config::{Config, Tool};
use terv_core::manager::VersionManager;
use terv_core::reporter::ConsoleReporter;

#[derive(Debug, Parser)]
#[command(name = "terv")]
#[command(author, version, about = "terv - version manager for OpenTofu, Terraform, Terragrunt, Terramate, and Atmos")]
pub struct Cli {
    /// Install root (default ~/.terv)
    #[arg(short, long, global = true, env = "TERV_ROOT")]
    pub root_path: Option<PathBuf>,

    /// Ignore locally installed versions during resolution
    #[arg(short, long, global = true, env = "TERV_FORCE_REMOTE")]
    pub force_remote: bool,

    /// Never install missing versions
    #[arg(short, long, global = true)]
    pub no_install: bool,

    /// Skip signature verification (checksums are always verified)
    #[arg(short, long, global = true, env = "TERV_SKIP_SIGNATURE")]
    pub skip_signature: bool,

    /// Target architecture in release-asset notation (amd64, arm64, ...)
    #[arg(short, long, global = true, env = "TERV_ARCH")]
    pub arch: Option<String>,

    /// GitHub token for API rate limits and private mirrors
    #[arg(short = 't', long, global = true, env = "TERV_GITHUB_TOKEN")]
    pub github_token: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: ToolCommand,
}

#[derive(Debug, Subcommand)]
pub enum ToolCommand {
    /// Manage OpenTofu versions
    #[command(alias = "opentofu")]
    Tofu {
        #[command(subcommand)]
        action: Action,
    },
    /// Manage Terraform versions
    #[command(name = "tf", alias = "terraform")]
    Terraform {
        #[command(subcommand)]
        action: Action,
    },
    /// Manage Terragrunt versions
    #[command(name = "tg", alias = "terragrunt")]
    Terragrunt {
        #[command(subcommand)]
        action: Action,
    },
    /// Manage Terramate versions
    #[command(name = "tm", alias = "terramate")]
    Terramate {
        #[command(subcommand)]
        action: Action,
    },
    /// Manage Atmos versions
    Atmos {
        #[command(subcommand)]
        action: Action,
    },
}

impl ToolCommand {
    pub fn split(self) -> (Tool, Action) {
        match self {
            ToolCommand::Tofu { action } => (Tool::Tofu, action),
            ToolCommand::Terraform { action } => (Tool::Terraform, action),
            ToolCommand::Terragrunt { action } => (Tool::Terragrunt, action),
            ToolCommand::Terramate { action } => (Tool::Terramate, action),
            ToolCommand::Atmos { action } => (Tool::Atmos, action),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Display the version that would run, installing it if needed
    Detect,
    /// Install a version matching a request (default: latest)
    Install {
        /// Exact version, keyword (latest, latest-stable, latest-pre,
        /// latest-allowed, min-required), or constraint expression
        version: Option<String>,
    },
    /// List installed versions
    List {
        /// Oldest first
        #[arg(long)]
        reverse: bool,
    },
    /// List versions available remotely
    ListRemote {
        /// Oldest first
        #[arg(long)]
        reverse: bool,
    },
    /// Remove the root-level pinned version
    Reset,
    /// Remove installed versions: exact versions, `all`, or a constraint
    Uninstall {
        #[arg(required = true)]
        versions: Vec<String>,
    },
    /// Resolve a version request and pin the result
    Use {
        version: String,
        /// Pin in the working directory instead of the install root
        #[arg(short, long)]
        working_dir: bool,
    },
}

/// Build the core configuration from the environment, then apply CLI flag
/// overrides.
pub fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let reporter = Arc::new(ConsoleReporter::new(cli.verbose));
    let mut conf = Config::from_env(reporter).context("failed to load configuration")?;

    if let Some(root_path) = &cli.root_path {
        conf.root_path.clone_from(root_path);
    }
    if let Some(arch) = &cli.arch {
        conf.arch.clone_from(arch);
    }
    if cli.github_token.is_some() {
        conf.github_token.clone_from(&cli.github_token);
    }
    conf.force_remote |= cli.force_remote;
    conf.no_install |= cli.no_install;
    conf.skip_signature |= cli.skip_signature;
    Ok(conf)
}

pub async fn dispatch(manager: &VersionManager, action: Action) -> anyhow::Result<()> {
    match action {
        Action::Detect => cmd::detect::detect(manager).await,
        Action::Install { version } => {
            cmd::install::install(manager, version.as_deref().unwrap_or("latest")).await
        }
        Action::List { reverse } => cmd::list::list(manager, !reverse),
        Action::ListRemote { reverse } => cmd::list::list_remote(manager, !reverse).await,
        Action::Reset => cmd::reset::reset(manager),
        Action::Uninstall { versions } => cmd::uninstall::uninstall(manager, &versions).await,
        Action::Use {
            version,
            working_dir,
        } => cmd::r#use::use_version(manager, &version, working_dir).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn tool_aliases_resolve() {
        let cli = Cli::try_parse_from(["terv", "opentofu", "detect"]).unwrap();
        assert!(matches!(cli.command.split().0, Tool::Tofu));

        let cli = Cli::try_parse_from(["terv", "tg", "list", "--reverse"]).unwrap();
        let (tool, action) = cli.command.split();
        assert!(matches!(tool, Tool::Terragrunt));
        assert!(matches!(action, Action::List { reverse: true }));
    }

    #[test]
    fn uninstall_requires_at_least_one_version() {
        assert!(Cli::try_parse_from(["terv", "tofu", "uninstall"]).is_err());
        let cli =
            Cli::try_parse_from(["terv", "tofu", "uninstall", "1.6.0", "1.6.1"]).unwrap();
        let (_, action) = cli.command.split();
        assert!(matches!(action, Action::Uninstall { versions } if versions.len() == 2));
    }

    #[test]
    fn global_flags_override_config() {
        let cli = Cli::try_parse_from([
            "terv",
            "--root-path",
            "/tmp/terv-root",
            "--force-remote",
            "tofu",
            "detect",
        ])
        .unwrap();
        let conf = build_config(&cli).unwrap();
        assert_eq!(conf.root_path, PathBuf::from("/tmp/terv-root"));
        assert!(conf.force_remote);
    }
}
