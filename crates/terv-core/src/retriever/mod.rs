//! Per-tool release retrieval.
//!
//! A [`Retriever`] knows where a tool's releases live, how its assets are
//! named, and which verification chain applies. Everything else (version
//! resolution, locking, directory layout) stays in the manager.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::{Config, InstallMode, ListMode, RemoteConfig, Tool};
use crate::download::{self, RequestOptions};
use crate::error::{Result, TervError};
use crate::{github, html};

mod atmos;
mod terraform;
mod terragrunt;
mod terramate;
mod tofu;

/// Release source for one tool.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Download, verify, and unpack `version` into `target_dir`.
    async fn install(
        &self,
        conf: &Config,
        client: &Client,
        version: &str,
        target_dir: &Path,
    ) -> Result<()>;

    /// Enumerate remotely available versions, in no particular order.
    async fn list_versions(&self, conf: &Config, client: &Client) -> Result<Vec<String>>;
}

pub fn for_tool(tool: Tool) -> Box<dyn Retriever> {
    match tool {
        Tool::Tofu => Box::new(tofu::TofuRetriever),
        Tool::Terraform => Box::new(terraform::TerraformRetriever),
        Tool::Terragrunt => Box::new(terragrunt::TerragruntRetriever),
        Tool::Terramate => Box::new(terramate::TerramateRetriever),
        Tool::Atmos => Box::new(atmos::AtmosRetriever),
    }
}

/// Release tags carry a leading `v`, asset names do not. Normalize a
/// request into both forms.
fn split_tag(requested: &str) -> (String, String) {
    match requested.strip_prefix('v') {
        Some(version) => (requested.to_string(), version.to_string()),
        None => (format!("v{requested}"), requested.to_string()),
    }
}

/// Basic auth for private mirrors, from `<PREFIX>_REMOTE_USER` and
/// `<PREFIX>_REMOTE_PASS`.
fn request_options(tool: Tool) -> RequestOptions {
    let prefix = tool.env_prefix();
    let user = std::env::var(format!("{prefix}_REMOTE_USER")).ok();
    let pass = std::env::var(format!("{prefix}_REMOTE_PASS")).ok();
    RequestOptions {
        bearer_token: None,
        basic_auth: match (user, pass) {
            (Some(user), Some(pass)) if !user.is_empty() => Some((user, pass)),
            _ => None,
        },
    }
}

/// Asset URLs for a GitHub-hosted release, honoring the install mode and
/// the mirror rewrite rule.
async fn github_asset_urls(
    conf: &Config,
    client: &Client,
    tool: Tool,
    repo_path: &str,
    tag: &str,
    asset_names: &[String],
) -> Result<Vec<String>> {
    let remote = conf.remote(tool);
    let urls = match remote.install_mode {
        InstallMode::Direct => {
            let base = format!(
                "{}/{repo_path}/releases/download/{tag}",
                remote.remote_url.trim_end_matches('/')
            );
            html::build_asset_urls(&base, asset_names)
        }
        InstallMode::Api => {
            github::asset_download_urls(
                client,
                tag,
                asset_names,
                &remote.list_url,
                conf.github_token.as_deref(),
                conf.reporter.as_ref(),
            )
            .await?
        }
        InstallMode::Mirror => {
            return Err(TervError::InstallMode("mirror".to_string()));
        }
    };
    Ok(download::rewrite_urls(remote, urls))
}

/// Remote version enumeration for a GitHub-hosted tool.
async fn github_list_versions(
    conf: &Config,
    client: &Client,
    tool: Tool,
    repo_path: &str,
) -> Result<Vec<String>> {
    let remote = conf.remote(tool);
    match remote.list_mode {
        ListMode::Api => {
            conf.reporter
                .display(&format!("Fetching all releases from {}", remote.list_url));
            github::list_releases(client, &remote.list_url, conf.github_token.as_deref()).await
        }
        ListMode::Html => {
            let base = format!(
                "{}/{repo_path}/releases/download/",
                remote.list_url.trim_end_matches('/')
            );
            conf.reporter
                .display(&format!("Fetching all releases from {base}"));
            html::list_releases(
                client,
                &base,
                &remote.data,
                conf.reporter.as_ref(),
                &request_options(tool),
            )
            .await
        }
        ListMode::Mirror => Err(TervError::ListMode("mirror".to_string())),
    }
}

/// Expand a mirror URL template (`{version}` and `{artifact}`
/// placeholders) for every asset name.
fn mirror_urls(
    remote: &RemoteConfig,
    template: &str,
    version: &str,
    asset_names: &[String],
) -> Vec<String> {
    let urls = asset_names
        .iter()
        .map(|name| {
            template
                .replace("{version}", version)
                .replace("{artifact}", name)
        })
        .collect();
    download::rewrite_urls(remote, urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_normalization() {
        assert_eq!(
            split_tag("1.6.0"),
            ("v1.6.0".to_string(), "1.6.0".to_string())
        );
        assert_eq!(
            split_tag("v1.6.0"),
            ("v1.6.0".to_string(), "1.6.0".to_string())
        );
    }

    #[test]
    fn mirror_template_expansion() {
        let conf = Config::for_root("/tmp/terv");
        let urls = mirror_urls(
            conf.remote(Tool::Tofu),
            "https://mirror.corp/tofu/{version}/{artifact}",
            "1.6.0",
            &["tofu_1.6.0_linux_amd64.zip".to_string()],
        );
        assert_eq!(
            urls,
            ["https://mirror.corp/tofu/1.6.0/tofu_1.6.0_linux_amd64.zip"]
        );
    }
}
