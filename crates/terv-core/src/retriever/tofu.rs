//! OpenTofu release retrieval.
//!
//! Assets live on GitHub releases (or a mirror); checksums are cosign
//! signed by the release workflow, with a PGP fallback for stable
//! releases when cosign is not installed.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::check::{cosign, pgp, sha256};
use crate::config::{Config, InstallMode, ListMode, Tool};
use crate::download::{self, RequestOptions};
use crate::error::{Result, TervError};
use crate::extract;
use crate::version::ParsedVersion;

const REPO_PATH: &str = "opentofu/opentofu";

const GET_TOFU_URL: &str = "https://get.opentofu.org/";
const DEFAULT_MIRROR_LIST_URL: &str = "https://get.opentofu.org/tofu/api.json";
const PUBLIC_KEY_URL: &str = "https://get.opentofu.org/opentofu.asc";

const DEFAULT_URL_TEMPLATE: &str =
    "https://github.com/opentofu/opentofu/releases/download/v{version}/{artifact}";
const URL_TEMPLATE_ENV: &str = "TERV_TOFU_URL_TEMPLATE";

const BASE_IDENTITY: &str =
    "https://github.com/opentofu/opentofu/.github/workflows/release.yml@refs/heads/v";
const UNSTABLE_IDENTITY: &str =
    "https://github.com/opentofu/opentofu/.github/workflows/release.yml@refs/heads/main";
const ISSUER: &str = "https://token.actions.githubusercontent.com";

pub struct TofuRetriever;

#[async_trait]
impl super::Retriever for TofuRetriever {
    async fn install(
        &self,
        conf: &Config,
        client: &Client,
        version: &str,
        target_dir: &Path,
    ) -> Result<()> {
        let (tag, version) = super::split_tag(version);
        let stable = match ParsedVersion::parse(&version) {
            ParsedVersion::Ordered(v) => v.pre.is_empty(),
            ParsedVersion::Unordered => {
                return Err(TervError::resolution(format!(
                    "unparsable version {version:?}"
                )));
            }
        };

        let asset_names = build_asset_names(&version, &conf.os, &conf.arch, stable);
        conf.reporter
            .debug(&format!("Searching assets {asset_names:?}"));

        let remote = conf.remote(Tool::Tofu);
        let asset_urls = match remote.install_mode {
            InstallMode::Mirror => {
                let template = std::env::var(URL_TEMPLATE_ENV)
                    .ok()
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| DEFAULT_URL_TEMPLATE.to_string());
                super::mirror_urls(remote, &template, &version, &asset_names)
            }
            _ => {
                super::github_asset_urls(conf, client, Tool::Tofu, REPO_PATH, &tag, &asset_names)
                    .await?
            }
        };

        let options = super::request_options(Tool::Tofu);
        let data =
            download::bytes(client, &asset_urls[0], conf.reporter.as_ref(), &options).await?;

        let identity = build_identity(&version, stable);
        check_sum_and_sig(
            conf,
            client,
            stable,
            &identity,
            &data,
            &asset_names[0],
            &asset_urls,
            &options,
        )
        .await?;

        extract::unzip_to_dir(&data, target_dir, &conf.binary_name(Tool::Tofu))
    }

    async fn list_versions(&self, conf: &Config, client: &Client) -> Result<Vec<String>> {
        let remote = conf.remote(Tool::Tofu);
        if remote.list_mode == ListMode::Mirror {
            let list_url = if remote.list_url.starts_with(GET_TOFU_URL)
                || remote.list_url.contains("api.github.com")
            {
                DEFAULT_MIRROR_LIST_URL.to_string()
            } else {
                remote.list_url.clone()
            };
            conf.reporter
                .display(&format!("Fetching all releases from {list_url}"));

            let body = download::bytes(
                client,
                &list_url,
                conf.reporter.as_ref(),
                &super::request_options(Tool::Tofu),
            )
            .await?;
            let index: MirrorIndex = serde_json::from_slice(&body)
                .map_err(|err| TervError::ResponseShape(err.to_string()))?;
            return Ok(index.versions.into_iter().map(|v| v.id).collect());
        }
        super::github_list_versions(conf, client, Tool::Tofu, REPO_PATH).await
    }
}

#[derive(Deserialize)]
struct MirrorIndex {
    versions: Vec<MirrorVersion>,
}

#[derive(Deserialize)]
struct MirrorVersion {
    id: String,
}

/// Checksum always; then cosign, then PGP for stable releases when cosign
/// is missing, then a warned skip for prereleases.
#[allow(clippy::too_many_arguments)]
async fn check_sum_and_sig(
    conf: &Config,
    client: &Client,
    stable: bool,
    identity: &str,
    data: &[u8],
    file_name: &str,
    asset_urls: &[String],
    options: &RequestOptions,
) -> Result<()> {
    let reporter = conf.reporter.as_ref();
    let data_sums = download::bytes(client, &asset_urls[1], reporter, options).await?;
    sha256::check(data, &data_sums, file_name)?;

    if conf.skip_signature {
        return Ok(());
    }

    let data_sums_sig = download::bytes(client, &asset_urls[3], reporter, options).await?;
    let data_sums_cert = download::bytes(client, &asset_urls[2], reporter, options).await?;

    match cosign::check(
        &data_sums,
        &data_sums_sig,
        &data_sums_cert,
        identity,
        ISSUER,
        reporter,
    )
    .await
    {
        Err(TervError::CosignNotInstalled) => {}
        other => return other,
    }

    if !stable {
        reporter.warning(
            "skip signature check: cosign executable not found and pgp check not available for unstable version",
        );
        return Ok(());
    }
    reporter.display("cosign executable not found, fallback to pgp check");

    let data_sums_sig = download::bytes(client, &asset_urls[4], reporter, options).await?;
    let public_key = match &conf.tofu_key_path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let bytes = download::bytes(client, PUBLIC_KEY_URL, reporter, options).await?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
    };
    pgp::check(&data_sums, &data_sums_sig, &public_key)
}

/// `tofu_<version>_<os>_<arch>.zip` plus the checksum file and its cosign
/// material; the PGP signature only exists for stable releases.
fn build_asset_names(version: &str, os: &str, arch: &str, stable: bool) -> Vec<String> {
    let sums = format!("tofu_{version}_SHA256SUMS");
    let mut names = vec![
        format!("tofu_{version}_{os}_{arch}.zip"),
        sums.clone(),
        format!("{sums}.pem"),
        format!("{sums}.sig"),
    ];
    if stable {
        names.push(format!("{sums}.gpgsig"));
    }
    names
}

/// Stable releases are signed from their release branch, prereleases from
/// main.
fn build_identity(version: &str, stable: bool) -> String {
    if !stable {
        return UNSTABLE_IDENTITY.to_string();
    }
    let short = version.rsplit_once('.').map_or(version, |(head, _)| head);
    format!("{BASE_IDENTITY}{short}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_names_for_stable_release() {
        let names = build_asset_names("1.6.0", "linux", "amd64", true);
        assert_eq!(
            names,
            [
                "tofu_1.6.0_linux_amd64.zip",
                "tofu_1.6.0_SHA256SUMS",
                "tofu_1.6.0_SHA256SUMS.pem",
                "tofu_1.6.0_SHA256SUMS.sig",
                "tofu_1.6.0_SHA256SUMS.gpgsig",
            ]
        );
    }

    #[test]
    fn prerelease_has_no_gpg_signature() {
        let names = build_asset_names("1.7.0-rc1", "darwin", "arm64", false);
        assert_eq!(names.len(), 4);
        assert_eq!(names[0], "tofu_1.7.0-rc1_darwin_arm64.zip");
    }

    #[test]
    fn identity_tracks_release_branch() {
        assert_eq!(build_identity("1.6.2", true), format!("{BASE_IDENTITY}1.6"));
        assert_eq!(build_identity("1.7.0-rc1", false), UNSTABLE_IDENTITY);
    }
}
