//! Terraform release retrieval from the HashiCorp releases host.
//!
//! Every version directory carries an `index.json` describing per-platform
//! builds plus checksum and signature file names. Checksums are PGP signed
//! with the HashiCorp release key.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::check::{pgp, sha256};
use crate::config::{Config, ListMode, Tool};
use crate::download::{self, RequestOptions};
use crate::error::{Result, TervError};
use crate::{extract, html};

const PRODUCT: &str = "terraform";
const INDEX_JSON: &str = "index.json";

const PUBLIC_KEY_URL: &str = "https://www.hashicorp.com/.well-known/pgp-key.txt";
const KEY_PATH_ENV: &str = "TERV_TF_HASHICORP_PGP_KEY";

pub struct TerraformRetriever;

#[derive(Deserialize)]
struct VersionIndex {
    builds: Vec<Build>,
    shasums: String,
    shasums_signature: String,
}

#[derive(Deserialize)]
struct Build {
    os: String,
    arch: String,
    url: String,
    filename: String,
}

#[derive(Deserialize)]
struct ProductIndex {
    versions: HashMap<String, serde::de::IgnoredAny>,
}

#[async_trait]
impl super::Retriever for TerraformRetriever {
    async fn install(
        &self,
        conf: &Config,
        client: &Client,
        version: &str,
        target_dir: &Path,
    ) -> Result<()> {
        let (_, version) = super::split_tag(version);
        let remote = conf.remote(Tool::Terraform);
        let base_version_url = format!(
            "{}/{PRODUCT}/{version}",
            remote.remote_url.trim_end_matches('/')
        );

        let options = super::request_options(Tool::Terraform);
        let body = download::bytes(
            client,
            &format!("{base_version_url}/{INDEX_JSON}"),
            conf.reporter.as_ref(),
            &options,
        )
        .await?;
        let index: VersionIndex = serde_json::from_slice(&body)
            .map_err(|err| TervError::ResponseShape(err.to_string()))?;

        let build = index
            .builds
            .iter()
            .find(|b| b.os == conf.os && b.arch == conf.arch)
            .ok_or_else(|| {
                TervError::ResponseShape(format!(
                    "no {PRODUCT} {version} build for {}_{}",
                    conf.os, conf.arch
                ))
            })?;

        let urls = download::rewrite_urls(
            remote,
            vec![
                build.url.clone(),
                format!("{base_version_url}/{}", index.shasums),
                format!("{base_version_url}/{}", index.shasums_signature),
            ],
        );

        let data = download::bytes(client, &urls[0], conf.reporter.as_ref(), &options).await?;
        check_sum_and_sig(conf, client, &data, &build.filename, &urls, &options).await?;

        extract::unzip_to_dir(&data, target_dir, &conf.binary_name(Tool::Terraform))
    }

    async fn list_versions(&self, conf: &Config, client: &Client) -> Result<Vec<String>> {
        let remote = conf.remote(Tool::Terraform);
        let options = super::request_options(Tool::Terraform);
        match remote.list_mode {
            ListMode::Html => {
                let base = format!("{}/{PRODUCT}/", remote.remote_url.trim_end_matches('/'));
                conf.reporter
                    .display(&format!("Fetching all releases from {base}"));
                html::list_releases(client, &base, &remote.data, conf.reporter.as_ref(), &options)
                    .await
            }
            ListMode::Api | ListMode::Mirror => {
                conf.reporter
                    .display(&format!("Fetching all releases from {}", remote.list_url));
                let body = download::bytes(
                    client,
                    &remote.list_url,
                    conf.reporter.as_ref(),
                    &options,
                )
                .await?;
                let index: ProductIndex = serde_json::from_slice(&body)
                    .map_err(|err| TervError::ResponseShape(err.to_string()))?;
                Ok(index.versions.into_keys().collect())
            }
        }
    }
}

async fn check_sum_and_sig(
    conf: &Config,
    client: &Client,
    data: &[u8],
    file_name: &str,
    urls: &[String],
    options: &RequestOptions,
) -> Result<()> {
    let reporter = conf.reporter.as_ref();
    let data_sums = download::bytes(client, &urls[1], reporter, options).await?;
    sha256::check(data, &data_sums, file_name)?;

    if conf.skip_signature {
        return Ok(());
    }

    let data_sums_sig = download::bytes(client, &urls[2], reporter, options).await?;
    let public_key = match std::env::var(KEY_PATH_ENV).ok().filter(|p| !p.is_empty()) {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let bytes = download::bytes(client, PUBLIC_KEY_URL, reporter, options).await?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
    };
    pgp::check(&data_sums, &data_sums_sig, &public_key)
}

#[cfg(test)]
mod tests {
    use super::super::Retriever;
    use super::*;
    use crate::config::RemoteConfig;

    fn conf_for(server_url: &str, root: &std::path::Path) -> Config {
        let mut conf = Config::for_root(root);
        conf.os = "linux".to_string();
        conf.arch = "amd64".to_string();
        conf.set_remote(
            Tool::Terraform,
            RemoteConfig {
                remote_url: server_url.to_string(),
                list_url: format!("{server_url}/{PRODUCT}/{INDEX_JSON}"),
                install_mode: crate::config::InstallMode::Direct,
                list_mode: ListMode::Api,
                rewrite_rule: None,
                data: HashMap::new(),
            },
        );
        conf
    }

    #[tokio::test]
    async fn lists_versions_from_product_index() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/terraform/index.json")
            .with_body(r#"{"name": "terraform", "versions": {"1.5.7": {}, "1.6.0": {}}}"#)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let conf = conf_for(&server.url(), tmp.path());
        let mut versions = TerraformRetriever
            .list_versions(&conf, &Client::new())
            .await
            .unwrap();
        versions.sort();
        assert_eq!(versions, ["1.5.7", "1.6.0"]);
    }

    #[tokio::test]
    async fn missing_platform_build_is_shape_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/terraform/1.6.0/index.json")
            .with_body(
                r#"{"builds": [{"os": "solaris", "arch": "sparc", "url": "u", "filename": "f"}],
                    "shasums": "terraform_1.6.0_SHA256SUMS",
                    "shasums_signature": "terraform_1.6.0_SHA256SUMS.sig"}"#,
            )
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let conf = conf_for(&server.url(), tmp.path());
        let err = TerraformRetriever
            .install(&conf, &Client::new(), "1.6.0", tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, TervError::ResponseShape(_)));
    }
}
