//! Terramate release retrieval.
//!
//! Releases ship gzipped tarballs (zips on windows) named with uname-style
//! architectures, checksummed in a shared `checksums.txt`.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;

use crate::check::sha256;
use crate::config::{Config, Tool};
use crate::download;
use crate::error::Result;
use crate::extract;

const REPO_PATH: &str = "terramate-io/terramate";
const SUMS_NAME: &str = "checksums.txt";

pub struct TerramateRetriever;

#[async_trait]
impl super::Retriever for TerramateRetriever {
    async fn install(
        &self,
        conf: &Config,
        client: &Client,
        version: &str,
        target_dir: &Path,
    ) -> Result<()> {
        let (tag, version) = super::split_tag(version);
        let file_name = build_asset_name(&version, &conf.os, &conf.arch);
        conf.reporter
            .debug(&format!("Searching assets [{file_name}, {SUMS_NAME}]"));

        let asset_names = vec![file_name.clone(), SUMS_NAME.to_string()];
        let asset_urls =
            super::github_asset_urls(conf, client, Tool::Terramate, REPO_PATH, &tag, &asset_names)
                .await?;

        let options = super::request_options(Tool::Terramate);
        let reporter = conf.reporter.as_ref();
        let data = download::bytes(client, &asset_urls[0], reporter, &options).await?;
        let data_sums = download::bytes(client, &asset_urls[1], reporter, &options).await?;
        sha256::check(&data, &data_sums, &file_name)?;

        let exec_name = conf.binary_name(Tool::Terramate);
        if conf.os == "windows" {
            extract::unzip_to_dir(&data, target_dir, &exec_name)
        } else {
            extract::untar_gz_to_dir(&data, target_dir, &exec_name)
        }
    }

    async fn list_versions(&self, conf: &Config, client: &Client) -> Result<Vec<String>> {
        super::github_list_versions(conf, client, Tool::Terramate, REPO_PATH).await
    }
}

/// Terramate uses uname notation in asset names.
fn convert_arch(arch: &str) -> &str {
    match arch {
        "amd64" => "x86_64",
        "386" => "i386",
        other => other,
    }
}

fn build_asset_name(version: &str, os: &str, arch: &str) -> String {
    let arch = convert_arch(arch);
    if os == "windows" {
        format!("terramate_{version}_{os}_{arch}.zip")
    } else {
        format!("terramate_{version}_{os}_{arch}.tar.gz")
    }
}
