//! Atmos release retrieval.
//!
//! Releases ship a raw binary per platform with a per-version checksum
//! file.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;

use crate::check::sha256;
use crate::config::{Config, Tool};
use crate::download;
use crate::error::Result;
use crate::extract;

const REPO_PATH: &str = "cloudposse/atmos";

pub struct AtmosRetriever;

#[async_trait]
impl super::Retriever for AtmosRetriever {
    async fn install(
        &self,
        conf: &Config,
        client: &Client,
        version: &str,
        target_dir: &Path,
    ) -> Result<()> {
        let (tag, version) = super::split_tag(version);
        let (file_name, sums_name) = build_asset_names(&version, &conf.os, &conf.arch);
        conf.reporter
            .debug(&format!("Searching assets [{file_name}, {sums_name}]"));

        let asset_names = vec![file_name.clone(), sums_name];
        let asset_urls =
            super::github_asset_urls(conf, client, Tool::Atmos, REPO_PATH, &tag, &asset_names)
                .await?;

        let options = super::request_options(Tool::Atmos);
        let reporter = conf.reporter.as_ref();
        let data = download::bytes(client, &asset_urls[0], reporter, &options).await?;
        let data_sums = download::bytes(client, &asset_urls[1], reporter, &options).await?;
        sha256::check(&data, &data_sums, &file_name)?;

        extract::write_binary(&data, target_dir, &conf.binary_name(Tool::Atmos))
    }

    async fn list_versions(&self, conf: &Config, client: &Client) -> Result<Vec<String>> {
        super::github_list_versions(conf, client, Tool::Atmos, REPO_PATH).await
    }
}

fn build_asset_names(version: &str, os: &str, arch: &str) -> (String, String) {
    let sums = format!("atmos_{version}_SHA256SUMS");
    let file = if os == "windows" {
        format!("atmos_{version}_{os}_{arch}.exe")
    } else {
        format!("atmos_{version}_{os}_{arch}")
    };
    (file, sums)
}
