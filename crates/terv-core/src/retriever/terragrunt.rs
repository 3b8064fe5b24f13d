//! Terragrunt release retrieval.
//!
//! Releases ship a raw binary per platform with a shared `SHA256SUMS`
//! file; there is no signature material to verify.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;

use crate::check::sha256;
use crate::config::{Config, Tool};
use crate::download;
use crate::error::Result;
use crate::extract;

const REPO_PATH: &str = "gruntwork-io/terragrunt";
const SUMS_NAME: &str = "SHA256SUMS";

pub struct TerragruntRetriever;

#[async_trait]
impl super::Retriever for TerragruntRetriever {
    async fn install(
        &self,
        conf: &Config,
        client: &Client,
        version: &str,
        target_dir: &Path,
    ) -> Result<()> {
        let (tag, _) = super::split_tag(version);
        let file_name = build_asset_name(&conf.os, &conf.arch);
        conf.reporter
            .debug(&format!("Searching assets [{file_name}, {SUMS_NAME}]"));

        let asset_names = vec![file_name.clone(), SUMS_NAME.to_string()];
        let asset_urls =
            super::github_asset_urls(conf, client, Tool::Terragrunt, REPO_PATH, &tag, &asset_names)
                .await?;

        let options = super::request_options(Tool::Terragrunt);
        let reporter = conf.reporter.as_ref();
        let data = download::bytes(client, &asset_urls[0], reporter, &options).await?;
        let data_sums = download::bytes(client, &asset_urls[1], reporter, &options).await?;
        sha256::check(&data, &data_sums, &file_name)?;

        extract::write_binary(&data, target_dir, &conf.binary_name(Tool::Terragrunt))
    }

    async fn list_versions(&self, conf: &Config, client: &Client) -> Result<Vec<String>> {
        super::github_list_versions(conf, client, Tool::Terragrunt, REPO_PATH).await
    }
}

fn build_asset_name(os: &str, arch: &str) -> String {
    if os == "windows" {
        format!("terragrunt_{os}_{arch}.exe")
    } else {
        format!("terragrunt_{os}_{arch}")
    }
}
