//! Typed GitHub releases API client.
//!
//! Payloads are decoded into explicit schemas; any missing or mismatched
//! field is a [`TervError::ResponseShape`] instead of silently empty data.

use reqwest::Client;
use serde::Deserialize;

use crate::error::{Result, TervError};
use crate::reporter::Reporter;

const ACCEPT_HEADER: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
}

/// List every release tag (without a leading `v`), oldest page first.
pub async fn list_releases(
    client: &Client,
    releases_url: &str,
    token: Option<&str>,
) -> Result<Vec<String>> {
    let mut versions = Vec::new();
    for page in 1.. {
        let url = format!("{releases_url}?page={page}&per_page={PER_PAGE}");
        let releases: Vec<Release> = get_json(client, &url, token).await?;
        if releases.is_empty() {
            break;
        }
        versions.extend(releases.into_iter().map(|r| clean_tag(&r.tag_name)));
    }
    Ok(versions)
}

/// Download URLs for `asset_names` in the release tagged `tag`, in the
/// same order. A missing asset is an error: the caller asked for a
/// concrete artifact set.
pub async fn asset_download_urls(
    client: &Client,
    tag: &str,
    asset_names: &[String],
    releases_url: &str,
    token: Option<&str>,
    reporter: &dyn Reporter,
) -> Result<Vec<String>> {
    let url = format!("{releases_url}/tags/{tag}");
    reporter.debug(&format!("Fetching release information from {url}"));
    let release: Release = get_json(client, &url, token).await?;

    asset_names
        .iter()
        .map(|name| {
            release
                .assets
                .iter()
                .find(|asset| &asset.name == name)
                .map(|asset| asset.browser_download_url.clone())
                .ok_or_else(|| {
                    TervError::ResponseShape(format!("asset {name} not found in release {tag}"))
                })
        })
        .collect()
}

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    token: Option<&str>,
) -> Result<T> {
    let mut request = client
        .get(url)
        .header(reqwest::header::ACCEPT, ACCEPT_HEADER)
        .header(API_VERSION_HEADER, API_VERSION)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let body = request.send().await?.error_for_status()?.text().await?;
    serde_json::from_str(&body).map_err(|err| TervError::ResponseShape(err.to_string()))
}

fn clean_tag(tag: &str) -> String {
    tag.strip_prefix('v').unwrap_or(tag).to_string()
}
