//! HTML directory-listing list mode.
//!
//! Fetches a release listing page and extracts version tokens with a
//! configurable CSS selector and part (an attribute name, or `#text`).
//! Each extracted token runs through the version-substring heuristic;
//! non-matches are discarded.

use std::collections::HashMap;

use reqwest::Client;

use crate::download::{self, RequestOptions};
use crate::error::{Result, TervError};
use crate::reporter::Reporter;
use crate::version::find_version;

const DEFAULT_SELECTOR: &str = "a";
const DEFAULT_PART: &str = "href";
const TEXT_PART: &str = "#text";

/// Build per-asset URLs under a common release base URL.
pub fn build_asset_urls(base_asset_url: &str, asset_names: &[String]) -> Vec<String> {
    let base = base_asset_url.trim_end_matches('/');
    asset_names
        .iter()
        .map(|name| format!("{base}/{name}"))
        .collect()
}

/// Fetch `base_url` and extract the versions listed on the page.
pub async fn list_releases(
    client: &Client,
    base_url: &str,
    remote_data: &HashMap<String, String>,
    reporter: &dyn Reporter,
    options: &RequestOptions,
) -> Result<Vec<String>> {
    let body = download::bytes(client, base_url, reporter, options).await?;
    let body = String::from_utf8_lossy(&body).into_owned();

    let selector = remote_data
        .get("selector")
        .map_or(DEFAULT_SELECTOR, String::as_str);
    let part = remote_data.get("part").map_or(DEFAULT_PART, String::as_str);
    extract_versions(&body, selector, part)
}

fn extract_versions(body: &str, selector: &str, part: &str) -> Result<Vec<String>> {
    let document = scraper::Html::parse_document(body);
    let selector = scraper::Selector::parse(selector)
        .map_err(|err| TervError::resolution(format!("invalid selector {selector:?}: {err:?}")))?;

    let mut versions = Vec::new();
    for element in document.select(&selector) {
        let token = if part == TEXT_PART {
            element.text().collect::<String>()
        } else {
            match element.value().attr(part) {
                Some(value) => value.to_string(),
                None => continue,
            }
        };
        if let Some(version) = find_version(&token) {
            versions.push(version);
        }
    }
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <a href="tofu/1.6.0/">v1.6.0</a>
        <a href="tofu/1.6.1/">v1.6.1</a>
        <a href="tofu/1.7.0-rc1/">v1.7.0-rc1</a>
        <a href="../">parent</a>
        </body></html>
    "#;

    #[test]
    fn extracts_versions_from_hrefs() {
        let versions = extract_versions(LISTING, "a", "href").unwrap();
        assert_eq!(versions, ["1.6.0", "1.6.1", "1.7.0-rc1"]);
    }

    #[test]
    fn extracts_versions_from_text() {
        let versions = extract_versions(LISTING, "a", "#text").unwrap();
        assert_eq!(versions, ["1.6.0", "1.6.1", "1.7.0-rc1"]);
    }

    #[test]
    fn invalid_selector_is_an_error() {
        assert!(extract_versions(LISTING, ":::", "href").is_err());
    }

    #[test]
    fn asset_urls_join_cleanly() {
        let urls = build_asset_urls(
            "https://releases.example/download/v1.6.0/",
            &["a.zip".to_string(), "SHA256SUMS".to_string()],
        );
        assert_eq!(
            urls,
            [
                "https://releases.example/download/v1.6.0/a.zip",
                "https://releases.example/download/v1.6.0/SHA256SUMS"
            ]
        );
    }
}
