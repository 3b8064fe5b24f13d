//! Raw file downloads and URL rewriting.
//!
//! Every remote fetch in the install pipeline goes through here: binaries,
//! checksum files, signatures, and mirror indexes. No retries — retry
//! policy, if any, belongs to the caller.

use reqwest::Client;

use crate::config::RemoteConfig;
use crate::error::Result;
use crate::reporter::Reporter;

/// Optional request settings (authentication).
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub bearer_token: Option<String>,
    pub basic_auth: Option<(String, String)>,
}

impl RequestOptions {
    fn apply(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some((user, password)) = &self.basic_auth {
            request = request.basic_auth(user, Some(password.clone()));
        }
        request
    }
}

/// Download a URL to memory, reporting the target first.
pub async fn bytes(
    client: &Client,
    url: &str,
    reporter: &dyn Reporter,
    options: &RequestOptions,
) -> Result<Vec<u8>> {
    reporter.display(&format!("Downloading {url}"));

    let request = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT);
    let response = options.apply(request).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Rewrite URLs matching the configured old-base prefix onto the new base,
/// enabling private mirrors. URLs outside the old base pass through.
pub fn rewrite_urls(remote: &RemoteConfig, urls: Vec<String>) -> Vec<String> {
    let Some((old_base, new_base)) = &remote.rewrite_rule else {
        return urls;
    };
    urls.into_iter()
        .map(|url| match url.strip_prefix(old_base.as_str()) {
            Some(rest) => format!("{}{rest}", new_base.trim_end_matches('/')),
            None => url,
        })
        .collect()
}
