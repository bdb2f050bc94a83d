//! Fetching result pages from the dictionary website.
//!
//! One search is one GET of `{base_url}/{term}`. The site answers unknown
//! terms with a regular results page listing suggestions, sometimes with a
//! 404 status, so that status is not treated as a failure.

use crate::error::{DleError, Result};
use crate::node::DLE_MAIN_URL;
use log::{debug, info};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;

/// Base URL searches are issued against.
pub const DEFAULT_BASE_URL: &str = DLE_MAIN_URL;

/// The site rejects clients that do not look like a browser.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the HTTP client used for every search.
pub fn build_client() -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?;
    Ok(client)
}

/// URL of the results page for `term`, with the term percent-encoded as a
/// single path segment.
pub fn search_url(base_url: &str, term: &str) -> Result<Url> {
    let term = term.trim();
    if term.is_empty() {
        return Err(DleError::InvalidArgument(
            "search term must not be empty".to_string(),
        ));
    }
    let mut url = Url::parse(base_url)
        .map_err(|e| DleError::InvalidArgument(format!("invalid base URL {}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| DleError::InvalidArgument(format!("base URL cannot hold a path: {}", base_url)))?
        .pop_if_empty()
        .push(term);
    Ok(url)
}

/// Downloads the raw results page for `term`.
pub async fn fetch_search_page(client: &Client, base_url: &str, term: &str) -> Result<String> {
    let url = search_url(base_url, term)?;
    info!("Fetching results page {}", url);

    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    let response = if status == StatusCode::NOT_FOUND {
        debug!("{} answered 404, reading it as a results page", url);
        response
    } else {
        response.error_for_status()?
    };

    let html = response.text().await?;
    debug!("Fetched {} bytes from {}", html.len(), url);
    Ok(html)
}
