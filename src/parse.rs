use crate::error::Result;
use crate::search::SearchResult;
use log::debug;
use tokio::task;

/// Parses a results page into a SearchResult using spawn_blocking.
pub async fn parse_search_result(html: String) -> Result<SearchResult> {
    debug!("Starting results page parsing (using spawn_blocking)...");
    let result = task::spawn_blocking(move || SearchResult::from_html(&html)).await??;
    debug!(
        "Parsed results page: {} articles, {} related entry groups.",
        result.articles().len(),
        result.related_entries().len()
    );
    Ok(result)
}

/// Same as [`parse_search_result`], skipping articles that fail to parse.
pub async fn parse_search_result_lossy(html: String) -> Result<SearchResult> {
    debug!("Starting lossy results page parsing (using spawn_blocking)...");
    let result = task::spawn_blocking(move || SearchResult::from_html_lossy(&html)).await??;
    Ok(result)
}
