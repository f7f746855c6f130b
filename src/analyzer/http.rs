// src/analyzer/http.rs
// =============================================================================
// This module does all the network work of an analysis:
// - Builds the reqwest client from the configuration
// - Fetches the page being analyzed
// - Checks whether external links are reachable
//
// Everything runs one request at a time. An analysis awaits the page fetch,
// then each link check in order, so a page with 30 external links makes
// 31 sequential requests.
//
// Rust concepts:
// - async/await: reqwest is an async client
// - Result<T, E>: For error handling
// - Enums: To represent the two outcomes of a page fetch
// =============================================================================

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{AnalyzeError, Result};

// Settings for the HTTP client
//
// Leaving `timeout` as None keeps reqwest's default behaviour.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub user_agent: String,
    pub timeout: Option<Duration>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("page-inspector/{}", env!("CARGO_PKG_VERSION")),
            timeout: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder().user_agent(&self.user_agent);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(builder.build()?)
    }
}

// What came back from fetching the page itself
#[derive(Debug)]
pub enum PageFetch {
    /// A 2xx answer: the body text
    Body(String),
    /// Anything else that reached us: 4xx/5xx, or a 3xx the client did not follow
    HttpError { status: StatusCode },
}

// Fetches the page at `url`
//
// Returns:
//   Ok(PageFetch::Body) for 2xx (redirects are followed first)
//   Ok(PageFetch::HttpError) for any other status, e.g. 404, 500 or an unfollowed 304
//   Err(AnalyzeError::Network) when no response (or no body) could be read
pub async fn fetch_page(client: &Client, url: &Url) -> Result<PageFetch> {
    debug!("Fetching {}", url);

    let network_error = |source: reqwest::Error| AnalyzeError::Network {
        url: url.to_string(),
        source,
    };

    let response = client.get(url.clone()).send().await.map_err(network_error)?;
    let status = response.status();

    if !status.is_success() {
        return Ok(PageFetch::HttpError { status });
    }

    let body = response.text().await.map_err(network_error)?;
    Ok(PageFetch::Body(body))
}

// Counts how many external links are inaccessible
//
// Parameters:
//   client: the shared reqwest client
//   page_url: the analyzed page, used to resolve protocol-relative hrefs
//   links: the external hrefs, exactly as written on the page
pub async fn count_inaccessible(client: &Client, page_url: &Url, links: &[String]) -> usize {
    let mut inaccessible = 0;

    for href in links {
        if !is_accessible(client, page_url, href).await {
            inaccessible += 1;
        }
    }

    inaccessible
}

// A link is accessible only if a GET answers with exactly 200 OK
async fn is_accessible(client: &Client, page_url: &Url, href: &str) -> bool {
    let target = match page_url.join(href) {
        Ok(target) => target,
        Err(e) => {
            debug!("Cannot resolve link {}: {}", href, e);
            return false;
        }
    };

    match client.get(target.clone()).send().await {
        Ok(response) => {
            let status = response.status();
            if status != StatusCode::OK {
                debug!("Link {} answered HTTP {}", target, status.as_u16());
            }
            status == StatusCode::OK
        }
        Err(e) => {
            warn!("Link {} is unreachable: {}", target, e);
            false
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why is `network_error` a closure?
//    - Both .send() and .text() can fail with a reqwest::Error
//    - The closure wraps either one into AnalyzeError::Network with the URL
//    - map_err(network_error)? then converts and returns early in one go
//
// 2. Why `for` + `.await` instead of running checks concurrently?
//    - Each check finishes before the next one starts
//    - The order of requests is predictable, which keeps the logs readable
//
// 3. What does Url::join do with "//host/path"?
//    - It keeps the scheme of the base URL and replaces everything else
//    - "https://a.com/page" joined with "//b.com/x" -> "https://b.com/x"
// -----------------------------------------------------------------------------
