// src/analyzer/mod.rs
// =============================================================================
// This module turns a URL into a page record.
//
// Submodules:
// - http: Fetches the page and checks whether external links respond
// - html: Pulls the title, doctype, headings and links out of the parsed page
// - doctype: The table that maps doctype declarations to HTML versions
//
// The pipeline is linear: fetch -> parse -> extract -> check links.
// =============================================================================

mod doctype;
mod html;
mod http;

use reqwest::Client;
use scraper::Html;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::info;
use url::Url;

use crate::error::{AnalyzeError, Result};

pub use http::AnalyzerConfig;
use http::PageFetch;

// The facts extracted from a page that was fetched successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    /// Text of the first <title>, None if the page has no title
    pub title: Option<String>,
    /// "HTML 5", "XHTML 1.0 Strict", ... or "unknown"
    pub html_version: String,
    /// "h1".."h6" -> number of elements
    pub heading_counts: BTreeMap<String, usize>,
    pub external_link_count: usize,
    pub internal_link_count: usize,
    pub inaccessible_link_count: usize,
}

// Result of analyzing one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analysis {
    Success(PageReport),
    FetchFailed { error_message: String, status_code: u16 },
}

impl Analysis {
    // The record fields this analysis contributes
    //
    // A record has either the report fields or `error_message` + `status_code`.
    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();

        match self {
            Analysis::Success(report) => {
                fields.insert("title".to_string(), json!(report.title));
                fields.insert("html_version".to_string(), json!(report.html_version));
                fields.insert("heading_counts".to_string(), json!(report.heading_counts));
                fields.insert("external_link_count".to_string(), json!(report.external_link_count));
                fields.insert("internal_link_count".to_string(), json!(report.internal_link_count));
                fields.insert(
                    "inaccessible_link_count".to_string(),
                    json!(report.inaccessible_link_count),
                );
            }
            Analysis::FetchFailed {
                error_message,
                status_code,
            } => {
                fields.insert("error_message".to_string(), json!(error_message));
                fields.insert("status_code".to_string(), json!(status_code));
            }
        }

        fields
    }
}

// Runs analyses with one shared HTTP client
pub struct Analyzer {
    client: Client,
}

impl Analyzer {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        Ok(Self {
            client: config.build_client()?,
        })
    }

    // Fetches `url` and extracts everything we report about it
    //
    // Returns:
    //   Ok(Analysis::Success) when the page was fetched and parsed
    //   Ok(Analysis::FetchFailed) when the server answered with a non-2xx status
    //   Err(AnalyzeError) when the URL is invalid or the fetch failed on the network
    pub async fn analyze(&self, url: &str) -> Result<Analysis> {
        let page_url = Url::parse(url).map_err(|e| AnalyzeError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let body = match http::fetch_page(&self.client, &page_url).await? {
            PageFetch::Body(body) => body,
            PageFetch::HttpError { status } => {
                info!("{} answered HTTP {}", page_url, status.as_u16());
                return Ok(Analysis::FetchFailed {
                    error_message: status.canonical_reason().unwrap_or("Unknown").to_string(),
                    status_code: status.as_u16(),
                });
            }
        };

        // scraper::Html is not Send, so it must be gone before the next .await
        let (title, html_version, heading_counts, links) = {
            let document = Html::parse_document(&body);
            (
                html::extract_title(&document),
                html::extract_html_version(&document, &body),
                html::count_headings(&document),
                html::extract_links(&document),
            )
        };

        let inaccessible_link_count =
            http::count_inaccessible(&self.client, &page_url, &links.external).await;

        info!(
            "Analyzed {}: {} internal, {} external ({} inaccessible) links",
            page_url,
            links.internal.len(),
            links.external.len(),
            inaccessible_link_count
        );

        Ok(Analysis::Success(PageReport {
            title,
            html_version,
            heading_counts,
            external_link_count: links.external.len(),
            internal_link_count: links.internal.len(),
            inaccessible_link_count,
        }))
    }
}
