// src/session.rs
// =============================================================================
// Per-client cache of page records.
//
// A Session is a plain value owned by whoever serves the client: the CLI run
// owns one for all URLs on its command line, the HTTP server keeps one per
// session id. There is no global state.
//
// Each URL is analyzed at most once per session. The first request stores the
// caller's payload with the analysis merged into it; later requests for the
// same URL get that stored record back unchanged.
// =============================================================================

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::analyzer::Analyzer;
use crate::error::Result;

// A stored record: the caller's payload plus the analysis fields
pub type PageRecord = Map<String, Value>;

#[derive(Debug, Default)]
pub struct Session {
    pages: BTreeMap<String, PageRecord>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // All records cached so far, keyed by URL
    pub fn pages(&self) -> &BTreeMap<String, PageRecord> {
        &self.pages
    }

    // Returns the cached record for `url`, analyzing it first if needed
    //
    // Parameters:
    //   analyzer: runs the analysis on a cache miss
    //   url: the page to analyze (also the cache key)
    //   payload: the caller's fields, ignored on a cache hit
    //
    // Network errors are returned as-is and nothing is stored, so asking
    // again later retries the fetch.
    pub async fn get_or_analyze(
        &mut self,
        analyzer: &Analyzer,
        url: &str,
        mut payload: PageRecord,
    ) -> Result<PageRecord> {
        if let Some(record) = self.pages.get(url) {
            debug!("Cache hit for {}", url);
            return Ok(record.clone());
        }

        let analysis = analyzer.analyze(url).await?;

        payload.extend(analysis.into_fields());

        self.pages.insert(url.to_string(), payload.clone());
        Ok(payload)
    }
}

// Builds the minimal payload for a URL: {"url": "<url>"}
pub fn url_payload(url: &str) -> PageRecord {
    let mut payload = Map::new();
    payload.insert("url".to_string(), Value::String(url.to_string()));
    payload
}
