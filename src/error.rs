// src/error.rs
// =============================================================================
// Error types for page analysis.
//
// An HTTP error status on the page itself is NOT an error here: it is a normal
// outcome (see `Analysis::FetchFailed`) and gets cached like any other record.
// This enum only covers the failures that stop an analysis from producing a
// record at all.
// =============================================================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    /// The URL we were asked to analyze could not be parsed
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The page could not be fetched at all (connection refused, DNS, timeout...)
    #[error("Network error while fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client itself could not be built from the configuration
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AnalyzeError>;
