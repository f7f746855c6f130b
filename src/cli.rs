// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Global flags (--timeout, --user-agent) configure the HTTP client and apply
// to both subcommands.
// =============================================================================

use clap::{Parser, Subcommand};
use std::time::Duration;

use crate::analyzer::AnalyzerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "page-inspector",
    version,
    about = "Inspect HTML pages: title, doctype version, headings and links",
    long_about = "page-inspector fetches a page and reports its title, declared HTML version, \
                  heading counts per level, and how many of its links are internal, external, \
                  and external-but-unreachable. Results are cached per URL for the session."
)]
pub struct Cli {
    /// Request timeout in seconds (default: no timeout beyond the HTTP client's own)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// User-Agent header sent with every request
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze one or more pages in a single session
    ///
    /// Example: page-inspector analyze https://example.com https://www.rust-lang.org
    Analyze {
        /// URLs to analyze; repeating a URL returns the cached record
        #[arg(required = true)]
        urls: Vec<String>,

        /// Output the session's records as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Serve the analyzer over HTTP (GET/POST /pages)
    ///
    /// Example: page-inspector serve --addr 0.0.0.0:8000
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: String,
    },
}

impl Cli {
    // Collects the global flags into the analyzer's client settings
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        let mut config = AnalyzerConfig::default();

        if let Some(secs) = self.timeout {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }

        config
    }
}
