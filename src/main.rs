// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (tracing, filtered by RUST_LOG)
// 2. Parse command-line arguments using clap
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = all pages analyzed, 1 = a page failed, 2 = error)
// =============================================================================

mod analyzer;
mod cli;
mod error;
mod server;
mod session;

use analyzer::Analyzer;
use anyhow::Result;
use error::AnalyzeError;
use clap::Parser;
use cli::{Cli, Commands};
use session::{url_payload, PageRecord, Session};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_logging();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so `--json` output on stdout stays clean.
// RUST_LOG_FORMAT=json switches to one JSON object per line.
fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "page_inspector=info".into());

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

// Returns:
//   Ok(0) = every page analyzed
//   Ok(1) = at least one page failed (HTTP error status or network error)
//   Err = unexpected error
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let analyzer = Analyzer::new(&cli.analyzer_config())?;

    match cli.command {
        Commands::Analyze { urls, json } => handle_analyze(&analyzer, &urls, json).await,
        Commands::Serve { addr } => {
            server::serve(&addr, analyzer).await?;
            Ok(0)
        }
    }
}

// Handles the 'analyze' subcommand
//
// All URLs share one session, so a URL given twice is only fetched once.
async fn handle_analyze(analyzer: &Analyzer, urls: &[String], json: bool) -> Result<i32> {
    let mut session = Session::new();
    let mut failed = 0;

    for url in urls {
        let outcome = session
            .get_or_analyze(analyzer, url, url_payload(url))
            .await;

        if is_failure(&outcome) {
            failed += 1;
        }

        match outcome {
            Ok(record) => {
                if !json {
                    print_record(url, &record);
                }
            }
            Err(e) => {
                warn!("Could not analyze {}: {}", url, e);
                eprintln!("❌ {}: {}", url, e);
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(session.pages())?);
    }

    Ok(exit_code(failed))
}

// A page failed if it could not be fetched at all, or came back as an
// HTTP-error record
fn is_failure(outcome: &std::result::Result<PageRecord, AnalyzeError>) -> bool {
    match outcome {
        Ok(record) => record.contains_key("error_message"),
        Err(_) => true,
    }
}

// 0 when every page was analyzed, 1 when at least one failed
fn exit_code(failed: usize) -> i32 {
    if failed > 0 {
        1
    } else {
        0
    }
}

// Prints one record as a human-readable block
fn print_record(url: &str, record: &PageRecord) {
    println!("🔍 {}", url);

    if let (Some(message), Some(code)) = (record.get("error_message"), record.get("status_code")) {
        println!("   ❌ HTTP {} {}", code, message.as_str().unwrap_or(""));
        println!();
        return;
    }

    let field = |name: &str| record.get(name).cloned().unwrap_or_default();
    let title = record
        .get("title")
        .and_then(|title| title.as_str())
        .unwrap_or("(none)");

    let html_version = field("html_version");

    println!("   {:<22} {}", "Title:", title);
    println!("   {:<22} {}", "HTML version:", html_version.as_str().unwrap_or("unknown"));

    if let Some(headings) = record.get("heading_counts").and_then(|h| h.as_object()) {
        let counts: Vec<String> = headings
            .iter()
            .map(|(tag, count)| format!("{}={}", tag, count))
            .collect();
        println!("   {:<22} {}", "Headings:", counts.join(" "));
    }

    println!("   {:<22} {}", "Internal links:", field("internal_link_count"));
    println!("   {:<22} {}", "External links:", field("external_link_count"));
    println!("   {:<22} {}", "Inaccessible links:", field("inaccessible_link_count"));
    println!();
}
