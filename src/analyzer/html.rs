// src/analyzer/html.rs
// =============================================================================
// This module extracts facts from a parsed HTML page.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// Every function here is pure: it takes the parsed document and returns a
// value. No network access happens in this file, which is why all the
// extraction rules are tested right here at the bottom.
// =============================================================================

use scraper::{Html, Node, Selector};
use std::collections::BTreeMap;

use super::doctype;

// Links found on a page, split by the "//" rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub external: Vec<String>,
    pub internal: Vec<String>,
}

// Returns the text of the first <title> element, or None if there is none
//
// Example:
//   "<title>Hello</title>" -> Some("Hello")
pub fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").unwrap();

    document
        .select(&selector)
        .next()
        .map(|title| title.text().collect::<String>())
}

// Works out the HTML version from the doctype declaration
//
// Parameters:
//   document: the parsed page (tells us whether a doctype node exists)
//   source: the raw page text (keeps the declaration exactly as written)
//
// Returns: one of the names in the doctype table, or "unknown"
pub fn extract_html_version(document: &Html, source: &str) -> String {
    let declaration = match find_doctype_declaration(document, source) {
        Some(declaration) => declaration,
        None => return doctype::UNKNOWN_VERSION.to_string(),
    };

    doctype::version_from_declaration(&declaration).to_string()
}

// Finds the doctype declaration text (everything after the DOCTYPE keyword)
//
// html5ever splits the doctype into name/public id/system id and throws the
// original layout away. The version table matches on the first line as written,
// so once the tree confirms there is a doctype we read the text from the source.
fn find_doctype_declaration(document: &Html, source: &str) -> Option<String> {
    let node = document.tree.root().children().find_map(|child| match child.value() {
        Node::Doctype(doctype) => Some(doctype),
        _ => None,
    })?;

    if let Some(raw) = raw_doctype_text(source) {
        return Some(raw.to_string());
    }

    // The tree has a doctype but the source scan missed it: rebuild it on one line
    let mut rebuilt = node.name().to_string();
    if !node.public_id().is_empty() {
        rebuilt.push_str(&format!(" PUBLIC \"{}\"", node.public_id()));
    }
    Some(rebuilt)
}

// Scans the raw text for "<!DOCTYPE ...>" and returns what sits between the
// keyword and the closing '>'. Exactly one separator character is dropped.
// Comments are skipped, so "<!-- <!DOCTYPE svg> -->" before the real
// declaration does not count.
fn raw_doctype_text(source: &str) -> Option<&str> {
    const KEYWORD: &str = "<!doctype";

    // ASCII lowercasing keeps byte offsets identical to `source`
    let lowered = source.to_ascii_lowercase();
    let mut cursor = 0;

    let start = loop {
        let rest = &lowered[cursor..];
        let doctype_at = rest.find(KEYWORD)?;

        match rest.find("<!--") {
            Some(comment_at) if comment_at < doctype_at => {
                // "<!-->" is an empty comment, so the search starts right after "<!"
                let body_at = comment_at + 2;
                let comment_end = rest[body_at..].find("-->")?;
                cursor += body_at + comment_end + 3;
            }
            _ => break cursor + doctype_at + KEYWORD.len(),
        }
    };
    let end = start + source[start..].find('>')?;

    let declaration = &source[start..end];
    let mut chars = declaration.chars();
    match chars.next() {
        Some(c) if c.is_whitespace() => Some(chars.as_str()),
        _ => Some(declaration),
    }
}

// Counts heading elements for each level h1..h6
//
// The map always has all six keys, even when the count is zero.
pub fn count_headings(document: &Html) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();

    for level in 1..=6 {
        let tag = format!("h{}", level);
        let selector = Selector::parse(&tag).unwrap();
        counts.insert(tag, document.select(&selector).count());
    }

    counts
}

// Collects the href of every <a> element and classifies it
//
// A link is external when its href contains "//" (so both "https://x" and
// "//x" count), everything else is internal. Anchors without an href are
// skipped.
pub fn extract_links(document: &Html) -> PageLinks {
    let selector = Selector::parse("a[href]").unwrap();
    let mut links = PageLinks::default();

    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            if is_external(href) {
                links.external.push(href.to_string());
            } else {
                links.internal.push(href.to_string());
            }
        }
    }

    links
}

fn is_external(href: &str) -> bool {
    href.contains("//")
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is find_map?
//    - Like .map() followed by .find(), in one step
//    - Stops at the first closure call that returns Some(...)
//    - Here it walks the document's top-level nodes looking for the doctype
//
// 2. Why BTreeMap instead of HashMap?
//    - A BTreeMap keeps its keys sorted
//    - So "h1".."h6" always print and serialize in order
//
// 3. What does the ? do inside an Option function?
//    - Same as with Result: if the value is None, return None right away
//    - lowered.find(KEYWORD)? means "no doctype text found, give up"
// -----------------------------------------------------------------------------
