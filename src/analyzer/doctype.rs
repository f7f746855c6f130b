// src/analyzer/doctype.rs
// =============================================================================
// Maps a doctype declaration to a human-readable HTML version.
//
// Matching is literal: the declaration's first line is lower-cased and looked
// up as-is. Extra spaces, or a system identifier on the same line, mean no
// match and the version is "unknown".
// =============================================================================

pub const UNKNOWN_VERSION: &str = "unknown";

// (normalized first line, version name)
const DOCTYPE_VERSIONS: [(&str, &str); 8] = [
    ("html", "HTML 5"),
    (r#"html public "-//w3c//dtd html 4.01//en""#, "HTML 4.01 Strict"),
    (r#"html public "-//w3c//dtd html 4.01 transitional//en""#, "HTML 4.01 Transitional"),
    (r#"html public "-//w3c//dtd html 4.01 frameset//en""#, "HTML 4.01 Frameset"),
    (r#"html public "-//w3c//dtd xhtml 1.0 strict//en""#, "XHTML 1.0 Strict"),
    (r#"html public "-//w3c//dtd xhtml 1.0 transitional//en""#, "XHTML 1.0 Transitional"),
    (r#"html public "-//w3c//dtd xhtml 1.0 frameset//en""#, "XHTML 1.0 Frameset"),
    (r#"html public "-//w3c//dtd xhtml 1.1//en""#, "XHTML 1.1"),
];

// Parameters:
//   declaration: doctype text after the DOCTYPE keyword, e.g. `html PUBLIC "..."`
//
// Returns: the version name, or UNKNOWN_VERSION
pub fn version_from_declaration(declaration: &str) -> &'static str {
    let first_line = declaration.split('\n').next().unwrap_or_default().to_lowercase();

    DOCTYPE_VERSIONS
        .iter()
        .find(|(line, _)| *line == first_line)
        .map(|(_, version)| *version)
        .unwrap_or(UNKNOWN_VERSION)
}
