//! Shared utilities for operations across vaultport crates.
//!
//! Provides helpers for:
//! - Serialization with consistent error handling
//! - CSV building for reports
//! - Display names derived from file names

use crate::{Error, Result};

/// Generic JSON serialization with consistent error handling
/// Works with any type that implements Serialize (including slices)
pub fn to_json_string<T: serde::Serialize + ?Sized>(data: &T, context: &str) -> Result<String> {
    serde_json::to_string_pretty(data).map_err(|e| {
        Error::serialization(format!("Failed to serialize {} as JSON: {}", context, e))
    })
}

/// Pretty JSON bytes, for writing straight into a package.
pub fn to_json_bytes<T: serde::Serialize + ?Sized>(data: &T, context: &str) -> Result<Vec<u8>> {
    to_json_string(data, context).map(String::into_bytes)
}

/// Generic CSV serialization builder
/// Use the CSVBuilder fluent API to construct and export CSV data
pub struct CSVBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CSVBuilder {
    /// Create a new CSV with headers
    pub fn new(headers: Vec<&str>) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Add a row of data from owned strings
    pub fn add_row_owned(mut self, values: Vec<String>) -> Self {
        self.rows.push(values);
        self
    }

    /// Build the CSV string. Fields containing separators or quotes are quoted.
    pub fn build(self) -> String {
        let mut csv = join_fields(&self.headers) + "\n";
        for row in &self.rows {
            csv.push_str(&join_fields(row));
            csv.push('\n');
        }
        csv
    }
}

fn join_fields(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| {
            if f.contains([',', '"', '\n']) {
                format!("\"{}\"", f.replace('"', "\"\""))
            } else {
                f.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Human-readable name from a file stem: `my_meeting-notes` becomes `My Meeting Notes`.
pub fn prettify_name(stem: &str) -> String {
    stem.replace(['_', '-'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Truncate to at most `max_len` characters, preferring a word boundary,
/// and mark the cut with `...`.
pub fn truncate_at_word(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    if max_len < 10 {
        return text.chars().take(max_len).collect();
    }

    let mut truncated: String = text.chars().take(max_len - 3).collect();
    if let Some(last_space) = truncated.rfind(' ')
        && truncated[..last_space].chars().count() > max_len / 2
    {
        truncated.truncate(last_space);
    }
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prettify_name() {
        assert_eq!(prettify_name("my_meeting-notes"), "My Meeting Notes");
        assert_eq!(prettify_name("README"), "Readme");
        assert_eq!(prettify_name("  "), "");
    }

    #[test]
    fn test_truncate_at_word() {
        assert_eq!(truncate_at_word("short", 100), "short");

        let long = "word ".repeat(30);
        let cut = truncate_at_word(&long, 100);
        assert!(cut.ends_with("..."));
        assert!(cut.chars().count() <= 100);
        assert!(!cut.trim_end_matches("...").ends_with(' '));
    }

    #[test]
    fn test_csv_quoting() {
        let csv = CSVBuilder::new(vec!["a", "b"])
            .add_row_owned(vec!["x,y".into(), "say \"hi\"".into()])
            .build();
        assert_eq!(csv, "a,b\n\"x,y\",\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn test_to_json_string() {
        let json = to_json_string(&vec![1, 2], "numbers").unwrap();
        assert!(json.contains('1'));
    }
}
