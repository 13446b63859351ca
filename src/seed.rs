//! Parsing for bulk seed files.
//!
//! Accepted formats:
//! - a JSON array of strings: `["first post", "second post"]`
//! - a JSON array of objects with a `post` field: `[{"post": "first post"}]`
//! - plain text with one post per line
//!
//! Blank entries are dropped in every format.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedEntry {
    Text(String),
    Record { post: String },
}

impl SeedEntry {
    fn into_text(self) -> String {
        match self {
            SeedEntry::Text(text) | SeedEntry::Record { post: text } => text,
        }
    }
}

pub fn parse_json(content: &str) -> Result<Vec<String>> {
    let entries: Vec<SeedEntry> =
        serde_json::from_str(content).context("seed file is not a JSON array of posts")?;
    Ok(entries
        .into_iter()
        .map(SeedEntry::into_text)
        .filter(|t| !t.trim().is_empty())
        .collect())
}

pub fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Parse seed content. A JSON array or object must have one of the JSON
/// shapes; everything else is read line by line.
pub fn parse(content: &str) -> Result<Vec<String>> {
    let is_json = serde_json::from_str::<serde_json::Value>(content)
        .map(|v| v.is_array() || v.is_object())
        .unwrap_or(false);
    if is_json {
        parse_json(content)
    } else {
        Ok(parse_lines(content))
    }
}

/// One line typed into the interactive seeder.
#[derive(Debug, PartialEq, Eq)]
pub enum Entry<'a> {
    Exit,
    Blank,
    Post(&'a str),
}

/// Interpret an interactive line. Posts are kept exactly as typed.
pub fn read_entry(line: &str) -> Entry<'_> {
    let trimmed = line.trim();
    if trimmed.eq_ignore_ascii_case("exit") {
        Entry::Exit
    } else if trimmed.is_empty() {
        Entry::Blank
    } else {
        Entry::Post(line)
    }
}

pub async fn load(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    parse(&content).with_context(|| format!("failed to parse seed file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_records_and_strings() {
        let posts = parse(r#"[{"post": "first", "category": null}, "second", {"post": "  "}]"#).unwrap();
        assert_eq!(posts, vec!["first", "second"]);
    }

    #[test]
    fn plain_lines() {
        let posts = parse("first post\n\n  second post  \r\n").unwrap();
        assert_eq!(posts, vec!["first post", "second post"]);
    }

    #[test]
    fn plain_lines_starting_with_bracket() {
        let posts = parse("[Update] new release is out\nsecond post\n").unwrap();
        assert_eq!(posts, vec!["[Update] new release is out", "second post"]);
    }

    #[test]
    fn json_of_wrong_shape_is_error() {
        assert!(parse(r#"{"post": "not an array"}"#).is_err());
        assert!(parse("[1, 2]").is_err());
    }

    #[test]
    fn json_scalar_line_is_plain_text() {
        assert_eq!(parse("42\n").unwrap(), vec!["42"]);
    }

    #[test]
    fn interactive_entries() {
        assert_eq!(read_entry("EXIT"), Entry::Exit);
        assert_eq!(read_entry("  exit "), Entry::Exit);
        assert_eq!(read_entry("   "), Entry::Blank);
        assert_eq!(read_entry("  indented post "), Entry::Post("  indented post "));
    }

    #[test]
    fn arabic_text_is_kept_verbatim() {
        let posts = parse(r#"["اليوم كنت أتابع الوضع السياسي"]"#).unwrap();
        assert_eq!(posts, vec!["اليوم كنت أتابع الوضع السياسي"]);
    }

    #[test]
    fn malformed_json_is_error() {
        assert!(parse(r#"[{"text": "wrong field"}]"#).is_err());
    }

    #[tokio::test]
    async fn load_reads_file() {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("posts.txt");
        std::fs::write(&p, "one\ntwo\n").unwrap();
        assert_eq!(load(&p).await.unwrap(), vec!["one", "two"]);
    }
}
