//! Item list loading

use crate::error::{CheckError, Result};
use std::fs;
use std::path::Path;

/// Parse items from content: one per line, trimmed, blank lines dropped.
/// Duplicates and input order are kept.
pub fn parse_items(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the item list. A file without usable lines is an error.
pub fn load_items<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let items = parse_items(&fs::read_to_string(path)?);
    if items.is_empty() {
        return Err(CheckError::EmptyInput {
            path: path.to_path_buf(),
        });
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items_skips_blank_lines() {
        let items = parse_items("a@example.com\n\n  b@example.com  \n\t\na@example.com\n");
        assert_eq!(items, ["a@example.com", "b@example.com", "a@example.com"]);
    }

    #[test]
    fn test_load_items_all_blank_is_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emails.txt");
        fs::write(&path, "\n   \n\n").unwrap();

        assert!(matches!(load_items(&path), Err(CheckError::EmptyInput { .. })));
    }

    #[test]
    fn test_load_items_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_items(dir.path().join("missing.txt")),
            Err(CheckError::Io(_))
        ));
    }
}
